// Transaction record - the flat shape returned by the transactions API
//
// Wire format: a JSON array of `{ "id", "name", "amount" }` objects.
// Decoding also accepts what the budgeting backend emits:
// - `amount` as a decimal string ("12.50") or as a JSON number
// - `pk` for `id` and `payee` for `name`
// - an object keyed by primary key instead of an array

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single transaction as received from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier, unique by assumption (not checked by the client)
    #[serde(alias = "pk")]
    pub id: i64,

    /// Payee / description
    #[serde(alias = "payee")]
    pub name: String,

    /// Signed amount; negative values are money going out
    #[serde(deserialize_with = "rust_decimal::serde::arbitrary_precision::deserialize")]
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(id: i64, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            amount,
        }
    }

    pub fn is_outflow(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// Decode a response body into a list of transactions.
///
/// Arrays keep the server's order. Keyed objects are flattened and ordered
/// by `id`, since their key order carries no meaning.
pub fn decode_transactions(body: &[u8]) -> Result<Vec<Transaction>, serde_json::Error> {
    // Go through `Value` so numeric amounts keep every digit
    let payload: Value = serde_json::from_slice(body)?;
    if payload.is_array() {
        return serde_json::from_value(payload);
    }

    let by_key: BTreeMap<String, Transaction> = serde_json::from_value(payload)?;
    let mut transactions: Vec<_> = by_key.into_values().collect();
    transactions.sort_by_key(|tx| tx.id);
    Ok(transactions)
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Totals shown in the view header and the plain listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub count: usize,
    pub total: Decimal,
    pub inflow: Decimal,
    pub outflow: Decimal,
}

impl Summary {
    pub fn of(transactions: &[Transaction]) -> Self {
        let mut summary = Summary {
            count: transactions.len(),
            ..Summary::default()
        };

        for tx in transactions {
            summary.total += tx.amount;
            if tx.is_outflow() {
                summary.outflow += tx.amount;
            } else {
                summary.inflow += tx.amount;
            }
        }

        summary
    }
}
