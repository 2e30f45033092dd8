use crate::transaction::Transaction;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Longest accepted payee name
pub const MAX_NAME_LEN: usize = 30;

/// Amounts are stored with at most 20 digits, 2 of them after the point
pub const MAX_DIGITS: u32 = 20;
pub const DECIMAL_PLACES: u32 = 2;

// ============================================================================
// INPUT RECORDS
// ============================================================================

/// A transaction about to be stored. Without an `id` the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(deserialize_with = "rust_decimal::serde::arbitrary_precision::deserialize")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTransaction {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name is longer than 30 characters")]
    NameTooLong,

    #[error("amount has more than 2 decimal places")]
    TooManyDecimalPlaces,

    #[error("amount has more than 20 digits")]
    TooManyDigits,
}

impl NewTransaction {
    pub fn new(id: Option<i64>, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidTransaction> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(InvalidTransaction::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(InvalidTransaction::NameTooLong);
        }

        if self.amount.normalize().scale() > DECIMAL_PLACES {
            return Err(InvalidTransaction::TooManyDecimalPlaces);
        }
        let integer_limit = Decimal::from(10_i64.pow(MAX_DIGITS - DECIMAL_PLACES));
        if self.amount.abs().trunc() >= integer_limit {
            return Err(InvalidTransaction::TooManyDigits);
        }

        Ok(())
    }
}

/// Result of a bulk import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

    // Amounts are decimal text so values round-trip exactly
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

/// Open (or create) the database file and make sure the schema exists.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: Option<i64>,
    name: String,
    amount: String,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<NewTransaction>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_csv(file)
}

/// Read `id,name,amount` rows. `id` may be left empty.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<NewTransaction>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row: CsvRow = result.with_context(|| format!("Failed to deserialize line {line}"))?;

        let amount = Decimal::from_str(&row.amount)
            .with_context(|| format!("Invalid amount `{}` on line {line}", row.amount))?;
        let transaction = NewTransaction::new(row.id, row.name, amount);
        transaction
            .validate()
            .with_context(|| format!("Invalid transaction on line {line}"))?;

        transactions.push(transaction);
    }

    Ok(transactions)
}

// ============================================================================
// WRITES
// ============================================================================

/// Insert one transaction. Returns `None` when the id is already taken.
///
/// Amounts are stored with exactly two decimal places (`1` becomes `1.00`).
pub fn insert_transaction(conn: &Connection, tx: &NewTransaction) -> Result<Option<Transaction>> {
    let mut amount = tx.amount;
    amount.rescale(DECIMAL_PLACES);

    let result = conn.execute(
        "INSERT INTO transactions (id, name, amount) VALUES (?1, ?2, ?3)",
        params![tx.id, tx.name.trim(), amount.to_string()],
    );

    match result {
        Ok(_) => Ok(Some(Transaction::new(
            conn.last_insert_rowid(),
            tx.name.trim(),
            amount,
        ))),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert many transactions, skipping ids that already exist.
pub fn insert_transactions(conn: &Connection, transactions: &[NewTransaction]) -> Result<ImportOutcome> {
    let mut outcome = ImportOutcome::default();

    for tx in transactions {
        match insert_transaction(conn, tx)? {
            Some(_) => outcome.inserted += 1,
            None => outcome.duplicates += 1,
        }
    }

    Ok(outcome)
}

/// Delete by id. Returns whether a row was removed.
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    Ok(removed > 0)
}

// ============================================================================
// READS
// ============================================================================

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let amount: String = row.get(2)?;
    let amount = Decimal::from_str(&amount).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        name: row.get(1)?,
        amount,
    })
}

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare("SELECT id, name, amount FROM transactions ORDER BY id")?;

    let transactions = stmt
        .query_map([], row_to_transaction)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let transaction = conn
        .query_row(
            "SELECT id, name, amount FROM transactions WHERE id = ?1",
            [id],
            row_to_transaction,
        )
        .optional()?;

    Ok(transaction)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}
