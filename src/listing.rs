// Plain-text rendering of the transaction list for `budgeteer list`

use crate::transaction::{Summary, Transaction};
use std::io::{self, Write};

/// Write one line per transaction followed by a totals line.
pub fn write_listing<W: Write>(out: &mut W, transactions: &[Transaction]) -> io::Result<()> {
    writeln!(out, "{:>8}  {:<30}  {:>14}", "ID", "Name", "Amount")?;

    for tx in transactions {
        writeln!(out, "{:>8}  {:<30}  {:>14.2}", tx.id, tx.name, tx.amount)?;
    }

    let summary = Summary::of(transactions);
    writeln!(
        out,
        "{} transactions, total {:.2} (in {:.2}, out {:.2})",
        summary.count, summary.total, summary.inflow, summary.outflow
    )?;

    Ok(())
}
