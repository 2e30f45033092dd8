// Budgeteer - API Server
// Serves the transactions store over REST, or imports a CSV into it

use anyhow::Result;
use budgeteer::api::{self, AppState};
use budgeteer::config::{ServerArgs, ServerCommand};
use budgeteer::telemetry::{init_tracing, LogTarget};
use budgeteer::{insert_transactions, load_csv, open_database, verify_count};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = ServerArgs::parse();
    init_tracing(LogTarget::Stderr)?;

    match args.command_or_serve() {
        ServerCommand::Serve => run_server(&args.db, args.addr).await,
        ServerCommand::Import { csv } => run_import(&args.db, &csv),
    }
}

async fn run_server(db_path: &Path, addr: SocketAddr) -> Result<()> {
    println!("🌐 Budgeteer - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(db_path)?;
    println!("✓ Database opened: {}", db_path.display());

    println!("\n🚀 Server running on http://{addr}");
    println!("   API: http://{addr}/api/transactions");
    println!("\n   Press Ctrl+C to stop\n");

    api::serve(addr, AppState::new(conn)).await
}

fn run_import(db_path: &Path, csv_path: &Path) -> Result<()> {
    println!("🗄️  Data Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let transactions = load_csv(csv_path)?;
    println!("✓ Loaded {} transactions from CSV", transactions.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = open_database(db_path)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert transactions
    println!("\n💾 Inserting transactions...");
    let outcome = insert_transactions(&conn, &transactions)?;
    println!("✓ Inserted {} transactions", outcome.inserted);
    if outcome.duplicates > 0 {
        println!("✓ Duplicates skipped: {}", outcome.duplicates);
    }

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let count = verify_count(&conn)?;
    println!("✓ Database contains {} transactions", count);

    Ok(())
}
