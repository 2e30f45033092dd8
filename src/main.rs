use anyhow::Result;
use budgeteer::config::{ClientArgs, ClientCommand, ClientConfig};
use budgeteer::telemetry::{init_tracing, LogTarget};
use budgeteer::{write_listing, HttpTransactionSource, TransactionView};
use clap::Parser;
use std::io;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = ClientArgs::parse();
    let config = args.endpoint.client_config()?;

    match args.command.unwrap_or(ClientCommand::View) {
        ClientCommand::List => run_list(config).await,
        ClientCommand::View => run_ui_mode(config, &args.log_file).await,
    }
}

async fn run_list(config: ClientConfig) -> Result<()> {
    init_tracing(LogTarget::Stderr)?;

    let source = Arc::new(HttpTransactionSource::new(&config)?);
    let mut view = TransactionView::new();
    view.activate(source);
    view.wait().await;

    // Failures were logged; the listing just comes out empty
    write_listing(&mut io::stdout().lock(), view.transactions())?;

    Ok(())
}

#[cfg(feature = "tui")]
async fn run_ui_mode(config: ClientConfig, log_file: &Path) -> Result<()> {
    use budgeteer::ui;

    // The terminal owns stdout/stderr while the UI runs
    init_tracing(LogTarget::File(log_file))?;

    let source = Arc::new(HttpTransactionSource::new(&config)?);
    let mut app = ui::App::new(source);
    ui::run_ui(&mut app).await?;

    println!("✅ UI closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_config: ClientConfig, _log_file: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print the list: budgeteer list");
    std::process::exit(1);
}
