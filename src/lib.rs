// Budgeteer - Core Library
// Exposes all modules for use in the viewer, the API server, and tests

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod listing;
pub mod telemetry;
pub mod transaction;
pub mod view;

#[cfg(feature = "tui")]
pub mod ui;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use client::{HttpTransactionSource, TransactionSource};
pub use config::{ClientArgs, ClientCommand, ClientConfig, ServerArgs, ServerCommand};
pub use db::{
    ImportOutcome, InvalidTransaction, NewTransaction,
    delete_transaction, get_all_transactions, get_transaction, insert_transaction,
    insert_transactions, load_csv, open_database, setup_database, verify_count,
};
pub use error::FetchError;
pub use listing::write_listing;
pub use telemetry::{init_tracing, LogTarget};
pub use transaction::{decode_transactions, Summary, Transaction};
pub use view::TransactionView;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
