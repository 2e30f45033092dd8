// Command-line / environment configuration for both binaries
//
// Precedence: command-line flag > environment variable (a `.env` file is
// loaded into the environment by the binaries) > default.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/transactions";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_FILE: &str = "budgeteer.log";
pub const DEFAULT_PORT: u16 = 8000;

// ============================================================================
// CLIENT
// ============================================================================

/// Terminal viewer for the transactions API
#[derive(Parser, Debug)]
#[command(name = "budgeteer")]
#[command(author, version, about, long_about = None)]
pub struct ClientArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Log file for the terminal UI (it owns stdout/stderr while running)
    #[arg(long, env = "BUDGETEER_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<ClientCommand>,
}

#[derive(Args, Debug, Clone)]
pub struct EndpointArgs {
    /// Transactions endpoint URL
    #[arg(long, env = "BUDGETEER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "BUDGETEER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Open the full-screen viewer (default)
    View,
    /// Fetch once and print the transactions to stdout
    List,
}

/// Validated settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub timeout: Duration,
}

impl EndpointArgs {
    pub fn client_config(&self) -> Result<ClientConfig> {
        let api_url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid API URL `{}`", self.api_url))?;

        if !matches!(api_url.scheme(), "http" | "https") {
            bail!("API URL must use http or https, got `{}`", api_url.scheme());
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }

        Ok(ClientConfig {
            api_url,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

// ============================================================================
// SERVER
// ============================================================================

/// Transactions API server
#[derive(Parser, Debug)]
#[command(name = "budgeteer-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// SQLite database file
    #[arg(long, global = true, env = "BUDGETEER_DB", default_value = "transactions.db")]
    pub db: PathBuf,

    /// Listen address
    #[arg(long, global = true, env = "BUDGETEER_ADDR", default_value_t = default_addr())]
    pub addr: SocketAddr,

    #[command(subcommand)]
    pub command: Option<ServerCommand>,
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

impl ServerArgs {
    /// The chosen subcommand, `serve` when none was given.
    pub fn command_or_serve(&self) -> ServerCommand {
        self.command.clone().unwrap_or(ServerCommand::Serve)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Serve the transactions API (default)
    Serve,
    /// Import `id,name,amount` rows from a CSV file
    Import {
        /// CSV file to load
        csv: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let args = ClientArgs::try_parse_from(["budgeteer"]).unwrap();
        let config = args.endpoint.client_config().unwrap();

        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(args.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(args.command, None);
    }

    #[test]
    fn test_client_flags() {
        let args = ClientArgs::try_parse_from([
            "budgeteer",
            "--api-url",
            "http://10.0.0.5:9000/tx/",
            "--timeout-secs",
            "3",
            "list",
        ])
        .unwrap();
        let config = args.endpoint.client_config().unwrap();

        assert_eq!(config.api_url.as_str(), "http://10.0.0.5:9000/tx/");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(args.command, Some(ClientCommand::List));
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let endpoint = EndpointArgs {
            api_url: "not a url".to_string(),
            timeout_secs: 10,
        };
        assert!(endpoint.client_config().is_err());

        let endpoint = EndpointArgs {
            api_url: "ftp://localhost/transactions".to_string(),
            timeout_secs: 10,
        };
        assert!(endpoint.client_config().is_err());
    }

    #[test]
    fn test_client_rejects_zero_timeout() {
        let endpoint = EndpointArgs {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 0,
        };
        assert!(endpoint.client_config().is_err());
    }

    #[test]
    fn test_server_args() {
        let args = ServerArgs::try_parse_from(["budgeteer-server", "--db", "/tmp/t.db", "import", "tx.csv"])
            .unwrap();

        assert_eq!(args.db, PathBuf::from("/tmp/t.db"));
        assert_eq!(
            args.command,
            Some(ServerCommand::Import {
                csv: PathBuf::from("tx.csv")
            })
        );

        let args = ServerArgs::try_parse_from(["budgeteer-server"]).unwrap();
        assert_eq!(args.command_or_serve(), ServerCommand::Serve);
        assert_eq!(args.addr, "127.0.0.1:8000".parse().unwrap());

        let args = ServerArgs::try_parse_from(["budgeteer-server", "serve", "--addr", "0.0.0.0:3000"]).unwrap();
        assert_eq!(args.command, Some(ServerCommand::Serve));
        assert_eq!(args.addr, "0.0.0.0:3000".parse().unwrap());
    }
}
