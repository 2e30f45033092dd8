//! HTTP access to the transactions endpoint.

use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::transaction::{decode_transactions, Transaction};
use reqwest::header::ACCEPT;
use reqwest::Url;
use std::future::Future;
use tracing::debug;

/// Anything the view can load transactions from.
pub trait TransactionSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Transaction>, FetchError>> + Send;
}

/// Read-only client for a fixed transactions URL.
///
/// One `GET` per call: no parameters, no authentication, no retry.
#[derive(Debug, Clone)]
pub struct HttpTransactionSource {
    http_client: reqwest::Client,
    url: Url,
}

impl HttpTransactionSource {
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            url: config.api_url.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl TransactionSource for HttpTransactionSource {
    async fn fetch(&self) -> Result<Vec<Transaction>, FetchError> {
        debug!(url = %self.url, "fetching transactions");

        let response = self
            .http_client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let transactions = decode_transactions(&body)?;

        debug!(count = transactions.len(), "fetched transactions");
        Ok(transactions)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Serve `router` on an ephemeral local port for the rest of the test.
    pub async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// An address nothing is listening on.
    pub async fn closed_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{closed_addr, serve};
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn source_for(addr: SocketAddr) -> HttpTransactionSource {
        let config = ClientConfig {
            api_url: Url::parse(&format!("http://{addr}/api/transactions")).unwrap(),
            timeout: Duration::from_secs(5),
        };
        HttpTransactionSource::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let router = Router::new().route(
            "/api/transactions",
            get(|| async {
                r#"[{"id": 1, "name": "Rent", "amount": "-900.00"},
                    {"id": 2, "name": "Salary", "amount": 2500}]"#
            }),
        );
        let addr = serve(router).await;

        let transactions = source_for(addr).fetch().await.unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].name, "Rent");
        assert_eq!(transactions[1].id, 2);
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_json() {
        let router = Router::new().route(
            "/api/transactions",
            get(|headers: HeaderMap| async move {
                match headers.get("accept").and_then(|v| v.to_str().ok()) {
                    Some("application/json") => (StatusCode::OK, "[]"),
                    _ => (StatusCode::NOT_ACCEPTABLE, ""),
                }
            }),
        );
        let addr = serve(router).await;

        assert!(source_for(addr).fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let router = Router::new().route(
            "/api/transactions",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = serve(router).await;

        let err = source_for(addr).fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[tokio::test]
    async fn test_fetch_missing_route() {
        let addr = serve(Router::new()).await;

        let err = source_for(addr).fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_body() {
        let router = Router::new().route("/api/transactions", get(|| async { "<html>oops</html>" }));
        let addr = serve(router).await;

        let err = source_for(addr).fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let addr = closed_addr().await;

        let err = source_for(addr).fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Request(_)));
    }
}
