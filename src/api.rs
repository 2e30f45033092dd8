// REST API over the transactions store
//
// Routes (all under /api):
//   GET    /health
//   GET    /transactions          -> JSON array ordered by id
//   POST   /transactions          -> 201 | 400 invalid | 409 duplicate id
//   GET    /transactions/:id      -> record | 404
//   DELETE /transactions/:id      -> 204 | 404

use crate::db::{self, InvalidTransaction, NewTransaction};
use crate::transaction::Transaction;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::Poisoned)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transaction {0} not found")]
    NotFound(i64),

    #[error("transaction {0} already exists")]
    Duplicate(i64),

    #[error(transparent)]
    Invalid(#[from] InvalidTransaction),

    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("database error")]
    Database(#[from] anyhow::Error),

    #[error("database unavailable")]
    Poisoned,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::Invalid(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(e) => {
                error!("database error: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Poisoned => {
                error!("database lock poisoned");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ApiResponse::err(self.to_string()))).into_response()
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - Get all transactions
async fn list_transactions(State(state): State<AppState>) -> Result<Json<Vec<Transaction>>, ApiError> {
    let conn = state.conn()?;
    let transactions = db::get_all_transactions(&conn)?;
    Ok(Json(transactions))
}

/// GET /api/transactions/:id - Get one transaction
async fn show_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, ApiError> {
    let conn = state.conn()?;
    db::get_transaction(&conn, id)?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// POST /api/transactions - Store a new transaction
async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(new_tx) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    new_tx.validate()?;

    let conn = state.conn()?;
    match db::insert_transaction(&conn, &new_tx)? {
        Some(tx) => {
            info!(id = tx.id, "transaction created");
            Ok((StatusCode::CREATED, Json(tx)))
        }
        None => Err(ApiError::Duplicate(new_tx.id.unwrap_or_default())),
    }
}

/// DELETE /api/transactions/:id - Remove a transaction
async fn remove_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = state.conn()?;
    if db::delete_transaction(&conn, id)? {
        info!(id, "transaction deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

// ============================================================================
// Router / Server
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/:id", get(show_transaction).delete(remove_transaction))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API on `addr` until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
