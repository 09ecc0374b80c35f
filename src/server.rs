//! HTTP query endpoint over the quote aggregator.
//!
//! ## Endpoints
//!
//! - `GET /api/{name}`: look up `name` at every source
//! - `GET /health`: liveness check
//!
//! Adapter errors are reported as `NOT_FOUND`; their diagnostics stay in the
//! server log.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stake_scout::{AggregateResult, Aggregator, Quote, QuoteStatus, ScoutError};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, StakeError};

/// Body of every 400 response for a missing or blank share name.
pub const MISSING_NAME: &str = "Missing share name. Example: /api/nse or /api/NSE India";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response of `GET /api/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// The share name as requested.
    pub query: String,
    /// When the lookup finished, RFC 3339 in UTC.
    pub timestamp: String,
    /// One entry per configured source, keyed by source name.
    pub quotes_by_source: BTreeMap<String, SourceEntry>,
    /// The cheapest found quote, if any.
    pub best_quote: Option<BestQuote>,
    /// One-line human-readable outcome.
    pub summary: String,
}

/// One source's outcome as shown to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// `FOUND` or `NOT_FOUND`.
    pub status: String,
    /// Present exactly when `status` is `FOUND`.
    pub data: Option<QuoteData>,
}

/// Fields of a found quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub share_name: String,
    /// Price text as the source shows it.
    pub last_traded_price: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_value: Decimal,
    pub source_url: String,
    pub detail_url: Option<String>,
    pub price_change: Option<String>,
}

/// The winning quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestQuote {
    pub source: String,
    pub share_name: String,
    pub last_traded_price: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_value: Decimal,
    pub source_url: String,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl QuoteData {
    /// `None` unless `quote` is [`QuoteStatus::Found`].
    pub fn from_quote(quote: &Quote) -> Option<Self> {
        if quote.status() != QuoteStatus::Found {
            return None;
        }
        Some(Self {
            share_name: quote.matched_name()?.to_owned(),
            last_traded_price: quote.raw_price_text()?.to_owned(),
            price_value: quote.numeric_price()?,
            source_url: quote.source_url().to_owned(),
            detail_url: quote.detail_url().map(str::to_owned),
            price_change: quote.price_change().map(str::to_owned),
        })
    }
}

impl BestQuote {
    pub fn from_quote(quote: &Quote) -> Option<Self> {
        let data = QuoteData::from_quote(quote)?;
        Some(Self {
            source: quote.source_name().to_owned(),
            share_name: data.share_name,
            last_traded_price: data.last_traded_price,
            price_value: data.price_value,
            source_url: data.source_url,
        })
    }
}

impl From<&AggregateResult> for QueryResponse {
    fn from(result: &AggregateResult) -> Self {
        let quotes_by_source = result
            .quotes_by_source()
            .iter()
            .map(|(name, quote)| {
                let entry = SourceEntry {
                    status: quote.status().wire_token().to_owned(),
                    data: QuoteData::from_quote(quote),
                };
                (name.clone(), entry)
            })
            .collect();

        Self {
            query: result.query().to_owned(),
            timestamp: result
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            quotes_by_source,
            best_quote: result.best_quote().and_then(BestQuote::from_quote),
            summary: result.summary().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    aggregator: Arc<Aggregator>,
}

// ---------------------------------------------------------------------------
// QueryServer
// ---------------------------------------------------------------------------

/// HTTP server answering price queries from a shared [`Aggregator`].
pub struct QueryServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl QueryServer {
    /// Start the query server.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if an allowed origin is not a valid header value or
    /// the TCP listener cannot bind.
    pub async fn start(config: &ServerConfig, aggregator: Arc<Aggregator>) -> Result<Self> {
        let app = router(config, aggregator)?;

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| StakeError::Server(format!("bind to {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| StakeError::Server(format!("failed to get local addr: {e}")))?;

        info!("query server listening on http://{addr}/api");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("query server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the server task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`StakeError::Server`] if the server task panicked.
    pub async fn wait(&mut self) -> Result<()> {
        (&mut self.handle)
            .await
            .map_err(|e| StakeError::Server(format!("server task failed: {e}")))
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for QueryServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Build the router with CORS applied.
///
/// # Errors
///
/// Returns [`StakeError::Config`] if an allowed origin is not a valid header
/// value.
pub fn router(config: &ServerConfig, aggregator: Arc<Aggregator>) -> Result<Router> {
    Ok(Router::new()
        .route("/api", get(handle_missing_name))
        .route("/api/", get(handle_missing_name))
        .route("/api/{name}", get(handle_query))
        .route("/health", get(handle_health))
        .layer(cors_layer(&config.allowed_origins)?)
        .with_state(AppState { aggregator }))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| StakeError::Config(format!("invalid CORS origin {origin:?}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/{name}`
async fn handle_query(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    tracing::trace!(name = %name, "query received");

    match state.aggregator.fetch_all(&name).await {
        Ok(result) => {
            tracing::debug!(
                found = result.found_count(),
                total = result.quotes_by_source().len(),
                "query answered"
            );
            (StatusCode::OK, Json(QueryResponse::from(&result))).into_response()
        }
        Err(ScoutError::InvalidInput(_)) => missing_name(),
        Err(e) => {
            tracing::error!(error = %e, "query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "lookup failed".to_owned(),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /api` and `GET /api/`
async fn handle_missing_name() -> Response {
    missing_name()
}

/// `GET /health`
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn missing_name() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: MISSING_NAME.to_owned(),
        }),
    )
        .into_response()
}
