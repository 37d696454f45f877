use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::future::join_all;
use serde_json::{json, Value};
use tower_http::set_header::SetResponseHeaderLayer;

mod config;
mod extract;
mod models;

use config::Config;
use extract::Scraper;
use models::ScrapeResponse;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let scraper = Scraper::new(&config)?;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(scraper))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn app(scraper: Scraper) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/scrape",
            post(scrape_endpoint)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,OPTIONS,POST"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(scraper)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("URLs array is required")]
    MissingUrls,
    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({"error": self.to_string()})),
            )
                .into_response(),
            ApiError::MissingUrls => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": self.to_string()})),
            )
                .into_response(),
            ApiError::Internal(ref message) => {
                tracing::error!(%message, "server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": self.to_string(), "message": message})),
                )
                    .into_response()
            }
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn scrape_endpoint(
    State(scraper): State<Scraper>,
    body: Bytes,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::Internal(e.to_string()))?;

    let urls: Vec<String> = match payload.get("urls") {
        Some(Value::Array(urls)) => urls.iter().map(url_text).collect(),
        _ => return Err(ApiError::MissingUrls),
    };

    // join_all yields results in input order, whatever order the fetches finish in.
    let articles = join_all(urls.iter().map(|url| scraper.scrape_article(url))).await;

    let succeeded = articles.iter().filter(|a| a.success).count();
    tracing::info!(urls = urls.len(), succeeded, "scrape batch done");

    Ok(Json(ScrapeResponse { articles }))
}

/// Non-string entries are passed through as JSON text and fail at fetch time.
fn url_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
