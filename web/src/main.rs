mod api;
mod config;
mod error;
mod models;
mod state;
mod workspace;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
// Timeout handled via ServiceBuilder::timeout to box error type
use axum::error_handling::HandleErrorLayer;
use axum::BoxError;
use tower::ServiceBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::state::AppState;

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
        ]);
    match allowed_origins {
        Some(origins) => {
            let list: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|s| HeaderValue::from_str(s).ok())
                .collect();
            base.allow_origin(AllowOrigin::list(list))
        }
        // Upload clients are served from other origins.
        None => base.allow_origin(Any),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stegoframe_web=debug,stegoframe=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting StegoFrame Web Server v{}", stegoframe::VERSION);

    let config = ServerConfig::from_env()?;
    let addr = config.bind;
    let timeout = config.timeout;
    let max_upload = config.max_upload_bytes;
    let cors = cors_layer(config.allowed_origins.as_deref());

    // Initialize application state
    let state = Arc::new(AppState::new(config)?);

    // Start background cleanup task
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        workspace::run_cleanup_task(cleanup_state).await;
    });

    // Build routes
    let app = Router::new()
        .route("/", get(api::serve_index))
        .route("/encrypt", post(api::encrypt))
        .route("/decrypt", post(api::decrypt))
        // Middleware
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_upload))
        // Global concurrency guard
        .layer(GlobalConcurrencyLimitLayer::new(16))
        // Global request timeout with error handling mapped to responses
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    if err.is::<tower::timeout::error::Elapsed>() {
                        AppError::Timeout.into_response()
                    } else {
                        AppError::Internal(err.to_string()).into_response()
                    }
                }))
                .timeout(timeout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        // Shared state
        .with_state(state);

    tracing::info!("🌐 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
