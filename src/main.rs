mod config;
mod expand;
mod flux;
mod models;
mod prompt;
mod ratelimit;
mod routes;
mod seed;
mod styles;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::expand::{CompletionBackend, ItemExpander, OpenAiClient};
use crate::flux::{CostTracker, FluxClient, ReplicateTransport};
use crate::routes::{generate_icons, list_styles, usage, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    if config.fallback_mode {
        tracing::warn!("⚠️ FALLBACK_MODE is on - no external calls will be made");
    }
    if config.missing_image_credential() {
        tracing::warn!("⚠️ REPLICATE_API_TOKEN is not set - generation requests will be rejected");
    }

    let completion: Option<Box<dyn CompletionBackend>> = config.openai_api_key.clone().map(|key| {
        Box::new(OpenAiClient::new(
            key,
            config.openai_model.clone(),
            config.api_timeout,
        )) as Box<dyn CompletionBackend>
    });
    let expander = Arc::new(ItemExpander::new(completion, config.fallback_mode));

    let transport = if config.fallback_mode {
        None
    } else {
        config.replicate_api_token.clone().map(|token| {
            Box::new(ReplicateTransport::new(token, config.replicate_timeout))
                as Box<dyn flux::PredictionTransport>
        })
    };
    let flux = Arc::new(FluxClient::new(
        transport,
        config.max_retries,
        config.base_retry_delay,
        config.rate_limit_interval,
        Arc::new(CostTracker::default()),
    ));

    let port = config.port;
    let state = AppState {
        expander,
        flux,
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/api/generate-icons", post(generate_icons))
        .route("/api/styles", get(list_styles))
        .route("/api/usage", get(usage))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "🚀 Starting server");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
