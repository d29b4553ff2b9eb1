mod bedrock;
mod cache;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod state;
mod worker;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bedrock::{BedrockClient, GenerateText};
use crate::cache::PromptCache;
use crate::config::Args;
use crate::handlers::{health_handler, invoke_handler, metrics_handler};
use crate::models::CorsHeaders;
use crate::state::AppState;
use crate::worker::invoke_worker;

// this is main async function with tokio
#[tokio::main]
async fn main() {
    // parse cli arguments
    let args = Args::parse();

    // low-noise default; RUST_LOG or --log-level raise it
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let (queue_tx, queue_rx) = mpsc::channel(100);

    let client: Arc<dyn GenerateText> = Arc::new(BedrockClient::new(
        &args.region,
        args.model_id.clone(),
        args.endpoint.clone(),
        args.api_key.clone(),
    ));
    let cache = PromptCache::new(args.cache_max_entries);

    // spawn the worker that owns the cache
    tokio::spawn(async move {
        invoke_worker(queue_rx, client, cache).await;
    });

    // creating shared state
    let state = Arc::new(AppState {
        model_id: args.model_id.clone(),
        max_prompt_length: args.max_prompt_length,
        cors: CorsHeaders::new(&args.allowed_origin),
        queue_tx,
    });

    // creating the router with routes
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/invoke", post(invoke_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("gateway running on http://localhost:{}", args.port);
    info!("invoking model {} in {}", args.model_id, args.region);
    axum::serve(listener, app).await.unwrap();
}
