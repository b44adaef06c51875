//! Web layer module
//!
//! Thin HTTP front end over [`IconService`]: handlers validate query
//! parameters and render cached results, all pipeline logic lives below.
//!
//! # Routes
//!
//! - `/icon`, `/image`, `/favicon`, `/facebook-icon`, `/twitter-icon`:
//!   square PNG, or base64 text with `format=base64`
//! - `/icons`, `/google-search-suggestions`: JSON
//! - `/health`: JSON status

use anyhow::Result;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::service::IconService;

pub mod handlers;
pub mod responses;

pub use responses::{ErrorResponse, HealthResponse, OutputFormat};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(service: Arc<IconService>) -> Result<Self> {
        let web = &service.config().web;
        let addr: SocketAddr = format!("{}:{}", web.host, web.port).parse()?;
        let app = Self::create_router(AppState { service });
        Ok(Self { app, addr })
    }

    /// Router with every route and middleware attached
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            .route("/icon", get(handlers::icon))
            .route("/icons", get(handlers::icons))
            .route("/image", get(handlers::image))
            .route("/favicon", get(handlers::favicon))
            .route("/facebook-icon", get(handlers::facebook_icon))
            .route("/twitter-icon", get(handlers::twitter_icon))
            .route(
                "/google-search-suggestions",
                get(handlers::search_suggestions),
            )
            // Middleware (applied in reverse order)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the web server, stopping on Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Listening on http://{}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IconService>,
}
