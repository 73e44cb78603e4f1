//! Web layer: a single-route HTTP surface over the chooser.
//!
//! The photo endpoint is meant to be embedded in third-party pages, so the
//! CORS policy is any-origin but scoped to GET.

use anyhow::Result;
use axum::{http::Method, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::services::ChooserService;

pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub chooser: Arc<ChooserService>,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, chooser: ChooserService) -> Result<Self> {
        let app = Self::create_router(AppState {
            chooser: Arc::new(chooser),
        });
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    /// Router with the photo endpoint, a health check and the permissive
    /// GET-only CORS policy.
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/photo", get(handlers::choose_photo))
            .route("/health", get(handlers::health_check))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET])
                    .allow_headers([axum::http::header::CONTENT_TYPE]),
            )
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        info!("Listening on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}
