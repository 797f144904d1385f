use crate::database::SensorDb;
use crate::renderer::{self, ViewContext};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;

/// What the request handlers share.
#[derive(Clone)]
pub struct HttpState {
    pub db: Arc<RwLock<SensorDb>>,
    pub host: Arc<str>,
    pub max_response: usize,
    pub static_root: Option<PathBuf>,
}

impl HttpState {
    pub fn new(db: Arc<RwLock<SensorDb>>, host: impl Into<Arc<str>>, max_response: usize) -> Self {
        Self {
            db,
            host: host.into(),
            max_response,
            static_root: None,
        }
    }

    /// Serves the files under `root` for every path without a sensor route.
    pub fn with_static_root(mut self, root: &Path) -> Self {
        self.static_root = Some(root.to_path_buf());
        self
    }

    fn context(&self) -> ViewContext<'_> {
        ViewContext {
            host: &self.host,
            timestamp: Utc::now().timestamp(),
            limit: self.max_response,
        }
    }
}

pub fn router(state: HttpState) -> Router {
    let mut router = Router::new()
        .route("/sensor/current", get(current_handler))
        .route("/sensor/recent", get(recent_handler))
        .route("/sensor/history", get(history_handler));

    if let Some(root) = &state.static_root {
        info!("Serving static files from {}", root.display());
        router = router.fallback_service(ServeDir::new(root));
    }
    router.with_state(state)
}

pub async fn serve(address: &str, port: u16, state: HttpState) -> Result<()> {
    let listener = TcpListener::bind((address, port))
        .await
        .with_context(|| format!("Failed to listen on {}:{}", address, port))?;
    info!("Serving sensor data on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")?;
    Ok(())
}

fn json(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

async fn current_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let db = state.db.read().await;
    json(renderer::latest(&db, &state.context()))
}

async fn recent_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let db = state.db.read().await;
    json(renderer::recent(&db, &state.context()))
}

async fn history_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let directory = state.db.read().await.archive_directory().to_path_buf();
    json(renderer::history(&directory, &state.context()))
}
