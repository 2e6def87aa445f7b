//! Viewer - static host for the WASM client and its runtime config

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use rust_embed::RustEmbed;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::ViewerConfig;

// Embedded static assets from client/web
#[derive(RustEmbed)]
#[folder = "../client/web"]
struct Assets;

// `[client]` table rendered once at startup
static CLIENT_CONFIG: OnceLock<String> = OnceLock::new();

// Deployment assets that are not compiled in (world snapshot, avatars)
static ASSETS_DIR: OnceLock<PathBuf> = OnceLock::new();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("World viewer host v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("VIEWER_CONFIG").unwrap_or_else(|_| "viewer.toml".to_string());
    let config = ViewerConfig::load(Path::new(&config_path))?;
    info!("World server: {}", config.client.server_url);
    CLIENT_CONFIG.set(config.client_json()?).ok();
    let assets_dir = PathBuf::from(&config.host.assets_dir);
    if !assets_dir.is_dir() {
        warn!(
            "Assets directory {} missing; {} will 404",
            assets_dir.display(),
            config.client.world_image
        );
    }
    ASSETS_DIR.set(assets_dir).ok();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.host.port);

    let app = router();

    let addr: SocketAddr = format!("{}:{}", config.host.bind, port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Viewer running on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn router() -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/index.html", get(serve_index))
        .route("/config.json", get(serve_config))
        .fallback(static_handler)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

async fn serve_index() -> Response {
    serve_static_file("index.html").await
}

async fn serve_config() -> Response {
    let body = CLIENT_CONFIG.get().cloned().unwrap_or_else(|| "{}".to_string());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// Handle static file requests
async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    if path.is_empty() {
        return serve_static_file("index.html").await;
    }
    serve_static_file(path).await
}

/// Serve a static file from embedded assets, then from the assets directory
async fn serve_static_file(path: &str) -> Response {
    if let Some(content) = Assets::get(path) {
        return file_response(path, content.data.into_owned());
    }
    if let Some(dir) = ASSETS_DIR.get() {
        if let Some(data) = read_disk_asset(dir, path).await {
            return file_response(path, data);
        }
    }
    warn!("Static file not found: {}", path);
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

fn file_response(path: &str, data: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        data,
    )
        .into_response()
}

/// Read `path` below `dir`. Anything but plain relative components is refused.
async fn read_disk_asset(dir: &Path, path: &str) -> Option<Vec<u8>> {
    let relative = Path::new(path);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        warn!("Rejected asset path: {}", path);
        return None;
    }
    tokio::fs::read(dir.join(relative)).await.ok()
}
