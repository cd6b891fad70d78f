//! HTTP transport: a thread-per-request style HTTP/1.1 API (axum's
//! connection-per-task model plays the same role) bound to all interfaces,
//! sharing the same `Dispatcher` and `Store` the BLE transport drives.

mod auth;
mod routes;

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, MAX_CMD_BODY_BYTES, MAX_UPLOAD_BYTES};
use crate::error::TransportError;
use crate::protocol::Dispatcher;
use crate::runtime::Runtime;
use crate::store::Store;

/// State shared by every route handler, cloned (cheaply, all `Arc`s) per
/// request by `axum`'s `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub runtime: Arc<Runtime>,
    pub ble_connected: Arc<AtomicBool>,
    pub token: Arc<String>,
    pub started_at: Instant,
}

/// Handle to the spawned HTTP server task.
pub struct HttpTransport {
    handle: JoinHandle<()>,
}

impl HttpTransport {
    /// Loads (or generates) the bearer token, builds the router, and binds
    /// to `0.0.0.0:<config.http_port>` on a spawned task. `shutdown` firing
    /// `true` triggers `axum`'s graceful shutdown.
    pub fn spawn(
        config: Arc<Config>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<Store>,
        runtime: Arc<Runtime>,
        ble_connected: Arc<AtomicBool>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Self, TransportError> {
        let token = auth::load_or_create_token(&config.http_token_path)
            .map_err(TransportError::Http)?;

        let state = AppState {
            dispatcher,
            store,
            config: config.clone(),
            runtime,
            ble_connected,
            token: Arc::new(token),
            started_at: Instant::now(),
        };

        let app = build_router(state);
        let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));

        let handle = tokio::spawn(async move {
            let listener = match TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(error) => {
                    warn!(%error, %addr, "failed to bind HTTP listener; HTTP transport disabled");
                    return;
                }
            };
            info!(%addr, "HTTP API listening");

            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            });
            if let Err(error) = serve.await {
                warn!(%error, "HTTP server exited with an error");
            }
        });

        Ok(Self { handle })
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

fn build_router(state: AppState) -> Router {
    // Each body-size limit is scoped to its own route before merging, so
    // `/api/cmd`'s 1 MiB cap and `/files/uploads`'s 100 MiB cap don't nest
    // inside one another once the auth layer wraps the merged whole.
    let cmd_route = Router::new()
        .route("/api/cmd", post(routes::cmd))
        .route_layer(DefaultBodyLimit::max(MAX_CMD_BODY_BYTES as usize));

    let upload_route = Router::new()
        .route("/files/uploads", post(routes::upload_file))
        .route_layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize));

    let file_routes = Router::new()
        .route("/files/db", get(routes::download_db))
        .route("/files/:category", get(routes::list_files))
        .route(
            "/files/:category/:filename",
            get(routes::download_file).delete(routes::delete_file),
        );

    let protected = cmd_route
        .merge(upload_route)
        .merge(file_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
}
