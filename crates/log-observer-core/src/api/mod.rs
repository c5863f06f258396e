//! Demo backend
//!
//! An axum server implementing the four endpoints the viewer consumes over a
//! generated in-memory dataset. Used for local demos and end-to-end tests.

pub mod dataset;
pub mod handlers;
pub mod predicate;
pub mod routes;

pub use dataset::Dataset;
pub use handlers::AppState;
pub use routes::create_router;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::DemoConfig;
use crate::error::{Error, Result};

/// HTTP server for the demo backend
pub struct DemoServer {
    state: AppState,
}

impl DemoServer {
    /// Generate a dataset sized by `config`; the server starts disconnected
    pub fn new(config: &DemoConfig) -> Self {
        let dataset = Dataset::generate(config.log_count, config.query_count, &mut rand::thread_rng());
        Self {
            state: AppState::new(dataset),
        }
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// Mark the backend connected as if `dsn` had been configured
    pub fn connect(self, dsn: &str) -> Self {
        *self.state.connection.write() = handlers::connect(dsn);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind `addr` and serve until the task is dropped
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = create_router(self.state)
            .layer(cors)
            .layer(TraceLayer::new_for_http());

        let local: SocketAddr = listener.local_addr()?;
        info!("Demo backend listening on http://{}", local);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}
