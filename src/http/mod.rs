//! HTTP surface: the health endpoint.
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/api/health` | 200 healthy / 503 unhealthy JSON |
//! | GET | `/health` | same |

pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::health::HealthProbe;

/// Build the router serving the health endpoint.
pub fn router(probe: Arc<HealthProbe>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(probe)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "health endpoint listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Other(format!("server error: {e}")))
}
