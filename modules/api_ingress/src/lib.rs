//! Outer HTTP stack shared by every timetable route: request ids, request
//! tracing, timeouts, CORS, body limits, health probes and the serve loop.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{middleware::from_fn, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
pub mod shutdown;
mod web;

pub use config::ApiIngressConfig;

/// Wrap application routes with health probes and the middleware stack.
///
/// Layers are listed innermost first; the request passes
/// SetRequestId → PropagateRequestId → Trace → push_req_id → Timeout → CORS → BodyLimit.
pub fn build_router(app: Router, cfg: &ApiIngressConfig) -> Router {
    let x_request_id = request_id::header();

    let mut router = app
        .route("/health", get(web::health_check))
        .route("/healthz", get(web::health_check))
        .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes));

    if cfg.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_sec)))
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(request_id::create_trace_layer())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
}

/// Bind `addr` and serve until a shutdown signal arrives.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server bound on {}", addr);

    let shutdown = async {
        if let Err(e) = shutdown::wait_for_shutdown().await {
            tracing::warn!(error = %e, "signal handler failed; shutting down");
        }
        tracing::info!("HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
