//! HTTP host for the users service: owns the listener, the shared middleware
//! stack and the routes every deployment exposes (`/health`, 404 fallback).

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware::from_fn, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
pub mod shutdown;
pub mod web;

pub use config::{ApiIngressConfig, DEFAULT_BODY_LIMIT_BYTES};
pub use shutdown::wait_for_shutdown;

/// Owns the HTTP server configuration and assembles the final router.
#[derive(Debug, Clone, Default)]
pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Merge module routes with the host routes and wrap everything in the
    /// middleware stack.
    ///
    /// Effective order, outermost first:
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions
    /// -> Timeout -> CORS -> BodyLimit -> handler
    ///
    /// SetRequestId has to wrap PropagateRequestId so generated ids are echoed.
    pub fn build_router(&self, routes: Router) -> Router {
        let x_request_id = request_id::header();

        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(routes)
            .fallback(web::not_found);

        // `Router::layer` wraps what is already there, so layers go innermost first.
        router = router.layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes));

        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        if self.config.timeout_sec > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeout_sec,
            )));
        }

        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.config.bind_addr))?;

        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))
    }

    /// Serve `router` on `listener` until `shutdown` resolves, then drain
    /// in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("HTTP server shutting down gracefully");
            })
            .await
            .context("HTTP server failed")
    }
}
