//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the quote endpoints
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Bind to a listener and drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::ChainNode;
use crate::config::schema::ServerConfig;
use crate::http::quote;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::quoting::QuoteProtocol;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
pub struct AppState<N> {
    pub protocol: Arc<QuoteProtocol<N>>,
}

impl<N> Clone for AppState<N> {
    fn clone(&self) -> Self {
        Self {
            protocol: Arc::clone(&self.protocol),
        }
    }
}

/// HTTP front end of the quote protocol.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new<N: ChainNode>(protocol: Arc<QuoteProtocol<N>>, config: ServerConfig) -> Self {
        let router = build_router(AppState { protocol }, &config);
        Self { router, config }
    }

    /// The fully layered router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then finish in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<N: ChainNode>(state: AppState<N>, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/getQuote", post(quote::get_quote::<N>))
        .route("/acceptQuote", post(quote::accept_quote::<N>))
        .route("/health", get(quote::health::<N>))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(RequestBodyLimitLayer::new(config.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        )
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}
