//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router for `/` (POST interactions, GET health, OPTIONS)
//! - Wire up middleware (security headers, request id, timeout, body cap,
//!   panic containment, tracing)
//! - Serve on a listener with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::Instrument;

use crate::clock::Clock;
use crate::config::BotConfig;
use crate::health::{HealthChecks, HealthReport};
use crate::http::request::{
    discard_foreign_request_id, peer_addr, propagate_request_id_layer, set_request_id_layer,
};
use crate::http::response;
use crate::interactions::{DispatchOutcome, Interaction, InteractionDispatcher};
use crate::observability::metrics;
use crate::observability::tracing::{record_command, request_span};
use crate::security::headers::security_response_headers;
use crate::security::{
    AuditEventType, AuditLogEntry, AuditSink, RateLimiter, SecurityContext, SecurityError,
    SecurityOrchestrator,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityOrchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub dispatcher: Arc<InteractionDispatcher>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
    pub public_key: Arc<str>,
    pub health: HealthChecks,
}

/// HTTP server for the interactions endpoint.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &BotConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &BotConfig, state: AppState) -> Router {
        let [nosniff, frame, xss, referrer, csp, hsts] = security_response_headers();

        Router::new()
            .route(
                "/",
                post(interaction_handler)
                    .get(health_handler)
                    .options(|| async { response::preflight() }),
            )
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetResponseHeaderLayer::overriding(nosniff.0, nosniff.1))
                    .layer(SetResponseHeaderLayer::overriding(frame.0, frame.1))
                    .layer(SetResponseHeaderLayer::overriding(xss.0, xss.1))
                    .layer(SetResponseHeaderLayer::overriding(referrer.0, referrer.1))
                    .layer(SetResponseHeaderLayer::overriding(csp.0, csp.1))
                    .layer(SetResponseHeaderLayer::overriding(hsts.0, hsts.1))
                    .map_request(discard_foreign_request_id)
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(CatchPanicLayer::custom(handle_panic))
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            )
    }

    /// The configured router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    response::internal_error()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let report = HealthReport::new(state.health, state.clock.now_millis());
    metrics::record_request("GET", 200, start);
    Json(report)
}

/// Verify, parse, dispatch.
async fn interaction_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let peer = peer_addr(&request);
    let (parts, body) = request.into_parts();
    let context = SecurityContext::from_headers(&parts.headers, peer, state.clock.now_millis());
    let span = request_span(Method::POST.as_str(), &context);

    let response = async {
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Request body rejected");
                metrics::record_security_rejection("body_limit");
                return response::body_too_large();
            }
        };

        let verification = state
            .security
            .verify_request_secure(&parts.headers, &body, &state.public_key, context)
            .await;
        let context = verification.context;

        if let Err(error) = verification.outcome {
            return reject(&state, &context, &error);
        }

        state.audit.record(&AuditLogEntry::new(
            &context,
            AuditEventType::RequestVerified,
            true,
            state.clock.now_millis(),
        ));

        let interaction: Interaction = match serde_json::from_slice(&body) {
            Ok(interaction) => interaction,
            Err(e) => {
                tracing::warn!(error = %e, "Verified body is not an interaction");
                return response::invalid_format();
            }
        };

        if let Some(name) = interaction.command_name() {
            record_command(&tracing::Span::current(), name);
        }

        let outcome = state.dispatcher.dispatch(&interaction, &context).await;

        if let Some(removed) = state.rate_limiter.maybe_sweep() {
            tracing::debug!(removed, "Rate limit sweep");
        }

        match outcome {
            DispatchOutcome::Respond(reply) => response::interaction(reply),
            DispatchOutcome::Unsupported(kind) => {
                tracing::warn!(interaction_type = ?kind, "Unsupported interaction type");
                response::unsupported_type()
            }
        }
    }
    .instrument(span)
    .await;

    metrics::record_request("POST", response.status().as_u16(), start);
    response
}

fn reject(state: &AppState, context: &SecurityContext, error: &SecurityError) -> Response {
    let event = match error {
        SecurityError::RateLimited => AuditEventType::RateLimitExceeded,
        _ => AuditEventType::SecurityViolation,
    };

    tracing::warn!(reason = %error, status = error.status_code().as_u16(), "Request rejected");
    metrics::record_security_rejection(error.reason_label());
    state.audit.record(
        &AuditLogEntry::new(context, event, false, state.clock.now_millis()).with_error(error.to_string()),
    );

    response::rejection(error)
}
