//! Router builder for the shelf HTTP server

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::HeaderValue,
    middleware,
    routing::{get, MethodRouter},
    BoxError, Router,
};
use std::time::Duration;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

use crate::error::{redact_error_details, AppError};

/// Builder for constructing the main HTTP router.
///
/// Routes and modules are collected first; middleware is applied in
/// [`RouterBuilder::build`] so that it wraps every route regardless of the
/// order the builder methods were called in.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
    redact_errors: bool,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
            redact_errors: false,
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/api/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let api_path = format!("/api/{}", module_name);
        self.router = self.router.nest(&api_path, module_router);
        self
    }

    /// Trace every request and response
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Allow cross-origin calls from any origin
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Tag requests with an `x-request-id` (UUID v7) and echo it back
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Bound every request by `timeout_ms`
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Replace error details with a generic string
    pub fn with_error_redaction(mut self, enabled: bool) -> Self {
        self.redact_errors = enabled;
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let mut router = self.router;

        if let Some(timeout) = self.timeout {
            router = router.layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                        request_failed(err, timeout)
                    }))
                    .timeout(timeout),
            );
        }

        // Wraps the timeout guard so its errors are redacted too.
        if self.redact_errors {
            router = router.layer(middleware::map_response(redact_error_details));
        }

        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }

        // Outermost, so the id is set before tracing opens its span.
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn request_failed(err: BoxError, timeout: Duration) -> AppError {
    if err.is::<Elapsed>() {
        AppError::timeout(
            "Request timed out",
            format!("no response within {} ms", timeout.as_millis()),
        )
    } else {
        AppError::Internal(anyhow::anyhow!("{err}"))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse::<HeaderValue>().ok()?;
        Some(RequestId::new(request_id))
    }
}

/// `GET` route for the liveness probe.
pub fn health_route() -> MethodRouter {
    get(health_check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ErrorBody, SUPPRESSED_DETAIL};
    use axum::{body::Body, body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn failing() -> Result<&'static str, AppError> {
        Err(AppError::server("Server error", "connection reset"))
    }

    #[tokio::test]
    async fn mounted_module_is_reachable_under_api_prefix() {
        let module_router = Router::new().route("/", get(|| async { "module" }));
        let router = RouterBuilder::new()
            .mount_module("books", module_router)
            .build();

        let response = router.oneshot(get_request("/api/books")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"module");
    }

    #[tokio::test]
    async fn request_id_is_echoed_on_routes_added_after_middleware_calls() {
        let router = RouterBuilder::new()
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .route("/healthz", health_route())
            .build();

        let response = router.oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response
            .headers()
            .get("x-request-id")
            .expect("request id header")
            .to_str()
            .unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn slow_requests_get_a_json_timeout_error() {
        async fn slow() -> &'static str {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "late"
        }

        for (redact, expected) in [(false, "no response within 20 ms"), (true, SUPPRESSED_DETAIL)] {
            let router = RouterBuilder::new()
                .route("/slow", get(slow))
                .with_timeout(20)
                .with_error_redaction(redact)
                .build();

            let response = router.oneshot(get_request("/slow")).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.message, "Request timed out");
            assert_eq!(body.error.as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn redaction_applies_only_when_enabled() {
        for (enabled, expected) in [(false, "connection reset"), (true, SUPPRESSED_DETAIL)] {
            let router = RouterBuilder::new()
                .route("/fail", get(failing))
                .with_error_redaction(enabled)
                .build();

            let response = router.oneshot(get_request("/fail")).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.message, "Server error");
            assert_eq!(body.error.as_deref(), Some(expected));
        }
    }
}
