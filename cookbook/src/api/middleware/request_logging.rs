use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tower_governor::key_extractor::KeyExtractor;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{info_span, Level};

use crate::api::rate_limiting::{ClientIdentity, ClientIdentityExtractor};

/// One span per request with method, path and client, and an `info` line
/// with status and latency when the response is sent.
pub fn with_request_logging<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let client = ClientIdentityExtractor
                    .extract(req)
                    .unwrap_or_else(|_| ClientIdentity::unknown());
                info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    client = %client,
                )
            })
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}
