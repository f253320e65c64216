//! Request spans for the HTTP surface.
//!
//! Every request gets an `http_request` span carrying the request id set by
//! the request-id layer, so handler and poller logs can be correlated.

use axum::http::Request;
use tower_http::trace::MakeSpan;
use tracing::Span;

use crate::http::REQUEST_ID_HEADER;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    }
}
