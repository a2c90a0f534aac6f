//! Per-request tracing spans
//!

use std::time::Duration;

use axum::{
    http::{header::CONTENT_LENGTH, HeaderName},
    response::Response,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{OnRequest, OnResponse, TraceLayer},
};
use tracing::{trace, Span};

/// Builds request spans tagged with the caller identity, when there is one.
#[derive(Clone)]
pub(crate) struct TrackerSpanner {
    user_header: HeaderName,
}

impl<B> tower_http::trace::MakeSpan<B> for TrackerSpanner {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let user = request
            .headers()
            .get(&self.user_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            user = %user,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            bytes = tracing::field::Empty
        )
    }
}

impl<B> OnRequest<B> for TrackerSpanner {
    fn on_request(&mut self, _request: &axum::http::Request<B>, _span: &Span) {
        trace!("request received");
    }
}

impl<B> OnResponse<B> for TrackerSpanner {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        span.record("status", response.status().as_u16());
        span.record("latency_ms", latency.as_millis() as u64);
        if let Some(content_length) = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
        {
            span.record("bytes", content_length);
        }
        if response.status().is_server_error() {
            tracing::event!(tracing::Level::WARN, "response sent");
        } else {
            tracing::event!(tracing::Level::INFO, "response sent");
        }
    }
}

pub(crate) fn logging_layer(
    user_header: HeaderName,
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, TrackerSpanner, TrackerSpanner, TrackerSpanner>
{
    let spanner = TrackerSpanner { user_header };
    TraceLayer::new_for_http()
        .on_request(spanner.clone())
        .make_span_with(spanner.clone())
        .on_response(spanner)
}
