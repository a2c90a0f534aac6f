//! Axum middleware things
//!

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

pub fn corslayer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        // allow requests from any origin
        .allow_origin(Any)
}
