//! Origin allow-list for the budget endpoint.
//!
//! Requests from a listed origin get CORS response headers; requests from any
//! other origin are refused with 403 before method dispatch. Requests without
//! an `Origin` header (server-to-server, curl) pass through untouched.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<HashSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    NoOrigin,
    Allowed(HeaderValue),
    Denied,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Arc::new(origins.into_iter().map(Into::into).collect()),
        }
    }

    /// Exact, case-sensitive match against the allow-list. An empty header is
    /// treated as absent.
    pub fn decide(&self, origin: Option<&HeaderValue>) -> OriginDecision {
        let Some(value) = origin else {
            return OriginDecision::NoOrigin;
        };
        if value.is_empty() {
            return OriginDecision::NoOrigin;
        }

        match value.to_str() {
            Ok(origin) if self.allowed.contains(origin) => OriginDecision::Allowed(value.clone()),
            _ => OriginDecision::Denied,
        }
    }
}

pub async fn origin_gate(State(policy): State<OriginPolicy>, req: Request, next: Next) -> Response {
    let decision = policy.decide(req.headers().get(header::ORIGIN));
    match decision {
        OriginDecision::NoOrigin => next.run(req).await,
        OriginDecision::Denied => {
            tracing::warn!(
                origin = ?req.headers().get(header::ORIGIN),
                "Rejected request from disallowed origin"
            );
            AppError::Forbidden(anyhow::anyhow!("Origin not allowed.")).into_response()
        }
        OriginDecision::Allowed(origin) => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
            response
        }
    }
}
