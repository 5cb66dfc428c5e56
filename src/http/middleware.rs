//! Admission middleware: the fail-open boundary between HTTP and the engine.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::key::resolve_client_key;
use super::AppState;
use crate::admission::{AdmissionBackend, Decision};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Body returned with every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    pub error: String,
    pub message: String,
}

impl Default for RejectionBody {
    fn default() -> Self {
        Self {
            error: "rate_limited".to_string(),
            message: "Too many requests, please try again later.".to_string(),
        }
    }
}

/// Consult the backend, turning a panic into `None`.
///
/// A faulting admission engine must never take the protected service down
/// with it, so the caller treats `None` as admitted.
pub fn guarded_check(backend: &dyn AdmissionBackend, key: &str) -> Option<Decision> {
    match catch_unwind(AssertUnwindSafe(|| backend.check(key))) {
        Ok(decision) => Some(decision),
        Err(panic) => {
            error!(
                key = %key,
                fault = %panic_message(panic.as_ref()),
                "Admission check failed, admitting request"
            );
            None
        }
    }
}

/// Write the three quota headers from `decision`.
pub fn apply_quota_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_in));
}

/// Axum middleware that admits or rejects each request before its handler.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = resolve_client_key(&request);

    let Some(decision) = guarded_check(state.backend.as_ref(), &key) else {
        return next.run(request).await;
    };

    if !decision.admitted {
        debug!(
            key = %key,
            reset_in = decision.reset_in,
            "Rejecting request over quota"
        );

        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, Json(RejectionBody::default())).into_response();
        apply_quota_headers(response.headers_mut(), &decision);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(decision.reset_in));
        return response;
    }

    let mut response = next.run(request).await;
    apply_quota_headers(response.headers_mut(), &decision);
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
