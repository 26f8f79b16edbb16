//! Response shapes for requests refused by a policy wrapper

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::manager::Decision;
use super::policy::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Throttled,
    Blocked,
}

/// A refused request, handed to the policy's formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub policy: Policy,
    pub reason: RejectionReason,
    pub retry_after: Duration,
}

impl Rejection {
    /// `None` for `Decision::Allowed`
    pub fn from_decision(policy: Policy, decision: Decision) -> Option<Self> {
        match decision {
            Decision::Allowed => None,
            Decision::Throttled { retry_after } => Some(Self {
                policy,
                reason: RejectionReason::Throttled,
                retry_after,
            }),
            Decision::Blocked { remaining } => Some(Self {
                policy,
                reason: RejectionReason::Blocked,
                retry_after: remaining,
            }),
        }
    }

    /// Whole seconds, rounded up, never zero
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let secs = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        secs.max(1)
    }

    pub fn message(&self) -> &'static str {
        match (self.reason, self.policy) {
            (RejectionReason::Blocked, _) => {
                "Too many requests. Your address is temporarily blocked."
            }
            (RejectionReason::Throttled, Policy::Login) => {
                "Too many login attempts. Please try again later."
            }
            (RejectionReason::Throttled, Policy::Register) => {
                "Too many registration attempts. Please try again later."
            }
            (RejectionReason::Throttled, Policy::Search) => {
                "Too many search requests. Please slow down."
            }
            (RejectionReason::Throttled, Policy::General) => {
                "Too many requests. Please slow down."
            }
        }
    }
}

/// Turns a rejection into the response body a policy's clients expect.
///
/// The wrapper overrides the status with 429 and sets `Retry-After`, so
/// formatters only decide on the body.
pub trait RejectionFormatter: Send + Sync {
    fn format(&self, rejection: &Rejection) -> Response;
}

/// `{"error": "..."}` body for API routes
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRejection;

impl RejectionFormatter for JsonRejection {
    fn format(&self, rejection: &Rejection) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": rejection.message() })),
        )
            .into_response()
    }
}

/// Plain text body for the login and registration forms
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRejection;

impl RejectionFormatter for PlainRejection {
    fn format(&self, rejection: &Rejection) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )],
            rejection.message(),
        )
            .into_response()
    }
}
