//! Policy wrapper: block check, then token check, then the wrapped handler

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use governor::clock::{Clock, DefaultClock};
use tower::{Layer, Service};
use tower_governor::key_extractor::KeyExtractor;
use tracing::debug;

use super::extractors::{ClientIdentity, ClientIdentityExtractor};
use super::manager::SecurityManager;
use super::policy::Policy;
use super::rejection::{JsonRejection, PlainRejection, Rejection, RejectionFormatter};

/// Layer that guards the wrapped routes with one policy
pub struct RateLimitLayer<C: Clock = DefaultClock> {
    manager: Arc<SecurityManager<C>>,
    policy: Policy,
    formatter: Arc<dyn RejectionFormatter>,
}

impl<C: Clock + Clone> RateLimitLayer<C> {
    pub fn new(
        manager: Arc<SecurityManager<C>>,
        policy: Policy,
        formatter: Arc<dyn RejectionFormatter>,
    ) -> Self {
        Self {
            manager,
            policy,
            formatter,
        }
    }

    /// Plain text rejections for the form endpoints, JSON for the API
    pub fn with_default_formatter(manager: Arc<SecurityManager<C>>, policy: Policy) -> Self {
        let formatter: Arc<dyn RejectionFormatter> = match policy {
            Policy::Login | Policy::Register => Arc::new(PlainRejection),
            Policy::Search | Policy::General => Arc::new(JsonRejection),
        };
        Self::new(manager, policy, formatter)
    }
}

impl<C: Clock> Clone for RateLimitLayer<C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            policy: self.policy,
            formatter: Arc::clone(&self.formatter),
        }
    }
}

impl<S, C: Clock> Layer<S> for RateLimitLayer<C> {
    type Service = RateLimitService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            manager: Arc::clone(&self.manager),
            policy: self.policy,
            formatter: Arc::clone(&self.formatter),
        }
    }
}

pub struct RateLimitService<S, C: Clock = DefaultClock> {
    inner: S,
    manager: Arc<SecurityManager<C>>,
    policy: Policy,
    formatter: Arc<dyn RejectionFormatter>,
}

impl<S: Clone, C: Clock> Clone for RateLimitService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            manager: Arc::clone(&self.manager),
            policy: self.policy,
            formatter: Arc::clone(&self.formatter),
        }
    }
}

impl<S, C> RateLimitService<S, C>
where
    C: Clock + Clone,
{
    fn reject(&self, rejection: &Rejection) -> Response {
        let mut response = self.formatter.format(rejection);
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(rejection.retry_after_secs()),
        );
        response
    }
}

impl<S, C, ReqBody> Service<Request<ReqBody>> for RateLimitService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    C: Clock + Clone + Send + Sync + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let client = ClientIdentityExtractor.extract(&req).unwrap_or_else(|_| {
            debug!(policy = %self.policy, "No client address on request, using shared identity");
            ClientIdentity::unknown()
        });

        let decision = self.manager.check(self.policy, &client);
        if let Some(rejection) = Rejection::from_decision(self.policy, decision) {
            let response = self.reject(&rejection);
            return Box::pin(async move { Ok(response) });
        }

        // Keep the service that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}
