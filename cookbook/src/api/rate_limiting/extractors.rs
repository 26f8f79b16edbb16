use std::fmt;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use tower_governor::key_extractor::KeyExtractor;
use tower_governor::GovernorError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Network-level key used to partition rate limiting state.
///
/// Not a user identity, it is recomputed for every request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Shared key for requests that carry no usable network metadata
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the client identity from proxy headers or the peer address
///
/// Precedence: first entry of `X-Forwarded-For`, then `X-Real-IP`, then the
/// transport peer address without its port. The headers are trusted as-is;
/// deployments that are reachable without a proxy in front must strip them.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIdentityExtractor;

impl KeyExtractor for ClientIdentityExtractor {
    type Key = ClientIdentity;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr)
            .or_else(|| req.extensions().get::<SocketAddr>().copied());

        resolve_client_identity(req.headers(), peer).ok_or(GovernorError::UnableToExtractKey)
    }
}

pub fn resolve_client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Option<ClientIdentity> {
    forwarded_for(headers)
        .or_else(|| header_value(headers, X_REAL_IP))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .map(ClientIdentity)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_value(headers, X_FORWARDED_FOR)?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
