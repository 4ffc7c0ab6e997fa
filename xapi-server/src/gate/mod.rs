//! Shared-secret API key gate in front of the asset routes.
//!
//! Outside production every request passes. In production the `apikey`
//! header must carry one of the configured keys.

use std::{collections::HashSet, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tracing::{info, warn};
use xapi_config::{AuthConfig, Environment};

use crate::infra::{app_state::AppState, errors::AppError};

/// Header carrying the credential. Header names are case-insensitive on the
/// wire; the value comparison is exact after trimming.
pub const API_KEY_HEADER: &str = "apikey";

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("API key required")]
    MissingKey,
    #[error("Invalid API key")]
    InvalidKey,
}

impl From<GateRejection> for AppError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::MissingKey => Self::unauthorized(rejection.to_string()),
            GateRejection::InvalidKey => Self::forbidden(rejection.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    environment: Environment,
    keys: HashSet<String>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("environment", &self.environment)
            .field("keys", &format_args!("<{} keys>", self.keys.len()))
            .finish()
    }
}

impl AccessGate {
    pub fn new<I, S>(environment: Environment, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        Self { environment, keys }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.environment.clone(), &auth.api_keys)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Decide on a presented credential. Blank counts as absent.
    pub fn check(&self, presented: Option<&str>) -> Result<(), GateRejection> {
        if !self.environment.is_production() {
            return Ok(());
        }

        let presented = presented.map(str::trim).filter(|key| !key.is_empty());
        match presented {
            None => Err(GateRejection::MissingKey),
            Some(key) if self.keys.contains(key) => Ok(()),
            Some(_) => Err(GateRejection::InvalidKey),
        }
    }
}

/// First `X-Forwarded-For` entry, else the transport peer, else `unknown`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn api_key_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = client_ip(request.headers(), peer);

    // A non-UTF-8 header is still a presented key, just never a valid one.
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.to_str().unwrap_or("\u{fffd}"));

    let gate = &state.gate;
    match gate.check(presented) {
        Ok(()) => {
            info!(
                %client_ip,
                environment = %gate.environment(),
                path = %request.uri().path(),
                "API request allowed"
            );
            Ok(next.run(request).await)
        }
        Err(rejection) => {
            warn!(
                %client_ip,
                environment = %gate.environment(),
                key_len = presented.map(str::len).unwrap_or(0),
                reason = %rejection,
                "API request denied"
            );
            Err(rejection.into())
        }
    }
}
