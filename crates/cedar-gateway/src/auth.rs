//! Authentication handling
//!
//! Optional bearer token on `/api/*`. Enabled when a token is configured
//! (file or `CEDAR_GATEWAY_TOKEN`) or `mode = "token"` is set.

use crate::server::{ApiError, AppState};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use cedar_core::{AuthConfig, AuthMode, Error, Result};
use std::sync::Arc;
use tracing::warn;

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Clone, Debug)]
pub struct ResolvedAuth {
    pub mode: AuthMode,
    pub token: Option<String>,
}

impl ResolvedAuth {
    pub fn from_config(config: &AuthConfig) -> Self {
        let token = config.token.clone().filter(|t| !t.is_empty());
        let mode = if token.is_some() {
            AuthMode::Token
        } else {
            config.mode.clone()
        };
        Self { mode, token }
    }

    pub fn verify_token(&self, provided: Option<&str>) -> Result<()> {
        match self.mode {
            AuthMode::None => Ok(()),
            AuthMode::Token => {
                let expected = self
                    .token
                    .as_deref()
                    .ok_or_else(|| Error::PermissionDenied("no token configured".into()))?;
                let provided =
                    provided.ok_or_else(|| Error::PermissionDenied("token required".into()))?;
                if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
                    return Err(Error::PermissionDenied("invalid token".into()));
                }
                Ok(())
            }
        }
    }
}

/// `Authorization: Bearer <token>` → `<token>`.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
}

pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.auth.verify_token(bearer_token(header)) {
        warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
