use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use yol_core::Identity;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub name: Option<String>,
    pub exp: usize,
}

impl SessionClaims {
    /// The verified caller, handed to every engine action.
    pub fn identity(&self) -> Identity {
        let identity = Identity::authenticated(self.sub.as_str());
        match &self.name {
            Some(name) => identity.with_name(name.clone()),
            None => identity,
        }
    }
}

// ============================================================================
// Session Authentication Middleware
// ============================================================================

pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract token from Authorization header
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return AppError::AuthenticationError("Missing bearer token".to_string()).into_response();
    };

    // 2. Decode and validate JWT
    let token_data = match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            return AppError::AuthenticationError("Invalid or expired session".to_string())
                .into_response();
        }
    };

    // 3. Inject claims into request extensions
    req.extensions_mut().insert(token_data.claims);

    next.run(req).await
}
