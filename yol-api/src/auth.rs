use anyhow::Context;
use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use yol_core::CoreError;
use yol_store::UserProfile;

use crate::{
    error::AppError,
    middleware::SessionClaims,
    state::{AppState, AuthConfig},
};

/// Sign-in after the phone has been verified.
///
/// OTP delivery and checking happen upstream of this service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub phone: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub display_name: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/session", post(create_session))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let digits = req.phone.chars().filter(char::is_ascii_digit).count();
    if !(9..=15).contains(&digits) {
        return Err(CoreError::Validation("phone number must have 9 to 15 digits".to_string()).into());
    }

    let user = state
        .users
        .upsert_by_phone(&req.phone, req.display_name.as_deref())
        .await;
    let token = issue_token(&state.auth, &user)?;

    tracing::info!(user_id = %user.user_id, "session issued");

    Ok(Json(SessionResponse {
        token,
        user_id: user.user_id.as_str().to_string(),
        display_name: user.display_name,
    }))
}

pub fn issue_token(auth: &AuthConfig, user: &UserProfile) -> Result<String, AppError> {
    let claims = SessionClaims {
        sub: user.user_id.as_str().to_string(),
        name: Some(user.display_name.clone()),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
    .context("Token encoding failed")?;

    Ok(token)
}
