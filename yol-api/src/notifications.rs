use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use yol_store::Notification;

use crate::{middleware::SessionClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub after: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/notifications", get(list_notifications))
}

/// GET /v1/notifications?after=
/// The caller's notifications newer than the cursor, oldest first
async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Query(query): Query<NotificationQuery>,
) -> Json<Vec<Notification>> {
    let identity = claims.identity();
    Json(state.notifications.since(identity.user_id(), query.after).await)
}
