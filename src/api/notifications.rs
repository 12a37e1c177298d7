//! Notification addressing endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::notification::{EventPolicy, RecipientList, RecipientRequest},
    services::notifications::EventParticipants,
    AppState,
};

use super::AuthenticatedUser;

/// Recipient policy of every event
#[utoipa::path(
    get,
    path = "/notifications/rules",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Policy table", body = Vec<EventPolicy>)
    )
)]
pub async fn list_rules(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<Vec<EventPolicy>> {
    Json(state.services.notifications.rules())
}

/// Preview who would be notified about an event
#[utoipa::path(
    post,
    path = "/notifications/recipients",
    tag = "notifications",
    security(("bearer_auth" = [])),
    request_body = RecipientRequest,
    responses(
        (status = 200, description = "Recipients, ascending", body = RecipientList),
        (status = 403, description = "Staff access required")
    )
)]
pub async fn preview_recipients(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<RecipientRequest>,
) -> AppResult<Json<RecipientList>> {
    claims.require_staff()?;

    let participants = EventParticipants {
        actor_id: request.actor_id.unwrap_or(claims.user_id),
        assignee_id: request.assignee_id,
        creator_id: request.creator_id,
        previous_assignee_id: request.previous_assignee_id,
    };

    let recipients = state
        .services
        .notifications
        .recipients(request.event, participants)
        .await?;

    Ok(Json(RecipientList {
        event: request.event,
        recipients,
    }))
}
