//! Ticket visibility endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::ticket::{TicketRecord, TicketSearchQuery},
    AppState,
};

use super::AuthenticatedUser;

/// Search the tickets visible to the caller
///
/// Children follow their parent; results are otherwise newest first.
#[utoipa::path(
    get,
    path = "/tickets",
    tag = "tickets",
    security(("bearer_auth" = [])),
    params(TicketSearchQuery),
    responses(
        (status = 200, description = "Visible tickets", body = Vec<TicketRecord>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn search_tickets(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TicketSearchQuery>,
) -> AppResult<Json<Vec<TicketRecord>>> {
    let tickets = state
        .services
        .tickets
        .resolve_tickets(claims.user_id, &query)
        .await?;
    Ok(Json(tickets))
}

/// Ids of every ticket the caller can access
#[utoipa::path(
    get,
    path = "/tickets/accessible-ids",
    tag = "tickets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Accessible ticket ids, ascending", body = Vec<i32>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn accessible_ticket_ids(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<i32>>> {
    let mut ids: Vec<i32> = state
        .services
        .tickets
        .resolve_accessible_ticket_ids(claims.user_id)
        .await?
        .into_iter()
        .collect();
    ids.sort_unstable();
    Ok(Json(ids))
}
