//! Account endpoints: signup, login, token refresh, profile and roles

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::user::{AssignRole, CreateUser, LoginRequest, LoginResponse, RefreshRequest, UserOut},
    AppState,
};

use super::AuthenticatedUser;

/// Create a new account
#[utoipa::path(
    post,
    path = "/users/signup",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserOut),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Role cannot be self-assigned"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(data): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<UserOut>)> {
    let user = state.services.users.signup(data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticate and receive access and refresh tokens
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .services
        .users
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/users/refresh",
    tag = "users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = LoginResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.users.refresh(&request.refresh_token).await?;
    Ok(Json(response))
}

/// Get the current user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserOut),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserOut>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user))
}

/// Assign a role to a user (admin only)
#[utoipa::path(
    post,
    path = "/users/assign-role",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = AssignRole,
    responses(
        (status = 200, description = "Role assigned", body = UserOut),
        (status = 400, description = "Role cannot be assigned"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn assign_role(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AssignRole>,
) -> AppResult<Json<UserOut>> {
    claims.require_admin()?;

    let user = state.services.users.assign_role(request).await?;
    Ok(Json(user))
}
