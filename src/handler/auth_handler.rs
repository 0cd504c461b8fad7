use std::sync::Arc;

use axum::extract::State;
use tracing::info;
use validator::Validate;

use crate::dto::auth_dto::{AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest};
use crate::dto::user_dto::UserResponse;
use crate::handler::extract::Json;
use crate::model::user::AuthUser;
use crate::service::auth_service::AuthService;
use crate::util::error::HandlerError;
use crate::util::jwt::TokenPair;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn login_handler(
    State(service): State<Arc<dyn AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    let response = service.login(&payload.email, &payload.password).await?;
    Ok(ApiResponse::success(response).with_message("Login successful"))
}

pub async fn refresh_token_handler(
    State(service): State<Arc<dyn AuthService>>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    payload.validate().map_err(HandlerError::validation)?;
    let tokens = service.refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::success(tokens))
}

pub async fn me_handler(State(service): State<Arc<dyn AuthService>>, actor: AuthUser) -> ApiResult<UserResponse> {
    Ok(ApiResponse::success(service.me(&actor).await?))
}

pub async fn change_password_handler(
    State(service): State<Arc<dyn AuthService>>,
    actor: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    payload.validate().map_err(HandlerError::validation)?;
    service.change_password(&actor, &payload.current_password, &payload.new_password).await?;
    info!(actor = %actor.id, "Password changed");
    Ok(ApiResponse::success(()).with_message("Password changed"))
}
