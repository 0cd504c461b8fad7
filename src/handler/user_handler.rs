use std::sync::Arc;

use axum::extract::State;
use validator::Validate;

use crate::dto::user_dto::{CreateUserRequest, UpdateUserRequest, UserListQuery, UserResponse};
use crate::handler::extract::{Json, Path, Query};
use crate::model::user::AuthUser;
use crate::service::user_service::UserService;
use crate::util::error::{parse_object_id, HandlerError};
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn create_user_handler(
    State(service): State<Arc<dyn UserService>>,
    actor: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    let user = service.create(&actor, payload).await?;
    Ok(ApiResponse::created(user).with_message("User created"))
}

pub async fn list_users_handler(
    State(service): State<Arc<dyn UserService>>,
    actor: AuthUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Paginated<UserResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}

pub async fn get_user_handler(
    State(service): State<Arc<dyn UserService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<UserResponse> {
    let id = parse_object_id(&id, "user")?;
    Ok(ApiResponse::success(service.get(&actor, id).await?))
}

pub async fn update_user_handler(
    State(service): State<Arc<dyn UserService>>,
    actor: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let id = parse_object_id(&id, "user")?;
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::success(service.update(&actor, id, payload).await?).with_message("User updated"))
}

pub async fn delete_user_handler(
    State(service): State<Arc<dyn UserService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_object_id(&id, "user")?;
    service.delete(&actor, id).await?;
    Ok(ApiResponse::success(()).with_message("User deleted"))
}
