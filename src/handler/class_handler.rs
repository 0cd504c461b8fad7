use std::sync::Arc;

use axum::extract::State;
use validator::Validate;

use crate::dto::class_dto::{ClassListQuery, ClassResponse, CreateClassRequest, UpdateClassRequest};
use crate::handler::extract::{Json, Path, Query};
use crate::model::user::AuthUser;
use crate::service::class_service::ClassService;
use crate::util::error::{parse_object_id, HandlerError};
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn create_class_handler(
    State(service): State<Arc<dyn ClassService>>,
    actor: AuthUser,
    Json(payload): Json<CreateClassRequest>,
) -> ApiResult<ClassResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::created(service.create(&actor, payload).await?).with_message("Class created"))
}

pub async fn list_classes_handler(
    State(service): State<Arc<dyn ClassService>>,
    actor: AuthUser,
    Query(query): Query<ClassListQuery>,
) -> ApiResult<Paginated<ClassResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}

pub async fn get_class_handler(
    State(service): State<Arc<dyn ClassService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ClassResponse> {
    let id = parse_object_id(&id, "class")?;
    Ok(ApiResponse::success(service.get(&actor, id).await?))
}

pub async fn update_class_handler(
    State(service): State<Arc<dyn ClassService>>,
    actor: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateClassRequest>,
) -> ApiResult<ClassResponse> {
    let id = parse_object_id(&id, "class")?;
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::success(service.update(&actor, id, payload).await?).with_message("Class updated"))
}

pub async fn delete_class_handler(
    State(service): State<Arc<dyn ClassService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_object_id(&id, "class")?;
    service.delete(&actor, id).await?;
    Ok(ApiResponse::success(()).with_message("Class deleted"))
}
