use std::sync::Arc;

use axum::extract::State;
use validator::Validate;

use crate::dto::school_dto::{CreateSchoolRequest, SchoolListQuery, SchoolResponse, UpdateSchoolRequest};
use crate::handler::extract::{Json, Path, Query};
use crate::model::user::AuthUser;
use crate::service::school_service::SchoolService;
use crate::util::error::{parse_object_id, HandlerError};
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn create_school_handler(
    State(service): State<Arc<dyn SchoolService>>,
    actor: AuthUser,
    Json(payload): Json<CreateSchoolRequest>,
) -> ApiResult<SchoolResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    let school = service.create(&actor, payload).await?;
    Ok(ApiResponse::created(school).with_message("School created"))
}

pub async fn list_schools_handler(
    State(service): State<Arc<dyn SchoolService>>,
    actor: AuthUser,
    Query(query): Query<SchoolListQuery>,
) -> ApiResult<Paginated<SchoolResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}

pub async fn get_school_handler(
    State(service): State<Arc<dyn SchoolService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<SchoolResponse> {
    let id = parse_object_id(&id, "school")?;
    Ok(ApiResponse::success(service.get(&actor, id).await?))
}

pub async fn update_school_handler(
    State(service): State<Arc<dyn SchoolService>>,
    actor: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSchoolRequest>,
) -> ApiResult<SchoolResponse> {
    let id = parse_object_id(&id, "school")?;
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::success(service.update(&actor, id, payload).await?).with_message("School updated"))
}

pub async fn delete_school_handler(
    State(service): State<Arc<dyn SchoolService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_object_id(&id, "school")?;
    service.delete(&actor, id).await?;
    Ok(ApiResponse::success(()).with_message("School deleted"))
}
