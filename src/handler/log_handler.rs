use std::sync::Arc;

use axum::extract::State;

use crate::dto::log_dto::{LogListQuery, LogResponse};
use crate::handler::extract::Query;
use crate::model::user::AuthUser;
use crate::service::log_service::LogService;
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn list_logs_handler(
    State(service): State<Arc<dyn LogService>>,
    actor: AuthUser,
    Query(query): Query<LogListQuery>,
) -> ApiResult<Paginated<LogResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}
