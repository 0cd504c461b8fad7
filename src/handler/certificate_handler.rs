use std::sync::Arc;

use axum::extract::State;
use validator::Validate;

use crate::dto::certificate_dto::{
    CertificateListQuery, CertificateResponse, CreateCertificateRequest, GeneratedCertificate, UpdateCertificateRequest,
};
use crate::handler::extract::{Json, Path, Query};
use crate::model::user::AuthUser;
use crate::service::certificate_service::CertificateService;
use crate::util::error::{parse_object_id, HandlerError};
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn create_certificate_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Json(payload): Json<CreateCertificateRequest>,
) -> ApiResult<CertificateResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::created(service.create(&actor, payload).await?).with_message("Certificate created"))
}

pub async fn list_certificates_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Query(query): Query<CertificateListQuery>,
) -> ApiResult<Paginated<CertificateResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}

pub async fn get_certificate_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<CertificateResponse> {
    let id = parse_object_id(&id, "certificate")?;
    Ok(ApiResponse::success(service.get(&actor, id).await?))
}

pub async fn update_certificate_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCertificateRequest>,
) -> ApiResult<CertificateResponse> {
    let id = parse_object_id(&id, "certificate")?;
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::success(service.update(&actor, id, payload).await?).with_message("Certificate updated"))
}

pub async fn delete_certificate_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_object_id(&id, "certificate")?;
    service.delete(&actor, id).await?;
    Ok(ApiResponse::success(()).with_message("Certificate deleted"))
}

pub async fn generate_certificate_handler(
    State(service): State<Arc<dyn CertificateService>>,
    actor: AuthUser,
    Path((id, student_id)): Path<(String, String)>,
) -> ApiResult<GeneratedCertificate> {
    let id = parse_object_id(&id, "certificate")?;
    let student_id = parse_object_id(&student_id, "student")?;
    Ok(ApiResponse::success(service.generate(&actor, id, student_id).await?))
}
