use std::sync::Arc;

use axum::extract::{multipart::MultipartError, Multipart, State};
use axum::http::StatusCode;
use bytes::BytesMut;
use tracing::{debug, error, info};
use validator::Validate;

use crate::dto::student_dto::{
    CreateStudentRequest, ImportReport, StudentListQuery, StudentResponse, UpdateStudentRequest,
};
use crate::handler::extract::{Json, Path, Query};
use crate::model::user::AuthUser;
use crate::service::student_service::StudentService;
use crate::util::error::{parse_object_id, parse_optional_object_id, HandlerError, HandlerErrorKind};
use crate::util::pagination::Paginated;
use crate::util::response::{ApiResponse, ApiResult};

pub async fn create_student_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    Json(payload): Json<CreateStudentRequest>,
) -> ApiResult<StudentResponse> {
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::created(service.create(&actor, payload).await?).with_message("Student created"))
}

pub async fn list_students_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    Query(query): Query<StudentListQuery>,
) -> ApiResult<Paginated<StudentResponse>> {
    Ok(ApiResponse::success(service.list(&actor, query).await?))
}

pub async fn get_student_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StudentResponse> {
    let id = parse_object_id(&id, "student")?;
    Ok(ApiResponse::success(service.get(&actor, id).await?))
}

pub async fn update_student_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStudentRequest>,
) -> ApiResult<StudentResponse> {
    let id = parse_object_id(&id, "student")?;
    payload.validate().map_err(HandlerError::validation)?;
    Ok(ApiResponse::success(service.update(&actor, id, payload).await?).with_message("Student updated"))
}

pub async fn delete_student_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_object_id(&id, "student")?;
    service.delete(&actor, id).await?;
    Ok(ApiResponse::success(()).with_message("Student deleted"))
}

fn multipart_error(err: MultipartError) -> HandlerError {
    error!("Failed to read multipart body: {}", err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HandlerError::new(HandlerErrorKind::PayloadTooLarge, "Uploaded file is too large")
    } else {
        HandlerError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// `multipart/form-data` with a `file` part plus `schoolId` and optional `classId` text parts
pub async fn import_students_handler(
    State(service): State<Arc<dyn StudentService>>,
    actor: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<ImportReport> {
    let mut file: Option<BytesMut> = None;
    let mut school_id: Option<String> = None;
    let mut class_id: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string).unwrap_or_default();
        debug!(field = %name, "Reading import field");
        match name.as_str() {
            "file" => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    buf.extend_from_slice(&chunk);
                }
                file = Some(buf);
            }
            "schoolId" => school_id = Some(field.text().await.map_err(multipart_error)?),
            "classId" => class_id = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| HandlerError::bad_request("Missing file field"))?;
    let school_id = school_id.ok_or_else(|| HandlerError::bad_request("Missing schoolId field"))?;
    let school_id = parse_object_id(&school_id, "school")?;
    let class_id = parse_optional_object_id(class_id.as_deref(), "class")?;
    info!(actor = %actor.id, school = %school_id, bytes = file.len(), "Importing students from CSV");

    let report = service.import_csv(&actor, school_id, class_id, &file).await?;
    let message = format!("Imported {} of {} rows", report.imported, report.total_rows);
    Ok(ApiResponse::success(report).with_message(message))
}
