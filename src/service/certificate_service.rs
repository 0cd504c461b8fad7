use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::dto::certificate_dto::{
    CertificateListQuery, CertificateResponse, CreateCertificateRequest, GeneratedCertificate, UpdateCertificateRequest,
};
use crate::model::certificate::Certificate;
use crate::model::class::SchoolClass;
use crate::model::log::LogAction;
use crate::model::school::School;
use crate::model::student::Student;
use crate::model::user::AuthUser;
use crate::model::timestamp;
use crate::repository::certificate_repo::{CertificateFilter, CertificateRepository};
use crate::repository::class_repo::ClassRepository;
use crate::repository::student_repo::StudentRepository;
use crate::service::access::AccessControl;
use crate::service::log_service::{LogEntry, LogService};
use crate::service::clean;
use crate::util::error::{parse_object_id, parse_optional_object_id, ServiceError};
use crate::util::pagination::Paginated;
use crate::util::template::{CertificateRenderer, TemplateError};

#[async_trait]
pub trait CertificateService: Send + Sync {
    async fn create(&self, actor: &AuthUser, request: CreateCertificateRequest) -> Result<CertificateResponse, ServiceError>;
    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<CertificateResponse, ServiceError>;
    async fn list(&self, actor: &AuthUser, query: CertificateListQuery) -> Result<Paginated<CertificateResponse>, ServiceError>;
    async fn update(
        &self,
        actor: &AuthUser,
        id: ObjectId,
        request: UpdateCertificateRequest,
    ) -> Result<CertificateResponse, ServiceError>;
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError>;
    /// Renders the certificate for one student of the same school
    async fn generate(&self, actor: &AuthUser, id: ObjectId, student_id: ObjectId) -> Result<GeneratedCertificate, ServiceError>;
}

pub struct CertificateServiceImpl {
    certificate_repo: Arc<dyn CertificateRepository>,
    student_repo: Arc<dyn StudentRepository>,
    class_repo: Arc<dyn ClassRepository>,
    access: Arc<AccessControl>,
    log_service: Arc<dyn LogService>,
    renderer: CertificateRenderer,
}

impl CertificateServiceImpl {
    pub fn new(
        certificate_repo: Arc<dyn CertificateRepository>,
        student_repo: Arc<dyn StudentRepository>,
        class_repo: Arc<dyn ClassRepository>,
        access: Arc<AccessControl>,
        log_service: Arc<dyn LogService>,
    ) -> Self {
        Self {
            certificate_repo,
            student_repo,
            class_repo,
            access,
            log_service,
            renderer: CertificateRenderer::new(),
        }
    }

    async fn find(&self, id: &ObjectId) -> Result<Certificate, ServiceError> {
        self.certificate_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Certificate not found: {}", id)))
    }

    async fn ensure_name_free(&self, school_id: &ObjectId, name: &str, except: Option<ObjectId>) -> Result<(), ServiceError> {
        match self.certificate_repo.find_by_name(school_id, name).await? {
            Some(existing) if existing.id != except => {
                Err(ServiceError::Conflict(format!("A certificate named {} already exists in this school", name)))
            }
            _ => Ok(()),
        }
    }

    fn check_template(&self, template: &str) -> Result<(), ServiceError> {
        self.renderer.validate(template).map_err(template_error)
    }
}

fn template_error(err: TemplateError) -> ServiceError {
    match err {
        TemplateError::Syntax(_) => ServiceError::InvalidInput(err.to_string()),
        TemplateError::Render(_) => ServiceError::InternalError(err.to_string()),
    }
}

fn text(value: &Option<String>) -> Value {
    Value::String(value.clone().unwrap_or_default())
}

/// Placeholder values available to a certificate template.
///
/// Custom student fields are inserted first so the standard keys win on collision.
pub fn certificate_context(
    certificate: &Certificate,
    student: &Student,
    school: &School,
    class: Option<&SchoolClass>,
    issued_on: &str,
) -> Value {
    let class_name = class.map(SchoolClass::display_name).unwrap_or_default();

    let mut context = Map::new();
    for (key, value) in &student.custom_fields {
        context.insert(key.clone(), Value::String(value.clone()));
    }
    let standard = json!({
        "studentName": student.full_name(),
        "firstName": student.first_name,
        "lastName": student.last_name,
        "admissionNumber": student.admission_number,
        "dateOfBirth": text(&student.date_of_birth),
        "gender": text(&student.gender),
        "guardianName": text(&student.guardian_name),
        "className": class_name,
        "schoolName": school.name,
        "principalName": school.principal_name,
        "schoolAddress": school.address,
        "certificateName": certificate.name,
        "issuedOn": issued_on,
        "student": {
            "name": student.full_name(),
            "firstName": student.first_name,
            "lastName": student.last_name,
            "admissionNumber": student.admission_number,
            "dateOfBirth": text(&student.date_of_birth),
            "gender": text(&student.gender),
            "guardianName": text(&student.guardian_name),
            "phone": text(&student.phone),
            "address": text(&student.address),
            "customFields": student.custom_fields,
        },
        "school": {
            "name": school.name,
            "principalName": school.principal_name,
            "address": school.address,
            "contactEmail": text(&school.contact_email),
            "contactPhone": text(&school.contact_phone),
        },
        "class": {
            "name": class.map(|c| c.name.clone()).unwrap_or_default(),
            "section": class.and_then(|c| c.section.clone()).unwrap_or_default(),
            "displayName": class_name,
        },
    });
    if let Value::Object(standard) = standard {
        context.extend(standard);
    }
    Value::Object(context)
}

#[async_trait]
impl CertificateService for CertificateServiceImpl {
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, name = %request.name))]
    async fn create(&self, actor: &AuthUser, request: CreateCertificateRequest) -> Result<CertificateResponse, ServiceError> {
        let school_id = parse_object_id(&request.school_id, "school")?;
        self.access.ensure_can_manage(actor, &school_id).await?;
        self.check_template(&request.template)?;

        let name = request.name.trim().to_string();
        self.ensure_name_free(&school_id, &name, None).await?;

        let certificate = self
            .certificate_repo
            .insert(Certificate {
                id: None,
                name,
                template: request.template,
                school_id,
                created_by: actor.id,
                created_at: None,
                updated_at: None,
            })
            .await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Create, format!("Created certificate {}", certificate.name))
                    .school(Some(school_id))
                    .document(certificate.id),
            )
            .await;
        info!("Certificate created");
        Ok(CertificateResponse::from(certificate))
    }

    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<CertificateResponse, ServiceError> {
        let certificate = self.find(&id).await?;
        self.access.ensure_can_read(actor, &certificate.school_id).await?;
        Ok(CertificateResponse::from(certificate))
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: CertificateListQuery) -> Result<Paginated<CertificateResponse>, ServiceError> {
        let requested = parse_optional_object_id(query.school_id.as_deref(), "school")?;
        let scope = self.access.visible_schools(actor).await?;
        let filter = CertificateFilter { school_ids: scope.narrow(requested)?, search: clean(query.search.clone()) };
        let page = query.page_request();
        let (certificates, total) = self.certificate_repo.list(&filter, page).await?;
        Ok(Paginated::new(certificates, total, page).map(CertificateResponse::from))
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, certificate = %id))]
    async fn update(
        &self,
        actor: &AuthUser,
        id: ObjectId,
        request: UpdateCertificateRequest,
    ) -> Result<CertificateResponse, ServiceError> {
        let mut certificate = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &certificate.school_id).await?;

        if let Some(template) = request.template {
            self.check_template(&template)?;
            certificate.template = template;
        }
        if let Some(name) = clean(request.name) {
            if !name.eq_ignore_ascii_case(&certificate.name) {
                self.ensure_name_free(&certificate.school_id, &name, Some(id)).await?;
            }
            certificate.name = name;
        }
        certificate.updated_at = Some(timestamp());

        let certificate = self.certificate_repo.update(certificate).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Update, format!("Updated certificate {}", certificate.name))
                    .school(Some(certificate.school_id))
                    .document(certificate.id),
            )
            .await;
        Ok(CertificateResponse::from(certificate))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, certificate = %id))]
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError> {
        let certificate = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &certificate.school_id).await?;

        self.certificate_repo.delete(&id).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Delete, format!("Deleted certificate {}", certificate.name))
                    .school(Some(certificate.school_id))
                    .document(Some(id)),
            )
            .await;
        Ok(())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, certificate = %id, student = %student_id))]
    async fn generate(&self, actor: &AuthUser, id: ObjectId, student_id: ObjectId) -> Result<GeneratedCertificate, ServiceError> {
        let certificate = self.find(&id).await?;
        let school = self.access.ensure_can_read(actor, &certificate.school_id).await?;
        let student = self
            .student_repo
            .find_by_id(&student_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Student not found: {}", student_id)))?;
        if student.school_id != certificate.school_id {
            return Err(ServiceError::InvalidInput(
                "Student and certificate belong to different schools".to_string(),
            ));
        }

        let class = match &student.class_id {
            Some(class_id) => self.class_repo.find_by_id(class_id).await?,
            None => None,
        };
        let issued_on = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let context = certificate_context(&certificate, &student, &school, class.as_ref(), &issued_on);
        let html = self.renderer.render(&certificate.template, &context).map_err(template_error)?;

        self.log_service
            .record(
                LogEntry::new(
                    actor.id,
                    LogAction::Generate,
                    format!("Generated {} for {}", certificate.name, student.full_name()),
                )
                .school(Some(certificate.school_id))
                .student(Some(student_id))
                .document(certificate.id),
            )
            .await;

        Ok(GeneratedCertificate {
            certificate_id: id.to_hex(),
            certificate_name: certificate.name,
            student_id: student_id.to_hex(),
            student_name: student.full_name(),
            issued_on,
            html,
        })
    }
}
