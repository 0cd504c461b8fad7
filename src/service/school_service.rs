use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument, warn};

use crate::dto::school_dto::{CreateSchoolRequest, SchoolListQuery, SchoolResponse, UpdateSchoolRequest};
use crate::model::log::LogAction;
use crate::model::school::School;
use crate::model::user::{AuthUser, Role};
use crate::model::timestamp;
use crate::repository::certificate_repo::{CertificateFilter, CertificateRepository};
use crate::repository::class_repo::{ClassFilter, ClassRepository};
use crate::repository::school_repo::{SchoolFilter, SchoolRepository};
use crate::repository::user_repo::{UserFilter, UserRepository};
use crate::service::access::{owns, AccessControl, SchoolScope};
use crate::service::log_service::{LogEntry, LogService};
use crate::service::clean;
use crate::util::error::{parse_optional_object_id, ServiceError};
use crate::util::pagination::{PageRequest, Paginated};

#[async_trait]
pub trait SchoolService: Send + Sync {
    async fn create(&self, actor: &AuthUser, request: CreateSchoolRequest) -> Result<SchoolResponse, ServiceError>;
    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<SchoolResponse, ServiceError>;
    async fn list(&self, actor: &AuthUser, query: SchoolListQuery) -> Result<Paginated<SchoolResponse>, ServiceError>;
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateSchoolRequest) -> Result<SchoolResponse, ServiceError>;
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError>;
}

pub struct SchoolServiceImpl {
    school_repo: Arc<dyn SchoolRepository>,
    user_repo: Arc<dyn UserRepository>,
    class_repo: Arc<dyn ClassRepository>,
    certificate_repo: Arc<dyn CertificateRepository>,
    access: Arc<AccessControl>,
    log_service: Arc<dyn LogService>,
}

impl SchoolServiceImpl {
    pub fn new(
        school_repo: Arc<dyn SchoolRepository>,
        user_repo: Arc<dyn UserRepository>,
        class_repo: Arc<dyn ClassRepository>,
        certificate_repo: Arc<dyn CertificateRepository>,
        access: Arc<AccessControl>,
        log_service: Arc<dyn LogService>,
    ) -> Self {
        Self { school_repo, user_repo, class_repo, certificate_repo, access, log_service }
    }

    /// Users, classes and certificates still bound to the school
    async fn dependents(&self, id: &ObjectId) -> Result<(u64, u64, u64), ServiceError> {
        let first = PageRequest::new(Some(1), Some(1));
        let scope = Some(vec![*id]);
        let (_, users) = self
            .user_repo
            .list(&UserFilter { school_ids: scope.clone(), ..Default::default() }, first)
            .await?;
        let (_, classes) = self
            .class_repo
            .list(&ClassFilter { school_ids: scope.clone(), ..Default::default() }, first)
            .await?;
        let (_, certificates) = self
            .certificate_repo
            .list(&CertificateFilter { school_ids: scope, ..Default::default() }, first)
            .await?;
        Ok((users, classes, certificates))
    }

    /// The school, provided `actor` may edit or delete it
    async fn owned(&self, actor: &AuthUser, id: &ObjectId) -> Result<School, ServiceError> {
        let school = self.access.ensure_can_read(actor, id).await?;
        if !owns(actor, &school) {
            return Err(ServiceError::Forbidden("Only the owning admin can change this school".to_string()));
        }
        Ok(school)
    }

    async fn ensure_name_free(&self, admin_id: &ObjectId, name: &str, except: Option<ObjectId>) -> Result<(), ServiceError> {
        match self.school_repo.find_by_name(admin_id, name).await? {
            Some(existing) if existing.id != except => {
                Err(ServiceError::Conflict(format!("A school named {} already exists", name)))
            }
            _ => Ok(()),
        }
    }

    /// Owner of a new school: the admin itself, or the admin a super admin names
    async fn resolve_owner(&self, actor: &AuthUser, requested: Option<ObjectId>) -> Result<ObjectId, ServiceError> {
        match (actor.role, requested) {
            (Role::SuperAdmin, Some(admin_id)) if admin_id != actor.id => {
                let admin = self
                    .user_repo
                    .find_by_id(&admin_id)
                    .await?
                    .ok_or_else(|| ServiceError::InvalidInput("adminId does not reference a user".to_string()))?;
                if admin.role != Role::Admin {
                    return Err(ServiceError::InvalidInput("adminId must reference an admin user".to_string()));
                }
                Ok(admin_id)
            }
            (Role::SuperAdmin, _) | (Role::Admin, _) => Ok(actor.id),
            _ => Err(ServiceError::Forbidden("Only admins can create schools".to_string())),
        }
    }
}

#[async_trait]
impl SchoolService for SchoolServiceImpl {
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, name = %request.name))]
    async fn create(&self, actor: &AuthUser, request: CreateSchoolRequest) -> Result<SchoolResponse, ServiceError> {
        let requested_owner = parse_optional_object_id(request.admin_id.as_deref(), "admin")?;
        let admin_id = self.resolve_owner(actor, requested_owner).await?;
        let name = request.name.trim().to_string();
        self.ensure_name_free(&admin_id, &name, None).await?;

        let school = self
            .school_repo
            .insert(School {
                id: None,
                name,
                principal_name: request.principal_name.trim().to_string(),
                admin_id,
                address: request.address.trim().to_string(),
                contact_email: clean(request.contact_email),
                contact_phone: clean(request.contact_phone),
                total_students: 0,
                total_teachers: 0,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .await?;

        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Create, format!("Created school {}", school.name))
                    .school(school.id)
                    .document(school.id),
            )
            .await;
        info!("School created");
        Ok(SchoolResponse::from(school))
    }

    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<SchoolResponse, ServiceError> {
        let school = self.access.ensure_can_read(actor, &id).await?;
        Ok(SchoolResponse::from(school))
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: SchoolListQuery) -> Result<Paginated<SchoolResponse>, ServiceError> {
        let ids = match self.access.visible_schools(actor).await? {
            SchoolScope::All => None,
            SchoolScope::Only(ids) => Some(ids),
        };
        let filter = SchoolFilter { ids, search: clean(query.search.clone()), is_active: query.is_active };
        let page = query.page_request();
        let (schools, total) = self.school_repo.list(&filter, page).await?;
        Ok(Paginated::new(schools, total, page).map(SchoolResponse::from))
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, school = %id))]
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateSchoolRequest) -> Result<SchoolResponse, ServiceError> {
        let mut school = self.owned(actor, &id).await?;

        if let Some(name) = clean(request.name) {
            if !name.eq_ignore_ascii_case(&school.name) {
                self.ensure_name_free(&school.admin_id, &name, Some(id)).await?;
            }
            school.name = name;
        }
        if let Some(principal_name) = clean(request.principal_name) {
            school.principal_name = principal_name;
        }
        if let Some(address) = clean(request.address) {
            school.address = address;
        }
        if request.contact_email.is_some() {
            school.contact_email = clean(request.contact_email);
        }
        if request.contact_phone.is_some() {
            school.contact_phone = clean(request.contact_phone);
        }
        if let Some(is_active) = request.is_active {
            school.is_active = is_active;
        }
        school.updated_at = Some(timestamp());

        let school = self.school_repo.update(school).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Update, format!("Updated school {}", school.name))
                    .school(school.id)
                    .document(school.id),
            )
            .await;
        Ok(SchoolResponse::from(school))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, school = %id))]
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError> {
        let school = self.owned(actor, &id).await?;
        if school.total_students > 0 || school.total_teachers > 0 {
            warn!(students = school.total_students, teachers = school.total_teachers, "Refusing to delete non-empty school");
            return Err(ServiceError::Conflict(format!(
                "School still has {} students and {} teachers",
                school.total_students, school.total_teachers
            )));
        }

        let (users, classes, certificates) = self.dependents(&id).await?;
        if users + classes + certificates > 0 {
            warn!(users, classes, certificates, "Refusing to delete school with dependent records");
            return Err(ServiceError::Conflict(format!(
                "School still has {} users, {} classes and {} certificates",
                users, classes, certificates
            )));
        }

        self.school_repo.delete(&id).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Delete, format!("Deleted school {}", school.name))
                    .school(Some(id))
                    .document(Some(id)),
            )
            .await;
        info!("School deleted");
        Ok(())
    }
}
