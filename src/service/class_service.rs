use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument};

use crate::dto::class_dto::{ClassListQuery, ClassResponse, CreateClassRequest, UpdateClassRequest};
use crate::model::class::SchoolClass;
use crate::model::log::LogAction;
use crate::model::user::{AuthUser, Role};
use crate::model::timestamp;
use crate::repository::class_repo::{ClassFilter, ClassRepository};
use crate::repository::student_repo::StudentRepository;
use crate::repository::user_repo::UserRepository;
use crate::service::access::AccessControl;
use crate::service::log_service::{LogEntry, LogService};
use crate::service::clean;
use crate::util::error::{parse_object_id, parse_optional_object_id, ServiceError};
use crate::util::pagination::Paginated;

#[async_trait]
pub trait ClassService: Send + Sync {
    async fn create(&self, actor: &AuthUser, request: CreateClassRequest) -> Result<ClassResponse, ServiceError>;
    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<ClassResponse, ServiceError>;
    async fn list(&self, actor: &AuthUser, query: ClassListQuery) -> Result<Paginated<ClassResponse>, ServiceError>;
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateClassRequest) -> Result<ClassResponse, ServiceError>;
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError>;
}

pub struct ClassServiceImpl {
    class_repo: Arc<dyn ClassRepository>,
    student_repo: Arc<dyn StudentRepository>,
    user_repo: Arc<dyn UserRepository>,
    access: Arc<AccessControl>,
    log_service: Arc<dyn LogService>,
}

impl ClassServiceImpl {
    pub fn new(
        class_repo: Arc<dyn ClassRepository>,
        student_repo: Arc<dyn StudentRepository>,
        user_repo: Arc<dyn UserRepository>,
        access: Arc<AccessControl>,
        log_service: Arc<dyn LogService>,
    ) -> Self {
        Self { class_repo, student_repo, user_repo, access, log_service }
    }

    async fn find(&self, id: &ObjectId) -> Result<SchoolClass, ServiceError> {
        self.class_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Class not found: {}", id)))
    }

    async fn ensure_teacher_in_school(&self, teacher_id: &ObjectId, school_id: &ObjectId) -> Result<(), ServiceError> {
        match self.user_repo.find_by_id(teacher_id).await? {
            Some(user) if user.role == Role::Teacher && user.school_id == Some(*school_id) => Ok(()),
            _ => Err(ServiceError::InvalidInput("teacherId must reference a teacher of this school".to_string())),
        }
    }

    async fn ensure_name_free(
        &self,
        school_id: &ObjectId,
        name: &str,
        section: Option<&str>,
        except: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        match self.class_repo.find_by_name(school_id, name, section).await? {
            Some(existing) if existing.id != except => {
                Err(ServiceError::Conflict(format!("Class {} already exists in this school", existing.display_name())))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ClassService for ClassServiceImpl {
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, name = %request.name))]
    async fn create(&self, actor: &AuthUser, request: CreateClassRequest) -> Result<ClassResponse, ServiceError> {
        let school_id = parse_object_id(&request.school_id, "school")?;
        let teacher_id = parse_optional_object_id(request.teacher_id.as_deref(), "teacher")?;
        self.access.ensure_can_manage(actor, &school_id).await?;
        if let Some(teacher_id) = &teacher_id {
            self.ensure_teacher_in_school(teacher_id, &school_id).await?;
        }

        let name = request.name.trim().to_string();
        let section = clean(request.section);
        self.ensure_name_free(&school_id, &name, section.as_deref(), None).await?;

        let class = self
            .class_repo
            .insert(SchoolClass { id: None, name, section, school_id, teacher_id, created_at: None, updated_at: None })
            .await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Create, format!("Created class {}", class.display_name()))
                    .school(Some(school_id))
                    .document(class.id),
            )
            .await;
        info!("Class created");
        Ok(ClassResponse::from(class))
    }

    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<ClassResponse, ServiceError> {
        let class = self.find(&id).await?;
        self.access.ensure_can_read(actor, &class.school_id).await?;
        Ok(ClassResponse::from(class))
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: ClassListQuery) -> Result<Paginated<ClassResponse>, ServiceError> {
        let requested = parse_optional_object_id(query.school_id.as_deref(), "school")?;
        let scope = self.access.visible_schools(actor).await?;
        let filter = ClassFilter {
            school_ids: scope.narrow(requested)?,
            teacher_id: parse_optional_object_id(query.teacher_id.as_deref(), "teacher")?,
            search: clean(query.search.clone()),
        };
        let page = query.page_request();
        let (classes, total) = self.class_repo.list(&filter, page).await?;
        Ok(Paginated::new(classes, total, page).map(ClassResponse::from))
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, class = %id))]
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateClassRequest) -> Result<ClassResponse, ServiceError> {
        let mut class = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &class.school_id).await?;

        let name = clean(request.name).unwrap_or_else(|| class.name.clone());
        let section = match request.section {
            Some(section) => clean(Some(section)),
            None => class.section.clone(),
        };
        if name != class.name || section != class.section {
            self.ensure_name_free(&class.school_id, &name, section.as_deref(), Some(id)).await?;
        }
        class.name = name;
        class.section = section;

        if let Some(raw) = request.teacher_id.as_deref() {
            class.teacher_id = parse_optional_object_id(Some(raw), "teacher")?;
            if let Some(teacher_id) = &class.teacher_id {
                self.ensure_teacher_in_school(teacher_id, &class.school_id).await?;
            }
        }
        class.updated_at = Some(timestamp());

        let class = self.class_repo.update(class).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Update, format!("Updated class {}", class.display_name()))
                    .school(Some(class.school_id))
                    .document(class.id),
            )
            .await;
        Ok(ClassResponse::from(class))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, class = %id))]
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError> {
        let class = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &class.school_id).await?;

        let enrolled = self.student_repo.count_in_class(&id).await?;
        if enrolled > 0 {
            return Err(ServiceError::Conflict(format!("Class still has {} students", enrolled)));
        }
        self.class_repo.delete(&id).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Delete, format!("Deleted class {}", class.display_name()))
                    .school(Some(class.school_id))
                    .document(Some(id)),
            )
            .await;
        Ok(())
    }
}
