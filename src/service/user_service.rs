use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument};

use crate::dto::user_dto::{CreateUserRequest, UpdateUserRequest, UserListQuery, UserResponse};
use crate::model::log::LogAction;
use crate::model::user::{AuthUser, Role, User};
use crate::model::timestamp;
use crate::repository::school_repo::SchoolRepository;
use crate::repository::user_repo::{UserFilter, UserRepository};
use crate::service::access::AccessControl;
use crate::service::log_service::{LogEntry, LogService};
use crate::service::clean;
use crate::util::error::{parse_optional_object_id, ServiceError};
use crate::util::pagination::Paginated;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

/// Roles `actor_role` may create and manage
pub fn manageable_roles(actor_role: Role) -> &'static [Role] {
    match actor_role {
        Role::SuperAdmin => &[Role::Admin, Role::SubAdmin, Role::Teacher],
        Role::Admin => &[Role::SubAdmin, Role::Teacher],
        Role::SubAdmin => &[Role::Teacher],
        Role::Teacher => &[],
    }
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create(&self, actor: &AuthUser, request: CreateUserRequest) -> Result<UserResponse, ServiceError>;
    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<UserResponse, ServiceError>;
    async fn list(&self, actor: &AuthUser, query: UserListQuery) -> Result<Paginated<UserResponse>, ServiceError>;
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateUserRequest) -> Result<UserResponse, ServiceError>;
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError>;
}

pub struct UserServiceImpl {
    user_repo: Arc<dyn UserRepository>,
    school_repo: Arc<dyn SchoolRepository>,
    access: Arc<AccessControl>,
    log_service: Arc<dyn LogService>,
}

impl UserServiceImpl {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        school_repo: Arc<dyn SchoolRepository>,
        access: Arc<AccessControl>,
        log_service: Arc<dyn LogService>,
    ) -> Self {
        Self { user_repo, school_repo, access, log_service }
    }

    async fn find(&self, id: &ObjectId) -> Result<User, ServiceError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", id)))
    }

    async fn ensure_can_view(&self, actor: &AuthUser, target: &User) -> Result<(), ServiceError> {
        if actor.is_super_admin() || target.id == Some(actor.id) {
            return Ok(());
        }
        match target.school_id {
            Some(school_id) => self.access.ensure_can_read(actor, &school_id).await.map(|_| ()),
            None => Err(ServiceError::Forbidden("You do not have access to this user".to_string())),
        }
    }

    async fn ensure_can_manage(&self, actor: &AuthUser, target: &User) -> Result<(), ServiceError> {
        if !manageable_roles(actor.role).contains(&target.role) {
            return Err(ServiceError::Forbidden(format!("You cannot manage {} users", target.role)));
        }
        if let Some(school_id) = target.school_id {
            self.access.ensure_can_manage(actor, &school_id).await?;
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<ObjectId>) -> Result<(), ServiceError> {
        match self.user_repo.find_by_email(email).await? {
            Some(existing) if existing.id != except => {
                Err(ServiceError::Conflict(format!("A user with email {} already exists", email)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, role = %request.role))]
    async fn create(&self, actor: &AuthUser, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        if request.role == Role::SuperAdmin {
            return Err(ServiceError::Forbidden("Super admins cannot be created through the API".to_string()));
        }
        if !manageable_roles(actor.role).contains(&request.role) {
            return Err(ServiceError::Forbidden(format!("You cannot create {} users", request.role)));
        }

        let school_id = parse_optional_object_id(request.school_id.as_deref(), "school")?;
        let school_id = match (request.role.requires_school(), school_id) {
            (true, Some(school_id)) => {
                self.access.ensure_can_manage(actor, &school_id).await?;
                Some(school_id)
            }
            (true, None) => {
                return Err(ServiceError::InvalidInput(format!("schoolId is required for {} users", request.role)))
            }
            (false, Some(_)) => {
                return Err(ServiceError::InvalidInput("Admin users are not bound to a school".to_string()))
            }
            (false, None) => None,
        };

        PasswordUtilsImpl::validate_password_strength(&request.password)
            .map_err(|errors| ServiceError::InvalidInput(errors.join("; ")))?;
        let email = request.email.trim().to_lowercase();
        self.ensure_email_free(&email, None).await?;

        let password_hash = PasswordUtilsImpl::hash_password(&request.password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let user = self
            .user_repo
            .insert(User {
                id: None,
                name: request.name.trim().to_string(),
                email,
                password_hash,
                role: request.role,
                school_id,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .await?;

        if let (Role::Teacher, Some(school_id)) = (user.role, user.school_id) {
            self.school_repo.adjust_counters(&school_id, 0, 1).await?;
        }
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Create, format!("Created {} user {}", user.role, user.email))
                    .school(user.school_id)
                    .document(user.id),
            )
            .await;
        info!("User created");
        Ok(UserResponse::from(user))
    }

    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<UserResponse, ServiceError> {
        let user = self.find(&id).await?;
        self.ensure_can_view(actor, &user).await?;
        Ok(UserResponse::from(user))
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: UserListQuery) -> Result<Paginated<UserResponse>, ServiceError> {
        let requested = parse_optional_object_id(query.school_id.as_deref(), "school")?;
        let scope = self.access.visible_schools(actor).await?;
        let filter = UserFilter {
            school_ids: scope.narrow(requested)?,
            role: query.role,
            search: clean(query.search.clone()),
        };
        let page = query.page_request();
        let (users, total) = self.user_repo.list(&filter, page).await?;
        Ok(Paginated::new(users, total, page).map(UserResponse::from))
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, target = %id))]
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateUserRequest) -> Result<UserResponse, ServiceError> {
        let mut user = self.find(&id).await?;
        let is_self = id == actor.id;
        if is_self {
            if request.is_active == Some(false) {
                return Err(ServiceError::InvalidInput("You cannot deactivate your own account".to_string()));
            }
        } else {
            self.ensure_can_manage(actor, &user).await?;
        }

        if let Some(name) = clean(request.name) {
            user.name = name;
        }
        if let Some(email) = clean(request.email).map(|e| e.to_lowercase()) {
            if email != user.email {
                self.ensure_email_free(&email, Some(id)).await?;
                user.email = email;
            }
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Some(timestamp());

        let user = self.user_repo.update(user).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Update, format!("Updated user {}", user.email))
                    .school(user.school_id)
                    .document(user.id),
            )
            .await;
        Ok(UserResponse::from(user))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, target = %id))]
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError> {
        if id == actor.id {
            return Err(ServiceError::InvalidInput("You cannot delete your own account".to_string()));
        }
        let user = self.find(&id).await?;
        self.ensure_can_manage(actor, &user).await?;

        self.user_repo.delete(&id).await?;
        if let (Role::Teacher, Some(school_id)) = (user.role, user.school_id) {
            self.school_repo.adjust_counters(&school_id, 0, -1).await?;
        }
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Delete, format!("Deleted {} user {}", user.role, user.email))
                    .school(user.school_id)
                    .document(Some(id)),
            )
            .await;
        info!("User deleted");
        Ok(())
    }
}
