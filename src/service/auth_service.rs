use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{error, info, instrument, warn};

use crate::config::SuperAdminConfig;
use crate::dto::auth_dto::AuthResponse;
use crate::dto::user_dto::UserResponse;
use crate::model::log::LogAction;
use crate::model::user::{AuthUser, Role, User};
use crate::model::timestamp;
use crate::repository::user_repo::UserRepository;
use crate::service::log_service::{LogEntry, LogService};
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtError, JwtTokenUtils, JwtTokenUtilsImpl, TokenPair, TokenSubject};
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ServiceError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError>;
    /// Resolves a bearer access token into the current actor
    async fn authenticate(&self, access_token: &str) -> Result<AuthUser, ServiceError>;
    async fn me(&self, actor: &AuthUser) -> Result<UserResponse, ServiceError>;
    async fn change_password(&self, actor: &AuthUser, current: &str, new: &str) -> Result<(), ServiceError>;
    /// Creates the configured super admin unless that email already exists
    async fn seed_super_admin(&self, config: &SuperAdminConfig) -> Result<bool, ServiceError>;
}

pub struct AuthServiceImpl {
    user_repo: Arc<dyn UserRepository>,
    jwt_utils: Arc<JwtTokenUtilsImpl>,
    log_service: Arc<dyn LogService>,
}

impl AuthServiceImpl {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        jwt_utils: Arc<JwtTokenUtilsImpl>,
        log_service: Arc<dyn LogService>,
    ) -> Self {
        Self { user_repo, jwt_utils, log_service }
    }

    fn issue_tokens(&self, user: &User, user_id: ObjectId) -> Result<TokenPair, ServiceError> {
        let subject = TokenSubject {
            user_id: user_id.to_hex(),
            email: user.email.clone(),
            role: user.role,
            school_id: user.school_id.map(|id| id.to_hex()),
        };
        self.jwt_utils.generate_token_pair(&subject).map_err(|e| {
            error!("Token generation failed: {}", e);
            ServiceError::InternalError(format!("Token generation failed: {}", e))
        })
    }

    /// Loads the user behind a token subject, refusing unknown or inactive users
    async fn active_user(&self, subject: &str) -> Result<(User, ObjectId), ServiceError> {
        let id = ObjectId::parse_str(subject).map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;
        let user = self
            .user_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User no longer exists".to_string()))?;
        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }
        Ok((user, id))
    }
}

fn token_error(err: JwtError) -> ServiceError {
    match err {
        JwtError::TokenExpired => ServiceError::Unauthorized("Token has expired".to_string()),
        JwtError::InvalidTokenType { .. } => ServiceError::Unauthorized("Wrong token type".to_string()),
        _ => ServiceError::Unauthorized("Invalid token".to_string()),
    }
}

fn strength_error(errors: Vec<String>) -> ServiceError {
    ServiceError::InvalidInput(errors.join("; "))
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ServiceError> {
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown email");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let valid = PasswordUtilsImpl::verify_password(password, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(format!("Password verification failed: {}", e)))?;
        if !valid {
            warn!("Login attempt with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".to_string()));
        }

        let user_id = user.id.ok_or_else(|| ServiceError::InternalError("Stored user has no id".to_string()))?;
        let tokens = self.issue_tokens(&user, user_id)?;
        self.log_service
            .record(LogEntry::new(user_id, LogAction::Login, format!("{} logged in", user.email)).school(user.school_id))
            .await;
        info!(user = %user_id, "User logged in");

        Ok(AuthResponse { user: UserResponse::from(user), tokens })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.jwt_utils.validate_refresh_token(refresh_token).map_err(token_error)?;
        let (user, id) = self.active_user(&claims.sub).await?;
        self.issue_tokens(&user, id)
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.jwt_utils.validate_access_token(access_token).map_err(token_error)?;
        let (user, id) = self.active_user(&claims.sub).await?;
        // role and school come from the stored user, not the token
        Ok(AuthUser { id, email: user.email, role: user.role, school_id: user.school_id })
    }

    async fn me(&self, actor: &AuthUser) -> Result<UserResponse, ServiceError> {
        let user = self
            .user_repo
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        Ok(UserResponse::from(user))
    }

    #[instrument(skip(self, actor, current, new), fields(actor = %actor.id))]
    async fn change_password(&self, actor: &AuthUser, current: &str, new: &str) -> Result<(), ServiceError> {
        let mut user = self
            .user_repo
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let valid = PasswordUtilsImpl::verify_password(current, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(ServiceError::Unauthorized("Current password is incorrect".to_string()));
        }
        PasswordUtilsImpl::validate_password_strength(new).map_err(strength_error)?;

        user.password_hash = PasswordUtilsImpl::hash_password(new)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        user.updated_at = Some(timestamp());
        self.user_repo.update(user).await?;
        info!("Password changed");
        Ok(())
    }

    #[instrument(skip(self, config), fields(email = %config.email))]
    async fn seed_super_admin(&self, config: &SuperAdminConfig) -> Result<bool, ServiceError> {
        if self.user_repo.find_by_email(&config.email).await?.is_some() {
            info!("Super admin already present");
            return Ok(false);
        }
        PasswordUtilsImpl::validate_password_strength(&config.password).map_err(strength_error)?;
        let password_hash = PasswordUtilsImpl::hash_password(&config.password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        self.user_repo
            .insert(User {
                id: None,
                name: config.name.clone(),
                email: config.email.clone(),
                password_hash,
                role: Role::SuperAdmin,
                school_id: None,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .await?;
        info!("Super admin seeded");
        Ok(true)
    }
}
