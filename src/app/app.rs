use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::{AppConfig, JwtConfig, MongoConfig, SuperAdminConfig};
use crate::middlewares::auth_middleware::AuthState;
use crate::repository::certificate_repo::{CertificateRepository, MongoCertificateRepository};
use crate::repository::class_repo::{ClassRepository, MongoClassRepository};
use crate::repository::log_repo::{LogRepository, MongoLogRepository};
use crate::repository::mongo;
use crate::repository::school_repo::{MongoSchoolRepository, SchoolRepository};
use crate::repository::student_repo::{MongoStudentRepository, StudentRepository};
use crate::repository::user_repo::{MongoUserRepository, UserRepository};
use crate::router::{
    auth_router::auth_router, certificate_router::certificate_router, class_router::class_router,
    log_router::log_router, school_router::school_router, student_router::student_router, user_router::user_router,
};
use crate::service::access::AccessControl;
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::service::certificate_service::{CertificateService, CertificateServiceImpl};
use crate::service::class_service::{ClassService, ClassServiceImpl};
use crate::service::log_service::{LogService, LogServiceImpl};
use crate::service::school_service::{SchoolService, SchoolServiceImpl};
use crate::service::student_service::{StudentService, StudentServiceImpl};
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::util::jwt::JwtTokenUtilsImpl;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage behind the services
#[derive(Clone)]
pub struct Repositories {
    pub schools: Arc<dyn SchoolRepository>,
    pub users: Arc<dyn UserRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub classes: Arc<dyn ClassRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub logs: Arc<dyn LogRepository>,
}

impl Repositories {
    pub fn mongo(db: &mongodb::Database) -> Self {
        Repositories {
            schools: Arc::new(MongoSchoolRepository::new(db)),
            users: Arc::new(MongoUserRepository::new(db)),
            students: Arc::new(MongoStudentRepository::new(db)),
            classes: Arc::new(MongoClassRepository::new(db)),
            certificates: Arc::new(MongoCertificateRepository::new(db)),
            logs: Arc::new(MongoLogRepository::new(db)),
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub schools: Arc<dyn SchoolService>,
    pub users: Arc<dyn UserService>,
    pub students: Arc<dyn StudentService>,
    pub classes: Arc<dyn ClassService>,
    pub certificates: Arc<dyn CertificateService>,
    pub logs: Arc<dyn LogService>,
}

impl Services {
    pub fn new(repos: &Repositories, jwt_config: JwtConfig, import_max_rows: usize) -> Self {
        let access = Arc::new(AccessControl::new(repos.schools.clone()));
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let logs: Arc<dyn LogService> = Arc::new(LogServiceImpl::new(repos.logs.clone(), access.clone()));

        Services {
            auth: Arc::new(AuthServiceImpl::new(repos.users.clone(), jwt_utils, logs.clone())),
            schools: Arc::new(SchoolServiceImpl::new(
                repos.schools.clone(),
                repos.users.clone(),
                repos.classes.clone(),
                repos.certificates.clone(),
                access.clone(),
                logs.clone(),
            )),
            users: Arc::new(UserServiceImpl::new(
                repos.users.clone(),
                repos.schools.clone(),
                access.clone(),
                logs.clone(),
            )),
            students: Arc::new(StudentServiceImpl::new(
                repos.students.clone(),
                repos.classes.clone(),
                repos.schools.clone(),
                access.clone(),
                logs.clone(),
                import_max_rows,
            )),
            classes: Arc::new(ClassServiceImpl::new(
                repos.classes.clone(),
                repos.students.clone(),
                repos.users.clone(),
                access.clone(),
                logs.clone(),
            )),
            certificates: Arc::new(CertificateServiceImpl::new(
                repos.certificates.clone(),
                repos.students.clone(),
                repos.classes.clone(),
                access,
                logs.clone(),
            )),
            logs,
        }
    }
}

/// Every route of the API
pub fn build_router(services: &Services, config: &AppConfig) -> Router {
    let auth = AuthState { auth_service: services.auth.clone() };
    let cors = if config.cors_allow_any { CorsLayer::permissive() } else { CorsLayer::new() };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(auth_router(services.auth.clone(), auth.clone()))
        .merge(school_router(services.schools.clone(), auth.clone()))
        .merge(user_router(services.users.clone(), auth.clone()))
        .merge(student_router(services.students.clone(), auth.clone(), config.import_max_bytes))
        .merge(class_router(services.classes.clone(), auth.clone()))
        .merge(certificate_router(services.certificates.clone(), auth.clone()))
        .merge(log_router(services.logs.clone(), auth))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub struct App {
    config: AppConfig,
    router: Router,
}

impl App {
    pub async fn new() -> Result<Self, BoxError> {
        let config = AppConfig::from_env()?;
        let jwt_config = JwtConfig::from_env()?;
        let mongo_config = MongoConfig::from_env()?;

        let db = mongo::connect(&mongo_config).await?;
        mongo::ensure_indexes(&db).await?;
        let repos = Repositories::mongo(&db);
        let services = Services::new(&repos, jwt_config, config.import_max_rows);

        seed_super_admin(services.auth.as_ref()).await;
        let router = build_router(&services, &config);
        Ok(App { config, router })
    }

    pub async fn start(self) -> Result<(), BoxError> {
        let addr = SocketAddr::new(self.config.host.parse()?, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Server running at http://{}", addr);
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

async fn seed_super_admin(auth: &dyn AuthService) {
    let config = match SuperAdminConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Super admin not seeded: {}", e);
            return;
        }
    };
    match auth.seed_super_admin(&config).await {
        Ok(true) => info!("Super admin {} created", config.email),
        Ok(false) => {}
        Err(e) => error!("Failed to seed super admin: {}", e),
    }
}
