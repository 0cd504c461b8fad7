use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handler::log_handler::list_logs_handler;
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::log_service::LogService;

pub fn log_router(service: Arc<dyn LogService>, auth: AuthState) -> Router {
    guarded(Router::new().route("/logs", get(list_logs_handler)), &auth, &Role::MANAGERS).with_state(service)
}
