use std::sync::Arc;

use axum::{routing::{get, post, put}, Router};

use crate::handler::school_handler::{
    create_school_handler, delete_school_handler, get_school_handler, list_schools_handler, update_school_handler,
};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::school_service::SchoolService;

pub fn school_router(service: Arc<dyn SchoolService>, auth: AuthState) -> Router {
    let read = Router::new()
        .route("/schools", get(list_schools_handler))
        .route("/schools/{id}", get(get_school_handler));

    let write = Router::new()
        .route("/schools", post(create_school_handler))
        .route("/schools/{id}", put(update_school_handler).delete(delete_school_handler));

    guarded(read, &auth, &Role::ALL)
        .merge(guarded(write, &auth, &Role::SCHOOL_OWNERS))
        .with_state(service)
}
