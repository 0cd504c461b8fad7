use std::sync::Arc;

use axum::{routing::{get, post, put}, Router};

use crate::handler::class_handler::{
    create_class_handler, delete_class_handler, get_class_handler, list_classes_handler, update_class_handler,
};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::class_service::ClassService;

pub fn class_router(service: Arc<dyn ClassService>, auth: AuthState) -> Router {
    let read = Router::new()
        .route("/classes", get(list_classes_handler))
        .route("/classes/{id}", get(get_class_handler));

    let write = Router::new()
        .route("/classes", post(create_class_handler))
        .route("/classes/{id}", put(update_class_handler).delete(delete_class_handler));

    guarded(read, &auth, &Role::ALL)
        .merge(guarded(write, &auth, &Role::MANAGERS))
        .with_state(service)
}
