use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::{get, post, put}, Router};

use crate::handler::student_handler::{
    create_student_handler, delete_student_handler, get_student_handler, import_students_handler,
    list_students_handler, update_student_handler,
};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::student_service::StudentService;

pub fn student_router(service: Arc<dyn StudentService>, auth: AuthState, import_max_bytes: usize) -> Router {
    let read = Router::new()
        .route("/students", get(list_students_handler))
        .route("/students/{id}", get(get_student_handler));

    let write = Router::new()
        .route("/students", post(create_student_handler))
        .route("/students/{id}", put(update_student_handler).delete(delete_student_handler))
        .route(
            "/students/import",
            post(import_students_handler).layer(DefaultBodyLimit::max(import_max_bytes)),
        );

    guarded(read, &auth, &Role::ALL)
        .merge(guarded(write, &auth, &Role::MANAGERS))
        .with_state(service)
}
