use std::sync::Arc;

use axum::{routing::{get, post, put}, Router};

use crate::handler::certificate_handler::{
    create_certificate_handler, delete_certificate_handler, generate_certificate_handler, get_certificate_handler,
    list_certificates_handler, update_certificate_handler,
};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::certificate_service::CertificateService;

pub fn certificate_router(service: Arc<dyn CertificateService>, auth: AuthState) -> Router {
    let read = Router::new()
        .route("/certificates", get(list_certificates_handler))
        .route("/certificates/{id}", get(get_certificate_handler))
        .route("/certificates/{id}/generate/{student_id}", get(generate_certificate_handler));

    let write = Router::new()
        .route("/certificates", post(create_certificate_handler))
        .route("/certificates/{id}", put(update_certificate_handler).delete(delete_certificate_handler));

    guarded(read, &auth, &Role::ALL)
        .merge(guarded(write, &auth, &Role::MANAGERS))
        .with_state(service)
}
