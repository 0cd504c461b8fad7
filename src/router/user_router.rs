use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handler::user_handler::{
    create_user_handler, delete_user_handler, get_user_handler, list_users_handler, update_user_handler,
};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::user_service::UserService;

pub fn user_router(service: Arc<dyn UserService>, auth: AuthState) -> Router {
    let managers = Router::new()
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{id}",
            get(get_user_handler).put(update_user_handler).delete(delete_user_handler),
        );

    guarded(managers, &auth, &Role::MANAGERS).with_state(service)
}
