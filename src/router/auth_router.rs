use std::sync::Arc;

use axum::{routing::{get, post}, Router};

use crate::handler::auth_handler::{change_password_handler, login_handler, me_handler, refresh_token_handler};
use crate::middlewares::auth_middleware::AuthState;
use crate::model::user::Role;
use crate::router::guarded;
use crate::service::auth_service::AuthService;

pub fn auth_router(service: Arc<dyn AuthService>, auth: AuthState) -> Router {
    let public = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_token_handler));

    let authenticated = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/auth/change-password", post(change_password_handler));

    public
        .merge(guarded(authenticated, &auth, &Role::ALL))
        .with_state(service)
}
