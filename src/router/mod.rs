pub mod auth_router;
pub mod certificate_router;
pub mod class_router;
pub mod log_router;
pub mod school_router;
pub mod student_router;
pub mod user_router;

use axum::{middleware, Router};

use crate::middlewares::auth_middleware::{require_auth, AuthState};
use crate::middlewares::role_guard::require_roles;
use crate::model::user::Role;

/// Puts every route of `router` behind authentication and the `roles` guard
pub(crate) fn guarded<S>(router: Router<S>, auth: &AuthState, roles: &'static [Role]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // last layer added runs first: authenticate, then check the role
    router
        .route_layer(middleware::from_fn_with_state(roles, require_roles))
        .route_layer(middleware::from_fn_with_state(auth.clone(), require_auth))
}
