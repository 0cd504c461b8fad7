use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::model::user::{AuthUser, Role};
use crate::util::error::HandlerError;

/// Lets the request through only when the authenticated actor has one of `roles`.
/// Must run inside `require_auth`.
pub async fn require_roles(
    State(roles): State<&'static [Role]>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let actor = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| HandlerError::unauthorized("Authentication required"))?;
    if !actor.has_any_role(roles) {
        warn!(actor = %actor.id, role = %actor.role, path = %req.uri().path(), "Role not allowed");
        return Err(HandlerError::forbidden("You do not have permission to perform this action"));
    }
    Ok(next.run(req).await)
}
