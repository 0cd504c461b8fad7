use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::model::user::AuthUser;
use crate::service::auth_service::AuthService;
use crate::util::error::HandlerError;
use crate::util::jwt::extract_token_from_header;

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<dyn AuthService>,
}

fn bearer_token(req: &Request<Body>) -> Result<&str, HandlerError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::unauthorized("Missing authorization header"))?;
    extract_token_from_header(header).map_err(|_| HandlerError::unauthorized("Invalid authorization header"))
}

/// Authenticates the bearer token and stores the actor in request extensions
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let token = bearer_token(&req)?;
    let actor = state.auth_service.authenticate(token).await?;
    debug!(actor = %actor.id, role = %actor.role, "Request authenticated");

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| HandlerError::unauthorized("Authentication required"))
    }
}
