pub mod auth_middleware;
pub mod role_guard;
