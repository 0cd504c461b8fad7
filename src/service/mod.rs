pub mod access;
pub mod auth_service;
pub mod certificate_service;
pub mod class_service;
pub mod log_service;
pub mod school_service;
pub mod student_service;
pub mod user_service;

/// Trims optional text, mapping blank input to `None`
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
