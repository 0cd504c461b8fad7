pub mod auth_handler;
pub mod certificate_handler;
pub mod class_handler;
pub mod extract;
pub mod log_handler;
pub mod school_handler;
pub mod student_handler;
pub mod user_handler;
