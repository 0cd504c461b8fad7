pub mod certificate_repo;
pub mod class_repo;
pub mod log_repo;
pub mod mongo;
pub mod repository_error;
pub mod school_repo;
pub mod student_repo;
pub mod user_repo;
