pub mod certificate;
pub mod class;
pub mod log;
pub mod school;
pub mod student;
pub mod user;

/// RFC 3339 timestamp stored in `created_at` / `updated_at`
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
