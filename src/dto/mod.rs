pub mod auth_dto;
pub mod certificate_dto;
pub mod class_dto;
pub mod log_dto;
pub mod school_dto;
pub mod student_dto;
pub mod user_dto;

use bson::oid::ObjectId;

/// Hex form of a stored id; empty for documents that were never persisted
pub(crate) fn hex_id(id: &Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub(crate) fn hex_opt(id: &Option<ObjectId>) -> Option<String> {
    id.map(|id| id.to_hex())
}
