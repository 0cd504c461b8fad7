use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::{hex_id, hex_opt};
use crate::model::class::SchoolClass;
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    pub school_id: String,
    pub teacher_id: Option<String>,
}

/// Partial update; an empty `teacherId` unassigns the teacher
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassListQuery {
    pub school_id: Option<String>,
    pub teacher_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ClassListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassResponse {
    pub id: String,
    pub name: String,
    pub section: Option<String>,
    pub display_name: String,
    pub school_id: String,
    pub teacher_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<SchoolClass> for ClassResponse {
    fn from(class: SchoolClass) -> Self {
        ClassResponse {
            id: hex_id(&class.id),
            display_name: class.display_name(),
            school_id: class.school_id.to_hex(),
            teacher_id: hex_opt(&class.teacher_id),
            name: class.name,
            section: class.section,
            created_at: class.created_at,
            updated_at: class.updated_at,
        }
    }
}
