use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::hex_id;
use crate::model::school::School;
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    #[validate(length(min = 2, max = 150))]
    pub name: String,
    #[validate(length(min = 2, max = 100))]
    pub principal_name: String,
    #[validate(length(min = 2, max = 300))]
    pub address: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(min = 6, max = 20))]
    pub contact_phone: Option<String>,
    /// Only honoured for super admins
    pub admin_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolRequest {
    #[validate(length(min = 2, max = 150))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub principal_name: Option<String>,
    #[validate(length(min = 2, max = 300))]
    pub address: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(min = 6, max = 20))]
    pub contact_phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl SchoolListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolResponse {
    pub id: String,
    pub name: String,
    pub principal_name: String,
    pub admin_id: String,
    pub address: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub total_students: i64,
    pub total_teachers: i64,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<School> for SchoolResponse {
    fn from(school: School) -> Self {
        SchoolResponse {
            id: hex_id(&school.id),
            admin_id: school.admin_id.to_hex(),
            name: school.name,
            principal_name: school.principal_name,
            address: school.address,
            contact_email: school.contact_email,
            contact_phone: school.contact_phone,
            total_students: school.total_students,
            total_teachers: school.total_teachers,
            is_active: school.is_active,
            created_at: school.created_at,
            updated_at: school.updated_at,
        }
    }
}
