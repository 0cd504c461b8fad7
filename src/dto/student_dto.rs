use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::{hex_id, hex_opt};
use crate::model::student::Student;
use crate::util::csv_import::RowError;
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 50))]
    pub admission_number: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[validate(length(max = 100))]
    pub guardian_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub school_id: String,
    pub class_id: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

/// Partial update; an empty `classId` removes the student from its class
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub admission_number: Option<String>,
    pub date_of_birth: Option<String>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[validate(length(max = 100))]
    pub guardian_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub class_id: Option<String>,
    pub custom_fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListQuery {
    pub school_id: Option<String>,
    pub class_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl StudentListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub admission_number: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub guardian_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub school_id: String,
    pub class_id: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        StudentResponse {
            id: hex_id(&student.id),
            school_id: student.school_id.to_hex(),
            class_id: hex_opt(&student.class_id),
            first_name: student.first_name,
            last_name: student.last_name,
            admission_number: student.admission_number,
            date_of_birth: student.date_of_birth,
            gender: student.gender,
            guardian_name: student.guardian_name,
            phone: student.phone,
            address: student.address,
            custom_fields: student.custom_fields,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

/// Outcome of a CSV bulk import
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}
