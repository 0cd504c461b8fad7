use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::hex_id;
use crate::model::certificate::Certificate;
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200000))]
    pub template: String,
    pub school_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCertificateRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateListQuery {
    pub school_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl CertificateListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub id: String,
    pub name: String,
    pub template: String,
    pub school_id: String,
    pub created_by: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Certificate> for CertificateResponse {
    fn from(certificate: Certificate) -> Self {
        CertificateResponse {
            id: hex_id(&certificate.id),
            school_id: certificate.school_id.to_hex(),
            created_by: certificate.created_by.to_hex(),
            name: certificate.name,
            template: certificate.template,
            created_at: certificate.created_at,
            updated_at: certificate.updated_at,
        }
    }
}

/// A certificate rendered for one student
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCertificate {
    pub certificate_id: String,
    pub certificate_name: String,
    pub student_id: String,
    pub student_name: String,
    pub issued_on: String,
    pub html: String,
}
