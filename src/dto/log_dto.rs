use serde::{Deserialize, Serialize};

use crate::dto::{hex_id, hex_opt};
use crate::model::log::{Log, LogAction};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListQuery {
    pub school_id: Option<String>,
    pub user_id: Option<String>,
    pub action: Option<LogAction>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl LogListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub id: String,
    pub action: LogAction,
    pub message: String,
    pub user_id: String,
    pub school_id: Option<String>,
    pub student_id: Option<String>,
    pub document_id: Option<String>,
    pub created_at: Option<String>,
}

impl From<Log> for LogResponse {
    fn from(log: Log) -> Self {
        LogResponse {
            id: hex_id(&log.id),
            user_id: log.user_id.to_hex(),
            school_id: hex_opt(&log.school_id),
            student_id: hex_opt(&log.student_id),
            document_id: hex_opt(&log.document_id),
            action: log.action,
            message: log.message,
            created_at: log.created_at,
        }
    }
}
