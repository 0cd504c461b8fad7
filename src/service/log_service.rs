use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{instrument, warn};

use crate::dto::log_dto::{LogListQuery, LogResponse};
use crate::model::log::{Log, LogAction};
use crate::model::user::AuthUser;
use crate::repository::log_repo::{LogFilter, LogRepository};
use crate::service::access::AccessControl;
use crate::util::error::{parse_optional_object_id, ServiceError};
use crate::util::pagination::Paginated;

/// An audit record about to be written
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub action: LogAction,
    pub message: String,
    pub user_id: ObjectId,
    pub school_id: Option<ObjectId>,
    pub student_id: Option<ObjectId>,
    pub document_id: Option<ObjectId>,
}

impl LogEntry {
    pub fn new(user_id: ObjectId, action: LogAction, message: impl Into<String>) -> Self {
        LogEntry { action, message: message.into(), user_id, school_id: None, student_id: None, document_id: None }
    }

    pub fn school(mut self, school_id: Option<ObjectId>) -> Self {
        self.school_id = school_id;
        self
    }

    pub fn student(mut self, student_id: Option<ObjectId>) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn document(mut self, document_id: Option<ObjectId>) -> Self {
        self.document_id = document_id;
        self
    }
}

#[async_trait]
pub trait LogService: Send + Sync {
    /// Appends an audit record; failures are logged, never returned
    async fn record(&self, entry: LogEntry);
    async fn list(&self, actor: &AuthUser, query: LogListQuery) -> Result<Paginated<LogResponse>, ServiceError>;
}

pub struct LogServiceImpl {
    log_repo: Arc<dyn LogRepository>,
    access: Arc<AccessControl>,
}

impl LogServiceImpl {
    pub fn new(log_repo: Arc<dyn LogRepository>, access: Arc<AccessControl>) -> Self {
        LogServiceImpl { log_repo, access }
    }
}

#[async_trait]
impl LogService for LogServiceImpl {
    async fn record(&self, entry: LogEntry) {
        let action = entry.action;
        let log = Log {
            id: None,
            action: entry.action,
            message: entry.message,
            user_id: entry.user_id,
            school_id: entry.school_id,
            student_id: entry.student_id,
            document_id: entry.document_id,
            created_at: None,
        };
        if let Err(e) = self.log_repo.insert(log).await {
            warn!(action = %action, "Failed to write audit log: {}", e);
        }
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: LogListQuery) -> Result<Paginated<LogResponse>, ServiceError> {
        let requested = parse_optional_object_id(query.school_id.as_deref(), "school")?;
        let scope = self.access.visible_schools(actor).await?;
        let filter = LogFilter {
            school_ids: scope.narrow(requested)?,
            user_id: parse_optional_object_id(query.user_id.as_deref(), "user")?,
            action: query.action,
        };
        let page = query.page_request();
        let (logs, total) = self.log_repo.list(&filter, page).await?;
        Ok(Paginated::new(logs, total, page).map(LogResponse::from))
    }
}
