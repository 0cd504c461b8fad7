use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use mongodb::{Collection, Database};

use crate::model::{log::{Log, LogAction}, timestamp};
use crate::repository::mongo::{find_page, scope_clause, LOGS};
use crate::repository::repository_error::RepositoryResult;
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub school_ids: Option<Vec<ObjectId>>,
    pub user_id: Option<ObjectId>,
    pub action: Option<LogAction>,
}

/// Append-only store: there is no update or delete
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn insert(&self, log: Log) -> RepositoryResult<Log>;
    async fn list(&self, filter: &LogFilter, page: PageRequest) -> RepositoryResult<(Vec<Log>, u64)>;
}

pub struct MongoLogRepository {
    collection: Collection<Log>,
}

impl MongoLogRepository {
    pub fn new(db: &Database) -> Self {
        MongoLogRepository { collection: db.collection::<Log>(LOGS) }
    }
}

fn filter_document(filter: &LogFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "school_id", &filter.school_ids);
    if let Some(user_id) = filter.user_id {
        query.insert("user_id", user_id);
    }
    if let Some(action) = filter.action {
        query.insert("action", action.as_str());
    }
    query
}

#[async_trait]
impl LogRepository for MongoLogRepository {
    async fn insert(&self, mut log: Log) -> RepositoryResult<Log> {
        log.id = Some(ObjectId::new());
        log.created_at = Some(timestamp());
        self.collection.insert_one(log.clone(), None).await?;
        Ok(log)
    }

    async fn list(&self, filter: &LogFilter, page: PageRequest) -> RepositoryResult<(Vec<Log>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }
}
