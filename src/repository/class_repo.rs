use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::{class::SchoolClass, timestamp};
use crate::repository::mongo::{contains_ci, equals_ci, find_page, scope_clause, CLASSES};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    pub school_ids: Option<Vec<ObjectId>>,
    pub teacher_id: Option<ObjectId>,
    pub search: Option<String>,
}

#[async_trait]
pub trait ClassRepository: Send + Sync {
    async fn insert(&self, class: SchoolClass) -> RepositoryResult<SchoolClass>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<SchoolClass>>;
    async fn find_by_name(&self, school_id: &ObjectId, name: &str, section: Option<&str>) -> RepositoryResult<Option<SchoolClass>>;
    async fn list(&self, filter: &ClassFilter, page: PageRequest) -> RepositoryResult<(Vec<SchoolClass>, u64)>;
    async fn update(&self, class: SchoolClass) -> RepositoryResult<SchoolClass>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoClassRepository {
    collection: Collection<SchoolClass>,
}

impl MongoClassRepository {
    pub fn new(db: &Database) -> Self {
        MongoClassRepository { collection: db.collection::<SchoolClass>(CLASSES) }
    }
}

fn filter_document(filter: &ClassFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "school_id", &filter.school_ids);
    if let Some(teacher_id) = filter.teacher_id {
        query.insert("teacher_id", teacher_id);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert("name", contains_ci(search));
    }
    query
}

#[async_trait]
impl ClassRepository for MongoClassRepository {
    #[tracing::instrument(skip(self, class), fields(name = %class.name))]
    async fn insert(&self, mut class: SchoolClass) -> RepositoryResult<SchoolClass> {
        class.id = Some(ObjectId::new());
        let now = timestamp();
        class.created_at = Some(now.clone());
        class.updated_at = Some(now);

        self.collection.insert_one(class.clone(), None).await.map_err(|e| {
            error!("Failed to insert class: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Class created");
        Ok(class)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<SchoolClass>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_name(&self, school_id: &ObjectId, name: &str, section: Option<&str>) -> RepositoryResult<Option<SchoolClass>> {
        let section = match section.map(str::trim).filter(|s| !s.is_empty()) {
            Some(section) => Bson::Document(equals_ci(section)),
            None => Bson::Null,
        };
        let filter = doc! { "school_id": school_id, "name": equals_ci(name), "section": section };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn list(&self, filter: &ClassFilter, page: PageRequest) -> RepositoryResult<(Vec<SchoolClass>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }

    #[tracing::instrument(skip(self, class), fields(id = ?class.id))]
    async fn update(&self, class: SchoolClass) -> RepositoryResult<SchoolClass> {
        let id = class.id.ok_or_else(|| RepositoryError::validation("Class has no id"))?;
        let mut fields = bson::to_document(&class)?;
        fields.remove("_id");

        let result = self.collection.update_one(doc! { "_id": id }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No class found to update for ID: {}", id)));
        }
        Ok(class)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("Class not found for ID: {}", id)));
        }
        Ok(())
    }
}
