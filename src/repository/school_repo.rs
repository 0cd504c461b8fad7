use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::stream::TryStreamExt;
use mongodb::{options::FindOptions, Collection, Database};
use tracing::{error, info};

use crate::model::{school::School, timestamp};
use crate::repository::mongo::{contains_ci, equals_ci, find_page, scope_clause, SCHOOLS};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct SchoolFilter {
    /// `None` means every school
    pub ids: Option<Vec<ObjectId>>,
    /// Matches the school name or principal name
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn insert(&self, school: School) -> RepositoryResult<School>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<School>>;
    async fn find_by_name(&self, admin_id: &ObjectId, name: &str) -> RepositoryResult<Option<School>>;
    async fn ids_for_admin(&self, admin_id: &ObjectId) -> RepositoryResult<Vec<ObjectId>>;
    async fn list(&self, filter: &SchoolFilter, page: PageRequest) -> RepositoryResult<(Vec<School>, u64)>;
    async fn update(&self, school: School) -> RepositoryResult<School>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
    /// Atomically shifts the denormalized counters
    async fn adjust_counters(&self, id: &ObjectId, students: i64, teachers: i64) -> RepositoryResult<()>;
}

pub struct MongoSchoolRepository {
    collection: Collection<School>,
}

impl MongoSchoolRepository {
    pub fn new(db: &Database) -> Self {
        MongoSchoolRepository { collection: db.collection::<School>(SCHOOLS) }
    }
}

fn filter_document(filter: &SchoolFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "_id", &filter.ids);
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert("$or", vec![doc! { "name": contains_ci(search) }, doc! { "principal_name": contains_ci(search) }]);
    }
    if let Some(is_active) = filter.is_active {
        query.insert("is_active", is_active);
    }
    query
}

#[async_trait]
impl SchoolRepository for MongoSchoolRepository {
    #[tracing::instrument(skip(self, school), fields(name = %school.name))]
    async fn insert(&self, mut school: School) -> RepositoryResult<School> {
        school.id = Some(ObjectId::new());
        let now = timestamp();
        school.created_at = Some(now.clone());
        school.updated_at = Some(now);

        self.collection.insert_one(school.clone(), None).await.map_err(|e| {
            error!("Failed to insert school: {}", e);
            RepositoryError::from(e)
        })?;
        info!("School created");
        Ok(school)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<School>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_name(&self, admin_id: &ObjectId, name: &str) -> RepositoryResult<Option<School>> {
        let filter = doc! {
            "admin_id": admin_id,
            "name": equals_ci(name),
        };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn ids_for_admin(&self, admin_id: &ObjectId) -> RepositoryResult<Vec<ObjectId>> {
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let cursor = self
            .collection
            .clone_with_type::<Document>()
            .find(doc! { "admin_id": admin_id }, options)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.iter().filter_map(|d| d.get_object_id("_id").ok()).collect())
    }

    async fn list(&self, filter: &SchoolFilter, page: PageRequest) -> RepositoryResult<(Vec<School>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }

    #[tracing::instrument(skip(self, school), fields(id = ?school.id))]
    async fn update(&self, school: School) -> RepositoryResult<School> {
        let id = school.id.ok_or_else(|| RepositoryError::validation("School has no id"))?;
        let mut fields = bson::to_document(&school)?;
        fields.remove("_id");
        // counters only move through adjust_counters
        fields.remove("total_students");
        fields.remove("total_teachers");

        let result = self.collection.update_one(doc! { "_id": id }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("School not found for ID: {}", id)));
        }
        self.find_by_id(&id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("School not found for ID: {}", id)))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("School not found for ID: {}", id)));
        }
        info!("School deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn adjust_counters(&self, id: &ObjectId, students: i64, teachers: i64) -> RepositoryResult<()> {
        let update = doc! {
            "$inc": { "total_students": students, "total_teachers": teachers },
            "$set": { "updated_at": timestamp() },
        };
        let result = self.collection.update_one(doc! { "_id": id }, update, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("School not found for ID: {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_document_scopes_and_searches() {
        let id = ObjectId::new();
        let filter = SchoolFilter { ids: Some(vec![id]), search: Some("hill".into()), is_active: Some(true) };
        let query = filter_document(&filter);
        assert_eq!(query.get_document("_id").unwrap(), &doc! { "$in": [id] });
        assert_eq!(query.get_array("$or").unwrap().len(), 2);
        assert!(query.get_bool("is_active").unwrap());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(filter_document(&SchoolFilter::default()).is_empty());
        let blank = SchoolFilter { search: Some("  ".into()), ..Default::default() };
        assert!(filter_document(&blank).is_empty());
    }
}
