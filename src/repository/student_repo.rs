use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::{student::Student, timestamp};
use crate::repository::mongo::{contains_ci, equals_ci, find_page, scope_clause, STUDENTS};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub school_ids: Option<Vec<ObjectId>>,
    pub class_id: Option<ObjectId>,
    /// Matches first name, last name or admission number
    pub search: Option<String>,
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn insert(&self, student: Student) -> RepositoryResult<Student>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Student>>;
    async fn find_by_admission_number(&self, school_id: &ObjectId, admission_number: &str) -> RepositoryResult<Option<Student>>;
    async fn list(&self, filter: &StudentFilter, page: PageRequest) -> RepositoryResult<(Vec<Student>, u64)>;
    async fn count_in_class(&self, class_id: &ObjectId) -> RepositoryResult<u64>;
    async fn update(&self, student: Student) -> RepositoryResult<Student>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoStudentRepository {
    collection: Collection<Student>,
}

impl MongoStudentRepository {
    pub fn new(db: &Database) -> Self {
        MongoStudentRepository { collection: db.collection::<Student>(STUDENTS) }
    }
}

fn filter_document(filter: &StudentFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "school_id", &filter.school_ids);
    if let Some(class_id) = filter.class_id {
        query.insert("class_id", class_id);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert(
            "$or",
            vec![
                doc! { "first_name": contains_ci(search) },
                doc! { "last_name": contains_ci(search) },
                doc! { "admission_number": contains_ci(search) },
            ],
        );
    }
    query
}

#[async_trait]
impl StudentRepository for MongoStudentRepository {
    #[tracing::instrument(skip(self, student), fields(admission_number = %student.admission_number))]
    async fn insert(&self, mut student: Student) -> RepositoryResult<Student> {
        student.id = Some(ObjectId::new());
        let now = timestamp();
        student.created_at = Some(now.clone());
        student.updated_at = Some(now);

        self.collection.insert_one(student.clone(), None).await.map_err(|e| {
            error!("Failed to insert student: {}", e);
            RepositoryError::from(e)
        })?;
        Ok(student)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Student>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_admission_number(&self, school_id: &ObjectId, admission_number: &str) -> RepositoryResult<Option<Student>> {
        let filter = doc! { "school_id": school_id, "admission_number": equals_ci(admission_number) };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn list(&self, filter: &StudentFilter, page: PageRequest) -> RepositoryResult<(Vec<Student>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }

    async fn count_in_class(&self, class_id: &ObjectId) -> RepositoryResult<u64> {
        Ok(self.collection.count_documents(doc! { "class_id": class_id }, None).await?)
    }

    #[tracing::instrument(skip(self, student), fields(id = ?student.id))]
    async fn update(&self, student: Student) -> RepositoryResult<Student> {
        let id = student.id.ok_or_else(|| RepositoryError::validation("Student has no id"))?;
        let mut fields = bson::to_document(&student)?;
        fields.remove("_id");

        let result = self.collection.update_one(doc! { "_id": id }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No student found to update for ID: {}", id)));
        }
        Ok(student)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("Student not found for ID: {}", id)));
        }
        info!("Student deleted");
        Ok(())
    }
}
