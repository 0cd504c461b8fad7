use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::{user::{Role, User}, timestamp};
use crate::repository::mongo::{contains_ci, find_page, scope_clause, USERS};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// `None` means users of every school, school-less ones included
    pub school_ids: Option<Vec<ObjectId>>,
    pub role: Option<Role>,
    /// Matches name or email
    pub search: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> RepositoryResult<(Vec<User>, u64)>;
    async fn update(&self, user: User) -> RepositoryResult<User>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        MongoUserRepository { collection: db.collection::<User>(USERS) }
    }
}

fn filter_document(filter: &UserFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "school_id", &filter.school_ids);
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert("$or", vec![doc! { "name": contains_ci(search) }, doc! { "email": contains_ci(search) }]);
    }
    query
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[tracing::instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id = Some(ObjectId::new());
        user.email = user.email.trim().to_lowercase();
        let now = timestamp();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);

        self.collection.insert_one(user.clone(), None).await.map_err(|e| {
            error!("Failed to insert user: {}", e);
            RepositoryError::from(e)
        })?;
        info!("User created");
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let filter = doc! { "email": email.trim().to_lowercase() };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> RepositoryResult<(Vec<User>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }

    #[tracing::instrument(skip(self, user), fields(id = ?user.id))]
    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        let id = user.id.ok_or_else(|| RepositoryError::validation("User has no id"))?;
        user.email = user.email.trim().to_lowercase();
        let mut fields = bson::to_document(&user)?;
        fields.remove("_id");

        let result = self.collection.update_one(doc! { "_id": id }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No user found to update for ID: {}", id)));
        }
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("User not found for ID: {}", id)));
        }
        info!("User deleted");
        Ok(())
    }
}
