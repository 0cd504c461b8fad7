use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use tracing::{error, info};

use crate::model::{certificate::Certificate, timestamp};
use crate::repository::mongo::{contains_ci, equals_ci, find_page, scope_clause, CERTIFICATES};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    pub school_ids: Option<Vec<ObjectId>>,
    pub search: Option<String>,
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn insert(&self, certificate: Certificate) -> RepositoryResult<Certificate>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Certificate>>;
    async fn find_by_name(&self, school_id: &ObjectId, name: &str) -> RepositoryResult<Option<Certificate>>;
    async fn list(&self, filter: &CertificateFilter, page: PageRequest) -> RepositoryResult<(Vec<Certificate>, u64)>;
    async fn update(&self, certificate: Certificate) -> RepositoryResult<Certificate>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoCertificateRepository {
    collection: Collection<Certificate>,
}

impl MongoCertificateRepository {
    pub fn new(db: &Database) -> Self {
        MongoCertificateRepository { collection: db.collection::<Certificate>(CERTIFICATES) }
    }
}

fn filter_document(filter: &CertificateFilter) -> Document {
    let mut query = Document::new();
    scope_clause(&mut query, "school_id", &filter.school_ids);
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        query.insert("name", contains_ci(search));
    }
    query
}

#[async_trait]
impl CertificateRepository for MongoCertificateRepository {
    #[tracing::instrument(skip(self, certificate), fields(name = %certificate.name))]
    async fn insert(&self, mut certificate: Certificate) -> RepositoryResult<Certificate> {
        certificate.id = Some(ObjectId::new());
        let now = timestamp();
        certificate.created_at = Some(now.clone());
        certificate.updated_at = Some(now);

        self.collection.insert_one(certificate.clone(), None).await.map_err(|e| {
            error!("Failed to insert certificate: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Certificate created");
        Ok(certificate)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Certificate>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_name(&self, school_id: &ObjectId, name: &str) -> RepositoryResult<Option<Certificate>> {
        let filter = doc! { "school_id": school_id, "name": equals_ci(name) };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn list(&self, filter: &CertificateFilter, page: PageRequest) -> RepositoryResult<(Vec<Certificate>, u64)> {
        find_page(&self.collection, filter_document(filter), page).await
    }

    #[tracing::instrument(skip(self, certificate), fields(id = ?certificate.id))]
    async fn update(&self, certificate: Certificate) -> RepositoryResult<Certificate> {
        let id = certificate.id.ok_or_else(|| RepositoryError::validation("Certificate has no id"))?;
        let mut fields = bson::to_document(&certificate)?;
        fields.remove("_id");

        let result = self.collection.update_one(doc! { "_id": id }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No certificate found to update for ID: {}", id)));
        }
        Ok(certificate)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("Certificate not found for ID: {}", id)));
        }
        Ok(())
    }
}
