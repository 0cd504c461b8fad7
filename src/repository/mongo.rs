//! Shared MongoDB plumbing: client construction, indexes and paged finds.

use bson::{doc, Document};
use futures::stream::TryStreamExt;
use mongodb::{
    options::{Collation, CollationStrength, ClientOptions, Credential, FindOptions, IndexOptions, ResolverConfig},
    Client, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::config::MongoConfig;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::pagination::PageRequest;

pub const SCHOOLS: &str = "schools";
pub const USERS: &str = "users";
pub const STUDENTS: &str = "students";
pub const CLASSES: &str = "classes";
pub const CERTIFICATES: &str = "certificates";
pub const LOGS: &str = "logs";

/// Opens the pooled client shared by every repository
pub async fn connect(config: &MongoConfig) -> RepositoryResult<Database> {
    let mut client_options = ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare())
        .await
        .map_err(|e| RepositoryError::connection(format!("Invalid MongoDB URI: {}", e)))?;
    client_options.app_name = Some("SchoolBackend".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }

    let client = Client::with_options(client_options)?;
    let db = client.database(&config.database);
    db.run_command(doc! { "ping": 1 }, None).await.map_err(|e| {
        error!("MongoDB ping failed: {}", e);
        RepositoryError::connection(format!("MongoDB is unreachable: {}", e))
    })?;
    info!(database = %config.database, "Connected to MongoDB");
    Ok(db)
}

/// Index definitions per collection. The per-school name checks compare
/// case-insensitively, so their unique indexes use a strength-2 collation.
pub fn index_models() -> Vec<(&'static str, IndexModel)> {
    let unique = || IndexOptions::builder().unique(true).build();
    let unique_ci = || {
        let collation = Collation::builder().locale("en").strength(CollationStrength::Secondary).build();
        IndexOptions::builder().unique(true).collation(collation).build()
    };

    vec![
        (USERS, IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build()),
        (SCHOOLS, IndexModel::builder().keys(doc! { "name": 1, "admin_id": 1 }).options(unique()).build()),
        (
            STUDENTS,
            IndexModel::builder().keys(doc! { "school_id": 1, "admission_number": 1 }).options(unique_ci()).build(),
        ),
        (STUDENTS, IndexModel::builder().keys(doc! { "school_id": 1, "class_id": 1 }).build()),
        (
            CLASSES,
            IndexModel::builder().keys(doc! { "school_id": 1, "name": 1, "section": 1 }).options(unique_ci()).build(),
        ),
        (CERTIFICATES, IndexModel::builder().keys(doc! { "school_id": 1, "name": 1 }).options(unique_ci()).build()),
        (LOGS, IndexModel::builder().keys(doc! { "school_id": 1, "created_at": -1 }).build()),
    ]
}

pub async fn ensure_indexes(db: &Database) -> RepositoryResult<()> {
    for (collection, model) in index_models() {
        db.collection::<Document>(collection).create_index(model, None).await?;
    }
    info!("MongoDB indexes ensured");
    Ok(())
}

/// Case-insensitive "contains" match on user input
pub fn contains_ci(term: &str) -> Document {
    doc! { "$regex": escape_regex(term.trim()), "$options": "i" }
}

/// Case-insensitive exact match, used by the per-school duplicate checks
pub fn equals_ci(term: &str) -> Document {
    doc! { "$regex": format!("^{}$", escape_regex(term.trim())), "$options": "i" }
}

fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Runs `filter` newest first, returning one page and the total match count
pub async fn find_page<T>(
    collection: &Collection<T>,
    filter: Document,
    page: PageRequest,
) -> RepositoryResult<(Vec<T>, u64)>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone(), None).await?;
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .skip(page.skip())
        .limit(page.limit as i64)
        .build();
    let cursor = collection.find(filter, options).await?;
    let items: Vec<T> = cursor.try_collect().await?;
    Ok((items, total))
}

/// `{ field: { $in: ids } }` when the scope is restricted
pub fn scope_clause(filter: &mut Document, field: &str, ids: &Option<Vec<bson::oid::ObjectId>>) {
    if let Some(ids) = ids {
        filter.insert(field, doc! { "$in": ids.clone() });
    }
}
