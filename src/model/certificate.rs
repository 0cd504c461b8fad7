use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// HTML with `{{placeholder}}` slots
    pub template: String,
    pub school_id: ObjectId,
    pub created_by: ObjectId,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
