use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub principal_name: String,
    /// Owning admin user
    pub admin_id: ObjectId,
    pub address: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub total_students: i64,
    pub total_teachers: i64,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
