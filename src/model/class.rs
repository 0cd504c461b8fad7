use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A class (grade/section) inside a school
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub section: Option<String>,
    pub school_id: ObjectId,
    pub teacher_id: Option<ObjectId>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl SchoolClass {
    /// "Grade 5 - A" style label used in certificates
    pub fn display_name(&self) -> String {
        match &self.section {
            Some(section) if !section.is_empty() => format!("{} - {}", self.name, section),
            _ => self.name.clone(),
        }
    }
}
