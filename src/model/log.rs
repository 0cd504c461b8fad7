use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Create,
    Update,
    Delete,
    Import,
    Generate,
    Login,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Create => "create",
            LogAction::Update => "update",
            LogAction::Delete => "delete",
            LogAction::Import => "import",
            LogAction::Generate => "generate",
            LogAction::Login => "login",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(LogAction::Create),
            "update" => Ok(LogAction::Update),
            "delete" => Ok(LogAction::Delete),
            "import" => Ok(LogAction::Import),
            "generate" => Ok(LogAction::Generate),
            "login" => Ok(LogAction::Login),
            other => Err(format!("Unknown log action: {}", other)),
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub action: LogAction,
    pub message: String,
    pub user_id: ObjectId,
    pub school_id: Option<ObjectId>,
    pub student_id: Option<ObjectId>,
    pub document_id: Option<ObjectId>,
    pub created_at: Option<String>,
}
