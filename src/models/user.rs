use serde::{Deserialize, Serialize};

/// A student/mentee account. API tokens are stored hashed; deactivated
/// accounts keep their rows but cannot start new purchases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub contact: Option<String>,
    pub active: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
}
