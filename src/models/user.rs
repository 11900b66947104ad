use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserType {
    Driver,
    Rider,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Driver => "driver",
            UserType::Rider => "rider",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub user_type: UserType,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
