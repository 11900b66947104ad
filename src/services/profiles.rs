use chrono::Utc;
use serde::Deserialize;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{UserProfile, UserType},
};

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpsert {
    pub email: String,
    pub user_type: UserType,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// User profiles are written by the identity collaborator on sign-in and
/// read here to display names. The ride ledger only ever snapshots
/// rider_name/driver_name out of them, so later edits never rewrite history.
#[derive(Clone)]
pub struct ProfileService {
    db: DbPool,
}

impl ProfileService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Insert-or-update keyed on uid, preserving the original created_at.
    pub async fn upsert_profile(
        &self,
        uid: &str,
        upsert: ProfileUpsert,
    ) -> Result<UserProfile, AppError> {
        if uid.trim().is_empty() {
            return Err(AppError::Validation("uid must not be empty".into()));
        }

        let profile: UserProfile = sqlx::query_as(
            "INSERT INTO users (uid, email, user_type, name, phone, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (uid) DO UPDATE SET \
                 email = excluded.email, \
                 user_type = excluded.user_type, \
                 name = excluded.name, \
                 phone = excluded.phone \
             RETURNING *",
        )
        .bind(uid)
        .bind(&upsert.email)
        .bind(upsert.user_type)
        .bind(&upsert.name)
        .bind(&upsert.phone)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
        .map_err(AppError::Write)?;

        Ok(profile)
    }

    pub async fn fetch_profile(&self, uid: &str) -> Result<UserProfile, AppError> {
        sqlx::query_as("SELECT * FROM users WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Read)?
            .ok_or(AppError::NotFound)
    }

    /// Mode switch between the driver and rider apps.
    pub async fn set_user_type(
        &self,
        uid: &str,
        user_type: UserType,
    ) -> Result<UserProfile, AppError> {
        sqlx::query_as("UPDATE users SET user_type = ? WHERE uid = ? RETURNING *")
            .bind(user_type)
            .bind(uid)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Write)?
            .ok_or(AppError::NotFound)
    }
}
