use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::store::{decode_rows, RemoteStore, StoreError};

/// Typed view over a raw `users` row. Timestamps are store-formatted strings
/// passed through opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub phone: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

impl User {
    async fn find_one(
        store: &RemoteStore,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, StoreError> {
        let rows = store.select("users", "*", &[(column, value)], None).await?;
        Ok(decode_rows(rows)?.into_iter().next())
    }

    pub async fn find_by_id(store: &RemoteStore, id: &str) -> Result<Option<User>, StoreError> {
        Self::find_one(store, "id", id).await
    }

    pub async fn find_by_username(
        store: &RemoteStore,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        Self::find_one(store, "username", username).await
    }

    pub async fn find_by_email(
        store: &RemoteStore,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Self::find_one(store, "email", email).await
    }

    pub async fn find_by_phone(
        store: &RemoteStore,
        phone: &str,
    ) -> Result<Option<User>, StoreError> {
        Self::find_one(store, "phone", phone).await
    }

    /// Insert a new user row. The id is store-assigned and comes back in the
    /// returned representation.
    pub async fn create(store: &RemoteStore, new: NewUser) -> Result<User, StoreError> {
        let now = now_rfc3339();
        let rows = json!([{
            "username": new.username,
            "email": new.email,
            "phone": new.phone,
            "full_name": new.full_name,
            "hashed_password": new.hashed_password,
            "is_active": true,
            "is_superuser": false,
            "created_at": now,
            "updated_at": now,
        }]);
        let inserted = store.insert("users", &rows).await?;
        decode_rows(inserted)?.into_iter().next().ok_or(StoreError::NoRows)
    }
}

#[cfg(test)]
pub(crate) fn user_row(id: &str, username: &str) -> serde_json::Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "hashed_password": "$argon2id$stub",
        "full_name": null,
        "phone": "555-0100",
        "is_active": true,
        "is_superuser": false,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    })
}
