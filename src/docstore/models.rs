/// Document models for the `users` and `datasets` collections
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use validator::Validate;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Dataset moderation state
///
/// `pending -> approved` on admin approval, `approved <-> pending` on admin
/// toggle, any state `-> deactivated` by the owner. Transitions are
/// unconditional overwrites, so repeating one is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DatasetState {
    Pending,
    Approved,
    Deactivated,
}

/// Full user row, credentials included. Never leaves the repository layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub birth_date: NaiveDate,
    pub role: Role,
    pub avatar_ref: Option<String>,
}

/// Public user projection - what repository reads return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub role: Role,
    pub avatar_ref: Option<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            birth_date: record.birth_date,
            role: record.role,
            avatar_ref: record.avatar_ref,
        }
    }
}

/// Registration payload. Credentials arrive pre-hashed from the caller;
/// this core never sees a plaintext password at creation time.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewUser {
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 1))]
    pub password_hash: String,
    #[validate(length(min = 1))]
    pub password_salt: String,
    pub birth_date: NaiveDate,
    pub avatar_ref: Option<String>,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct UserUpdate {
    #[validate(length(min = 3, max = 30))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub avatar_ref: Option<String>,
}

/// Dataset document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub state: DatasetState,
    pub size_mb: f64,
    pub download_count: i64,
    pub owner_id: String,
    pub image_ref: Option<String>,
    pub video_ref: Option<String>,
    pub file_refs: Vec<String>,
}

// file_refs is stored as a JSON array in a TEXT column, so the row mapping
// is written out by hand.
impl<'r> FromRow<'r, SqliteRow> for Dataset {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let file_refs: Option<String> = row.try_get("file_refs")?;
        let file_refs = match file_refs {
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "file_refs".to_string(),
                    source: Box::new(e),
                })?
            }
            None => Vec::new(),
        };

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            state: row.try_get("state")?,
            size_mb: row.try_get("size_mb")?,
            download_count: row.try_get("download_count")?,
            owner_id: row.try_get("owner_id")?,
            image_ref: row.try_get("image_ref")?,
            video_ref: row.try_get("video_ref")?,
            file_refs,
        })
    }
}

/// Dataset creation payload
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewDataset {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub size_mb: f64,
    #[validate(length(min = 1))]
    pub owner_id: String,
    pub image_ref: Option<String>,
    pub video_ref: Option<String>,
    pub file_refs: Vec<String>,
}

/// Partial dataset update (owner-editable content only; state and
/// download_count have dedicated operations)
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct DatasetUpdate {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub size_mb: Option<f64>,
    pub image_ref: Option<String>,
    pub video_ref: Option<String>,
    pub file_refs: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_drops_credentials() {
        let record = UserRecord {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice".to_string(),
            password_hash: "hash".to_string(),
            password_salt: "salt".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            role: Role::User,
            avatar_ref: None,
        };

        let user = User::from(record);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
        assert!(!json.contains("salt"));
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_new_user_validation() {
        let mut new_user = NewUser {
            username: "al".to_string(),
            email: "not-an-email".to_string(),
            full_name: "Alice".to_string(),
            password_hash: "hash".to_string(),
            password_salt: "salt".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            avatar_ref: None,
        };
        assert!(validator::Validate::validate(&new_user).is_err());

        new_user.username = "alice".to_string();
        new_user.email = "alice@example.com".to_string();
        assert!(validator::Validate::validate(&new_user).is_ok());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DatasetState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
