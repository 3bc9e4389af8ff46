/// User collection operations
use crate::docstore::models::{NewUser, Role, UserRecord, UserUpdate};
use crate::docstore::DocumentStore;
use crate::error::{HiveError, HiveResult};
use uuid::Uuid;
use validator::Validate;

impl DocumentStore {
    /// Insert a new user, enforcing username/email uniqueness.
    ///
    /// Email comparison is case-insensitive: addresses are stored lowercased.
    pub async fn create_user(&self, new_user: &NewUser) -> HiveResult<UserRecord> {
        new_user
            .validate()
            .map_err(|e| HiveError::Validation(e.to_string()))?;

        let email = new_user.email.to_lowercase();

        if self.username_exists(&new_user.username, None).await? {
            return Err(HiveError::Conflict(format!(
                "Username {} already taken",
                new_user.username
            )));
        }
        if self.email_exists(&email, None).await? {
            return Err(HiveError::Conflict("Email already registered".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, password_salt, birth_date, role, avatar_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(&new_user.username)
        .bind(&email)
        .bind(&new_user.full_name)
        .bind(&new_user.password_hash)
        .bind(&new_user.password_salt)
        .bind(new_user.birth_date)
        .bind(Role::User)
        .bind(&new_user.avatar_ref)
        .execute(&self.pool)
        .await?;

        Ok(UserRecord {
            id,
            username: new_user.username.clone(),
            email,
            full_name: new_user.full_name.clone(),
            password_hash: new_user.password_hash.clone(),
            password_salt: new_user.password_salt.clone(),
            birth_date: new_user.birth_date,
            role: Role::User,
            avatar_ref: new_user.avatar_ref.clone(),
        })
    }

    pub async fn get_user(&self, id: &str) -> HiveResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn get_user_by_email(&self, email: &str) -> HiveResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn get_user_by_username(&self, username: &str) -> HiveResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Batch lookup preserving no particular order
    pub async fn get_users_by_ids(&self, ids: &[String]) -> HiveResult<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM users WHERE id IN ({})", placeholders);

        let mut query = sqlx::query_as::<_, UserRecord>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn list_users(&self, exclude: Option<&str>) -> HiveResult<Vec<UserRecord>> {
        let records = match exclude {
            Some(id) => {
                sqlx::query_as::<_, UserRecord>(
                    "SELECT * FROM users WHERE id != ?1 ORDER BY username",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY username")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(records)
    }

    /// Case-insensitive substring search over username and full name
    pub async fn search_users(&self, query: &str) -> HiveResult<Vec<UserRecord>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users
             WHERE LOWER(username) LIKE ?1 OR LOWER(full_name) LIKE ?1
             ORDER BY username",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Apply a partial profile update and return the updated record
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> HiveResult<UserRecord> {
        update
            .validate()
            .map_err(|e| HiveError::Validation(e.to_string()))?;

        if let Some(ref username) = update.username {
            if self.username_exists(username, Some(id)).await? {
                return Err(HiveError::Conflict(format!(
                    "Username {} already taken",
                    username
                )));
            }
        }

        let email = update.email.as_ref().map(|e| e.to_lowercase());
        if let Some(ref email) = email {
            if self.email_exists(email, Some(id)).await? {
                return Err(HiveError::Conflict("Email already registered".to_string()));
            }
        }

        let result = sqlx::query(
            "UPDATE users SET
                 username = COALESCE(?1, username),
                 email = COALESCE(?2, email),
                 full_name = COALESCE(?3, full_name),
                 birth_date = COALESCE(?4, birth_date),
                 avatar_ref = COALESCE(?5, avatar_ref)
             WHERE id = ?6",
        )
        .bind(&update.username)
        .bind(&email)
        .bind(&update.full_name)
        .bind(update.birth_date)
        .bind(&update.avatar_ref)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| HiveError::NotFound(format!("User {} not found", id)))
    }

    pub async fn update_user_role(&self, id: &str, role: Role) -> HiveResult<()> {
        let result = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    async fn username_exists(&self, username: &str, exclude_id: Option<&str>) -> HiveResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2")
                    .bind(username)
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
                    .bind(username)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<&str>) -> HiveResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2")
                    .bind(email)
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count > 0)
    }
}
