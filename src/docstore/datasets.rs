/// Dataset collection operations
use crate::docstore::models::{Dataset, DatasetState, DatasetUpdate, NewDataset};
use crate::docstore::DocumentStore;
use crate::error::{HiveError, HiveResult};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

impl DocumentStore {
    /// Insert a new dataset in the `pending` state
    pub async fn create_dataset(&self, new_dataset: &NewDataset) -> HiveResult<Dataset> {
        new_dataset
            .validate()
            .map_err(|e| HiveError::Validation(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let file_refs_json = serde_json::to_string(&new_dataset.file_refs)
            .map_err(|e| HiveError::Internal(format!("Failed to encode file refs: {}", e)))?;

        sqlx::query(
            "INSERT INTO datasets (id, name, description, created_at, state, size_mb, download_count, owner_id, image_ref, video_ref, file_refs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)",
        )
        .bind(&id)
        .bind(&new_dataset.name)
        .bind(&new_dataset.description)
        .bind(created_at)
        .bind(DatasetState::Pending)
        .bind(new_dataset.size_mb)
        .bind(&new_dataset.owner_id)
        .bind(&new_dataset.image_ref)
        .bind(&new_dataset.video_ref)
        .bind(&file_refs_json)
        .execute(&self.pool)
        .await?;

        Ok(Dataset {
            id,
            name: new_dataset.name.clone(),
            description: new_dataset.description.clone(),
            created_at,
            state: DatasetState::Pending,
            size_mb: new_dataset.size_mb,
            download_count: 0,
            owner_id: new_dataset.owner_id.clone(),
            image_ref: new_dataset.image_ref.clone(),
            video_ref: new_dataset.video_ref.clone(),
            file_refs: new_dataset.file_refs.clone(),
        })
    }

    pub async fn get_dataset(&self, id: &str) -> HiveResult<Option<Dataset>> {
        let dataset = sqlx::query_as::<_, Dataset>("SELECT * FROM datasets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(dataset)
    }

    pub async fn list_datasets(&self) -> HiveResult<Vec<Dataset>> {
        let datasets =
            sqlx::query_as::<_, Dataset>("SELECT * FROM datasets ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(datasets)
    }

    pub async fn list_approved_datasets(&self) -> HiveResult<Vec<Dataset>> {
        let datasets = sqlx::query_as::<_, Dataset>(
            "SELECT * FROM datasets WHERE state = ?1 ORDER BY created_at DESC",
        )
        .bind(DatasetState::Approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(datasets)
    }

    pub async fn list_datasets_by_owner(&self, owner_id: &str) -> HiveResult<Vec<Dataset>> {
        let datasets = sqlx::query_as::<_, Dataset>(
            "SELECT * FROM datasets WHERE owner_id = ?1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(datasets)
    }

    /// Apply a partial content update and return the updated document.
    /// `owner_id` is immutable and has no update path.
    pub async fn update_dataset(&self, id: &str, update: &DatasetUpdate) -> HiveResult<Dataset> {
        update
            .validate()
            .map_err(|e| HiveError::Validation(e.to_string()))?;

        let file_refs_json = match &update.file_refs {
            Some(refs) => Some(
                serde_json::to_string(refs)
                    .map_err(|e| HiveError::Internal(format!("Failed to encode file refs: {}", e)))?,
            ),
            None => None,
        };

        let result = sqlx::query(
            "UPDATE datasets SET
                 name = COALESCE(?1, name),
                 description = COALESCE(?2, description),
                 size_mb = COALESCE(?3, size_mb),
                 image_ref = COALESCE(?4, image_ref),
                 video_ref = COALESCE(?5, video_ref),
                 file_refs = COALESCE(?6, file_refs)
             WHERE id = ?7",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.size_mb)
        .bind(&update.image_ref)
        .bind(&update.video_ref)
        .bind(&file_refs_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::NotFound(format!("Dataset {} not found", id)));
        }

        self.get_dataset(id)
            .await?
            .ok_or_else(|| HiveError::NotFound(format!("Dataset {} not found", id)))
    }

    /// Unconditional state overwrite; repeating a transition is a no-op
    pub async fn update_dataset_state(&self, id: &str, state: DatasetState) -> HiveResult<()> {
        let result = sqlx::query("UPDATE datasets SET state = ?1 WHERE id = ?2")
            .bind(state)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::NotFound(format!("Dataset {} not found", id)));
        }

        Ok(())
    }

    /// Monotonic download counter; the only mutation path for the field
    pub async fn increment_downloads(&self, id: &str) -> HiveResult<i64> {
        let result =
            sqlx::query("UPDATE datasets SET download_count = download_count + 1 WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::NotFound(format!("Dataset {} not found", id)));
        }

        let count: i64 = sqlx::query_scalar("SELECT download_count FROM datasets WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
