//! Resume persistence, the collaborator the draft engine saves through.
//!
//! `ResumeStore` is carried in `AppState` as `Arc<dyn ResumeStore>`; the engine
//! only ever calls `upsert`. The Postgres implementation keeps photos in S3
//! behind the `PhotoStorage` trait.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::resume::ResumeRow;
use crate::resume::draft::{Attachment, Photo, ResumeDraft};

/// One save as sent by the draft engine.
///
/// `draft.photo` is `None` when the photo did not change since the last save;
/// the store must then leave the stored photo alone.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub record_id: Option<Uuid>,
    pub user_id: Uuid,
    pub draft: ResumeDraft,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Inserts when `record_id` is `None`, otherwise updates that record.
    async fn upsert(&self, request: SaveRequest) -> Result<ResumeRow, StoreError>;

    async fn get(&self, id: Uuid) -> Result<ResumeRow, StoreError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, StoreError>;

    async fn duplicate(&self, id: Uuid) -> Result<ResumeRow, StoreError>;

    async fn rename(&self, id: Uuid, title: &str) -> Result<ResumeRow, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<ResumeRow, StoreError>;
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Uploads the attachment and returns its public URL.
    async fn put(&self, attachment: &Attachment) -> Result<String, StoreError>;

    async fn delete(&self, url: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PhotoReferences: Send + Sync {
    /// Whether any stored resume still points at `url`.
    async fn is_photo_referenced(&self, url: &str) -> Result<bool, StoreError>;
}

/// Writes a resume row while moving its photo from `existing` to `requested`.
///
/// A new photo is uploaded before `write` runs, and the old object is released
/// only after the row stopped pointing at it. If the upload fails nothing
/// changes. If the write fails, the fresh upload is discarded and the old photo
/// stays in place.
pub async fn save_with_photo<F, Fut>(
    photos: &dyn PhotoStorage,
    references: &dyn PhotoReferences,
    requested: Option<&Photo>,
    existing: Option<&str>,
    write: F,
) -> Result<ResumeRow, StoreError>
where
    F: FnOnce(Option<String>) -> Fut,
    Fut: Future<Output = Result<ResumeRow, StoreError>>,
{
    let (photo_url, uploaded) = match requested {
        Some(Photo::Pending(attachment)) => {
            let url = photos.put(attachment).await?;
            (Some(url.clone()), Some(url))
        }
        Some(Photo::Removed) => (None, None),
        Some(Photo::Stored { .. }) | None => (existing.map(String::from), None),
    };

    let row = match write(photo_url.clone()).await {
        Ok(row) => row,
        Err(e) => {
            if let Some(url) = uploaded {
                if let Err(cleanup) = photos.delete(&url).await {
                    warn!("Could not discard photo {url} after failed save: {cleanup}");
                }
            }
            return Err(e);
        }
    };

    if let Some(old) = existing.filter(|old| photo_url.as_deref() != Some(*old)) {
        release_photo(photos, references, old).await;
    }
    Ok(row)
}

/// Deletes the object behind `url` unless another resume still uses it.
/// Duplicated resumes share photo objects. Failures are logged only, since
/// the rows are already consistent.
pub async fn release_photo(photos: &dyn PhotoStorage, references: &dyn PhotoReferences, url: &str) {
    match references.is_photo_referenced(url).await {
        Ok(true) => info!("Keeping photo {url}: still used by another resume"),
        Ok(false) => {
            if let Err(e) = photos.delete(url).await {
                warn!("Could not delete unused photo {url}: {e}");
            }
        }
        Err(e) => warn!("Could not check whether photo {url} is still used: {e}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgResumeStore {
    db: PgPool,
    photos: Arc<dyn PhotoStorage>,
}

impl PgResumeStore {
    pub fn new(db: PgPool, photos: Arc<dyn PhotoStorage>) -> Self {
        Self { db, photos }
    }

    /// Inserts (`existing_id` is `None`) or updates one resume row.
    async fn write_row(
        &self,
        user_id: Uuid,
        existing_id: Option<Uuid>,
        draft: &ResumeDraft,
        photo_url: Option<String>,
    ) -> Result<ResumeRow, StoreError> {
        let general_info = json!({
            "title": draft.title,
            "description": draft.description,
        });
        let personal_info = json!({
            "first_name": draft.first_name,
            "last_name": draft.last_name,
            "job_title": draft.job_title,
            "city": draft.city,
            "country": draft.country,
            "phone": draft.phone,
            "email": draft.email,
            "photo": photo_url,
        });
        let work_experiences = json!(draft.work_experience);
        let education = json!(draft.education);
        let summary = draft.summary.clone().unwrap_or_default();

        let query = match existing_id {
            Some(id) => sqlx::query_as::<_, ResumeRow>(
                r#"
                UPDATE resume
                SET photo_url = $2, general_info = $3, personal_info = $4,
                    work_experiences = $5, education = $6, skills = $7,
                    summary = $8, color = $9, border = $10, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id),
            None => sqlx::query_as::<_, ResumeRow>(
                r#"
                INSERT INTO resume
                    (user_id, photo_url, general_info, personal_info, work_experiences,
                     education, skills, summary, color, border)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(user_id),
        };

        Ok(query
            .bind(&photo_url)
            .bind(&general_info)
            .bind(&personal_info)
            .bind(&work_experiences)
            .bind(&education)
            .bind(&draft.skills)
            .bind(&summary)
            .bind(&draft.color_hex)
            .bind(&draft.border_style)
            .fetch_one(&self.db)
            .await?)
    }
}

#[async_trait]
impl PhotoReferences for PgResumeStore {
    async fn is_photo_referenced(&self, url: &str) -> Result<bool, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM resume WHERE photo_url = $1)")
                .bind(url)
                .fetch_one(&self.db)
                .await?,
        )
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn upsert(&self, request: SaveRequest) -> Result<ResumeRow, StoreError> {
        let draft = request.draft.normalized();

        let existing = match request.record_id {
            Some(id) => {
                let row = self.get(id).await?;
                if row.user_id != request.user_id {
                    return Err(StoreError::NotFound(format!("Resume {id}")));
                }
                Some(row)
            }
            None => None,
        };

        let existing_id = existing.as_ref().map(|row| row.id);
        let existing_photo = existing.and_then(|row| row.photo_url);

        let row = save_with_photo(
            self.photos.as_ref(),
            self,
            draft.photo.as_ref(),
            existing_photo.as_deref(),
            |photo_url| self.write_row(request.user_id, existing_id, &draft, photo_url),
        )
        .await?;

        info!("Saved resume {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resume WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, StoreError> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resume WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }

    async fn duplicate(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resume
                (user_id, photo_url, general_info, personal_info, work_experiences,
                 education, skills, summary, color, border)
            SELECT user_id, photo_url, general_info, personal_info, work_experiences,
                   education, skills, summary, color, border
            FROM resume
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))
    }

    async fn rename(&self, id: Uuid, title: &str) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resume
            SET general_info = jsonb_set(general_info, '{title}', to_jsonb($2::text)),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))
    }

    async fn delete(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        let row = sqlx::query_as::<_, ResumeRow>("DELETE FROM resume WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Resume {id}")))?;

        if let Some(url) = row.photo_url.as_deref() {
            release_photo(self.photos.as_ref(), self, url).await;
        }

        Ok(row)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO photo storage
// ────────────────────────────────────────────────────────────────────────────

pub struct S3PhotoStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Public prefix photo URLs are built from: `{endpoint}/{bucket}`.
    public_base: String,
}

impl S3PhotoStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, endpoint: &str) -> Self {
        let public_base = format!("{}/{}", endpoint.trim_end_matches('/'), bucket);
        Self {
            client,
            bucket,
            public_base,
        }
    }

    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

/// Object key for a new upload, keeping the original file extension.
pub fn photo_object_key(file_name: &str, millis: i64) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("resume_photos/{millis}{extension}")
}

#[async_trait]
impl PhotoStorage for S3PhotoStorage {
    async fn put(&self, attachment: &Attachment) -> Result<String, StoreError> {
        let key = photo_object_key(
            &attachment.file_name,
            chrono::Utc::now().timestamp_millis(),
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(attachment.data.clone()))
            .content_type(&attachment.content_type)
            .send()
            .await
            .map_err(|e| StoreError::Photo(format!("S3 upload failed: {e}")))?;

        info!("Uploaded resume photo to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let Some(key) = self.key_for_url(url) else {
            warn!("Not deleting photo outside bucket {}: {url}", self.bucket);
            return Ok(());
        };

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Photo(format!("S3 delete failed: {e}")))?;

        info!("Deleted resume photo s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::resume_row;
    use bytes::Bytes;
    use std::sync::Mutex;

    const OLD: &str = "https://cdn.example/jobboard/resume_photos/1.png";
    const NEW: &str = "https://cdn.example/jobboard/resume_photos/2.png";

    /// Photo storage that records every call, and answers reference checks
    /// from a fixed list of URLs still in use elsewhere.
    #[derive(Default)]
    struct RecordingPhotos {
        events: Mutex<Vec<String>>,
        failing_put: bool,
        referenced: Vec<String>,
    }

    impl RecordingPhotos {
        fn log(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PhotoStorage for RecordingPhotos {
        async fn put(&self, attachment: &Attachment) -> Result<String, StoreError> {
            if self.failing_put {
                return Err(StoreError::Photo("bucket unavailable".to_string()));
            }
            self.log(format!("put {}", attachment.file_name));
            Ok(NEW.to_string())
        }

        async fn delete(&self, url: &str) -> Result<(), StoreError> {
            self.log(format!("delete {url}"));
            Ok(())
        }
    }

    #[async_trait]
    impl PhotoReferences for RecordingPhotos {
        async fn is_photo_referenced(&self, url: &str) -> Result<bool, StoreError> {
            Ok(self.referenced.iter().any(|used| used == url))
        }
    }

    fn pending_photo() -> Photo {
        Photo::Pending(Attachment {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            size: 3,
            data: Bytes::from_static(b"png"),
        })
    }

    async fn save(
        photos: &RecordingPhotos,
        requested: Option<&Photo>,
        write_fails: bool,
    ) -> Result<ResumeRow, StoreError> {
        save_with_photo(photos, photos, requested, Some(OLD), |url| {
            photos.log(format!("write {}", url.as_deref().unwrap_or("none")));
            async move {
                if write_fails {
                    return Err(StoreError::Unavailable("update failed".to_string()));
                }
                Ok(resume_row(Uuid::new_v4(), "Resume"))
            }
        })
        .await
    }

    #[tokio::test]
    async fn test_new_photo_is_uploaded_before_write_and_old_released_after() {
        let photos = RecordingPhotos::default();
        save(&photos, Some(&pending_photo()), false).await.unwrap();
        assert_eq!(
            photos.events(),
            vec![
                "put me.png".to_string(),
                format!("write {NEW}"),
                format!("delete {OLD}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_photo_shared_with_a_duplicate_is_kept() {
        let photos = RecordingPhotos {
            referenced: vec![OLD.to_string()],
            ..RecordingPhotos::default()
        };
        save(&photos, Some(&pending_photo()), false).await.unwrap();
        save(&photos, Some(&Photo::Removed), false).await.unwrap();
        assert!(!photos.events().iter().any(|e| e.starts_with("delete")));
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_row_and_old_photo_alone() {
        let photos = RecordingPhotos {
            failing_put: true,
            ..RecordingPhotos::default()
        };
        let err = save(&photos, Some(&pending_photo()), false).await.unwrap_err();
        assert!(matches!(err, StoreError::Photo(_)));
        assert!(photos.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_discards_new_upload_and_keeps_old_photo() {
        let photos = RecordingPhotos::default();
        assert!(save(&photos, Some(&pending_photo()), true).await.is_err());
        assert_eq!(
            photos.events(),
            vec![
                "put me.png".to_string(),
                format!("write {NEW}"),
                format!("delete {NEW}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_removed_photo_is_released_after_write() {
        let photos = RecordingPhotos::default();
        save(&photos, Some(&Photo::Removed), false).await.unwrap();
        assert_eq!(
            photos.events(),
            vec!["write none".to_string(), format!("delete {OLD}")]
        );
    }

    #[tokio::test]
    async fn test_unchanged_photo_is_kept_on_the_row() {
        let photos = RecordingPhotos::default();
        save(&photos, None, false).await.unwrap();
        assert_eq!(photos.events(), vec![format!("write {OLD}")]);
    }

    #[test]
    fn test_photo_object_key_keeps_extension() {
        assert_eq!(
            photo_object_key("portrait.jpeg", 1700000000000),
            "resume_photos/1700000000000.jpeg"
        );
    }

    #[test]
    fn test_photo_object_key_without_extension() {
        assert_eq!(photo_object_key("upload", 5), "resume_photos/5");
    }
}
