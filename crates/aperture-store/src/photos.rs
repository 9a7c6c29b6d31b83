use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use crate::database::Database;
use crate::error::StoreError;

/// Select list shared by every photo query. `hidden` and `priority` are
/// nullable with defaults in the DDL, so reads coalesce them.
const PHOTO_COLUMNS: &str = "\
id, title, caption, taken_at, width, height, aspect_ratio, blur_data, \
make, model, focal_length, focal_length_in_35mm, f_number, iso, \
exposure_time, latitude, longitude, film_simulation, \
COALESCE(hidden, false) AS hidden, COALESCE(priority, 0) AS priority, \
image_path, thumbnail_path, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct PhotoRow {
    pub id: String,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub aspect_ratio: Option<f32>,
    pub blur_data: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub focal_length: Option<String>,
    pub focal_length_in_35mm: Option<String>,
    pub f_number: Option<f32>,
    pub iso: Option<i32>,
    pub exposure_time: Option<String>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub film_simulation: Option<String>,
    pub hidden: bool,
    pub priority: i32,
    pub image_path: String,
    pub thumbnail_path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A photo to persist. Only the image path is required; everything else is
/// optional capture metadata.
#[derive(Clone, Debug)]
pub struct NewPhoto {
    pub id: String,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub aspect_ratio: Option<f32>,
    pub blur_data: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub focal_length: Option<String>,
    pub focal_length_in_35mm: Option<String>,
    pub f_number: Option<f32>,
    pub iso: Option<i32>,
    pub exposure_time: Option<String>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub film_simulation: Option<String>,
    pub hidden: bool,
    pub priority: i32,
    pub image_path: String,
    pub thumbnail_path: Option<String>,
}

impl NewPhoto {
    /// A photo with a freshly generated id and no metadata beyond its
    /// storage path.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: None,
            caption: None,
            taken_at: None,
            width: None,
            height: None,
            aspect_ratio: None,
            blur_data: None,
            make: None,
            model: None,
            focal_length: None,
            focal_length_in_35mm: None,
            f_number: None,
            iso: None,
            exposure_time: None,
            latitude: None,
            longitude: None,
            film_simulation: None,
            hidden: false,
            priority: 0,
            image_path: image_path.into(),
            thumbnail_path: None,
        }
    }
}

pub struct PhotoRepo {
    db: Database,
}

impl PhotoRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a new photo. `created_at`/`updated_at` come from the store's
    /// defaults.
    #[instrument(skip(self, photo), fields(photo_id = %photo.id))]
    pub async fn insert(&self, photo: &NewPhoto) -> Result<PhotoRow, StoreError> {
        let sql = format!(
            "INSERT INTO photos (\
                id, title, caption, taken_at, width, height, aspect_ratio, \
                blur_data, make, model, focal_length, focal_length_in_35mm, \
                f_number, iso, exposure_time, latitude, longitude, \
                film_simulation, hidden, priority, image_path, thumbnail_path\
            ) VALUES (\
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22\
            ) RETURNING {PHOTO_COLUMNS}"
        );

        let row = self
            .db
            .fetch_all(
                sqlx::query(&sql)
                    .bind(&photo.id)
                    .bind(photo.title.as_deref())
                    .bind(photo.caption.as_deref())
                    .bind(photo.taken_at)
                    .bind(photo.width)
                    .bind(photo.height)
                    .bind(photo.aspect_ratio)
                    .bind(photo.blur_data.as_deref())
                    .bind(photo.make.as_deref())
                    .bind(photo.model.as_deref())
                    .bind(photo.focal_length.as_deref())
                    .bind(photo.focal_length_in_35mm.as_deref())
                    .bind(photo.f_number)
                    .bind(photo.iso)
                    .bind(photo.exposure_time.as_deref())
                    .bind(photo.latitude)
                    .bind(photo.longitude)
                    .bind(photo.film_simulation.as_deref())
                    .bind(photo.hidden)
                    .bind(photo.priority)
                    .bind(&photo.image_path)
                    .bind(photo.thumbnail_path.as_deref()),
            )
            .await?;

        row.first()
            .map(PhotoRow::from_row)
            .transpose()?
            .ok_or_else(|| StoreError::Database("insert returned no row".into()))
    }

    /// Get a photo by id.
    #[instrument(skip(self), fields(photo_id = %id))]
    pub async fn get(&self, id: &str) -> Result<PhotoRow, StoreError> {
        let sql = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1");
        let row = self
            .db
            .fetch_optional(sqlx::query(&sql).bind(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("photo {id}")))?;
        Ok(PhotoRow::from_row(&row)?)
    }

    /// Visible photos, highest priority first, newest capture first within
    /// a priority. Served by the `taken_at` and `hidden` indexes.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<PhotoRow>, StoreError> {
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos \
             WHERE COALESCE(hidden, false) = false \
             ORDER BY COALESCE(priority, 0) DESC, taken_at DESC NULLS LAST \
             LIMIT $1"
        );
        let rows = self.db.fetch_all(sqlx::query(&sql).bind(limit)).await?;
        rows.iter()
            .map(|row| PhotoRow::from_row(row).map_err(StoreError::from))
            .collect()
    }

    /// Toggle visibility, touching `updated_at`.
    #[instrument(skip(self), fields(photo_id = %id))]
    pub async fn set_hidden(&self, id: &str, hidden: bool) -> Result<(), StoreError> {
        let affected = self
            .db
            .execute(
                sqlx::query("UPDATE photos SET hidden = $2, updated_at = NOW() WHERE id = $1")
                    .bind(id)
                    .bind(hidden),
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("photo {id}")));
        }
        Ok(())
    }

    /// Delete a photo; its tag associations go with it via cascade.
    #[instrument(skip(self), fields(photo_id = %id))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let affected = self
            .db
            .execute(sqlx::query("DELETE FROM photos WHERE id = $1").bind(id))
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("photo {id}")));
        }
        Ok(())
    }
}


#[cfg(all(test, feature = "integration-tests"))]
mod integration_tests {
    use super::*;
    use crate::testkit;

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn insert_and_get_roundtrip() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let repo = PhotoRepo::new(db);
        let mut photo = NewPhoto::new("/photos/fuji-0001.jpg");
        photo.title = Some("Harbor at dusk".into());
        photo.make = Some("FUJIFILM".into());
        photo.width = Some(6000);
        photo.height = Some(4000);
        photo.aspect_ratio = Some(1.5);

        let inserted = repo.insert(&photo).await.unwrap();
        assert_eq!(inserted.id, photo.id);
        assert!(inserted.created_at.is_some());

        let fetched = repo.get(&photo.id).await.unwrap();
        assert_eq!(fetched.title.as_deref(), Some("Harbor at dusk"));
        assert_eq!(fetched.make.as_deref(), Some("FUJIFILM"));
        assert!(!fetched.hidden);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn hidden_photos_are_not_listed() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let repo = PhotoRepo::new(db);
        let visible = repo.insert(&NewPhoto::new("/photos/a.jpg")).await.unwrap();
        let hidden = repo.insert(&NewPhoto::new("/photos/b.jpg")).await.unwrap();
        repo.set_hidden(&hidden.id, true).await.unwrap();

        let listed = repo.list_recent(10).await.unwrap();
        assert!(listed.iter().any(|p| p.id == visible.id));
        assert!(listed.iter().all(|p| p.id != hidden.id));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn delete_removes_the_photo() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let repo = PhotoRepo::new(db);
        let photo = repo.insert(&NewPhoto::new("/photos/a.jpg")).await.unwrap();
        repo.delete(&photo.id).await.unwrap();

        assert!(matches!(
            repo.get(&photo.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&photo.id).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
