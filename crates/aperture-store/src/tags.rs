use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct TagRow {
    pub id: i32,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct TagRepo {
    db: Database,
}

impl TagRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get or create a tag by name. Tag names are unique; concurrent
    /// callers racing on the same name converge on one row.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, name: &str) -> Result<TagRow, StoreError> {
        let row = self
            .db
            .fetch_all(
                sqlx::query(
                    "INSERT INTO tags (name) VALUES ($1) \
                     ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
                     RETURNING id, name, created_at",
                )
                .bind(name),
            )
            .await?;

        row.first()
            .map(TagRow::from_row)
            .transpose()?
            .ok_or_else(|| StoreError::Database("upsert returned no row".into()))
    }

    /// All tags, alphabetically.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<TagRow>, StoreError> {
        let rows = self
            .db
            .fetch_all(sqlx::query(
                "SELECT id, name, created_at FROM tags ORDER BY name",
            ))
            .await?;
        rows.iter()
            .map(|row| TagRow::from_row(row).map_err(StoreError::from))
            .collect()
    }

    /// Associate a photo with a tag. Re-attaching an existing pair is a
    /// no-op; referencing an unknown photo or tag is a constraint error.
    #[instrument(skip(self), fields(photo_id = %photo_id, tag_id))]
    pub async fn attach(&self, photo_id: &str, tag_id: i32) -> Result<(), StoreError> {
        self.db
            .execute(
                sqlx::query(
                    "INSERT INTO photo_tags (photo_id, tag_id) VALUES ($1, $2) \
                     ON CONFLICT (photo_id, tag_id) DO NOTHING",
                )
                .bind(photo_id)
                .bind(tag_id),
            )
            .await?;
        Ok(())
    }

    /// Remove one photo/tag association.
    #[instrument(skip(self), fields(photo_id = %photo_id, tag_id))]
    pub async fn detach(&self, photo_id: &str, tag_id: i32) -> Result<(), StoreError> {
        self.db
            .execute(
                sqlx::query("DELETE FROM photo_tags WHERE photo_id = $1 AND tag_id = $2")
                    .bind(photo_id)
                    .bind(tag_id),
            )
            .await?;
        Ok(())
    }

    /// Tags attached to one photo, alphabetically.
    #[instrument(skip(self), fields(photo_id = %photo_id))]
    pub async fn for_photo(&self, photo_id: &str) -> Result<Vec<TagRow>, StoreError> {
        let rows = self
            .db
            .fetch_all(
                sqlx::query(
                    "SELECT t.id, t.name, t.created_at \
                     FROM tags t \
                     JOIN photo_tags pt ON pt.tag_id = t.id \
                     WHERE pt.photo_id = $1 \
                     ORDER BY t.name",
                )
                .bind(photo_id),
            )
            .await?;
        rows.iter()
            .map(|row| TagRow::from_row(row).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(all(test, feature = "integration-tests"))]
mod integration_tests {
    use super::*;
    use crate::photos::{NewPhoto, PhotoRepo};
    use crate::testkit;

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn get_or_create_converges_on_one_row() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let repo = TagRepo::new(db);
        let first = repo.get_or_create("landscape").await.unwrap();
        let second = repo.get_or_create("landscape").await.unwrap();
        assert_eq!(first.id, second.id);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn attach_requires_an_existing_photo() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let repo = TagRepo::new(db);
        let tag = repo.get_or_create("street").await.unwrap();

        let result = repo.attach("no-such-photo", tag.id).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn duplicate_attach_is_a_noop() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let photos = PhotoRepo::new(db.clone());
        let tags = TagRepo::new(db);

        let photo = photos.insert(&NewPhoto::new("/photos/a.jpg")).await.unwrap();
        let tag = tags.get_or_create("street").await.unwrap();

        tags.attach(&photo.id, tag.id).await.unwrap();
        tags.attach(&photo.id, tag.id).await.unwrap();

        let attached = tags.for_photo(&photo.id).await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].name, "street");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL via POSTGRES_URL"]
    async fn deleting_a_photo_cascades_to_associations() {
        let db = testkit::database();
        testkit::reset(&db).await;
        testkit::bootstrap(&db).await;

        let photos = PhotoRepo::new(db.clone());
        let tags = TagRepo::new(db.clone());

        let photo = photos.insert(&NewPhoto::new("/photos/a.jpg")).await.unwrap();
        let tag = tags.get_or_create("street").await.unwrap();
        tags.attach(&photo.id, tag.id).await.unwrap();

        photos.delete(&photo.id).await.unwrap();

        let orphans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM photo_tags WHERE photo_id = $1")
                .bind(&photo.id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(orphans, 0);

        // The tag itself survives.
        assert_eq!(tags.list().await.unwrap().len(), 1);
    }
}
