//! Helpers for the feature-gated integration tests.
//!
//! These tests expect a scratch PostgreSQL database reachable via
//! `POSTGRES_URL`; they drop and recreate the gallery tables, so never
//! point them at real data.

use crate::config::DbConfig;
use crate::database::Database;

pub fn config() -> DbConfig {
    DbConfig::from_env()
        .expect("invalid database configuration")
        .expect("POSTGRES_URL must be set for integration tests")
}

pub fn database() -> Database {
    Database::connect(&config()).expect("failed to build database provider")
}

/// Drop the gallery tables so each test starts from an empty store.
pub async fn reset(db: &Database) {
    sqlx::query("DROP TABLE IF EXISTS photo_tags, photos, tags CASCADE")
        .execute(db.pool())
        .await
        .expect("failed to reset schema");
}

/// Create the full schema via the bootstrapper, asserting success.
pub async fn bootstrap(db: &Database) {
    let bootstrapper = crate::bootstrap::Bootstrapper::new(db.clone());
    assert!(bootstrapper.setup().await, "schema bootstrap failed");
}
