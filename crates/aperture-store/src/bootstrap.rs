use parking_lot::RwLock;
use sqlx::Row;
use tracing::{error, info, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::schema;

/// Where the bootstrapper is in its lifecycle. It only ever moves forward:
/// `Uninitialized` until a `setup()` call has verified or created the
/// schema, `Ready` afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Ready,
}

/// Creates the gallery schema on first run and verifies it on every run
/// after that.
///
/// `setup()` never raises past its own boundary: callers get a boolean and
/// decide for themselves whether a failure is fatal.
pub struct Bootstrapper {
    db: Database,
    state: RwLock<BootstrapState>,
}

impl Bootstrapper {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            state: RwLock::new(BootstrapState::Uninitialized),
        }
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.read()
    }

    /// Ensure the schema exists. Idempotent: repeated calls against a
    /// bootstrapped store verify and return without issuing any DDL.
    #[instrument(skip(self))]
    pub async fn setup(&self) -> bool {
        info!("checking database schema");

        let existing = match self.existing_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                error!(error = %e, "failed to check database schema");
                return false;
            }
        };

        if schema_complete(&existing) {
            info!("database schema already exists");
            *self.state.write() = BootstrapState::Ready;
            return true;
        }

        info!(
            existing = existing.len(),
            expected = schema::EXPECTED_TABLES.len(),
            "creating database schema"
        );

        match self.create_schema().await {
            Ok(()) => {
                info!("database schema created");
                *self.state.write() = BootstrapState::Ready;
                true
            }
            Err(e) => {
                error!(error = %e, "failed to create database schema");
                false
            }
        }
    }

    /// Which of the expected tables are present in the public namespace.
    async fn existing_tables(&self) -> Result<Vec<String>, StoreError> {
        let expected: Vec<String> = schema::EXPECTED_TABLES
            .iter()
            .map(|t| t.to_string())
            .collect();

        let rows = self
            .db
            .fetch_all(sqlx::query(schema::TABLES_EXIST).bind(expected))
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(StoreError::from))
            .collect()
    }

    /// Run the full DDL script inside one transaction on a dedicated
    /// connection. Statement order matters: referenced tables before the
    /// join table, tables before indexes.
    async fn create_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        for statement in schema::create_statements() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// The existence check requires an exact count match; anything less means
/// a fresh or partially-bootstrapped store and the idempotent DDL runs.
pub fn schema_complete(existing: &[String]) -> bool {
    existing.len() == schema::EXPECTED_TABLES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn empty_store_is_incomplete() {
        assert!(!schema_complete(&[]));
    }

    #[test]
    fn all_tables_present_is_complete() {
        assert!(schema_complete(&names(&["photos", "tags", "photo_tags"])));
    }

    #[test]
    fn partial_store_is_incomplete() {
        assert!(!schema_complete(&names(&["photos"])));
        assert!(!schema_complete(&names(&["photos", "tags"])));
    }

    #[test]
    fn order_does_not_matter() {
        assert!(schema_complete(&names(&["photo_tags", "photos", "tags"])));
    }
}
