pub mod bootstrap;
pub mod config;
pub mod database;
pub mod error;
pub mod photos;
pub mod schema;
pub mod tags;

#[cfg(all(test, feature = "integration-tests"))]
pub(crate) mod testkit;

pub use bootstrap::{BootstrapState, Bootstrapper};
pub use config::{AppEnv, DbConfig, SslPolicy};
pub use database::Database;
pub use error::StoreError;
