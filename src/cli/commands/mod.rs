//! CLI command implementations.

pub mod events;
pub mod ingest;
pub mod inspect;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::sqlite::{initialize_database, SqliteSnapshotStore};
use crate::domain::models::Config;
use crate::services::AttractorDetector;

/// Loaded configuration plus the opened database.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteSnapshotStore>,
}

impl AppContext {
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.persistence.database_path)
            .await
            .with_context(|| {
                format!("Failed to open database at {}", config.persistence.database_path)
            })?;

        Ok(Self {
            config,
            store: Arc::new(SqliteSnapshotStore::new(pool)),
        })
    }

    /// A detector built from the loaded config, without persistence attached.
    pub fn detector(&self) -> Result<AttractorDetector> {
        let detector = AttractorDetector::new(self.config.detector.clone())
            .context("Invalid detector configuration")?
            .with_rules(self.config.inference.rules.clone());
        Ok(detector)
    }
}
