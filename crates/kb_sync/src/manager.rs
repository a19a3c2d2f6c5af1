use chrono::{DateTime, Utc};
use kb_core::{ArticleSource, DatasetStore, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use crate::engine::{SyncEngine, SyncStats};

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub stats: SyncStats,
    /// No catalog was stored before this run.
    pub bootstrap: bool,
    /// The catalog was written back.
    pub persisted: bool,
    pub total_records: usize,
    pub finished_at: DateTime<Utc>,
}

/// One scrape-enrich-store pass over the help center.
pub struct SyncManager {
    source: Arc<dyn ArticleSource>,
    store: Arc<dyn DatasetStore>,
    engine: SyncEngine,
    data_path: PathBuf,
}

impl SyncManager {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        store: Arc<dyn DatasetStore>,
        engine: SyncEngine,
        data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            store,
            engine,
            data_path: data_path.into(),
        }
    }

    /// Scrape and store failures end the run with an error; enrichment
    /// failures only degrade the affected articles.
    pub async fn run(&self) -> Result<SyncReport> {
        let persisted = self.store.load(&self.data_path).await?;
        let bootstrap = persisted.is_none();
        if bootstrap {
            info!(
                "The file {} was not found. Creating a new catalog",
                self.data_path.display()
            );
        }

        info!("Scraping {}", self.source.name());
        let current = self.source.fetch_all().await?;
        info!("Scraped {} articles", current.len());

        let (records, stats) = self.engine.synchronize(current, persisted).await;

        let persisted = bootstrap || stats.has_changes();
        if persisted {
            self.store.save(&self.data_path, &records).await?;
            info!(
                "Catalog written to {} ({} articles, {} enrichment fallbacks)",
                self.data_path.display(),
                records.len(),
                stats.enrichment_fallbacks
            );
        } else {
            info!("No changes detected in the articles at {}", self.source.name());
        }

        Ok(SyncReport {
            stats,
            bootstrap,
            persisted,
            total_records: records.len(),
            finished_at: Utc::now(),
        })
    }
}
