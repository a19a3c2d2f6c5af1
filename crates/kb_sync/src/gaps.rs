use kb_core::storage::{GAPS_SHEET, TOP_SHEET};
use kb_core::{ArticleRecord, DatasetStore, DeepDive, Gap, InferenceModel, Result};
use kb_storage::to_rows;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const GLOBAL_GAP_COUNT: usize = 10;
pub const TOP_GAP_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub gaps_written: usize,
    pub deep_dives_written: usize,
}

/// Asks the model for help-center wide gaps and a deep dive on the top ones,
/// writing each result to its own sheet of the gaps workbook.
pub struct GapSynthesizer {
    model: Arc<dyn InferenceModel>,
    store: Arc<dyn DatasetStore>,
    data_path: PathBuf,
    gaps_path: PathBuf,
}

impl GapSynthesizer {
    pub fn new(
        model: Arc<dyn InferenceModel>,
        store: Arc<dyn DatasetStore>,
        data_path: impl Into<PathBuf>,
        gaps_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            store,
            data_path: data_path.into(),
            gaps_path: gaps_path.into(),
        }
    }

    pub async fn synthesize_global_gaps(&self, catalog: &[ArticleRecord]) -> Result<Vec<Gap>> {
        let gaps = self.model.global_gaps(catalog, GLOBAL_GAP_COUNT).await?;
        if gaps.len() != GLOBAL_GAP_COUNT {
            warn!("Expected {} global gaps, the model returned {}", GLOBAL_GAP_COUNT, gaps.len());
        }
        Ok(gaps)
    }

    pub async fn synthesize_top_n(&self, gaps: &[Gap], n: usize) -> Result<Vec<DeepDive>> {
        let dives = self.model.deep_dive(gaps, n).await?;
        if dives.len() != n {
            warn!("Expected {} deep dives, the model returned {}", n, dives.len());
        }
        Ok(dives)
    }

    /// Runs both steps. Failures are logged and stop the run; whatever was
    /// already written stays.
    pub async fn run(&self) -> GapReport {
        let mut report = GapReport::default();

        let catalog = match self.store.load(&self.data_path).await {
            Ok(Some(catalog)) if !catalog.is_empty() => catalog,
            Ok(_) => {
                warn!("Catalog {} not found or empty, skipping gap analysis", self.data_path.display());
                return report;
            }
            Err(e) => {
                error!("Could not read catalog {}: {}", self.data_path.display(), e);
                return report;
            }
        };

        let gaps = match self.synthesize_global_gaps(&catalog).await {
            Ok(gaps) => gaps,
            Err(e) => {
                error!("LLM gaps analysis failed because: {}", e);
                return report;
            }
        };
        if let Err(e) = self.write_sheet(GAPS_SHEET, &gaps).await {
            error!("Could not write the {} sheet: {}", GAPS_SHEET, e);
            return report;
        }
        report.gaps_written = gaps.len();

        if gaps.is_empty() {
            warn!("No gaps to rank, skipping the {} sheet", TOP_SHEET);
            return report;
        }

        let dives = match self.synthesize_top_n(&gaps, TOP_GAP_COUNT).await {
            Ok(dives) => dives,
            Err(e) => {
                error!("LLM top {} analysis failed because: {}", TOP_GAP_COUNT, e);
                return report;
            }
        };
        if let Err(e) = self.write_sheet(TOP_SHEET, &dives).await {
            error!("Could not write the {} sheet: {}", TOP_SHEET, e);
            return report;
        }
        report.deep_dives_written = dives.len();
        report
    }

    async fn write_sheet<T: Serialize>(&self, sheet: &str, items: &[T]) -> Result<()> {
        let rows = to_rows(items)?;
        self.store.save_sheet(&self.gaps_path, sheet, rows).await?;
        info!("Wrote {} row(s) to sheet {} of {}", items.len(), sheet, self.gaps_path.display());
        Ok(())
    }
}
