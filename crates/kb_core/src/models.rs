use async_trait::async_trait;
use std::collections::HashMap;
use crate::types::{ArticleRecord, DeepDive, Enrichment, Gap};
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    /// Topics and gap for each article of one batch, keyed by article id (or url).
    ///
    /// An `Err` means the whole batch failed; articles missing from an `Ok` map
    /// were skipped by the model.
    async fn enrich_batch(&self, batch: &[ArticleRecord]) -> Result<HashMap<String, Enrichment>>;

    /// Help-center wide gaps inferred from the enriched catalog.
    async fn global_gaps(&self, catalog: &[ArticleRecord], count: usize) -> Result<Vec<Gap>>;

    /// The `n` most important of `gaps`, each with an article outline.
    async fn deep_dive(&self, gaps: &[Gap], n: usize) -> Result<Vec<DeepDive>>;
}
