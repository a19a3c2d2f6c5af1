use async_trait::async_trait;
use crate::types::ArticleRecord;
use crate::Result;

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Returns the name of the help center being scraped
    fn name(&self) -> &str;

    /// Scrapes every article once. Urls are unique and ids are assigned in
    /// traversal order, starting at 1.
    async fn fetch_all(&self) -> Result<Vec<ArticleRecord>>;
}
