use async_trait::async_trait;
use std::path::Path;
use crate::types::ArticleRecord;
use crate::Result;

/// One spreadsheet row, column header to cell value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Sheet holding the article catalog.
pub const ARTICLES_SHEET: &str = "Articles";
/// Sheet holding the help-center wide gaps.
pub const GAPS_SHEET: &str = "Gaps";
/// Sheet holding the deep dive on the most important gaps.
pub const TOP_SHEET: &str = "Top2";

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Loads the article catalog, `None` if the store does not exist yet
    async fn load(&self, path: &Path) -> Result<Option<Vec<ArticleRecord>>>;

    /// Replaces the whole store with the given catalog
    async fn save(&self, path: &Path, records: &[ArticleRecord]) -> Result<()>;

    /// Loads one sheet, `None` if the store or the sheet does not exist
    async fn load_sheet(&self, path: &Path, sheet: &str) -> Result<Option<Vec<Row>>>;

    /// Replaces one sheet, keeping the others and creating the store if needed
    async fn save_sheet(&self, path: &Path, sheet: &str, rows: Vec<Row>) -> Result<()>;
}
