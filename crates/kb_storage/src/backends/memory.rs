use async_trait::async_trait;
use kb_core::storage::ARTICLES_SHEET;
use kb_core::{ArticleRecord, DatasetStore, Result, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{to_rows, Workbook};

/// Keeps workbooks in process memory, keyed by path. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    workbooks: Arc<RwLock<HashMap<PathBuf, Workbook>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn workbook(&self, path: &Path) -> Option<Workbook> {
        self.workbooks.read().await.get(path).cloned()
    }

    /// Number of workbooks written so far.
    pub async fn len(&self) -> usize {
        self.workbooks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workbooks.read().await.is_empty()
    }
}

#[async_trait]
impl DatasetStore for MemoryStorage {
    async fn load(&self, path: &Path) -> Result<Option<Vec<ArticleRecord>>> {
        match self.workbooks.read().await.get(path) {
            Some(workbook) => Ok(Some(workbook.articles()?.unwrap_or_default())),
            None => Ok(None),
        }
    }

    async fn save(&self, path: &Path, records: &[ArticleRecord]) -> Result<()> {
        let workbook = Workbook::with_sheet(ARTICLES_SHEET, to_rows(records)?);
        self.workbooks.write().await.insert(path.to_path_buf(), workbook);
        Ok(())
    }

    async fn load_sheet(&self, path: &Path, sheet: &str) -> Result<Option<Vec<Row>>> {
        Ok(self
            .workbooks
            .read()
            .await
            .get(path)
            .and_then(|workbook| workbook.sheet(sheet).map(|s| s.rows.clone())))
    }

    async fn save_sheet(&self, path: &Path, sheet: &str, rows: Vec<Row>) -> Result<()> {
        self.workbooks
            .write()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .replace_sheet(sheet, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let path = Path::new("catalog.json");
        assert!(storage.load(path).await.unwrap().is_none());

        let mut article = ArticleRecord::new("KB-1", "http://test.com", "Test Article");
        article.last_updated = "2024-01-01".to_string();
        storage.save(path, &[article.clone()]).await.unwrap();

        let loaded = storage.load(path).await.unwrap().unwrap();
        assert_eq!(loaded, vec![article]);
        assert_eq!(storage.len().await, 1);

        storage.save_sheet(path, "Gaps", Vec::new()).await.unwrap();
        let workbook = storage.workbook(path).await.unwrap();
        assert_eq!(workbook.sheets.len(), 2);
        assert_eq!(storage.load(path).await.unwrap().unwrap().len(), 1);
    }
}
