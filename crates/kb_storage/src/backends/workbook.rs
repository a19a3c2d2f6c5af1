use async_trait::async_trait;
use kb_core::storage::ARTICLES_SHEET;
use kb_core::{ArticleRecord, DatasetStore, Error, Result, Row};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use crate::{to_rows, Workbook};

/// Stores each workbook as one JSON document on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// readers only ever see a whole workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookStorage;

impl WorkbookStorage {
    pub fn new() -> Self {
        Self
    }

    pub async fn read_workbook(&self, path: &Path) -> Result<Option<Workbook>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let workbook = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Storage(format!("Failed to parse workbook {}: {}", path.display(), e))
        })?;
        Ok(Some(workbook))
    }

    pub async fn write_workbook(&self, path: &Path, workbook: &Workbook) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(workbook)?;
        let tmp = temp_path(path);
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, path).await?;
        debug!("Wrote {} sheet(s) to {}", workbook.sheets.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[async_trait]
impl DatasetStore for WorkbookStorage {
    async fn load(&self, path: &Path) -> Result<Option<Vec<ArticleRecord>>> {
        match self.read_workbook(path).await? {
            Some(workbook) => Ok(Some(workbook.articles()?.unwrap_or_default())),
            None => Ok(None),
        }
    }

    async fn save(&self, path: &Path, records: &[ArticleRecord]) -> Result<()> {
        let workbook = Workbook::with_sheet(ARTICLES_SHEET, to_rows(records)?);
        self.write_workbook(path, &workbook).await
    }

    async fn load_sheet(&self, path: &Path, sheet: &str) -> Result<Option<Vec<Row>>> {
        Ok(self
            .read_workbook(path)
            .await?
            .and_then(|workbook| workbook.sheet(sheet).map(|s| s.rows.clone())))
    }

    async fn save_sheet(&self, path: &Path, sheet: &str, rows: Vec<Row>) -> Result<()> {
        let mut workbook = self.read_workbook(path).await?.unwrap_or_default();
        workbook.replace_sheet(sheet, rows);
        self.write_workbook(path, &workbook).await
    }
}
