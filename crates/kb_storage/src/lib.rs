use kb_core::storage::ARTICLES_SHEET;
use kb_core::{ArticleRecord, DatasetStore, Error, Result, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// A named table of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Ordered collection of sheets, the unit a store reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn with_sheet(name: &str, rows: Vec<Row>) -> Self {
        let mut workbook = Self::default();
        workbook.replace_sheet(name, rows);
        workbook
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Swaps the rows of `name` in place, or appends a new sheet.
    pub fn replace_sheet(&mut self, name: &str, rows: Vec<Row>) {
        match self.sheets.iter_mut().find(|s| s.name == name) {
            Some(sheet) => sheet.rows = rows,
            None => self.sheets.push(Sheet {
                name: name.to_string(),
                rows,
            }),
        }
    }

    pub fn articles(&self) -> Result<Option<Vec<ArticleRecord>>> {
        self.sheet(ARTICLES_SHEET)
            .map(|sheet| from_rows(&sheet.rows))
            .transpose()
    }
}

pub fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Row>> {
    items
        .iter()
        .map(|item| match serde_json::to_value(item)? {
            serde_json::Value::Object(row) => Ok(row),
            other => Err(Error::Storage(format!("expected a row object, got {}", other))),
        })
        .collect()
}

pub fn from_rows<T: DeserializeOwned>(rows: &[Row]) -> Result<Vec<T>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value(serde_json::Value::Object(row.clone()))
                .map_err(|e| Error::Storage(format!("invalid row {}: {}", i + 1, e)))
        })
        .collect()
}

pub async fn create_storage(kind: &str) -> Result<Arc<dyn DatasetStore>> {
    match kind {
        "workbook" | "file" => Ok(Arc::new(WorkbookStorage::new())),
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        other => Err(Error::Config(format!(
            "Unknown storage backend: {} (expected workbook or memory)",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, from_rows, to_rows, Sheet, Workbook};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> Row {
        let mut row = Row::new();
        row.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        row
    }

    #[test]
    fn test_replace_sheet_keeps_other_sheets_in_order() {
        let mut workbook = Workbook::with_sheet("Gaps", vec![row("Gap ID", "G-001")]);
        workbook.replace_sheet("Top2", vec![row("Gap ID", "G-002")]);
        workbook.replace_sheet("Gaps", vec![row("Gap ID", "G-009")]);

        let names: Vec<_> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Gaps", "Top2"]);
        assert_eq!(workbook.sheet("Gaps").unwrap().rows[0]["Gap ID"], "G-009");
    }

    #[test]
    fn test_invalid_row_reports_position() {
        let rows = vec![row("article id", "KB-1")];
        let err = from_rows::<ArticleRecord>(&rows).unwrap_err();
        assert!(err.to_string().contains("invalid row 1"));
    }

    #[tokio::test]
    async fn test_create_storage_rejects_unknown_backend() {
        assert!(create_storage("memory").await.is_ok());
        assert!(matches!(create_storage("qdrant").await, Err(Error::Config(_))));
    }
}
