//! Contract of the spreadsheet that holds the ledger, plus an in-memory
//! implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::StoreError;

/// Handle to one sheet (tab) of a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub title: String,
}

impl SheetRef {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Metadata of a spreadsheet document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub sheets: Vec<SheetRef>,
}

impl Document {
    #[must_use]
    pub fn find_sheet(&self, title: &str) -> Option<&SheetRef> {
        self.sheets.iter().find(|s| s.title == title)
    }
}

/// Operations the engine needs from the spreadsheet backend.
///
/// Rows are positional cells, header excluded. Decoding them into typed
/// records is the engine's job.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn resolve_document(&self, doc_id: &str) -> Result<Document, StoreError>;

    /// Creates a sheet with `header` as its first row. The sheet and its
    /// header appear together or not at all.
    ///
    /// Creating a sheet that already exists must succeed and return it.
    async fn create_sheet(
        &self,
        doc_id: &str,
        title: &str,
        header: &[&str],
    ) -> Result<SheetRef, StoreError>;

    async fn append_row(
        &self,
        doc_id: &str,
        sheet: &SheetRef,
        fields: Vec<String>,
    ) -> Result<(), StoreError>;

    async fn fetch_rows(&self, doc_id: &str, sheet: &SheetRef)
    -> Result<Vec<Vec<String>>, StoreError>;
}

#[derive(Debug, Default)]
struct MemorySheet {
    title: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Documents kept in process memory. Sheets keep creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Vec<MemorySheet>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty document.
    pub async fn add_document(&self, doc_id: &str) {
        self.documents
            .write()
            .await
            .entry(doc_id.to_string())
            .or_default();
    }

    /// Creates (or replaces) a sheet with the given header and rows.
    pub async fn seed_sheet(
        &self,
        doc_id: &str,
        title: &str,
        header: &[&str],
        rows: Vec<Vec<String>>,
    ) {
        let mut documents = self.documents.write().await;
        let sheets = documents.entry(doc_id.to_string()).or_default();
        sheets.retain(|s| s.title != title);
        sheets.push(MemorySheet {
            title: title.to_string(),
            header: header.iter().map(ToString::to_string).collect(),
            rows,
        });
    }

    /// Header and data rows of a sheet, if it exists.
    pub async fn snapshot(&self, doc_id: &str, title: &str) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let documents = self.documents.read().await;
        documents
            .get(doc_id)?
            .iter()
            .find(|s| s.title == title)
            .map(|s| (s.header.clone(), s.rows.clone()))
    }

    pub async fn sheet_count(&self, doc_id: &str) -> usize {
        self.documents
            .read()
            .await
            .get(doc_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn resolve_document(&self, doc_id: &str) -> Result<Document, StoreError> {
        let documents = self.documents.read().await;
        let sheets = documents
            .get(doc_id)
            .ok_or_else(|| StoreError::DocumentNotFound(doc_id.to_string()))?;
        Ok(Document {
            id: doc_id.to_string(),
            sheets: sheets.iter().map(|s| SheetRef::new(&s.title)).collect(),
        })
    }

    async fn create_sheet(
        &self,
        doc_id: &str,
        title: &str,
        header: &[&str],
    ) -> Result<SheetRef, StoreError> {
        let mut documents = self.documents.write().await;
        let sheets = documents
            .get_mut(doc_id)
            .ok_or_else(|| StoreError::DocumentNotFound(doc_id.to_string()))?;
        if !sheets.iter().any(|s| s.title == title) {
            sheets.push(MemorySheet {
                title: title.to_string(),
                header: header.iter().map(ToString::to_string).collect(),
                rows: Vec::new(),
            });
        }
        Ok(SheetRef::new(title))
    }

    async fn append_row(
        &self,
        doc_id: &str,
        sheet: &SheetRef,
        fields: Vec<String>,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let target = documents
            .get_mut(doc_id)
            .ok_or_else(|| StoreError::DocumentNotFound(doc_id.to_string()))?
            .iter_mut()
            .find(|s| s.title == sheet.title)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.title.clone()))?;
        target.rows.push(fields);
        Ok(())
    }

    async fn fetch_rows(
        &self,
        doc_id: &str,
        sheet: &SheetRef,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let documents = self.documents.read().await;
        documents
            .get(doc_id)
            .ok_or_else(|| StoreError::DocumentNotFound(doc_id.to_string()))?
            .iter()
            .find(|s| s.title == sheet.title)
            .map(|s| s.rows.clone())
            .ok_or_else(|| StoreError::SheetNotFound(sheet.title.clone()))
    }
}
