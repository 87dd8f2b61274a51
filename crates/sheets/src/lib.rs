//! Google Sheets v4 backend for the ledger.
//!
//! The store authenticates with an OAuth bearer token obtained elsewhere
//! (service account, workload identity, ...). Every failure is reported as
//! an [`engine::StoreError`].

use async_trait::async_trait;
use engine::{Document, LedgerStore, SheetRef, StoreError};
use reqwest::{Client, Method, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Columns fetched for data rows; the header row is skipped.
const DATA_COLUMNS: &str = "A2:Z";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct SheetsStore {
    client: Client,
    base_url: Url,
}

impl SheetsStore {
    pub fn new(access_token: &str) -> Result<Self, SheetsError> {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Same as [`SheetsStore::new`] against another endpoint (proxy, mock).
    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self, SheetsError> {
        let base_url =
            Url::parse(base_url).map_err(|err| SheetsError::InvalidBaseUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetsError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut auth = header::HeaderValue::try_from(format!("Bearer {access_token}"))
            .map_err(|err| SheetsError::InvalidToken(err.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["v4", "spreadsheets"]).extend(segments);
        }
        url
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<&T>,
    ) -> Result<reqwest::Response, ApiFailure> {
        let mut req = self.client.request(method, url).query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|err| ApiFailure::network(&err))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "sheets api error".to_string(),
        };
        Err(ApiFailure {
            status: Some(status),
            message,
        })
    }
}

impl SheetsStore {
    async fn spreadsheet_meta(&self, doc_id: &str) -> Result<SpreadsheetMeta, StoreError> {
        let resp = self
            .send::<()>(
                Method::GET,
                self.url(&[doc_id]),
                &[("fields", "sheets.properties(sheetId,title)")],
                None,
            )
            .await
            .map_err(|failure| match failure.status {
                Some(StatusCode::NOT_FOUND) => StoreError::DocumentNotFound(doc_id.to_string()),
                _ => failure.into(),
            })?;
        resp.json().await.map_err(decode_failure)
    }
}

/// A failed call, before it is mapped to a [`StoreError`] for its context.
#[derive(Debug)]
struct ApiFailure {
    status: Option<StatusCode>,
    message: String,
}

impl ApiFailure {
    fn network(err: &reqwest::Error) -> Self {
        Self {
            status: None,
            message: format!("network error: {err}"),
        }
    }

    /// `addSheet` was refused because a sheet named `title` exists.
    fn title_taken(&self, title: &str) -> bool {
        self.status == Some(StatusCode::BAD_REQUEST)
            && self.message.contains("already exists")
            && self.message.contains(&format!("\"{title}\""))
    }
}

impl From<ApiFailure> for StoreError {
    fn from(value: ApiFailure) -> Self {
        match value.status {
            Some(status) => StoreError::Backend(format!("{status}: {}", value.message)),
            None => StoreError::Backend(value.message),
        }
    }
}

fn decode_failure(err: reqwest::Error) -> StoreError {
    StoreError::Backend(format!("unexpected sheets response: {err}"))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId", default)]
    sheet_id: i64,
    title: String,
}

impl SpreadsheetMeta {
    fn has_title(&self, title: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == title)
    }

    /// Smallest sheet id not used by the document.
    fn free_sheet_id(&self) -> i64 {
        (0..)
            .find(|id| !self.sheets.iter().any(|s| s.properties.sheet_id == *id))
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct ValueRange {
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FetchedRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Text of a cell read with `UNFORMATTED_VALUE`: numbers lose their display
/// format (`$1,000.00` reads as `1000`).
fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string().to_uppercase(),
        other => other.to_string(),
    }
}

/// A1 range over `title`, quoting the sheet name.
///
/// ```rust
/// assert_eq!(sheets::a1_range("2026-10", "A1"), "'2026-10'!A1");
/// assert_eq!(sheets::a1_range("Bob's", "A2:Z"), "'Bob''s'!A2:Z");
/// ```
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{cells}", title.replace('\'', "''"))
}

#[async_trait]
impl LedgerStore for SheetsStore {
    async fn resolve_document(&self, doc_id: &str) -> Result<Document, StoreError> {
        let meta = self.spreadsheet_meta(doc_id).await?;
        Ok(Document {
            id: doc_id.to_string(),
            sheets: meta
                .sheets
                .into_iter()
                .map(|s| SheetRef::new(s.properties.title))
                .collect(),
        })
    }

    /// Adds the sheet and writes its header in one `batchUpdate`, so a
    /// failure never leaves a sheet without a header behind.
    async fn create_sheet(
        &self,
        doc_id: &str,
        title: &str,
        header: &[&str],
    ) -> Result<SheetRef, StoreError> {
        let meta = self.spreadsheet_meta(doc_id).await?;
        if meta.has_title(title) {
            return Ok(SheetRef::new(title));
        }

        let sheet_id = meta.free_sheet_id();
        let header_cells: Vec<Value> = header
            .iter()
            .map(|name| json!({ "userEnteredValue": { "stringValue": name } }))
            .collect();
        let body = json!({
            "requests": [
                { "addSheet": { "properties": { "sheetId": sheet_id, "title": title } } },
                {
                    "updateCells": {
                        "start": { "sheetId": sheet_id, "rowIndex": 0, "columnIndex": 0 },
                        "rows": [{ "values": header_cells }],
                        "fields": "userEnteredValue"
                    }
                }
            ]
        });

        let batch = format!("{doc_id}:batchUpdate");
        match self
            .send(Method::POST, self.url(&[batch.as_str()]), &[], Some(&body))
            .await
        {
            Ok(_) => {}
            Err(failure) if failure.title_taken(title) => {
                tracing::debug!(title, "sheet already exists");
                return Ok(SheetRef::new(title));
            }
            Err(failure) => return Err(failure.into()),
        }

        tracing::info!(title, sheet_id, "sheet created");
        Ok(SheetRef::new(title))
    }

    async fn append_row(
        &self,
        doc_id: &str,
        sheet: &SheetRef,
        fields: Vec<String>,
    ) -> Result<(), StoreError> {
        let target = format!("{}:append", a1_range(&sheet.title, "A1"));
        let body = ValueRange {
            values: vec![fields],
        };
        self.send(
            Method::POST,
            self.url(&[doc_id, "values", target.as_str()]),
            &[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn fetch_rows(
        &self,
        doc_id: &str,
        sheet: &SheetRef,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let range = a1_range(&sheet.title, DATA_COLUMNS);
        let resp = self
            .send::<()>(
                Method::GET,
                self.url(&[doc_id, "values", range.as_str()]),
                &[
                    ("valueRenderOption", "UNFORMATTED_VALUE"),
                    ("dateTimeRenderOption", "FORMATTED_STRING"),
                ],
                None,
            )
            .await?;
        let fetched: FetchedRange = resp.json().await.map_err(decode_failure)?;
        Ok(fetched
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}
