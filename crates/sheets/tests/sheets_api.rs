//! Drives `SheetsStore` against an in-process mock of the Sheets v4 API.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use engine::{Amount, LedgerStore, SheetRef, StoreError, decode_categories};
use serde_json::{Value, json};
use sheets::SheetsStore;

const TOKEN: &str = "test-token";

#[derive(Clone, Debug)]
struct MockSheet {
    id: i64,
    title: String,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug)]
struct MockState {
    sheets: Vec<MockSheet>,
    /// Number of upcoming `batchUpdate` calls answered with a 500.
    failing_batches: usize,
}

type Shared = Arc<Mutex<MockState>>;
type Reply = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: &str) -> Reply {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn title_of(range: &str) -> String {
    let quoted = range.split("'!").next().unwrap_or_default();
    quoted.trim_start_matches('\'').replace("''", "'")
}

fn sheet(id: i64, title: &str, rows: Vec<Vec<Value>>) -> MockSheet {
    MockSheet {
        id,
        title: title.to_string(),
        rows,
    }
}

fn text_row(cells: &[&str]) -> Vec<Value> {
    cells.iter().map(|c| json!(c)).collect()
}

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(ToString::to_string).collect()
}

/// What the API shows for a cell without `UNFORMATTED_VALUE`, with every
/// number in a currency format.
fn formatted(cell: &Value) -> Value {
    match cell {
        Value::Number(n) => json!(format!("${:.2}", n.as_f64().unwrap_or_default())),
        other => other.clone(),
    }
}

async fn spreadsheet_get(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(target): Path<String>,
) -> Reply {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "missing credentials");
    }
    if target != "doc" {
        return error(StatusCode::NOT_FOUND, "Requested entity was not found.");
    }
    let state = state.lock().unwrap();
    let listed: Vec<Value> = state
        .sheets
        .iter()
        .map(|s| json!({ "properties": { "sheetId": s.id, "title": s.title } }))
        .collect();
    (StatusCode::OK, Json(json!({ "sheets": listed })))
}

/// Applies every request of the batch, or none of them.
async fn spreadsheet_batch(
    State(state): State<Shared>,
    Path(target): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if target != "doc:batchUpdate" {
        return error(StatusCode::NOT_FOUND, "unknown method");
    }
    let mut state = state.lock().unwrap();
    if state.failing_batches > 0 {
        state.failing_batches -= 1;
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error encountered.");
    }

    let mut sheets = state.sheets.clone();
    let requests = body["requests"].as_array().cloned().unwrap_or_default();
    for (idx, request) in requests.iter().enumerate() {
        if let Some(props) = request.get("addSheet").map(|r| &r["properties"]) {
            let title = props["title"].as_str().unwrap_or_default();
            let id = props["sheetId"].as_i64().unwrap_or_default();
            if sheets.iter().any(|s| s.title == title) {
                return error(
                    StatusCode::BAD_REQUEST,
                    &format!(
                        "Invalid requests[{idx}].addSheet: A sheet with the name \"{title}\" already exists. Please enter another name."
                    ),
                );
            }
            if sheets.iter().any(|s| s.id == id) {
                return error(
                    StatusCode::BAD_REQUEST,
                    &format!("Invalid requests[{idx}].addSheet: Sheet with id {id} already exists."),
                );
            }
            sheets.push(sheet(id, title, Vec::new()));
        } else if let Some(update) = request.get("updateCells") {
            let id = update["start"]["sheetId"].as_i64().unwrap_or_default();
            let Some(target) = sheets.iter_mut().find(|s| s.id == id) else {
                return error(
                    StatusCode::BAD_REQUEST,
                    &format!("Invalid requests[{idx}].updateCells: No grid with id: {id}"),
                );
            };
            let header: Vec<Value> = update["rows"][0]["values"]
                .as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|c| c["userEnteredValue"]["stringValue"].clone())
                        .collect()
                })
                .unwrap_or_default();
            if target.rows.is_empty() {
                target.rows.push(header);
            } else {
                target.rows[0] = header;
            }
        } else {
            return error(StatusCode::BAD_REQUEST, "unsupported request");
        }
    }

    state.sheets = sheets;
    let replies: Vec<Value> = requests.iter().map(|_| json!({})).collect();
    (StatusCode::OK, Json(json!({ "replies": replies })))
}

async fn values_get(
    State(state): State<Shared>,
    Path((_, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let title = title_of(&range);
    let state = state.lock().unwrap();
    let Some(found) = state.sheets.iter().find(|s| s.title == title) else {
        return error(StatusCode::BAD_REQUEST, "Unable to parse range");
    };
    let unformatted =
        query.get("valueRenderOption").map(String::as_str) == Some("UNFORMATTED_VALUE");
    let data: Vec<Vec<Value>> = found
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            row.iter()
                .map(|cell| if unformatted { cell.clone() } else { formatted(cell) })
                .collect()
        })
        .collect();
    if data.is_empty() {
        // The API omits `values` for an empty range.
        return (StatusCode::OK, Json(json!({ "range": range })));
    }
    (StatusCode::OK, Json(json!({ "range": range, "values": data })))
}

async fn values_append(
    State(state): State<Shared>,
    Path((_, target)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let Some(range) = target.strip_suffix(":append") else {
        return error(StatusCode::NOT_FOUND, "unknown method");
    };
    let title = title_of(range);
    let mut state = state.lock().unwrap();
    let Some(found) = state.sheets.iter_mut().find(|s| s.title == title) else {
        return error(StatusCode::BAD_REQUEST, "Unable to parse range");
    };
    let rows: Vec<Vec<Value>> = serde_json::from_value(body["values"].clone()).unwrap_or_default();
    found.rows.extend(rows);
    (StatusCode::OK, Json(json!({ "updates": {} })))
}

async fn mock_api(initial: Vec<MockSheet>) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState {
        sheets: initial,
        failing_batches: 0,
    }));
    let app = Router::new()
        .route(
            "/v4/spreadsheets/{target}",
            get(spreadsheet_get).post(spreadsheet_batch),
        )
        .route(
            "/v4/spreadsheets/{doc}/values/{range}",
            get(values_get).post(values_append),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn resolve_lists_sheet_titles() {
    let (url, _) = mock_api(vec![sheet(0, "Categories", Vec::new())]).await;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let doc = store.resolve_document("doc").await.unwrap();
    assert_eq!(doc.sheets, vec![SheetRef::new("Categories")]);

    assert_eq!(
        store.resolve_document("missing").await,
        Err(StoreError::DocumentNotFound("missing".to_string()))
    );
}

#[tokio::test]
async fn wrong_token_is_backend_error() {
    let (url, _) = mock_api(Vec::new()).await;
    let store = SheetsStore::with_base_url("nope", &url).unwrap();

    let err = store.resolve_document("doc").await.unwrap_err();
    assert!(matches!(&err, StoreError::Backend(msg) if msg.contains("missing credentials")));
}

#[tokio::test]
async fn create_append_fetch() {
    let (url, state) = mock_api(vec![sheet(0, "Categories", Vec::new())]).await;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let created = store
        .create_sheet("doc", "2026-10", &["User", "Amount"])
        .await
        .unwrap();
    assert_eq!(created, SheetRef::new("2026-10"));
    assert!(store.fetch_rows("doc", &created).await.unwrap().is_empty());

    store
        .append_row("doc", &created, strings(&["Alice", "12.50"]))
        .await
        .unwrap();
    store
        .append_row("doc", &created, strings(&["Bob", "3"]))
        .await
        .unwrap();

    let rows = store.fetch_rows("doc", &created).await.unwrap();
    assert_eq!(rows, vec![strings(&["Alice", "12.50"]), strings(&["Bob", "3"])]);

    let state = state.lock().unwrap();
    assert_eq!(state.sheets[1].id, 1);
    assert_eq!(state.sheets[1].rows[0], text_row(&["User", "Amount"]));
}

#[tokio::test]
async fn failed_creation_leaves_no_headerless_sheet() {
    let (url, state) = mock_api(Vec::new()).await;
    state.lock().unwrap().failing_batches = 1;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let err = store
        .create_sheet("doc", "2026-10", &["User", "Amount"])
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(store.resolve_document("doc").await.unwrap().sheets.is_empty());

    let created = store
        .create_sheet("doc", "2026-10", &["User", "Amount"])
        .await
        .unwrap();
    store
        .append_row("doc", &created, strings(&["Alice", "5"]))
        .await
        .unwrap();

    assert_eq!(
        store.fetch_rows("doc", &created).await.unwrap(),
        vec![strings(&["Alice", "5"])]
    );
    assert_eq!(
        state.lock().unwrap().sheets[0].rows[0],
        text_row(&["User", "Amount"])
    );
}

#[tokio::test]
async fn creating_an_existing_sheet_keeps_its_rows() {
    let (url, state) = mock_api(vec![sheet(
        7,
        "2026-10",
        vec![text_row(&["User"]), text_row(&["Alice"])],
    )])
    .await;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let created = store.create_sheet("doc", "2026-10", &["User"]).await.unwrap();
    assert_eq!(created.title, "2026-10");
    let state = state.lock().unwrap();
    assert_eq!(state.sheets.len(), 1);
    assert_eq!(state.sheets[0].rows.len(), 2);
}

#[tokio::test]
async fn titles_with_quotes_and_spaces_round_trip() {
    let (url, _) = mock_api(Vec::new()).await;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let created = store
        .create_sheet("doc", "Bob's budget", &["ID", "Name", "Budget"])
        .await
        .unwrap();
    store
        .append_row("doc", &created, strings(&["1", "Food", "1000"]))
        .await
        .unwrap();

    let rows = store.fetch_rows("doc", &created).await.unwrap();
    assert_eq!(rows, vec![strings(&["1", "Food", "1000"])]);
}

#[tokio::test]
async fn number_formatted_cells_decode() {
    let (url, _) = mock_api(vec![sheet(
        0,
        "Categories",
        vec![
            text_row(&["ID", "Name", "Budget"]),
            vec![json!(1), json!("Food"), json!(1000)],
            vec![json!(2), json!("Fun"), json!(25.5)],
        ],
    )])
    .await;
    let store = SheetsStore::with_base_url(TOKEN, &url).unwrap();

    let rows = store
        .fetch_rows("doc", &SheetRef::new("Categories"))
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![strings(&["1", "Food", "1000"]), strings(&["2", "Fun", "25.5"])]
    );

    let categories = decode_categories("Categories", &rows).unwrap();
    assert_eq!(categories[0].budget, Amount::new(100_000));
    assert_eq!(categories[1].budget, Amount::new(2_550));
}
