use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Form, Path as RoutePath, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, TimeZone};
use promptbot_core::{config::AppConfig, PromptRecord};
use promptbot_sheets::{GoogleSheetsRecorder, PromptRecorder, RecorderError};
use serde_json::{json, Value};

const FIXTURE_KEY: &str = include_str!("fixtures/service_account.json");

#[derive(Clone, Default)]
struct GoogleStub {
    token_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    drive_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    metadata_requests: Arc<Mutex<Vec<String>>>,
    appends: Arc<Mutex<Vec<AppendCall>>>,
    known_spreadsheet: Option<&'static str>,
}

#[derive(Clone, Debug)]
struct AppendCall {
    spreadsheet_id: String,
    range: String,
    query: HashMap<String, String>,
    authorization: Option<String>,
    body: Value,
}

async fn token(
    State(stub): State<GoogleStub>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    stub.token_requests.lock().expect("lock").push(form);
    Json(json!({ "access_token": "ya29.stub", "expires_in": 3599, "token_type": "Bearer" }))
}

async fn drive_files(
    State(stub): State<GoogleStub>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.drive_queries.lock().expect("lock").push(query);
    let files = match stub.known_spreadsheet {
        Some(id) => json!([{ "id": id, "name": "Prompt Log" }]),
        None => json!([]),
    };
    Json(json!({ "files": files }))
}

async fn metadata(
    State(stub): State<GoogleStub>,
    RoutePath(spreadsheet_id): RoutePath<String>,
) -> Json<Value> {
    stub.metadata_requests.lock().expect("lock").push(spreadsheet_id);
    Json(json!({
        "sheets": [
            { "properties": { "title": "Archive", "index": 1 } },
            { "properties": { "title": "Prompts", "index": 0 } }
        ]
    }))
}

async fn append(
    State(stub): State<GoogleStub>,
    RoutePath((spreadsheet_id, range)): RoutePath<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned);
    stub.appends.lock().expect("lock").push(AppendCall {
        spreadsheet_id: spreadsheet_id.clone(),
        range,
        query,
        authorization,
        body,
    });
    (
        StatusCode::OK,
        Json(json!({
            "spreadsheetId": spreadsheet_id,
            "updates": { "updatedRange": "Prompts!A2:D2", "updatedRows": 1 }
        })),
    )
}

async fn spawn_google(stub: GoogleStub) -> String {
    let router = Router::new()
        .route("/token", post(token))
        .route("/drive/files", get(drive_files))
        .route("/sheets/spreadsheets/{id}", get(metadata))
        .route("/sheets/spreadsheets/{id}/values/{range}", post(append))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{address}")
}

fn write_key(dir: &Path, token_uri: &str) -> std::path::PathBuf {
    let mut key: Value = serde_json::from_str(FIXTURE_KEY).expect("fixture key");
    key["token_uri"] = Value::String(token_uri.to_string());
    let path = dir.join("creds.json");
    fs::write(&path, key.to_string()).expect("write key");
    path
}

fn recorder_for(base_url: &str, dir: &Path, spreadsheet_id: Option<&str>) -> GoogleSheetsRecorder {
    let mut sheets = AppConfig::default().sheets;
    sheets.spreadsheet_name = "Prompt Log".to_string();
    sheets.spreadsheet_id = spreadsheet_id.map(ToOwned::to_owned);
    sheets.credentials_path = write_key(dir, &format!("{base_url}/token"));
    sheets.sheets_api_base_url = format!("{base_url}/sheets");
    sheets.drive_api_base_url = format!("{base_url}/drive");
    match GoogleSheetsRecorder::from_config(&sheets) {
        Ok(recorder) => recorder,
        Err(error) => panic!("recorder should build from fixture key: {error}"),
    }
}

fn record(prompt: &str) -> PromptRecord {
    let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single().expect("local time");
    PromptRecord::at(at, "U123", prompt, "5")
}

#[tokio::test]
async fn append_finds_sheet_by_name_and_writes_one_raw_row() {
    let stub = GoogleStub { known_spreadsheet: Some("sheet-abc"), ..GoogleStub::default() };
    let base_url = spawn_google(stub.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), None);

    recorder.append(&record("Write a haiku about ferris")).await.expect("append");

    let tokens = stub.token_requests.lock().expect("lock");
    assert_eq!(tokens.len(), 1);
    assert_eq!(
        tokens[0].get("grant_type").map(String::as_str),
        Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    );
    assert_eq!(tokens[0].get("assertion").map(|a| a.split('.').count()), Some(3));

    let drive = stub.drive_queries.lock().expect("lock");
    let q = drive[0].get("q").expect("drive query");
    assert!(q.contains("name = 'Prompt Log'"));
    assert!(q.contains("trashed = false"));

    let appends = stub.appends.lock().expect("lock");
    assert_eq!(appends.len(), 1);
    let call = &appends[0];
    assert_eq!(call.spreadsheet_id, "sheet-abc");
    assert_eq!(call.range, "'Prompts'!A1:append");
    assert_eq!(call.query.get("valueInputOption").map(String::as_str), Some("RAW"));
    assert_eq!(call.query.get("insertDataOption").map(String::as_str), Some("INSERT_ROWS"));
    assert_eq!(call.authorization.as_deref(), Some("Bearer ya29.stub"));
    assert_eq!(
        call.body["values"],
        json!([["2024-05-01 09:30:00", "U123", "Write a haiku about ferris", "5"]])
    );
}

#[tokio::test]
async fn token_and_target_are_reused_across_appends() {
    let stub = GoogleStub { known_spreadsheet: Some("sheet-abc"), ..GoogleStub::default() };
    let base_url = spawn_google(stub.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), None);

    recorder.append(&record("one")).await.expect("first append");
    recorder.append(&record("two")).await.expect("second append");

    assert_eq!(stub.token_requests.lock().expect("lock").len(), 1);
    assert_eq!(stub.drive_queries.lock().expect("lock").len(), 1);
    assert_eq!(stub.metadata_requests.lock().expect("lock").len(), 1);
    assert_eq!(stub.appends.lock().expect("lock").len(), 2);
}

#[tokio::test]
async fn configured_spreadsheet_id_skips_drive_lookup() {
    let stub = GoogleStub::default();
    let base_url = spawn_google(stub.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), Some("pinned-id"));

    let target = recorder.target().await.expect("target");
    assert_eq!(target.spreadsheet_id, "pinned-id");
    assert_eq!(target.sheet_title, "Prompts");
    assert!(stub.drive_queries.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn blank_spreadsheet_id_falls_back_to_name_lookup() {
    let stub = GoogleStub { known_spreadsheet: Some("sheet-abc"), ..GoogleStub::default() };
    let base_url = spawn_google(stub.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), Some("   "));

    recorder.append(&record("found by name")).await.expect("append");

    assert_eq!(stub.drive_queries.lock().expect("lock").len(), 1);
    let appends = stub.appends.lock().expect("lock");
    assert_eq!(appends[0].spreadsheet_id, "sheet-abc");
}

#[tokio::test]
async fn unknown_spreadsheet_name_is_reported_and_nothing_is_appended() {
    let stub = GoogleStub::default();
    let base_url = spawn_google(stub.clone()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), None);

    let error = recorder.append(&record("lost")).await.expect_err("no spreadsheet");

    assert!(matches!(error, RecorderError::SpreadsheetNotFound(ref name) if name == "Prompt Log"));
    assert!(stub.appends.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn token_endpoint_failure_surfaces_status() {
    let router = Router::new()
        .route("/token", post(|| async { (StatusCode::BAD_REQUEST, "invalid_grant") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    let base_url = format!("http://{address}");
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = recorder_for(&base_url, dir.path(), Some("pinned-id"));

    let error = recorder.append(&record("denied")).await.expect_err("token failure");

    assert!(matches!(
        error,
        RecorderError::Status { status: 400, ref body, .. } if body == "invalid_grant"
    ));
}

#[test]
fn missing_credentials_file_fails_at_construction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sheets = AppConfig::default().sheets;
    sheets.credentials_path = dir.path().join("absent.json");

    let error = GoogleSheetsRecorder::from_config(&sheets).err().expect("missing key");
    assert!(matches!(error, RecorderError::ReadCredentials { .. }));
}
