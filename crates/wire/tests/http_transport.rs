use advisor_wire::{
    AdvisorTransport, HistoryEntry, HistoryRole, StreamRequest, SyncRequest, WireClient,
    WireConfig,
};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{Value, json};

fn bearer(headers: &HeaderMap) -> Value {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| Value::String(value.to_string()))
        .unwrap_or(Value::Null)
}

async fn stream_chat(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let echo = json!({ "response": format!("echo: {}", body["message"].as_str().unwrap_or_default()) });
    let tools = json!({
        "tool_calls": [{
            "tool_call_id": "t1",
            "result": {
                "authorization": bearer(&headers),
                "history_len": body["conversation_history"].as_array().map(Vec::len),
                "scenario": body["scenario"].clone(),
            }
        }]
    });
    let payload = format!("event: message\ndata: {echo}\n\ndata: {{not json\n\nevent: message\ndata: {tools}\n\n");

    ([(header::CONTENT_TYPE, "text/event-stream")], payload)
}

async fn sync_chat(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "response": format!("sync: {}", body["message"].as_str().unwrap_or_default()),
        "intent_profile": { "risk_preference": "balanced", "intent_score": 0.5 }
    }))
}

async fn suggestions() -> Json<Value> {
    Json(json!([
        { "id": 1, "text": "How much should I keep in an emergency fund?", "category": "budgeting" },
        { "id": "2", "text": "Is my portfolio too risky?", "category": "investing" }
    ]))
}

async fn unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

async fn advisory_backend() -> String {
    spawn_server(
        Router::new()
            .route("/api/chat/stream", post(stream_chat))
            .route("/api/chat", post(sync_chat))
            .route("/api/suggestions", get(suggestions)),
    )
    .await
}

#[tokio::test]
async fn stream_yields_parsed_records_and_sends_credential() {
    let base_url = advisory_backend().await;
    let client = WireClient::new(WireConfig::new(base_url).with_api_key("secret-token")).unwrap();

    let mut extra = serde_json::Map::new();
    extra.insert("scenario".to_string(), json!("young-family"));
    let request = StreamRequest::new(
        "Should I refinance?",
        "session-1",
        vec![HistoryEntry::new(HistoryRole::User, "hello")],
    )
    .with_extra_context(extra);

    let records = client
        .open_stream(request)
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].as_ref().unwrap()["response"],
        "echo: Should I refinance?"
    );

    let result = &records[1].as_ref().unwrap()["tool_calls"][0]["result"];
    assert_eq!(result["authorization"], "Bearer secret-token");
    assert_eq!(result["history_len"], 1);
    assert_eq!(result["scenario"], "young-family");
}

#[tokio::test]
async fn missing_credential_sends_no_authorization_header() {
    let base_url = advisory_backend().await;
    let client = WireClient::new(WireConfig::new(base_url)).unwrap();

    let records = client
        .open_stream(StreamRequest::new("hi", "session-2", Vec::new()))
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await;

    let result = &records[1].as_ref().unwrap()["tool_calls"][0]["result"];
    assert_eq!(result["authorization"], Value::Null);
}

#[tokio::test]
async fn non_success_status_is_reported_before_streaming() {
    let base_url = spawn_server(Router::new().route("/api/chat/stream", post(unavailable))).await;
    let client = WireClient::new(WireConfig::new(base_url)).unwrap();

    let error = match client
        .open_stream(StreamRequest::new("hi", "session-3", Vec::new()))
        .await
    {
        Ok(_) => panic!("stream should have been rejected"),
        Err(error) => error,
    };

    assert_eq!(error.status(), Some(503));
    assert_eq!(error.stage(), "stream-http-status");
}

#[tokio::test]
async fn unreachable_backend_is_a_send_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = WireClient::new(WireConfig::new(format!("http://{address}"))).unwrap();
    let error = client
        .send_sync(SyncRequest::new("hi", "session-4", Vec::new()))
        .await
        .unwrap_err();

    assert_eq!(error.stage(), "send-sync-request");
    assert_eq!(error.status(), None);
}

#[tokio::test]
async fn sync_request_returns_text_and_profile() {
    let base_url = advisory_backend().await;
    let client = WireClient::new(WireConfig::new(base_url)).unwrap();

    let response = client
        .send_sync(SyncRequest::new("hi", "session-5", Vec::new()))
        .await
        .unwrap();

    assert_eq!(response.response, "sync: hi");
    assert_eq!(
        response.intent_profile,
        Some(json!({ "risk_preference": "balanced", "intent_score": 0.5 }))
    );
}

#[tokio::test]
async fn suggestions_are_listed() {
    let base_url = advisory_backend().await;
    let client = WireClient::new(WireConfig::new(base_url)).unwrap();

    let suggestions = client.fetch_suggestions().await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].id, "1");
    assert_eq!(suggestions[1].category, "investing");
}
