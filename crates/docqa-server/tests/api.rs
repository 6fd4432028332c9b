use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use docqa_chat::{CompletionRequest, CompletionService, QueryDispatcher};
use docqa_core::{DocQaConfig, Error, Result};
use docqa_ingest::NO_EXTRACTABLE_TEXT_WARNING;
use docqa_server::{build_router, AppState};

const BOUNDARY: &str = "docqa-test-boundary";

/// Records every request; replies with `reply` or fails when it is `None`.
struct RecordingService {
    calls: Mutex<Vec<CompletionRequest>>,
    reply: Option<&'static str>,
}

impl CompletionService for RecordingService {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String>> {
        self.calls.lock().push(request);
        let reply = self.reply;
        Box::pin(async move {
            reply.map(str::to_string).ok_or_else(|| Error::Api {
                status: 503,
                message: "upstream overloaded".into(),
            })
        })
    }
}

fn config() -> DocQaConfig {
    DocQaConfig::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        _ => None,
    })
    .unwrap()
}

fn app(reply: Option<&'static str>) -> (Router, Arc<RecordingService>) {
    let service = Arc::new(RecordingService {
        calls: Mutex::new(Vec::new()),
        reply,
    });
    let config = config();
    let dispatcher = QueryDispatcher::new(
        service.clone(),
        config.llm.model.clone(),
        config.llm.temperature,
    );
    let state = Arc::new(AppState::with_dispatcher(config, dispatcher));
    (build_router(state), service)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn upload(session_id: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(format!("/api/sessions/{}/document", session_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, request(Method::POST, "/api/sessions", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn ask(app: &Router, id: &str, question: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::POST,
            &format!("/api/sessions/{}/ask", id),
            Some(json!({ "question": question })),
        ),
    )
    .await
}

/// A PDF whose pages carry no text operators, like a scanned document.
fn scanned_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..page_count {
        let content = Content { operations: vec![] };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn status_reports_configuration() {
    let (app, _service) = app(Some("ok"));
    create_session(&app).await;

    let (status, body) = send(&app, request(Method::GET, "/api/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["llmConfigured"], true);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["temperature"], 0.2);
    assert_eq!(body["maxContextChars"], 12_000);
    assert_eq!(body["truncation"], "head");
    assert_eq!(body["activeSessions"], 1);
}

#[tokio::test]
async fn text_document_question_is_answered() {
    let (app, service) = app(Some("Blue."));
    let id = create_session(&app).await;

    let (status, doc) = send(&app, upload(&id, "notes.txt", b"The sky is blue.")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["filename"], "notes.txt");
    assert_eq!(doc["format"], "text");
    assert_eq!(doc["extractedChars"], 16);
    assert_eq!(doc["contextChars"], 16);
    assert_eq!(doc["truncated"], false);
    assert!(doc["warning"].is_null());

    let (status, body) = ask(&app, &id, "What color is the sky?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Blue.");
    assert_eq!(body["outcome"], "answered");
    assert_eq!(body["turns"], 2);

    let calls = service.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].messages.len(), 2);
    assert!(calls[0].messages[1]
        .content
        .contains("DOCUMENT CONTEXT:\nThe sky is blue.\n\nQUESTION:\nWhat color is the sky?"));
}

#[tokio::test]
async fn question_without_document_uses_fallback() {
    let (app, service) = app(Some("unused"));
    let id = create_session(&app).await;

    let (status, body) = ask(&app, &id, "What color is the sky?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Please upload a .txt or .pdf with text first.");
    assert_eq!(body["outcome"], "no_context");
    assert!(service.calls.lock().is_empty());

    let (_, transcript) = send(
        &app,
        request(Method::GET, &format!("/api/sessions/{}/transcript", id), None),
    )
    .await;
    let turns = transcript["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["content"], "What color is the sky?");
    assert_eq!(turns[1]["role"], "assistant");
}

#[tokio::test]
async fn scanned_pdf_warns_and_falls_back() {
    let (app, service) = app(Some("unused"));
    let id = create_session(&app).await;

    let (status, doc) = send(&app, upload(&id, "scan.PDF", &scanned_pdf(2))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["format"], "pdf");
    assert_eq!(doc["contextChars"], 0);
    assert_eq!(doc["warning"], NO_EXTRACTABLE_TEXT_WARNING);

    let (_, body) = ask(&app, &id, "Anything?").await;
    assert_eq!(body["outcome"], "no_context");
    assert!(service.calls.lock().is_empty());
}

#[tokio::test]
async fn unsupported_upload_warns() {
    let (app, _service) = app(Some("unused"));
    let id = create_session(&app).await;

    let (status, doc) = send(&app, upload(&id, "report.docx", b"PK\x03\x04")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["format"], "unsupported");
    assert_eq!(doc["warning"], NO_EXTRACTABLE_TEXT_WARNING);
}

#[tokio::test]
async fn service_failure_keeps_history() {
    let (app, service) = app(None);
    let id = create_session(&app).await;
    send(&app, upload(&id, "notes.txt", b"Some text.")).await;

    for question in ["First?", "Second?"] {
        let (status, body) = ask(&app, &id, question).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "unavailable");
        assert_eq!(
            body["answer"],
            "The document service is unavailable right now, please try again."
        );
    }
    assert_eq!(service.calls.lock().len(), 2);

    let (_, session) = send(&app, request(Method::GET, &format!("/api/sessions/{}", id), None)).await;
    let roles: Vec<&str> = session["transcript"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "assistant", "user", "assistant"]);
    assert_eq!(session["document"]["filename"], "notes.txt");
}

#[tokio::test]
async fn long_document_is_truncated() {
    let (app, service) = app(Some("ok"));
    let id = create_session(&app).await;

    let text = "x".repeat(12_000) + "TAIL";
    let (_, doc) = send(&app, upload(&id, "long.txt", text.as_bytes())).await;
    assert_eq!(doc["extractedChars"], 12_004);
    assert_eq!(doc["contextChars"], 12_000);
    assert_eq!(doc["truncated"], true);

    ask(&app, &id, "Where is the tail?").await;
    let calls = service.calls.lock();
    assert!(!calls[0].messages[1].content.contains("TAIL"));
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let (app, service) = app(Some("ok"));
    let id = create_session(&app).await;

    let (status, body) = ask(&app, &id, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
    assert!(service.calls.lock().is_empty());
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (app, _service) = app(Some("ok"));
    let id = create_session(&app).await;

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/sessions/{}/document", id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (app, _service) = app(Some("ok"));
    let missing = "00000000-0000-0000-0000-000000000000";

    let requests = [
        request(Method::GET, &format!("/api/sessions/{}", missing), None),
        request(Method::DELETE, &format!("/api/sessions/{}", missing), None),
        request(Method::POST, &format!("/api/sessions/{}/reset", missing), None),
        request(Method::GET, &format!("/api/sessions/{}/transcript", missing), None),
        request(
            Method::POST,
            &format!("/api/sessions/{}/ask", missing),
            Some(json!({ "question": "Hello?" })),
        ),
        upload(missing, "notes.txt", b"text"),
    ];

    for req in requests {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(missing));
    }
}

#[tokio::test]
async fn unknown_session_wins_over_blank_question() {
    let (app, _service) = app(Some("ok"));
    let missing = "00000000-0000-0000-0000-000000000000";

    let (status, body) = ask(&app, missing, "   ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(missing));
}

#[tokio::test]
async fn reset_and_delete_session() {
    let (app, _service) = app(Some("Blue."));
    let id = create_session(&app).await;
    send(&app, upload(&id, "notes.txt", b"The sky is blue.")).await;
    ask(&app, &id, "What color is the sky?").await;

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/api/sessions/{}/reset", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, session) = send(&app, request(Method::GET, &format!("/api/sessions/{}", id), None)).await;
    assert!(session["document"].is_null());
    assert_eq!(session["transcript"].as_array().unwrap().len(), 0);

    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/sessions/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request(Method::GET, &format!("/api/sessions/{}", id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
