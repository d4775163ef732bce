//! Mock backend for integration tests: canned REST responses plus a minimal Socket.IO endpoint.
//! Every REST request and every client WebSocket frame is recorded.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ayna::app::App;
use ayna::config::Config;
use ayna::notify::Notice;
use ayna::storage::{LocalStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const VALID_TOKEN: &str = "t1";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
pub struct Backend {
    responses: Arc<Mutex<HashMap<(Method, String), VecDeque<(StatusCode, String)>>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    frames: Arc<Mutex<Vec<String>>>,
    next_id: Arc<AtomicUsize>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`. The last queued response is repeated.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) -> &Self {
        self.respond_raw(method, path, status, body.to_string())
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: StatusCode, body: String) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((status, body));
        self
    }

    /// Hold every REST response for `delay` before answering.
    pub fn delay_responses(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Wait until a client frame equal to `frame` has been received.
    pub async fn wait_for_frame(&self, frame: &str) -> bool {
        for _ in 0..100 {
            if self.frames().iter().any(|f| f == frame) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    /// Serve on a loopback port and return the origin (`http://127.0.0.1:PORT`).
    pub async fn serve(&self) -> String {
        let router = Router::new()
            .route("/socket.io/", get(socket_io))
            .fallback(canned)
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local_addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }
}

async fn canned(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed = reqwest::Url::parse(&format!("http://mock{}", uri)).expect("request uri");
    backend.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: parsed.path().to_string(),
        query: parsed.query_pairs().into_owned().collect(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });
    let delay = *backend.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut responses = backend.responses.lock().unwrap();
    let queue = responses.get_mut(&(method, parsed.path().to_string()));
    let next = match queue {
        Some(q) if q.len() > 1 => q.pop_front(),
        Some(q) => q.front().cloned(),
        None => None,
    };
    match next {
        Some((status, body)) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no canned response").into_response(),
    }
}

async fn socket_io(ws: WebSocketUpgrade, State(backend): State<Backend>) -> Response {
    ws.on_upgrade(move |socket| engine_session(socket, backend))
}

/// Engine.IO/Socket.IO server side: open, connect with token check, ping, join, and
/// `sendMessage` echoed back to the sender as `receive_message`.
/// A text of the form `edit:<id>` is echoed with that document id; the text `hangup`
/// makes the server disconnect the socket.
async fn engine_session(mut socket: WebSocket, backend: Backend) {
    let open = r#"0{"sid":"mock","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
    if socket.send(WsMessage::Text(open.to_string())).await.is_err() {
        return;
    }
    let mut session_id = String::new();
    while let Some(Ok(msg)) = socket.recv().await {
        let WsMessage::Text(text) = msg else { continue };
        backend.frames.lock().unwrap().push(text.clone());

        if let Some(auth) = text.strip_prefix("40") {
            let token = serde_json::from_str::<Value>(auth)
                .ok()
                .and_then(|v| v.get("token").and_then(Value::as_str).map(str::to_string));
            if token.as_deref() != Some(VALID_TOKEN) {
                let _ = socket
                    .send(WsMessage::Text(r#"44{"message":"Authentication error"}"#.into()))
                    .await;
                return;
            }
            let _ = socket.send(WsMessage::Text(r#"40{"sid":"mock-socket"}"#.into())).await;
            let _ = socket.send(WsMessage::Text("2".into())).await;
        } else if text == "41" {
            return;
        } else if let Some(body) = text.strip_prefix("42") {
            let Ok(Value::Array(args)) = serde_json::from_str::<Value>(body) else {
                continue;
            };
            let payload = args.get(1).cloned().unwrap_or(Value::Null);
            if args[0] == "join" {
                session_id = payload["sessionId"].as_str().unwrap_or_default().to_string();
            } else if args[0] == "sendMessage" {
                let text = payload["text"].as_str().unwrap_or_default().to_string();
                if text == "hangup" {
                    let _ = socket.send(WsMessage::Text("41".into())).await;
                    return;
                }
                let id = match text.strip_prefix("edit:") {
                    Some(id) => id.to_string(),
                    None => format!("live{}", backend.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                };
                let record = json!({
                    "documentId": id,
                    "text": text,
                    "senderType": "USER",
                    "session": { "documentId": session_id },
                    "createdAt": "2025-01-01T00:00:00.000Z"
                });
                let frame = format!("42{}", json!(["receive_message", record]));
                if socket.send(WsMessage::Text(frame)).await.is_err() {
                    return;
                }
            }
        }
    }
}

pub fn message(id: &str, text: &str, sender: &str, session: &str) -> Value {
    json!({
        "documentId": id,
        "text": text,
        "senderType": sender,
        "session": { "documentId": session },
        "user": null,
        "createdAt": "2025-01-01T00:00:00.000Z"
    })
}

pub fn seed_login(storage: &MemoryStorage) {
    storage.set(TOKEN_KEY, VALID_TOKEN).unwrap();
    storage
        .set(USER_KEY, r#"{"username":"a","email":"a@b.com","userId":"u1"}"#)
        .unwrap();
}

pub async fn app_at(
    origin: &str,
    storage: Arc<MemoryStorage>,
) -> (App, UnboundedReceiver<Notice>) {
    let mut config = Config::default();
    config.api.base_url = origin.to_string();
    config.api.request_timeout_secs = Some(5);
    App::new(config, storage).await.expect("build app")
}
