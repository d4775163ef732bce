//! Integration tests: REST flows against a mock backend on a loopback port.

mod common;

use axum::http::{Method, StatusCode};
use ayna::api::{ApiErrorKind, UNEXPECTED_MESSAGE, UNEXPECTED_STATUS};
use ayna::auth::FlowError;
use ayna::directory::NEW_SESSION_PREVIEW;
use ayna::notify::NoticeLevel;
use ayna::routing::Route;
use ayna::storage::{LocalStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
use ayna::validation::SignInForm;
use common::{app_at, message, seed_login, Backend};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn sign_in_persists_identity_and_token() {
    let backend = Backend::new();
    backend.respond(
        Method::POST,
        "/api/auth/local",
        StatusCode::OK,
        json!({ "jwt": "t1", "user": { "id": 1, "username": "a", "email": "a@b.com", "documentId": "u1" } }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    let (app, mut notices) = app_at(&origin, storage.clone()).await;

    let form = SignInForm {
        email: "a@b.com".into(),
        password: "Abcd1234!".into(),
    };
    let user = app.auth_flow().sign_in(&form).await.expect("sign in");
    assert_eq!(user.document_id, "u1");

    assert!(app.auth().is_logged_in().await);
    assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("t1"));
    let snapshot: serde_json::Value =
        serde_json::from_str(&storage.get(USER_KEY).expect("snapshot")).unwrap();
    assert_eq!(
        snapshot,
        json!({ "username": "a", "email": "a@b.com", "userId": "u1" })
    );
    assert_eq!(app.navigator().current(), Route::Home);

    let notice = notices.try_recv().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Welcome! Ayna missed you!");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        Some(json!({ "identifier": "a@b.com", "password": "Abcd1234!" }))
    );
    assert_eq!(requests[0].authorization, None);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_server() {
    let backend = Backend::new();
    let origin = backend.serve().await;
    let (app, _notices) = app_at(&origin, Arc::new(MemoryStorage::new())).await;

    let form = SignInForm {
        email: "a@b.com".into(),
        password: "abc".into(),
    };
    let err = app.auth_flow().sign_in(&form).await.unwrap_err();
    let errors = match err {
        FlowError::Invalid(errors) => errors,
        other => panic!("expected validation failure, got {:?}", other),
    };
    assert_eq!(
        errors.password.as_deref(),
        Some("Password must be at least 8 characters long")
    );
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn structured_server_error_is_surfaced() {
    let backend = Backend::new();
    backend.respond(
        Method::POST,
        "/api/auth/local",
        StatusCode::BAD_REQUEST,
        json!({ "data": null, "error": { "status": 400, "name": "ValidationError", "message": "Invalid identifier or password" } }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    let (app, mut notices) = app_at(&origin, storage.clone()).await;

    let form = SignInForm {
        email: "a@b.com".into(),
        password: "Abcd1234!".into(),
    };
    let err = app.auth_flow().sign_in(&form).await.unwrap_err();
    let e = match err {
        FlowError::Api(e) => e,
        other => panic!("expected api error, got {:?}", other),
    };
    assert_eq!(e.message, "Invalid identifier or password");
    assert_eq!(e.name, "ValidationError");
    assert_eq!(e.status, 400);
    assert_eq!(e.kind(), ApiErrorKind::Server);

    let notice = notices.try_recv().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Invalid identifier or password");
    assert!(!app.auth().is_logged_in().await);
    assert_eq!(storage.get(TOKEN_KEY), None);
}

#[tokio::test]
async fn unstructured_failure_becomes_generic_error() {
    let backend = Backend::new();
    backend.respond_raw(
        Method::GET,
        "/api/sessions",
        StatusCode::BAD_GATEWAY,
        "<html>bad gateway</html>".into(),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage).await;

    let e = app.sessions_api().list().await.unwrap_err();
    assert_eq!(e.message, UNEXPECTED_MESSAGE);
    assert_eq!(e.status, UNEXPECTED_STATUS);
    assert_eq!(e.kind(), ApiErrorKind::Unexpected);
}

#[tokio::test]
async fn unauthorized_clears_credentials_and_redirects() {
    let backend = Backend::new();
    backend.respond(
        Method::GET,
        "/api/sessions",
        StatusCode::UNAUTHORIZED,
        json!({ "data": null, "error": { "status": 401, "name": "UnauthorizedError", "message": "Missing or invalid credentials" } }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage.clone()).await;
    assert!(app.auth().is_logged_in().await);
    app.directory().select("s1");

    let e = app.directory().load().await.unwrap_err();
    assert_eq!(e.kind(), ApiErrorKind::Unauthorized);
    assert_eq!(e.message, "Missing or invalid credentials");

    assert!(!app.auth().is_logged_in().await);
    assert_eq!(storage.get(TOKEN_KEY), None);
    assert_eq!(storage.get(USER_KEY), None);
    assert_eq!(app.navigator().current(), Route::SignIn);
    assert_eq!(
        backend.requests()[0].authorization.as_deref(),
        Some("Bearer t1")
    );
}

#[tokio::test]
async fn directory_load_replaces_store() {
    let backend = Backend::new();
    backend.respond(
        Method::GET,
        "/api/sessions",
        StatusCode::OK,
        json!({
            "data": [
                { "documentId": "s2", "lastMessage": "newer" },
                { "documentId": "s1", "lastMessage": "older" }
            ],
            "meta": {}
        }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage).await;
    let directory = app.directory();
    directory.store().set_all(vec![]).await;

    directory.load().await.expect("load");
    let ids: Vec<String> = directory
        .store()
        .list()
        .await
        .into_iter()
        .map(|s| s.document_id)
        .collect();
    assert_eq!(ids, vec!["s2", "s1"]);
    assert_eq!(
        backend.requests()[0].query.get("sort[0]").map(String::as_str),
        Some("createdAt:desc")
    );
}

#[tokio::test]
async fn create_session_prepends_and_opens_thread() {
    let backend = Backend::new();
    backend.respond(
        Method::POST,
        "/api/sessions",
        StatusCode::CREATED,
        json!({ "data": { "id": 7, "documentId": "s1", "lastMessage": "Start Chatting...", "createdAt": "2025-01-01T00:00:00.000Z" }, "meta": {} }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, mut notices) = app_at(&origin, storage).await;
    let directory = app.directory();
    assert!(directory.store().list().await.is_empty());

    let created = directory.create().await.expect("create");
    assert_eq!(created.document_id, "s1");
    assert_eq!(created.last_message, NEW_SESSION_PREVIEW);

    let listed = directory.store().list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].document_id, "s1");
    assert_eq!(app.navigator().current(), Route::Thread("s1".into()));
    assert_eq!(notices.try_recv().expect("notice").level, NoticeLevel::Success);

    let body = backend.requests()[0].body.clone().expect("body");
    assert_eq!(
        body,
        json!({ "data": { "lastMessage": "Start Chatting..." } })
    );
}

#[tokio::test]
async fn thread_history_keeps_server_order() {
    let backend = Backend::new();
    backend.respond(
        Method::GET,
        "/api/messages",
        StatusCode::OK,
        json!({
            "data": [
                message("m3", "third", "SERVER", "s1"),
                message("m2", "second", "USER", "s1"),
                message("m1", "first", "USER", "s1")
            ],
            "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 3 } }
        }),
    );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage).await;

    let mut thread = app.thread();
    thread.open("s1").await;
    let ids: Vec<&str> = thread
        .messages()
        .iter()
        .map(|m| m.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["m3", "m2", "m1"]);
    assert!(!thread.has_older());
    assert!(!thread.is_loading());

    let history = backend
        .requests()
        .into_iter()
        .find(|r| r.path == "/api/messages")
        .expect("history request");
    let q = &history.query;
    assert_eq!(q.get("filters[session][documentId][$eq]").map(String::as_str), Some("s1"));
    assert_eq!(q.get("sort[0]").map(String::as_str), Some("createdAt:desc"));
    assert_eq!(q.get("pagination[page]").map(String::as_str), Some("1"));
    assert_eq!(q.get("pagination[pageSize]").map(String::as_str), Some("10"));
    thread.close().await;
}

#[tokio::test]
async fn history_failure_leaves_thread_empty() {
    let backend = Backend::new();
    backend.respond_raw(Method::GET, "/api/messages", StatusCode::INTERNAL_SERVER_ERROR, String::new());
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, mut notices) = app_at(&origin, storage).await;

    let mut thread = app.thread();
    thread.open("s1").await;
    assert!(thread.messages().is_empty());
    let notice = notices.try_recv().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, UNEXPECTED_MESSAGE);
    thread.close().await;
}

#[tokio::test]
async fn load_older_appends_unseen_messages() {
    let backend = Backend::new();
    backend
        .respond(
            Method::GET,
            "/api/messages",
            StatusCode::OK,
            json!({
                "data": [message("m4", "d", "SERVER", "s1"), message("m3", "c", "USER", "s1")],
                "meta": { "pagination": { "page": 1, "pageSize": 2, "pageCount": 2, "total": 4 } }
            }),
        )
        .respond(
            Method::GET,
            "/api/messages",
            StatusCode::OK,
            json!({
                "data": [message("m3", "c", "USER", "s1"), message("m2", "b", "SERVER", "s1")],
                "meta": { "pagination": { "page": 2, "pageSize": 2, "pageCount": 2, "total": 4 } }
            }),
        );
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage).await;

    let mut thread = app.thread();
    thread.open("s1").await;
    assert!(thread.has_older());
    assert_eq!(thread.load_older().await.expect("older"), 1);
    let ids: Vec<&str> = thread
        .messages()
        .iter()
        .map(|m| m.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["m4", "m3", "m2"]);
    assert!(!thread.has_older());
    assert_eq!(thread.load_older().await.expect("no more"), 0);

    let pages: Vec<String> = backend
        .requests()
        .into_iter()
        .filter(|r| r.path == "/api/messages")
        .filter_map(|r| r.query.get("pagination[page]").cloned())
        .collect();
    assert_eq!(pages, vec!["1", "2"]);
    thread.close().await;
}

#[tokio::test]
async fn loading_flag_is_raised_while_history_is_fetched() {
    let backend = Backend::new();
    backend.respond(
        Method::GET,
        "/api/messages",
        StatusCode::OK,
        json!({
            "data": [message("m1", "first", "USER", "s1")],
            "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 1 } }
        }),
    );
    backend.delay_responses(std::time::Duration::from_millis(300));
    let origin = backend.serve().await;
    let storage = Arc::new(MemoryStorage::new());
    seed_login(&storage);
    let (app, _notices) = app_at(&origin, storage).await;

    let mut thread = app.thread();
    let mut loading = thread.loading_updates();
    assert!(!*loading.borrow());
    let observed = async {
        let raised = loading.wait_for(|l| *l).await.is_ok();
        let lowered = loading.wait_for(|l| !*l).await.is_ok();
        (raised, lowered)
    };
    let ((), (raised, lowered)) = tokio::join!(thread.open("s1"), observed);
    assert!(raised, "loading never raised");
    assert!(lowered, "loading never lowered");
    assert!(!thread.is_loading());
    assert_eq!(thread.messages().len(), 1);
    thread.close().await;
}
