// Integration tests for the read/write flows over the mock API: cached
// queries, write hooks, auth token handling and form submission.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::time::Duration;

use apidesk::api::mock::{MockResponse, MockTransport};
use apidesk::api::{ApiClient, MemoryTokenStore, TokenStore};
use apidesk::app::data::{page_key, page_path};
use apidesk::forms::FormDraft;
use apidesk::hooks::{Hooks, MutationHook};
use apidesk::models::{DataItem, LoginCredentials, Page, User};
use apidesk::notify::{Level, Notifier};
use apidesk::query::{QueryClient, QueryKey, QueryResult};
use apidesk::services::Api;
use apidesk::subscription::Subscription;
use futures::StreamExt;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::time::timeout;

fn setup(transport: &MockTransport) -> (MemoryTokenStore, Hooks) {
    let tokens = MemoryTokenStore::new();
    let hooks = Hooks::new(
        ApiClient::new(transport.clone(), tokens.clone()),
        QueryClient::new(),
        Notifier::new(),
    );
    (tokens, hooks)
}

fn users_json() -> Value {
    json!([{
        "id": 1,
        "name": "Ada",
        "email": "ada@example.com",
        "role": "admin",
        "created_at": "2024-01-01"
    }])
}

// Pulls results off a query stream until the first non-stale success.
async fn first_fresh<V: Clone + Send + Sync + 'static>(
    sub: Subscription<QueryResult<V>>,
) -> QueryResult<V> {
    let mut stream = sub.into_stream();
    while let Some(result) = stream.next().await {
        if result.is_success() && !result.is_stale() {
            return result;
        }
    }
    panic!("query stream ended without data");
}

#[tokio::test]
async fn test_concurrent_reads_share_one_request() {
    let transport = MockTransport::new().with_delay(Duration::from_millis(30));
    transport.respond(Method::GET, "/api/users", MockResponse::json(200, users_json()));
    let (_tokens, hooks) = setup(&transport);

    let a = Subscription::new(hooks.get::<Vec<User>>("users", "/api/users"));
    let b = Subscription::new(hooks.get::<Vec<User>>("users", "/api/users"));
    let (a, b) = timeout(Duration::from_secs(1), async {
        tokio::join!(first_fresh(a), first_fresh(b))
    })
    .await
    .expect("both queries resolve");

    assert_eq!(a.data().map(Vec::len), Some(1));
    assert_eq!(a, b);
    assert_eq!(transport.requests_to(&Method::GET, "/api/users").len(), 1);
}

#[tokio::test]
async fn test_successful_write_marks_reads_stale() {
    let transport = MockTransport::new();
    transport.respond(Method::GET, "/api/users", MockResponse::json(200, users_json()));
    transport.respond(Method::POST, "/api/users", MockResponse::json(201, json!({"id": 2})));
    let (_tokens, hooks) = setup(&transport);
    let key = QueryKey::from("users");

    let _ = first_fresh(Subscription::new(hooks.get::<Vec<User>>(key.clone(), "/api/users"))).await;
    assert_eq!(hooks.queries().is_stale(&key), Some(false));

    let create: MutationHook<Value, Value> = hooks.post("/api/users");
    create.mutate_async(json!({"name": "Bo"})).await.expect("create");

    assert_eq!(hooks.queries().is_stale(&key), Some(true));
}

#[tokio::test]
async fn test_failed_write_keeps_reads_fresh() {
    let transport = MockTransport::new();
    transport.respond(Method::GET, "/api/users", MockResponse::json(200, users_json()));
    transport.respond(Method::DELETE, "/api/users/1", MockResponse::empty(500));
    let (_tokens, hooks) = setup(&transport);
    let key = QueryKey::from("users");
    let mut notes = hooks.notifier().subscribe();

    let _ = first_fresh(Subscription::new(hooks.get::<Vec<User>>(key.clone(), "/api/users"))).await;
    let delete: MutationHook<u64, Value> = hooks.delete("/api/users");
    let err = delete.mutate_async(1).await.expect_err("server error");

    assert_eq!(err.status(), Some(500));
    assert_eq!(hooks.queries().is_stale(&key), Some(false));
    let note = notes.recv().await.expect("notification");
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.text, "Delete failed!");
}

#[tokio::test]
async fn test_pages_are_cached_separately() {
    let transport = MockTransport::new();
    transport.respond(
        Method::GET,
        "/api/data",
        MockResponse::json(
            200,
            json!({"items": [{"id": 1, "name": "a", "description": "", "created_at": ""}], "total": 11}),
        ),
    );
    let (_tokens, hooks) = setup(&transport);

    for page in [1, 2, 1] {
        let query = hooks.get::<Page<DataItem>>(page_key(page), page_path(page));
        let result = first_fresh(Subscription::new(query)).await;
        assert_eq!(result.data().and_then(|p| p.total), Some(11));
    }

    let pages: Vec<_> = transport
        .requests_to(&Method::GET, "/api/data")
        .iter()
        .filter_map(|r| r.query_param("page"))
        .collect();
    assert_eq!(pages, ["1", "2"], "page 1 is served from cache the second time");
}

#[tokio::test]
async fn test_login_then_logout_controls_bearer() {
    let transport = MockTransport::new();
    transport.respond(
        Method::POST,
        "/api/auth/login",
        MockResponse::json(
            200,
            json!({
                "access_token": "tok-123",
                "token_type": "bearer",
                "user": users_json()[0]
            }),
        ),
    );
    transport.respond(Method::GET, "/api/auth/verify", MockResponse::json(200, json!({"valid": true})));
    transport.respond(Method::POST, "/api/auth/logout", MockResponse::json(200, json!({})));
    let (tokens, hooks) = setup(&transport);
    let auth = Api::new(hooks.api().clone()).auth();

    let credentials = LoginCredentials {
        email: "ada@example.com".to_string(),
        password: "secret".to_string(),
    };
    auth.login(&credentials).await.expect("login");
    assert_eq!(tokens.get().as_deref(), Some("tok-123"));

    auth.verify().await.expect("verify");
    let verify = transport.requests_to(&Method::GET, "/api/auth/verify");
    assert_eq!(verify[0].bearer.as_deref(), Some("tok-123"));

    auth.logout().await.expect("logout");
    assert_eq!(tokens.get(), None);
    let logout = transport.requests_to(&Method::POST, "/api/auth/logout");
    assert_eq!(logout[0].bearer, None, "token is cleared before the logout call");
}

#[tokio::test]
async fn test_form_age_boundary() {
    let transport = MockTransport::new();
    transport.respond(Method::POST, "/api/submit", MockResponse::json(200, json!({"ok": true})));
    let (_tokens, hooks) = setup(&transport);
    let submit: MutationHook<_, Value> = hooks.post("/api/submit");

    let mut draft = FormDraft {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        age: "17".to_string(),
        message: "Long enough message".to_string(),
    };
    assert!(draft.parse().is_err());

    draft.age = "18".to_string();
    let form = draft.parse().expect("valid at 18");
    submit.mutate_async(form).await.expect("submit");

    assert_eq!(transport.requests_to(&Method::POST, "/api/submit").len(), 1);
    assert_eq!(transport.request_count(), 1);
}
