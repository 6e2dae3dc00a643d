//! Generic read and write hooks over the API client and the query cache.
//!
//! [`Hooks::get`] turns an endpoint into a cached [`Query`]. [`Hooks::post`],
//! [`Hooks::put`] and [`Hooks::delete`] return a [`MutationHook`] whose
//! `mutate` performs one request and then, on success:
//!
//! 1. marks every cached read stale, so live queries refetch
//! 2. emits a success notification
//! 3. calls the `on_success` callback with the response body
//!
//! On failure it emits an error notification carrying the server's
//! `detail` (or a fixed fallback) and hands the error back to the caller.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::command::Command;
use crate::notify::Notifier;
use crate::query::{Mutation, Query, QueryClient, QueryKey};

/// Shared context for hooks: the API client, the cache and the
/// notification feed. Clones share all three.
#[derive(Debug, Clone)]
pub struct Hooks {
    api: ApiClient,
    queries: QueryClient,
    notifier: Notifier,
}

impl Hooks {
    pub const fn new(api: ApiClient, queries: QueryClient, notifier: Notifier) -> Self {
        Self {
            api,
            queries,
            notifier,
        }
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    pub const fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// A cached GET of `path` under `key`.
    ///
    /// `key` must capture every parameter in `path` (page number, id...).
    /// Use [`Query::enabled`] to hold the request back.
    pub fn get<V>(&self, key: impl Into<QueryKey>, path: impl Into<String>) -> Query<V>
    where
        V: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let api = self.api.clone();
        let path: Arc<str> = Arc::from(path.into());
        Query::new(
            key.into(),
            move || {
                let api = api.clone();
                let path = Arc::clone(&path);
                async move { api.get::<V>(&path).await }.boxed()
            },
            self.queries.clone(),
        )
    }

    /// A POST hook sending `P` as the JSON body of `path`.
    pub fn post<P, R>(&self, path: impl Into<String>) -> MutationHook<P, R>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        self.json_write(WriteKind::Create, Method::POST, path.into())
    }

    /// A PUT hook sending `P` as the JSON body of `path`.
    pub fn put<P, R>(&self, path: impl Into<String>) -> MutationHook<P, R>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        self.json_write(WriteKind::Update, Method::PUT, path.into())
    }

    /// A DELETE hook; the payload is the resource id, sent to `{path}/{id}`.
    pub fn delete<I, R>(&self, path: impl Into<String>) -> MutationHook<I, R>
    where
        I: fmt::Display + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let path = path.into();
        let base = path.trim_end_matches('/').to_string();
        self.hook(WriteKind::Delete, path, move |id: I| {
            Ok(ApiRequest::new(Method::DELETE, format!("{base}/{id}")))
        })
    }

    fn json_write<P, R>(&self, kind: WriteKind, method: Method, path: String) -> MutationHook<P, R>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let target = path.clone();
        self.hook(kind, path, move |payload: P| {
            let body = serde_json::to_value(&payload)?;
            Ok(ApiRequest::new(method.clone(), target.clone()).json(body))
        })
    }

    fn hook<P, R, F>(&self, kind: WriteKind, path: String, build: F) -> MutationHook<P, R>
    where
        F: Fn(P) -> Result<ApiRequest, ApiError> + Send + Sync + 'static,
    {
        MutationHook {
            kind,
            path,
            build: Arc::new(build),
            hooks: self.clone(),
            on_success: None,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// The flavor of a write, which decides its notification texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

impl WriteKind {
    pub const fn success_text(self) -> &'static str {
        match self {
            Self::Create => "Operation successful!",
            Self::Update => "Updated successfully!",
            Self::Delete => "Deleted successfully!",
        }
    }

    pub const fn fallback_text(self) -> &'static str {
        match self {
            Self::Create => "Operation failed!",
            Self::Update => "Update failed!",
            Self::Delete => "Delete failed!",
        }
    }
}

type BuildRequest<P> = Arc<dyn Fn(P) -> Result<ApiRequest, ApiError> + Send + Sync>;
type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;

/// A write endpoint bound to the shared cache and notification feed.
///
/// Clones share the pending counter. Concurrent `mutate` calls are
/// independent and may complete in any order.
pub struct MutationHook<P, R> {
    kind: WriteKind,
    path: String,
    build: BuildRequest<P>,
    hooks: Hooks,
    on_success: Option<SuccessCallback<R>>,
    pending: Arc<AtomicUsize>,
}

impl<P, R> Clone for MutationHook<P, R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            path: self.path.clone(),
            build: Arc::clone(&self.build),
            hooks: self.hooks.clone(),
            on_success: self.on_success.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<P, R> fmt::Debug for MutationHook<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHook")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("pending", &self.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<P, R> MutationHook<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Registers a callback invoked with the response body after a
    /// successful write.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub const fn kind(&self) -> WriteKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `true` while at least one `mutate` of this hook is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Returns a command performing the write once.
    ///
    /// The hook counts as pending from this call until the command finishes
    /// or is dropped.
    pub fn mutate(&self, payload: P) -> Command<Result<R, ApiError>>
    where
        R: DeserializeOwned,
    {
        let guard = PendingGuard::enter(&self.pending);
        let hook = self.clone();
        Mutation::mutate(payload, move |payload| {
            async move {
                let result = hook.perform(payload).await;
                drop(guard);
                result
            }
            .boxed()
        })
    }

    /// Performs the write and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the request error after the error notification was emitted.
    pub async fn mutate_async(&self, payload: P) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let _guard = PendingGuard::enter(&self.pending);
        self.perform(payload).await
    }

    async fn perform(&self, payload: P) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let result = match (self.build)(payload) {
            Ok(request) => self.hooks.api.send::<R>(request).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(body) => {
                tracing::debug!(path = %self.path, kind = ?self.kind, "write succeeded");
                self.hooks.queries.invalidate_all();
                self.hooks.notifier.success(self.kind.success_text());
                if let Some(callback) = &self.on_success {
                    callback(&body);
                }
                Ok(body)
            }
            Err(err) => {
                tracing::warn!(path = %self.path, kind = ?self.kind, error = %err, "write failed");
                self.hooks
                    .notifier
                    .error(err.user_message(self.kind.fallback_text()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryTokenStore;
    use crate::api::mock::{MockResponse, MockTransport};
    use crate::notify::{Level, Notification};
    use crate::subscription::SubscriptionSource;
    use futures::StreamExt;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn hooks(transport: &MockTransport) -> Hooks {
        Hooks::new(
            ApiClient::new(transport.clone(), MemoryTokenStore::new()),
            QueryClient::new(),
            Notifier::new(),
        )
    }

    #[tokio::test]
    async fn test_post_success_invalidates_and_notifies() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/data", MockResponse::json(201, json!({"id": 1})));
        let hooks = hooks(&transport);
        hooks.queries().set_cached(QueryKey::from(["data", "1"]), 5);
        let mut notes = hooks.notifier().subscribe();

        let hook = hooks.post::<Value, Value>("/api/data");
        let result = hook.mutate_async(json!({"name": "a"})).await;

        assert_eq!(result, Ok(json!({"id": 1})));
        assert_eq!(hooks.queries().is_stale(&QueryKey::from(["data", "1"])), Some(true));
        assert_eq!(
            notes.recv().await.ok(),
            Some(Notification::new(Level::Success, "Operation successful!"))
        );
        let sent = transport.requests_to(&Method::POST, "/api/data");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].json_body(), Some(&json!({"name": "a"})));
    }

    #[tokio::test]
    async fn test_failure_uses_server_detail() {
        let transport = MockTransport::new();
        transport.respond(
            Method::PUT,
            "/api/data/3",
            MockResponse::json(400, json!({"detail": "Name taken"})),
        );
        let hooks = hooks(&transport);
        let mut notes = hooks.notifier().subscribe();

        let result = hooks
            .put::<Value, Value>("/api/data/3")
            .mutate_async(json!({}))
            .await;

        assert_eq!(result.as_ref().err().and_then(ApiError::detail), Some("Name taken"));
        assert_eq!(
            notes.recv().await.ok(),
            Some(Notification::new(Level::Error, "Name taken"))
        );
    }

    #[tokio::test]
    async fn test_failure_without_detail_uses_fallback() {
        let transport = MockTransport::new();
        transport.respond(Method::DELETE, "/api/data/9", MockResponse::empty(500));
        let hooks = hooks(&transport);
        hooks.queries().set_cached(QueryKey::from("data"), 1);
        let mut notes = hooks.notifier().subscribe();

        let result = hooks.delete::<u64, Value>("/api/data").mutate_async(9).await;

        assert!(result.is_err());
        assert_eq!(
            notes.recv().await.ok(),
            Some(Notification::new(Level::Error, "Delete failed!"))
        );
        // A failed write leaves the cache alone.
        assert_eq!(hooks.queries().is_stale(&QueryKey::from("data")), Some(false));
    }

    #[tokio::test]
    async fn test_delete_appends_id() {
        let transport = MockTransport::new();
        transport.respond(Method::DELETE, "/api/users/42", MockResponse::empty(204));
        let hooks = hooks(&transport);

        let result = hooks.delete::<u64, ()>("/api/users/").mutate_async(42).await;

        assert_eq!(result, Ok(()));
        assert_eq!(transport.requests_to(&Method::DELETE, "/api/users/42").len(), 1);
    }

    #[tokio::test]
    async fn test_on_success_receives_body() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/submit", MockResponse::json(200, json!("ok")));
        let hooks = hooks(&transport);
        let seen = Arc::new(std::sync::Mutex::new(None));

        let hook = hooks.post::<Value, String>("/api/submit").on_success({
            let seen = Arc::clone(&seen);
            move |body: &String| {
                if let Ok(mut slot) = seen.lock() {
                    *slot = Some(body.clone());
                }
            }
        });
        let results = hook.mutate(json!({})).collect_messages().await;

        assert_eq!(results, vec![Ok("ok".to_string())]);
        assert_eq!(*seen.lock().expect("lock"), Some("ok".to_string()));
    }

    #[tokio::test]
    async fn test_is_pending_tracks_in_flight_writes() {
        let transport = MockTransport::new().with_delay(Duration::from_millis(30));
        transport.respond(Method::POST, "/api/data", MockResponse::json(200, json!(null)));
        let hooks = hooks(&transport);
        let hook = hooks.post::<Value, Value>("/api/data");

        assert!(!hook.is_pending());
        let cmd = hook.mutate(json!({}));
        assert!(hook.is_pending());

        cmd.collect_messages().await;
        assert!(!hook.is_pending());
    }

    #[tokio::test]
    async fn test_dropped_command_is_not_pending() {
        let transport = MockTransport::new();
        let hooks = hooks(&transport);
        let hook = hooks.post::<Value, Value>("/api/data");

        drop(hook.mutate(json!({})));

        assert!(!hook.is_pending());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let transport = MockTransport::new().with_delay(Duration::from_millis(20));
        transport.respond(Method::GET, "/api/users", MockResponse::json(200, json!([1, 2])));
        let hooks = hooks(&transport);

        let a = hooks.get::<Vec<u32>>("users", "/api/users");
        let b = hooks.get::<Vec<u32>>("users", "/api/users");
        let mut sa = a.stream().skip(1);
        let mut sb = b.stream().skip(1);

        let (ra, rb) = tokio::join!(sa.next(), sb.next());

        assert_eq!(ra.as_ref().and_then(|r| r.data()), Some(&vec![1, 2]));
        assert_eq!(rb.as_ref().and_then(|r| r.data()), Some(&vec![1, 2]));
        assert_eq!(transport.requests_to(&Method::GET, "/api/users").len(), 1);
    }

    #[test]
    fn test_write_kind_texts() {
        assert_eq!(WriteKind::Create.success_text(), "Operation successful!");
        assert_eq!(WriteKind::Update.success_text(), "Updated successfully!");
        assert_eq!(WriteKind::Delete.success_text(), "Deleted successfully!");
        assert_eq!(WriteKind::Create.fallback_text(), "Operation failed!");
        assert_eq!(WriteKind::Update.fallback_text(), "Update failed!");
        assert_eq!(WriteKind::Delete.fallback_text(), "Delete failed!");
    }
}
