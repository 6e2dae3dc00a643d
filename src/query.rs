//! Client-side caching for API reads.
//!
//! Reads are **subscriptions**: a [`Query`] declared in
//! `Application::subscriptions` fetches through the shared [`QueryClient`]
//! and keeps the view in sync with the cache:
//!
//! 1. cached data is emitted immediately
//! 2. missing or stale data is fetched, one request per key at a time
//! 3. an invalidation makes every live query on the key refetch
//!
//! Writes are **commands**: [`Mutation::mutate`] returns a `Command` that
//! performs one request. Invalidating afterwards is the caller's job (the
//! hooks in [`crate::hooks`] do it for you).
//!
//! ```
//! use apidesk::api::ApiError;
//! use apidesk::query::{Query, QueryClient, QueryKey, QueryResult};
//! use apidesk::subscription::Subscription;
//! use futures::FutureExt;
//!
//! enum Message {
//!     Page(QueryResult<Vec<String>>),
//! }
//!
//! let client = QueryClient::new();
//! let page = 2;
//! let subscription = Subscription::new(Query::new(
//!     QueryKey::from("data").with(page),
//!     move || async move { Ok::<_, ApiError>(vec![format!("page {page}")]) }.boxed(),
//!     client.clone(),
//! ))
//! .map(Message::Page);
//! # drop(subscription);
//! ```

mod cache;
mod client;
mod config;
mod key;
mod mutation;
mod source;

pub use cache::CacheEntry;
pub use client::{Invalidation, LiveKey, QueryClient};
pub use config::QueryConfig;
pub use key::QueryKey;
pub use mutation::Mutation;
pub use source::{Query, QueryResult, QueryState};
