//! # apidesk - a terminal frontend for a CRUD HTTP API
//!
//! apidesk browses, edits and submits data against a remote JSON API from the
//! terminal. It is built on a small Elm-style runtime over
//! [ratatui](https://ratatui.rs/) and a client-side query cache.
//!
//! ## Layers
//!
//! - [`api`]: the HTTP client, error mapping, bearer token storage
//! - [`services`]: typed operations per endpoint group (data, users, auth...)
//! - [`query`]: cached reads as subscriptions, writes as commands
//! - [`hooks`]: generic read/write hooks that invalidate the cache and notify
//! - [`app`]: the screens (home, data, forms, users, settings)
//!
//! The runtime pieces ([`Application`](application::Application),
//! [`Runtime`](runtime::Runtime), [`Command`](command::Command) and
//! [`Subscription`](subscription::Subscription)) drive the whole thing:
//! `update` returns commands for side effects, `subscriptions` declares the
//! event sources that should be running, and the runtime redraws with
//! `view` after each batch of messages.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ratatui::Frame;
//! use apidesk::{application::Application, command::Command, subscription::Subscription};
//!
//! #[derive(Debug)]
//! enum Message {
//!     Refresh,
//! }
//!
//! struct Dashboard {
//!     refreshes: u32,
//! }
//!
//! impl Application for Dashboard {
//!     type Message = Message;
//!     type Flags = ();
//!
//!     fn new(_flags: ()) -> (Self, Command<Message>) {
//!         (Dashboard { refreshes: 0 }, Command::none())
//!     }
//!
//!     fn update(&mut self, msg: Message) -> Command<Message> {
//!         match msg {
//!             Message::Refresh => {
//!                 self.refreshes += 1;
//!                 Command::none()
//!             }
//!         }
//!     }
//!
//!     fn view(&self, frame: &mut Frame<'_>) {}
//!
//!     fn subscriptions(&self) -> Vec<Subscription<Message>> {
//!         vec![]
//!     }
//! }
//! ```

pub mod api;
pub mod app;
pub mod application;
pub mod command;
pub mod config;
pub mod forms;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod notify;
pub mod prelude;
pub mod query;
pub mod runtime;
pub mod services;
pub mod subscription;
