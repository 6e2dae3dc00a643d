//! Common imports.
//!
//! ```
//! use apidesk::prelude::*;
//! ```

pub use crate::api::{ApiClient, ApiError};
pub use crate::application::Application;
pub use crate::command::{Action, Command};
pub use crate::hooks::{Hooks, MutationHook};
pub use crate::notify::{Notification, Notifier};
pub use crate::query::{Query, QueryClient, QueryKey, QueryResult, QueryState};
pub use crate::runtime::Runtime;
pub use crate::subscription::Subscription;
