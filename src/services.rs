//! Typed wrappers, one async function per remote operation.
//!
//! Every function performs exactly one HTTP call through the shared
//! [`ApiClient`] and returns the decoded payload. Only the auth group
//! touches anything beyond the network: it stores or clears the token.
//!
//! ```no_run
//! # async fn demo() -> Result<(), apidesk::api::ApiError> {
//! use apidesk::api::{ApiClient, MemoryTokenStore, ReqwestTransport};
//! use apidesk::services::Api;
//!
//! let api = Api::new(ApiClient::new(
//!     ReqwestTransport::new("http://localhost:8000"),
//!     MemoryTokenStore::new(),
//! ));
//! let first_page = api.data().list(1, 10).await?;
//! println!("{} items", first_page.len());
//! # Ok(())
//! # }
//! ```

mod analytics;
mod auth;
mod data;
mod files;
mod forms;
mod search;
mod users;

pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use data::DataService;
pub use files::FileService;
pub use forms::FormService;
pub use search::SearchService;
pub use users::UserService;

use crate::api::ApiClient;

/// Entry point to the service groups. Clones share the client.
#[derive(Debug, Clone)]
pub struct Api {
    client: ApiClient,
}

impl Api {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn data(&self) -> DataService {
        DataService::new(self.client.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.client.clone())
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone())
    }

    pub fn forms(&self) -> FormService {
        FormService::new(self.client.clone())
    }

    pub fn files(&self) -> FileService {
        FileService::new(self.client.clone())
    }

    pub fn search(&self) -> SearchService {
        SearchService::new(self.client.clone())
    }

    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self.client.clone())
    }
}
