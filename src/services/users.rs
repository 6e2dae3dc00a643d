use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::models::{CreateUser, UpdateUser, User};

/// `/api/users` resource.
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.client.get("/api/users").await
    }

    /// The profile of the user owning the stored token.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.client.get("/api/users/me").await
    }

    pub async fn get(&self, id: u64) -> Result<User, ApiError> {
        self.client.get(&format!("/api/users/{id}")).await
    }

    pub async fn create(&self, user: &CreateUser) -> Result<User, ApiError> {
        self.client.post("/api/users", user).await
    }

    pub async fn update(&self, id: u64, user: &UpdateUser) -> Result<User, ApiError> {
        self.client.put(&format!("/api/users/{id}"), user).await
    }

    pub async fn delete(&self, id: u64) -> Result<Value, ApiError> {
        self.client.delete(&format!("/api/users/{id}")).await
    }
}
