use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::models::SearchParams;

#[derive(Debug, Clone)]
pub struct SearchService {
    client: ApiClient,
}

impl SearchService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Value, ApiError> {
        self.client.post("/api/search", params).await
    }
}
