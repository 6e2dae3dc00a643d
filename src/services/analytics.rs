use reqwest::Method;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};

pub const DEFAULT_ACTIVITY_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct AnalyticsService {
    client: ApiClient,
}

impl AnalyticsService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn dashboard(&self) -> Result<Value, ApiError> {
        self.client.get("/api/analytics/dashboard").await
    }

    /// Activity of one user over the last `days` days.
    pub async fn user_activity(&self, user_id: u64, days: u32) -> Result<Value, ApiError> {
        let request = ApiRequest::new(Method::GET, format!("/api/analytics/users/{user_id}/activity"))
            .query("days", days);
        self.client.send(request).await
    }

    pub async fn user_activity_default(&self, user_id: u64) -> Result<Value, ApiError> {
        self.user_activity(user_id, DEFAULT_ACTIVITY_DAYS).await
    }
}
