use reqwest::Method;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::{CreateDataItem, DataItem, Page};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;

/// `/api/data` resource.
#[derive(Debug, Clone)]
pub struct DataService {
    client: ApiClient,
}

impl DataService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of items. Pages start at 1.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<Page<DataItem>, ApiError> {
        let request = ApiRequest::new(Method::GET, "/api/data")
            .query("page", page)
            .query("per_page", per_page);
        self.client.send(request).await
    }

    /// The first page with the default page size.
    pub async fn list_default(&self) -> Result<Page<DataItem>, ApiError> {
        self.list(DEFAULT_PAGE, DEFAULT_PER_PAGE).await
    }

    pub async fn get(&self, id: u64) -> Result<DataItem, ApiError> {
        self.client.get(&format!("/api/data/{id}")).await
    }

    pub async fn create(&self, item: &CreateDataItem) -> Result<DataItem, ApiError> {
        self.client.post("/api/data", item).await
    }

    pub async fn update(&self, id: u64, item: &CreateDataItem) -> Result<DataItem, ApiError> {
        self.client.put(&format!("/api/data/{id}"), item).await
    }

    pub async fn delete(&self, id: u64) -> Result<Value, ApiError> {
        self.client.delete(&format!("/api/data/{id}")).await
    }
}
