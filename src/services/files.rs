use reqwest::Method;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::UploadFile;

/// Multipart uploads and file removal.
#[derive(Debug, Clone)]
pub struct FileService {
    client: ApiClient,
}

impl FileService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Uploads one file as the `file` field.
    pub async fn upload(&self, file: UploadFile) -> Result<Value, ApiError> {
        let request =
            ApiRequest::new(Method::POST, "/api/upload").multipart(vec![("file".to_string(), file)]);
        self.client.send(request).await
    }

    /// Uploads several files, each as a `files` field.
    pub async fn upload_many(&self, files: Vec<UploadFile>) -> Result<Value, ApiError> {
        let parts = files.into_iter().map(|f| ("files".to_string(), f)).collect();
        let request = ApiRequest::new(Method::POST, "/api/upload/multiple").multipart(parts);
        self.client.send(request).await
    }

    pub async fn delete(&self, file_id: &str) -> Result<Value, ApiError> {
        self.client.delete(&format!("/api/files/{file_id}")).await
    }
}
