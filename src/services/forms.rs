use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::forms::FormSubmission;

#[derive(Debug, Clone)]
pub struct FormService {
    client: ApiClient,
}

impl FormService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Posts an already validated form to `/api/submit`.
    pub async fn submit(&self, form: &FormSubmission) -> Result<Value, ApiError> {
        self.client.post("/api/submit", form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryTokenStore;
    use crate::api::mock::{MockResponse, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_posts_form_fields() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/submit", MockResponse::json(200, json!({"ok": true})));
        let forms = FormService::new(ApiClient::new(transport.clone(), MemoryTokenStore::new()));

        let form = FormSubmission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            age: 36.0,
            message: "Hello from the terminal".to_string(),
        };
        let reply = forms.submit(&form).await.expect("submit");

        assert_eq!(reply, json!({"ok": true}));
        let sent = transport.requests_to(&Method::POST, "/api/submit");
        assert_eq!(
            sent[0].json_body(),
            Some(&json!({
                "name": "Ada",
                "email": "ada@example.com",
                "age": 36,
                "message": "Hello from the terminal"
            }))
        );
    }
}
