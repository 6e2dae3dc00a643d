use serde_json::Value;

use crate::api::{ApiClient, ApiError, TokenStore};
use crate::models::{AuthResponse, CreateUser, LoginCredentials};

/// `/api/auth` endpoints. Successful login, register and refresh replace the
/// stored token; logout clears it.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self.client.post("/api/auth/login", credentials).await?;
        self.store(&response).await?;
        tracing::info!(user = %response.user.email, "logged in");
        Ok(response)
    }

    pub async fn register(&self, user: &CreateUser) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self.client.post("/api/auth/register", user).await?;
        self.store(&response).await?;
        tracing::info!(user = %response.user.email, "registered");
        Ok(response)
    }

    pub async fn refresh(&self) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self.client.post_empty("/api/auth/refresh").await?;
        self.store(&response).await?;
        tracing::debug!("token refreshed");
        Ok(response)
    }

    /// Clears the stored token, then notifies the server.
    ///
    /// The token is gone even if the request fails, and the request itself
    /// is sent without it.
    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.write_token(|tokens| tokens.clear()).await?;
        tracing::info!("logged out");
        self.client.post_empty("/api/auth/logout").await
    }

    pub async fn verify(&self) -> Result<Value, ApiError> {
        self.client.get("/api/auth/verify").await
    }

    async fn store(&self, response: &AuthResponse) -> Result<(), ApiError> {
        let token = response.access_token.clone();
        self.write_token(move |tokens| tokens.set(&token)).await
    }

    // A file-backed slot writes synchronously, so writes run on the blocking
    // pool.
    async fn write_token<F>(&self, write: F) -> Result<(), ApiError>
    where
        F: FnOnce(&dyn TokenStore) -> Result<(), ApiError> + Send + 'static,
    {
        let tokens = self.client.token_store();
        tokio::task::spawn_blocking(move || write(tokens.as_ref()))
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FileTokenStore, MemoryTokenStore};
    use crate::api::mock::{MockResponse, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    fn auth_body(token: &str) -> Value {
        json!({
            "access_token": token,
            "token_type": "bearer",
            "user": {"id": 1, "name": "Ada", "email": "ada@example.com", "role": "user", "created_at": "2024-01-01"}
        })
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/auth/login", MockResponse::json(200, auth_body("abc")));
        let client = ApiClient::new(transport.clone(), MemoryTokenStore::new());
        let auth = AuthService::new(client.clone());

        auth.login(&credentials()).await.expect("login");

        assert_eq!(client.tokens().get().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_token() {
        let transport = MockTransport::new();
        transport.respond(
            Method::POST,
            "/api/auth/login",
            MockResponse::json(401, json!({"detail": "Invalid credentials"})),
        );
        let tokens = MemoryTokenStore::new();
        tokens.set("old").expect("set");
        let client = ApiClient::new(transport.clone(), tokens);

        let err = AuthService::new(client.clone())
            .login(&credentials())
            .await
            .expect_err("rejected");

        assert_eq!(err.detail(), Some("Invalid credentials"));
        assert_eq!(client.tokens().get().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_logout_clears_token_before_request() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/auth/login", MockResponse::json(200, auth_body("abc")));
        transport.respond(Method::POST, "/api/auth/logout", MockResponse::network_error("offline"));
        let client = ApiClient::new(transport.clone(), MemoryTokenStore::new());
        let auth = AuthService::new(client.clone());

        auth.login(&credentials()).await.expect("login");
        let result = auth.logout().await;

        assert!(result.is_err());
        assert_eq!(client.tokens().get(), None);
        let logout = transport.requests_to(&Method::POST, "/api/auth/logout");
        assert_eq!(logout[0].bearer, None);
    }

    #[tokio::test]
    async fn test_refresh_replaces_token() {
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/auth/refresh", MockResponse::json(200, auth_body("new")));
        let tokens = MemoryTokenStore::new();
        tokens.set("old").expect("set");
        let client = ApiClient::new(transport.clone(), tokens);

        AuthService::new(client.clone()).refresh().await.expect("refresh");

        assert_eq!(client.tokens().get().as_deref(), Some("new"));
        let sent = transport.requests_to(&Method::POST, "/api/auth/refresh");
        assert_eq!(sent[0].bearer.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_file_token_round_trip_through_login_and_logout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("apidesk").join("storage.json");
        let transport = MockTransport::new();
        transport.respond(Method::POST, "/api/auth/login", MockResponse::json(200, auth_body("on-disk")));
        transport.respond(Method::POST, "/api/auth/logout", MockResponse::json(200, json!({})));
        let auth = AuthService::new(ApiClient::new(transport.clone(), FileTokenStore::open(&path)));

        auth.login(&credentials()).await.expect("login");
        assert_eq!(FileTokenStore::open(&path).get().as_deref(), Some("on-disk"));

        auth.logout().await.expect("logout");
        assert_eq!(FileTokenStore::open(&path).get(), None);
        let logout = transport.requests_to(&Method::POST, "/api/auth/logout");
        assert_eq!(logout[0].bearer, None);
    }
}
