use serde_json::json;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, TokenResponse};
use crate::storage::PersistedSession;

impl ApiClient {
    pub async fn login(&self, credentials: &LoginRequest) -> ApiResult<AuthResponse> {
        let url = self.endpoint(&["auth", "login"])?;
        self.post(url, credentials).await.map_err(|e| {
            tracing::error!("Login error: {}", e);
            e
        })
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<ApiResponse<AuthResponse>> {
        let url = self.endpoint(&["auth", "register"])?;
        self.create(url, request).await.map_err(|e| {
            tracing::error!("Registration error: {}", e);
            e
        })
    }

    /// Remote half of logout only. Clearing local state is the session
    /// store's job and happens whatever this returns.
    pub async fn logout(&self) -> ApiResult<()> {
        let url = self.endpoint(&["auth", "logout"])?;
        self.send(self.http.post(url).json(&json!({}))).await?;
        Ok(())
    }

    /// Exchange the current token for a fresh one and store it.
    pub async fn refresh_token(&self) -> ApiResult<String> {
        let url = self.endpoint(&["auth", "refresh"])?;
        let response: TokenResponse = self.post(url, &json!({})).await?;

        match response.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.set_token(token.clone());
                if let Some(bridge) = &self.bridge {
                    bridge.persist(&PersistedSession {
                        token: Some(token.clone()),
                        ..Default::default()
                    });
                }
                Ok(token)
            }
            None => Err(ApiError::Decode("No token received".into())),
        }
    }

    pub async fn check_auth_status(&self) -> bool {
        match self.endpoint(&["users", "me"]) {
            Ok(url) => self.send(self.http.get(url)).await.is_ok(),
            Err(_) => false,
        }
    }
}
