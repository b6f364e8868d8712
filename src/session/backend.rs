use async_trait::async_trait;

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, UserProfile};

/// The slice of the API the session store drives.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn login(&self, credentials: &LoginRequest) -> ApiResult<AuthResponse>;

    async fn register(&self, request: &RegisterRequest) -> ApiResult<ApiResponse<AuthResponse>>;

    /// `GET /users/me`, bypassing HTTP caches.
    async fn current_user(&self) -> ApiResult<UserProfile>;

    async fn logout(&self) -> ApiResult<()>;

    /// Token sent as the bearer credential on later requests.
    fn set_token(&self, token: &str);

    fn clear_token(&self);
}

#[async_trait]
impl SessionBackend for ApiClient {
    async fn login(&self, credentials: &LoginRequest) -> ApiResult<AuthResponse> {
        ApiClient::login(self, credentials).await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<ApiResponse<AuthResponse>> {
        ApiClient::register(self, request).await
    }

    async fn current_user(&self) -> ApiResult<UserProfile> {
        self.fetch_current_user(true).await
    }

    async fn logout(&self) -> ApiResult<()> {
        ApiClient::logout(self).await
    }

    fn set_token(&self, token: &str) {
        ApiClient::set_token(self, token);
    }

    fn clear_token(&self) {
        ApiClient::clear_token(self);
    }
}
