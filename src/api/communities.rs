use serde_json::json;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{Community, CommunityMembershipResponse, CreatePostRequest, Post};

impl ApiClient {
    pub async fn list_communities(&self) -> ApiResult<Vec<Community>> {
        let url = self.endpoint(&["communities"])?;
        self.get(url).await
    }

    pub async fn get_community(&self, community_id: &str) -> ApiResult<Community> {
        let url = self.endpoint(&["communities", community_id])?;
        self.get(url).await
    }

    pub async fn get_community_posts(&self, community_id: &str) -> ApiResult<Vec<Post>> {
        let url = self.endpoint(&["communities", community_id, "posts"])?;
        self.get(url).await
    }

    /// An empty success body counts as a successful join.
    pub async fn join_community(&self, community_id: &str) -> ApiResult<CommunityMembershipResponse> {
        let url = self.endpoint(&["communities", community_id, "join"])?;
        self.post(url, &json!({})).await
    }

    pub async fn leave_community(&self, community_id: &str) -> ApiResult<CommunityMembershipResponse> {
        let url = self.endpoint(&["communities", community_id, "leave"])?;
        self.delete(url).await
    }

    pub async fn create_community_post(&self, community_id: &str, content: &str) -> ApiResult<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Post content cannot be empty".into()));
        }

        let url = self.endpoint(&["communities", community_id, "posts"])?;
        let request = CreatePostRequest {
            content: content.to_string(),
        };
        self.create(url, &request).await
    }
}
