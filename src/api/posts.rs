use serde_json::json;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Comment, CreateCommentRequest, LikeResponse, Post, PostId, SaveResponse, ShareResponse, UserId,
};
use crate::validation::validate_comment;

impl ApiClient {
    pub async fn get_posts_by_user(&self, user_id: UserId) -> ApiResult<Vec<Post>> {
        let url = self.endpoint(&["posts", "user", &user_id.to_string()])?;
        self.get(url).await
    }

    /// Toggles the like server-side; the response may carry the new count.
    pub async fn like_post(&self, post_id: PostId) -> ApiResult<LikeResponse> {
        let url = self.endpoint(&["posts", &post_id.to_string(), "like"])?;
        self.post(url, &json!({})).await
    }

    pub async fn save_post(&self, post_id: PostId) -> ApiResult<SaveResponse> {
        let url = self.endpoint(&["posts", &post_id.to_string(), "save"])?;
        self.post(url, &json!({})).await
    }

    pub async fn share_post(&self, post_id: PostId) -> ApiResult<ShareResponse> {
        let url = self.endpoint(&["posts", &post_id.to_string(), "share"])?;
        self.post(url, &json!({})).await
    }

    pub async fn get_comments(&self, post_id: PostId) -> ApiResult<Vec<Comment>> {
        let url = self.endpoint(&["posts", &post_id.to_string(), "comments"])?;
        self.get(url).await
    }

    pub async fn add_comment(
        &self,
        post_id: PostId,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> ApiResult<Comment> {
        validate_comment(content).map_err(|e| ApiError::Validation(e.to_string()))?;

        let url = self.endpoint(&["posts", &post_id.to_string(), "comments"])?;
        let request = CreateCommentRequest {
            content: content.trim().to_string(),
            parent_comment_id,
        };
        self.create(url, &request).await
    }
}
