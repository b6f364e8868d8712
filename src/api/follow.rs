use serde_json::json;

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::{FollowResponse, FollowUser, UserId};

impl ApiClient {
    pub async fn follow_user(&self, user_id: UserId) -> ApiResult<FollowResponse> {
        let url = self.endpoint(&["follow", &user_id.to_string()])?;
        self.post(url, &json!({})).await.map_err(|e| {
            tracing::error!("Error following user {}: {}", user_id, e);
            e
        })
    }

    pub async fn unfollow_user(&self, user_id: UserId) -> ApiResult<FollowResponse> {
        let url = self.endpoint(&["follow", &user_id.to_string()])?;
        self.delete(url).await.map_err(|e| {
            tracing::error!("Error unfollowing user {}: {}", user_id, e);
            e
        })
    }

    /// Falls back to "not following, zero counts" on any failure.
    pub async fn get_follow_status(&self, user_id: UserId) -> FollowResponse {
        let result = match self.endpoint(&["follow", "status", &user_id.to_string()]) {
            Ok(url) => self.get(url).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Error getting follow status for user {}: {}", user_id, e);
            FollowResponse::default()
        })
    }

    pub async fn get_followers(&self, user_id: UserId, page: u32) -> Vec<FollowUser> {
        self.follow_listing("followers", user_id, page).await
    }

    pub async fn get_following(&self, user_id: UserId, page: u32) -> Vec<FollowUser> {
        self.follow_listing("following", user_id, page).await
    }

    async fn follow_listing(&self, kind: &str, user_id: UserId, page: u32) -> Vec<FollowUser> {
        let result = match self.endpoint(&["follow", kind, &user_id.to_string()]) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("page", &page.max(1).to_string());
                self.get(url).await
            }
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Error getting {} for user {}: {}", kind, user_id, e);
            Vec::new()
        })
    }
}
