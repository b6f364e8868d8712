use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::multipart::{Form, Part};

use super::{decode, ApiClient};
use crate::error::{ApiError, ApiResult};
use crate::events::ProfileUpdate;
use crate::models::{
    Post, UpdateProfileRequest, UpdateProfileResponse, UpdateUsernameRequest,
    UpdateUsernameResponse, UserProfile,
};
use crate::storage::ProfileFields;
use crate::validation::validate_username;

impl ApiClient {
    /// `GET /users/me`, caching the profile locally. `None` on any failure.
    pub async fn get_current_user(&self) -> Option<UserProfile> {
        match self.fetch_current_user(false).await {
            Ok(profile) => {
                self.cache_profile(&profile, false);
                Some(profile)
            }
            Err(e) => {
                tracing::warn!("Error fetching current user: {}", e);
                None
            }
        }
    }

    pub(crate) async fn fetch_current_user(&self, no_cache: bool) -> ApiResult<UserProfile> {
        let url = self.endpoint(&["users", "me"])?;
        let mut request = self.http.get(url);
        if no_cache {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }
        decode(self.send(request).await?).await
    }

    pub async fn get_user_profile(&self, username: &str) -> Option<UserProfile> {
        self.fetch_user_profile(username)
            .await
            .map_err(|e| tracing::warn!("Error fetching profile for {}: {}", username, e))
            .ok()
    }

    async fn fetch_user_profile(&self, username: &str) -> ApiResult<UserProfile> {
        let url = self.endpoint(&["users", "profile", username])?;
        self.get(url).await
    }

    /// Validates locally before any request; failures of either kind come
    /// back as `success: false` rather than an error.
    pub async fn update_username(&self, new_username: &str) -> UpdateUsernameResponse {
        if let Err(e) = validate_username(new_username) {
            return UpdateUsernameResponse::failure(e.message());
        }

        match self.send_username_update(new_username).await {
            Ok(response) => {
                if response.success {
                    if let Some(bridge) = &self.bridge {
                        if let Some(user_id) = bridge.current_user_id() {
                            bridge.persist_profile(
                                user_id,
                                &ProfileFields {
                                    username: Some(new_username.to_string()),
                                    ..Default::default()
                                },
                            );
                        }
                    }
                    self.events.publish(ProfileUpdate {
                        username: Some(new_username.to_string()),
                        ..Default::default()
                    });
                }
                response
            }
            Err(e) => {
                tracing::error!("Error updating username: {}", e);
                UpdateUsernameResponse::failure(e.message())
            }
        }
    }

    async fn send_username_update(&self, username: &str) -> ApiResult<UpdateUsernameResponse> {
        let url = self.endpoint(&["users", "update-username"])?;
        let request = UpdateUsernameRequest {
            username: username.to_string(),
        };
        self.put(url, &request).await
    }

    /// Multipart `PUT /users/update-profile` with an optional image part.
    pub async fn update_profile(&self, profile: &UpdateProfileRequest) -> UpdateProfileResponse {
        match self.send_profile_update(profile).await {
            Ok(response) => {
                if response.success {
                    self.after_profile_update(profile, &response);
                }
                response
            }
            Err(e) => {
                tracing::error!("Error updating profile: {}", e);
                UpdateProfileResponse::failure(format!("Profile update failed: {}", e.message()))
            }
        }
    }

    async fn send_profile_update(
        &self,
        profile: &UpdateProfileRequest,
    ) -> ApiResult<UpdateProfileResponse> {
        let mut form = Form::new();
        if let Some(display_name) = &profile.display_name {
            form = form.text("displayName", display_name.clone());
        }
        if let Some(bio) = &profile.bio {
            form = form.text("bio", bio.clone());
        }
        if let Some(image) = &profile.profile_image {
            let part = Part::bytes(image.bytes.to_vec())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime)
                .map_err(|e| ApiError::Validation(format!("Invalid image type: {}", e)))?;
            form = form.part("profileImage", part);
        }

        let url = self.endpoint(&["users", "update-profile"])?;
        tracing::debug!("Sending profile update request");
        let response = self.send(self.http.put(url).multipart(form)).await?;
        decode(response).await
    }

    fn after_profile_update(&self, profile: &UpdateProfileRequest, response: &UpdateProfileResponse) {
        if let Some(bridge) = &self.bridge {
            if let Some(user_id) = bridge.current_user_id() {
                bridge.persist_profile(
                    user_id,
                    &ProfileFields {
                        display_name: profile.display_name.clone(),
                        bio: profile.bio.clone(),
                        profile_image_url: response.profile_image_url.clone(),
                        ..Default::default()
                    },
                );
            }
        }

        let update = match &response.user {
            Some(user) => ProfileUpdate::from(user),
            None => ProfileUpdate {
                display_name: profile.display_name.clone(),
                bio: profile.bio.clone(),
                profile_image_url: response.profile_image_url.clone(),
                ..Default::default()
            },
        };
        self.events.publish(update);
    }

    pub async fn search_users(&self, query: &str) -> Vec<UserProfile> {
        let result = match self.endpoint(&["users", "search"]) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("query", query);
                self.get::<Vec<UserProfile>>(url).await
            }
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Error searching users with query {}: {}", query, e);
            Vec::new()
        })
    }

    /// Re-fetch the current user bypassing caches, rewrite the cached
    /// profile and notify subscribers. Returns whether it worked.
    pub async fn refresh_user_profile(&self) -> bool {
        match self.fetch_current_user(true).await {
            Ok(profile) => {
                self.cache_profile(&profile, true);
                self.events.publish(ProfileUpdate::from(&profile));
                tracing::debug!("Profile data refreshed for user {}", profile.id);
                true
            }
            Err(e) => {
                tracing::warn!("Profile refresh failed: {}", e);
                false
            }
        }
    }

    /// Resolves the username to an id, then lists that user's posts.
    pub async fn get_posts_by_username(&self, username: &str) -> Vec<Post> {
        let result = match self.fetch_user_profile(username).await {
            Ok(profile) => self.get_posts_by_user(profile.id).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Error fetching posts for user {}: {}", username, e);
            Vec::new()
        })
    }

    /// `overwrite_blank` writes display name and bio even when empty so a
    /// cleared field does not linger in the cache.
    fn cache_profile(&self, profile: &UserProfile, overwrite_blank: bool) {
        let Some(bridge) = &self.bridge else {
            return;
        };

        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let blankable = |v: &Option<String>| {
            if overwrite_blank {
                Some(v.clone().unwrap_or_default())
            } else {
                present(v)
            }
        };

        bridge.persist_profile(
            profile.id,
            &ProfileFields {
                username: Some(profile.username.clone()).filter(|u| !u.is_empty()),
                email: present(&profile.email),
                display_name: blankable(&profile.display_name),
                bio: blankable(&profile.bio),
                profile_image_url: present(&profile.profile_image_url),
            },
        );
    }
}
