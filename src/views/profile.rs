use super::{login_redirect, Action, PostCard};
use crate::api::ApiClient;
use crate::models::{FollowResponse, UserId, UserProfile};
use crate::optimistic::{run_toggle, MutationError, Outcome, ToggleCell, ToggleState};
use crate::session::SessionStore;

pub fn profile_route(username: &str) -> String {
    format!("/profile/{}", username)
}

/// Someone's profile page: header, follow button and posts.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: UserProfile,
    /// Whether the viewer follows this user, and the follower count.
    pub follow: ToggleCell,
    pub following_count: u64,
    pub posts: Vec<PostCard>,
}

impl ProfileView {
    pub fn new(profile: UserProfile, status: FollowResponse, posts: Vec<PostCard>) -> Self {
        // An all-default status is what a failed lookup returns.
        let (is_following, followers, following) = if status == FollowResponse::default() {
            (
                profile.is_following.unwrap_or(false),
                profile.followers_count.unwrap_or(0),
                profile.following_count.unwrap_or(0),
            )
        } else {
            (
                status.is_following,
                status.followers_count,
                status.following_count,
            )
        };

        Self {
            follow: ToggleCell::new(ToggleState::new(is_following, followers)),
            following_count: following,
            profile,
            posts,
        }
    }

    /// `None` when the profile itself cannot be fetched. Follow status and
    /// posts are best-effort.
    pub async fn load(username: &str, api: &ApiClient) -> Option<Self> {
        let profile = api.get_user_profile(username).await?;
        let (status, posts) = futures::join!(
            api.get_follow_status(profile.id),
            api.get_posts_by_user(profile.id)
        );

        let posts = posts.unwrap_or_else(|e| {
            tracing::warn!("Error fetching posts for user {}: {}", username, e);
            Vec::new()
        });
        Some(Self::new(
            profile,
            status,
            posts.into_iter().map(PostCard::new).collect(),
        ))
    }

    pub fn user_id(&self) -> UserId {
        self.profile.id
    }

    pub fn display_name(&self) -> &str {
        self.profile
            .display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(self.profile.username.as_str())
    }

    pub fn is_following(&self) -> bool {
        self.follow.get().active
    }

    pub fn followers(&self) -> u64 {
        self.follow.get().count
    }

    pub fn is_own_profile(&self, session: &SessionStore) -> bool {
        session.user_id() == Some(self.profile.id)
    }

    /// Follow or unfollow. The follower count is taken from the response
    /// when it carries one.
    pub async fn toggle_follow(
        &self,
        api: &ApiClient,
        session: &SessionStore,
    ) -> Result<Action<ToggleState>, MutationError> {
        if !session.is_authenticated() {
            return Ok(Action::NeedsLogin(login_redirect(&profile_route(
                &self.profile.username,
            ))));
        }
        if self.is_own_profile(session) {
            return Ok(Action::Ignored);
        }

        let user_id = self.profile.id;
        let state = run_toggle(&self.follow, |follow| async move {
            let response = if follow {
                api.follow_user(user_id).await
            } else {
                api.unfollow_user(user_id).await
            };
            response.map(|r| {
                if r == FollowResponse::default() {
                    Outcome::confirmed()
                } else {
                    Outcome::confirmed().with_count(Some(r.followers_count))
                }
            })
        })
        .await?;
        Ok(Action::Done(state))
    }
}
