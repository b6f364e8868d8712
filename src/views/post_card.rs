use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::{hashtag_route, parse_and_format_time, segments, Action, Segment};
use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::models::{Post, PostId};
use crate::optimistic::{run_toggle, MutationError, Outcome, ToggleCell, ToggleState};
use crate::session::SessionStore;

/// One post in a feed, with its like/save/share controls.
#[derive(Debug, Clone)]
pub struct PostCard {
    post: Post,
    like: ToggleCell,
    save: ToggleCell,
    shares: Arc<AtomicU64>,
    liking: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the like call settles.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PostCard {
    pub fn new(post: Post) -> Self {
        Self {
            like: ToggleCell::new(ToggleState::new(post.is_liked, post.likes)),
            save: ToggleCell::new(ToggleState::new(post.is_saved, 0)),
            shares: Arc::new(AtomicU64::new(post.shares_count)),
            liking: Arc::new(AtomicBool::new(false)),
            post,
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn id(&self) -> PostId {
        self.post.id
    }

    pub fn author(&self) -> String {
        self.post.author_name()
    }

    pub fn content(&self) -> String {
        self.post.content_text()
    }

    pub fn hashtags(&self) -> Vec<String> {
        self.post.hashtags()
    }

    pub fn segments(&self) -> Vec<Segment> {
        segments(&self.content())
    }

    pub fn hashtag_route(&self, tag: &str) -> String {
        hashtag_route(tag)
    }

    pub fn author_route(&self) -> String {
        format!("/profile/{}", self.author())
    }

    pub fn created_label(&self) -> String {
        self.post
            .created_at
            .as_deref()
            .map(parse_and_format_time)
            .unwrap_or_default()
    }

    pub fn likes(&self) -> ToggleState {
        self.like.get()
    }

    pub fn is_saved(&self) -> bool {
        self.save.get().active
    }

    pub fn shares(&self) -> u64 {
        self.shares.load(Ordering::Acquire)
    }

    pub fn is_liking(&self) -> bool {
        self.liking.load(Ordering::Acquire)
    }

    /// Toggle the like. Does nothing without a session token or while a
    /// previous like on this card is still pending.
    pub async fn like(
        &self,
        api: &ApiClient,
        session: &SessionStore,
    ) -> Result<Action<ToggleState>, MutationError> {
        if session.token().is_none() {
            return Ok(Action::Ignored);
        }
        let Some(_guard) = InFlight::acquire(&self.liking) else {
            return Ok(Action::Ignored);
        };

        let id = self.post.id;
        let state = run_toggle(&self.like, |_| async move {
            api.like_post(id).await.map(|response| {
                Outcome::confirmed()
                    .with_count(response.likes_count)
                    .with_active(response.is_liked)
            })
        })
        .await?;
        Ok(Action::Done(state))
    }

    pub async fn save(&self, api: &ApiClient) -> Result<bool, MutationError> {
        let id = self.post.id;
        let state = run_toggle(&self.save, |_| async move {
            api.save_post(id)
                .await
                .map(|response| Outcome::confirmed().with_active(response.is_saved))
        })
        .await?;
        Ok(state.active)
    }

    /// The share count only moves once the server confirms.
    pub async fn share(&self, api: &ApiClient) -> ApiResult<u64> {
        let response = api.share_post(self.post.id).await?;
        let count = match response.shares_count {
            Some(count) => {
                self.shares.store(count, Ordering::Release);
                count
            }
            None => self.shares.fetch_add(1, Ordering::AcqRel) + 1,
        };
        Ok(count)
    }
}
