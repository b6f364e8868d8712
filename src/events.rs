use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::models::{UserId, UserProfile};

const CHANNEL_CAPACITY: usize = 32;

/// Fields of the current user's profile that changed. `None` means
/// unchanged, not cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

impl From<&UserProfile> for ProfileUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: Some(profile.id),
            username: Some(profile.username.clone()).filter(|u| !u.is_empty()),
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            profile_image_url: profile.profile_image_url.clone(),
        }
    }
}

/// Publish/subscribe channel for profile changes.
#[derive(Clone)]
pub struct ProfileEvents {
    tx: broadcast::Sender<ProfileUpdate>,
}

impl Default for ProfileEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Returns the number of subscribers that will see the update.
    pub fn publish(&self, update: ProfileUpdate) -> usize {
        self.tx.send(update).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileUpdate> {
        self.tx.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<ProfileUpdate> {
        BroadcastStream::new(self.tx.subscribe())
    }
}
