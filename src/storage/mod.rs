//! Session persistence.
//!
//! A [`SessionStorage`] is a string key/value store. The
//! [`PersistenceBridge`] mirrors the authenticated session into one or two
//! storage tiers and reads it back on start-up. It swallows every storage
//! failure: writes are logged and skipped, and a failed restore yields no
//! session.

mod memory;
mod sqlite;

use std::collections::HashSet;
use std::sync::Arc;

pub use self::memory::MemoryStorage;
pub use self::sqlite::{create_pool, memory_pool, run_migrations, DbPool, SqliteStorage, MIGRATIONS};

use crate::config::{Config, StorageBackend};
use crate::error::StorageError;
use crate::models::UserId;

pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USERNAME: &str = "username";
    pub const USER_ID: &str = "userId";
    pub const EMAIL: &str = "email";
    pub const CURRENT_USER_ID: &str = "currentUserId";
    pub const JOINED_COMMUNITIES: &str = "joinedCommunities";

    pub const SESSION: [&str; 4] = [TOKEN, USERNAME, USER_ID, EMAIL];
}

/// Per-user profile key, e.g. `user_7_displayName`.
pub fn profile_key(user_id: UserId, field: &str) -> String {
    format!("user_{}_{}", user_id, field)
}

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// The fields of a session that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub user_id: Option<UserId>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Cached copy of a user's profile, keyed per user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

impl ProfileFields {
    const FIELDS: [&'static str; 5] = ["username", "email", "displayName", "bio", "profileImageUrl"];

    fn entries(&self) -> [(&'static str, Option<&str>); 5] {
        [
            (Self::FIELDS[0], self.username.as_deref()),
            (Self::FIELDS[1], self.email.as_deref()),
            (Self::FIELDS[2], self.display_name.as_deref()),
            (Self::FIELDS[3], self.bio.as_deref()),
            (Self::FIELDS[4], self.profile_image_url.as_deref()),
        ]
    }
}

#[derive(Clone)]
pub struct PersistenceBridge {
    primary: Arc<dyn SessionStorage>,
    fallback: Option<Arc<dyn SessionStorage>>,
    placeholder_username: String,
}

impl PersistenceBridge {
    pub fn new(primary: Arc<dyn SessionStorage>) -> Self {
        Self {
            primary,
            fallback: None,
            placeholder_username: "User".to_string(),
        }
    }

    /// In-memory bridge, mostly for tests and one-shot tools.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SessionStorage>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_placeholder_username(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder_username = placeholder.into();
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let primary = open_backend(config.storage.backend, config)?;
        let mut bridge = Self::new(primary)
            .with_placeholder_username(config.session.placeholder_username.clone());
        if let Some(backend) = config.storage.fallback {
            bridge = bridge.with_fallback(open_backend(backend, config)?);
        }
        Ok(bridge)
    }

    pub fn placeholder_username(&self) -> &str {
        &self.placeholder_username
    }

    fn tiers(&self) -> impl Iterator<Item = &Arc<dyn SessionStorage>> {
        std::iter::once(&self.primary).chain(self.fallback.iter())
    }

    /// Write every present field of the session to every tier.
    pub fn persist(&self, session: &PersistedSession) {
        let user_id = session.user_id.map(|id| id.to_string());
        let fields = [
            (keys::TOKEN, session.token.as_deref()),
            (keys::USERNAME, session.username.as_deref()),
            (keys::USER_ID, user_id.as_deref()),
            (keys::EMAIL, session.email.as_deref()),
        ];

        for tier in self.tiers() {
            for (key, value) in fields {
                if let Some(value) = value {
                    set_logged(tier.as_ref(), key, value);
                }
            }
        }
    }

    pub fn persist_username(&self, username: &str) {
        for tier in self.tiers() {
            set_logged(tier.as_ref(), keys::USERNAME, username);
        }
    }

    /// Remove the session keys from every tier.
    pub fn clear(&self) {
        for tier in self.tiers() {
            for key in keys::SESSION {
                if let Err(e) = tier.remove(key) {
                    tracing::warn!("Failed to remove {} from session storage: {}", key, e);
                }
            }
        }
    }

    /// Read the session back, primary tier first. Returns `None` when no
    /// tier holds a token or every read fails.
    pub fn restore(&self) -> Option<PersistedSession> {
        for tier in self.tiers() {
            match read_session(tier.as_ref()) {
                Ok(Some(mut session)) => {
                    if session.username.as_deref().map_or(true, str::is_empty) {
                        session.username = Some(self.placeholder_username.clone());
                    }
                    return Some(session);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Failed to read persisted session: {}", e);
                    continue;
                }
            }
        }
        None
    }

    /// Cache profile fields under the per-user keys and mark the user as
    /// current. Only present fields are written.
    pub fn persist_profile(&self, user_id: UserId, fields: &ProfileFields) {
        let storage = self.primary.as_ref();
        set_logged(storage, keys::CURRENT_USER_ID, &user_id.to_string());
        for (field, value) in fields.entries() {
            if let Some(value) = value {
                set_logged(storage, &profile_key(user_id, field), value);
            }
        }
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        get_logged(self.primary.as_ref(), keys::CURRENT_USER_ID).and_then(|v| v.parse().ok())
    }

    pub fn cached_profile(&self, user_id: UserId) -> ProfileFields {
        let read = |field: &str| get_logged(self.primary.as_ref(), &profile_key(user_id, field));
        ProfileFields {
            username: read("username"),
            email: read("email"),
            display_name: read("displayName"),
            bio: read("bio"),
            profile_image_url: read("profileImageUrl"),
        }
    }

    /// Store the joined community ids as a sorted JSON array in the primary
    /// tier. An empty set removes the key.
    pub fn persist_joined(&self, ids: &HashSet<String>) {
        let storage = self.primary.as_ref();
        if ids.is_empty() {
            if let Err(e) = storage.remove(keys::JOINED_COMMUNITIES) {
                tracing::warn!("Failed to clear joined communities: {}", e);
            }
            return;
        }

        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        match serde_json::to_string(&sorted) {
            Ok(json) => set_logged(storage, keys::JOINED_COMMUNITIES, &json),
            Err(e) => tracing::warn!("Failed to encode joined communities: {}", e),
        }
    }

    /// Joined community ids from the primary tier. Missing or unreadable
    /// data yields an empty set.
    pub fn joined_communities(&self) -> HashSet<String> {
        let Some(raw) = get_logged(self.primary.as_ref(), keys::JOINED_COMMUNITIES) else {
            return HashSet::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed joined communities: {}", e);
            HashSet::new()
        })
    }
}

fn open_backend(
    backend: StorageBackend,
    config: &Config,
) -> anyhow::Result<Arc<dyn SessionStorage>> {
    Ok(match backend {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(&config.db_path())?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    })
}

fn read_session(storage: &dyn SessionStorage) -> Result<Option<PersistedSession>, StorageError> {
    let token = match storage.get(keys::TOKEN)? {
        Some(token) if !token.is_empty() => token,
        _ => return Ok(None),
    };

    Ok(Some(PersistedSession {
        user_id: storage.get(keys::USER_ID)?.and_then(|v| v.parse().ok()),
        token: Some(token),
        username: storage.get(keys::USERNAME)?,
        email: storage.get(keys::EMAIL)?.filter(|e| !e.is_empty()),
    }))
}

fn set_logged(storage: &dyn SessionStorage, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        tracing::warn!("Failed to persist {}: {}", key, e);
    }
}

fn get_logged(storage: &dyn SessionStorage, key: &str) -> Option<String> {
    storage.get(key).unwrap_or_else(|e| {
        tracing::warn!("Failed to read {}: {}", key, e);
        None
    })
}
