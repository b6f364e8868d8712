use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::storage::PersistenceBridge;

/// Ids of the communities the current user has joined, shared between the
/// community list and detail views. When backed by a bridge every change is
/// written through, so membership survives restarts.
#[derive(Clone, Default)]
pub struct JoinedCommunities {
    ids: Arc<RwLock<HashSet<String>>>,
    bridge: Option<PersistenceBridge>,
}

impl fmt::Debug for JoinedCommunities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinedCommunities")
            .field("ids", &self.snapshot())
            .field("persisted", &self.bridge.is_some())
            .finish()
    }
}

impl JoinedCommunities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ids stored in `bridge` and keep writing changes back to it.
    pub fn persisted(bridge: PersistenceBridge) -> Self {
        let ids = bridge.joined_communities();
        Self {
            ids: Arc::new(RwLock::new(ids)),
            bridge: Some(bridge),
        }
    }

    fn save(&self, ids: &HashSet<String>) {
        if let Some(bridge) = &self.bridge {
            bridge.persist_joined(ids);
        }
    }

    pub fn join(&self, community_id: &str) {
        if let Ok(mut ids) = self.ids.write() {
            if ids.insert(community_id.to_string()) {
                self.save(&ids);
            }
        }
    }

    pub fn leave(&self, community_id: &str) {
        if let Ok(mut ids) = self.ids.write() {
            if ids.remove(community_id) {
                self.save(&ids);
            }
        }
    }

    pub fn contains(&self, community_id: &str) -> bool {
        self.ids
            .read()
            .map(|ids| ids.contains(community_id))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.ids.read().map(|ids| ids.clone()).unwrap_or_default()
    }

    /// Forget everything, e.g. on logout.
    pub fn clear(&self) {
        if let Ok(mut ids) = self.ids.write() {
            ids.clear();
            self.save(&ids);
        }
    }
}
