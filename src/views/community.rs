use super::{login_redirect, Action};
use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{Community, CommunityMembershipResponse, Post};
use crate::optimistic::{run_toggle, MutationError, Outcome, ToggleCell, ToggleState};
use crate::session::{JoinedCommunities, SessionStore};

/// How many of the listed communities get the trending badge.
const TRENDING_COUNT: usize = 2;

pub fn community_route(community_id: &str) -> String {
    format!("/community/{}", community_id)
}

impl From<CommunityMembershipResponse> for Outcome {
    fn from(response: CommunityMembershipResponse) -> Self {
        Outcome {
            success: response.success,
            message: response.message,
            count: response.members,
            active: response.is_joined,
        }
    }
}

/// Join or leave depending on the cell, then mirror the result into the
/// shared joined set.
async fn toggle_membership(
    community_id: &str,
    cell: &ToggleCell,
    api: &ApiClient,
    session: &SessionStore,
    joined: &JoinedCommunities,
) -> Result<Action<ToggleState>, MutationError> {
    if !session.is_authenticated() {
        return Ok(Action::NeedsLogin(login_redirect(&community_route(
            community_id,
        ))));
    }

    let state = run_toggle(cell, |join| async move {
        let response = if join {
            api.join_community(community_id).await
        } else {
            api.leave_community(community_id).await
        };
        response.map(Outcome::from)
    })
    .await?;

    if state.active {
        joined.join(community_id);
    } else {
        joined.leave(community_id);
    }
    Ok(Action::Done(state))
}

/// A row in the community directory. `membership` holds the live joined
/// flag and member count.
#[derive(Debug, Clone)]
pub struct CommunityEntry {
    pub community: Community,
    pub trending: bool,
    pub membership: ToggleCell,
}

impl CommunityEntry {
    pub fn id(&self) -> &str {
        &self.community.id
    }

    pub fn is_joined(&self) -> bool {
        self.membership.get().active
    }

    pub fn members(&self) -> u64 {
        self.membership.get().count
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityList {
    entries: Vec<CommunityEntry>,
}

impl CommunityList {
    pub fn from_communities(communities: Vec<Community>, joined: &JoinedCommunities) -> Self {
        let entries = communities
            .into_iter()
            .enumerate()
            .map(|(index, community)| {
                let is_joined = joined.contains(&community.id);
                CommunityEntry {
                    membership: ToggleCell::new(ToggleState::new(is_joined, community.members)),
                    trending: index < TRENDING_COUNT,
                    community,
                }
            })
            .collect();
        Self { entries }
    }

    pub async fn load(api: &ApiClient, joined: &JoinedCommunities) -> ApiResult<Self> {
        let communities = api.list_communities().await.map_err(|e| {
            tracing::error!("Error fetching communities: {}", e);
            e
        })?;
        Ok(Self::from_communities(communities, joined))
    }

    pub fn entries(&self) -> &[CommunityEntry] {
        &self.entries
    }

    pub fn get(&self, community_id: &str) -> Option<&CommunityEntry> {
        self.entries.iter().find(|e| e.id() == community_id)
    }

    /// Case-insensitive match on name or description. A blank query
    /// matches everything.
    pub fn filter(&self, query: &str) -> Vec<&CommunityEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                query.is_empty()
                    || e.community.name.to_lowercase().contains(&query)
                    || e.community.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Unknown ids are ignored.
    pub async fn toggle_membership(
        &self,
        community_id: &str,
        api: &ApiClient,
        session: &SessionStore,
        joined: &JoinedCommunities,
    ) -> Result<Action<ToggleState>, MutationError> {
        let Some(entry) = self.get(community_id) else {
            return Ok(Action::Ignored);
        };
        toggle_membership(community_id, &entry.membership, api, session, joined).await
    }
}

/// A single community page: details, membership, notifications and posts.
#[derive(Debug, Clone)]
pub struct CommunityDetail {
    pub community: Community,
    pub membership: ToggleCell,
    pub notifications: ToggleCell,
    pub posts: Vec<Post>,
}

impl CommunityDetail {
    /// Membership comes from the shared joined set, as in the list view.
    pub fn new(community: Community, posts: Vec<Post>, joined: &JoinedCommunities) -> Self {
        let is_joined = joined.contains(&community.id);
        Self {
            membership: ToggleCell::new(ToggleState::new(is_joined, community.members)),
            notifications: ToggleCell::new(ToggleState::new(community.is_notifications_on, 0)),
            community,
            posts,
        }
    }

    /// The community must load; its posts are best-effort.
    pub async fn load(
        community_id: &str,
        api: &ApiClient,
        joined: &JoinedCommunities,
    ) -> ApiResult<Self> {
        let (community, posts) = futures::join!(
            api.get_community(community_id),
            api.get_community_posts(community_id)
        );

        let community = community?;
        let posts = posts.unwrap_or_else(|e| {
            tracing::warn!("Error fetching posts for community {}: {}", community_id, e);
            Vec::new()
        });
        Ok(Self::new(community, posts, joined))
    }

    pub fn is_joined(&self) -> bool {
        self.membership.get().active
    }

    pub fn members(&self) -> u64 {
        self.membership.get().count
    }

    pub fn notifications_on(&self) -> bool {
        self.notifications.get().active
    }

    pub async fn toggle_membership(
        &self,
        api: &ApiClient,
        session: &SessionStore,
        joined: &JoinedCommunities,
    ) -> Result<Action<ToggleState>, MutationError> {
        toggle_membership(&self.community.id, &self.membership, api, session, joined).await
    }

    /// There is no notifications endpoint, so this only flips local state.
    pub async fn toggle_notifications(
        &self,
        session: &SessionStore,
    ) -> Result<Action<bool>, MutationError> {
        if !session.is_authenticated() {
            return Ok(Action::NeedsLogin(login_redirect(&community_route(
                &self.community.id,
            ))));
        }
        let state = run_toggle(&self.notifications, |_| async {
            Ok::<_, ApiError>(Outcome::confirmed())
        })
        .await?;
        Ok(Action::Done(state.active))
    }

    pub async fn refresh_posts(&mut self, api: &ApiClient) -> ApiResult<()> {
        self.posts = api.get_community_posts(&self.community.id).await?;
        Ok(())
    }

    /// Publish a post and put it at the top of the list.
    pub async fn create_post(
        &mut self,
        content: &str,
        api: &ApiClient,
        session: &SessionStore,
    ) -> ApiResult<Action<Post>> {
        if !session.is_authenticated() {
            return Ok(Action::NeedsLogin(login_redirect(&community_route(
                &self.community.id,
            ))));
        }
        let post = api.create_community_post(&self.community.id, content).await?;
        self.posts.insert(0, post.clone());
        Ok(Action::Done(post))
    }
}
