use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type UserId = i64;
pub type PostId = i64;

/// Treat an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Auth ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope some endpoints wrap their payload in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

// --- Users ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub join_date: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
    #[serde(default)]
    pub post_count: Option<u64>,
    #[serde(default)]
    pub is_following: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUsernameResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl UpdateUsernameResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            username: None,
        }
    }
}

/// Image attached to a profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl ProfileImage {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profile-image".to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            mime,
            bytes: Bytes::from(bytes),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<ProfileImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl UpdateProfileResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            profile_image_url: None,
            user: None,
        }
    }
}

// --- Follow ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub is_following: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub followers_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub following_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUser {
    pub id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_following: bool,
}

// --- Loosely typed text ---

/// A field the backend sends either as a string or as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    Object(Map<String, Value>),
    Other(Value),
}

impl TextValue {
    /// The plain string, or the `username` of an object payload.
    pub fn username(&self) -> Option<String> {
        match self {
            TextValue::Text(s) => Some(s.clone()),
            TextValue::Object(map) => map.get("username").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }),
            TextValue::Other(_) => None,
        }
    }

    /// Text for display; objects and scalars are stringified.
    pub fn to_display_text(&self) -> String {
        match self {
            TextValue::Text(s) => s.clone(),
            TextValue::Object(map) => Value::Object(map.clone()).to_string(),
            TextValue::Other(Value::Null) | TextValue::Other(Value::Bool(false)) => String::new(),
            TextValue::Other(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hashtag {
    Tag(String),
    Object { tag: Option<String> },
    Other(Value),
}

impl Hashtag {
    fn into_tag(self) -> Option<String> {
        match self {
            Hashtag::Tag(t) | Hashtag::Object { tag: Some(t) } if !t.is_empty() => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hashtags {
    List(Vec<Hashtag>),
    Single(Hashtag),
}

// --- Posts ---

pub const UNKNOWN_AUTHOR: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub author: Option<TextValue>,
    #[serde(default)]
    pub content: Option<TextValue>,
    #[serde(default, deserialize_with = "nullable")]
    pub likes: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub is_liked: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub is_saved: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub shares_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub comments_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub hashtags: Option<Hashtags>,
    #[serde(default)]
    pub community_id: Option<String>,
    #[serde(default)]
    pub community_name: Option<String>,
    #[serde(default)]
    pub original_post_id: Option<PostId>,
    #[serde(default)]
    pub original_author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_repost: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub repost_count: u64,
}

impl Post {
    pub fn author_name(&self) -> String {
        self.author
            .as_ref()
            .and_then(TextValue::username)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    pub fn content_text(&self) -> String {
        self.content
            .as_ref()
            .map(TextValue::to_display_text)
            .unwrap_or_default()
    }

    /// Hashtags as plain strings, whatever shape the backend used.
    pub fn hashtags(&self) -> Vec<String> {
        match self.hashtags.clone() {
            Some(Hashtags::List(tags)) => tags.into_iter().filter_map(Hashtag::into_tag).collect(),
            Some(Hashtags::Single(tag)) => tag.into_tag().into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts RFC 3339 as well as zone-less `LocalDateTime` strings.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    #[serde(default, alias = "likes")]
    pub likes_count: Option<u64>,
    #[serde(default, alias = "liked")]
    pub is_liked: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    #[serde(default, alias = "saved")]
    pub is_saved: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    #[serde(default, alias = "shares")]
    pub shares_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Comments ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default, alias = "author")]
    pub user: Option<TextValue>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub likes_count: u64,
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
}

impl Comment {
    pub fn author_name(&self) -> String {
        self.user
            .as_ref()
            .and_then(TextValue::username)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<i64>,
}

// --- Communities ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub members: u64,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub rules: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub moderators: Vec<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_joined: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub is_notifications_on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMembershipResponse {
    #[serde(default = "default_true", deserialize_with = "nullable_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "memberCount")]
    pub members: Option<u64>,
    #[serde(default)]
    pub is_joined: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn nullable_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

impl Default for CommunityMembershipResponse {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            members: None,
            is_joined: None,
        }
    }
}
