//! Domain DTOs and response envelopes for the forum API.
//!
//! # Design
//! Records mirror the remote schema: string ids in `_id`, camelCase field
//! names. Fields the server may omit default instead of failing the whole
//! payload. `creator` and `community` references arrive either populated or
//! as a bare id, so they are untagged enums.
//!
//! The mock-server crate defines its own copies of these shapes; integration
//! tests catch drift between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal view of a user embedded in other records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// A user reference: populated summary or bare id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Populated(user) => &user.id,
            UserRef::Id(id) => id,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            UserRef::Populated(user) if !user.username.is_empty() => Some(&user.username),
            _ => None,
        }
    }

    /// Display name with the "Anonymous" fallback used for unknown authors.
    pub fn display_name(&self) -> &str {
        self.username().unwrap_or("Anonymous")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Free-form bio.
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub subscribed_communities: Vec<String>,
    #[serde(default)]
    pub upvoted_posts: Vec<String>,
    #[serde(default)]
    pub downvoted_posts: Vec<String>,
    #[serde(default)]
    pub upvoted_comments: Vec<String>,
    #[serde(default)]
    pub downvoted_comments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunitySummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommunityRef {
    Populated(CommunitySummary),
    Id(String),
}

impl CommunityRef {
    pub fn id(&self) -> &str {
        match self {
            CommunityRef::Populated(community) => &community.id,
            CommunityRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator: Option<UserRef>,
    #[serde(default)]
    pub moderators: Vec<UserRef>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub user_flairs: Vec<String>,
    #[serde(default)]
    pub post_flairs: Vec<String>,
    #[serde(default)]
    pub score: i64,
}

impl Community {
    pub fn description_or_placeholder(&self) -> &str {
        if self.description.is_empty() {
            "No description available"
        } else {
            &self.description
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub creator: UserRef,
    pub community: CommunityRef,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "mediaURLs", default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    /// Id of the post or comment this replies to.
    pub parent: String,
    #[serde(default)]
    pub creator: Option<UserRef>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn author(&self) -> &str {
        self.creator
            .as_ref()
            .map(UserRef::display_name)
            .unwrap_or("Anonymous")
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    #[serde(rename = "mediaURLs")]
    pub media_urls: Vec<String>,
    pub community: String,
}

/// Partial post update; omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mediaURLs", skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub parent: String,
    pub creator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateComment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Sign-up and admin user creation payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// `{ "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `{ "documents": [...] }`, the payload of every collection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documents<T> {
    pub documents: Vec<T>,
}

/// `{ "user": {...} }`, the payload of user and auth responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub user: User,
}

/// `{ "token": "...", "data": { "user": {...} } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEnvelope {
    pub token: String,
    pub data: UserPayload,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}
