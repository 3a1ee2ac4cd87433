use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub about: String,
    pub role: String,
    pub karma: i64,
    pub subscribed_communities: Vec<String>,
    pub upvoted_posts: Vec<String>,
    pub downvoted_posts: Vec<String>,
    pub upvoted_comments: Vec<String>,
    pub downvoted_comments: Vec<String>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub moderators: Vec<String>,
    pub user_flairs: Vec<String>,
    pub post_flairs: Vec<String>,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub creator: UserSummary,
    pub community: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "mediaURLs")]
    pub media_urls: Vec<String>,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub parent: String,
    pub creator: UserSummary,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "mediaURLs", default)]
    pub media_urls: Vec<String>,
    pub community: String,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "mediaURLs")]
    pub media_urls: Option<Vec<String>>,
}

/// `creator` from the body is ignored; the bearer token decides the author.
#[derive(Deserialize)]
pub struct CreateComment {
    pub content: String,
}

#[derive(Deserialize)]
pub struct UpdateComment {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct PostFilter {
    pub community: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

/// Move `id` between a user's vote lists and adjust the item's counters.
/// Repeating the held direction changes nothing.
pub fn cast_vote(
    upvoted: &mut Vec<String>,
    downvoted: &mut Vec<String>,
    id: &str,
    vote: Vote,
    upvotes: &mut i64,
    downvotes: &mut i64,
) {
    let (held, other, held_count, other_count) = match vote {
        Vote::Up => (upvoted, downvoted, upvotes, downvotes),
        Vote::Down => (downvoted, upvoted, downvotes, upvotes),
    };
    if held.iter().any(|v| v == id) {
        return;
    }
    if let Some(pos) = other.iter().position(|v| v == id) {
        other.remove(pos);
        *other_count -= 1;
    }
    held.push(id.to_string());
    *held_count += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_serializes_with_wire_names() {
        let post = Post {
            id: "p1".to_string(),
            creator: UserSummary {
                id: "u1".to_string(),
                username: "ann".to_string(),
            },
            community: "c1".to_string(),
            title: "T".to_string(),
            description: "D".to_string(),
            media_urls: vec!["http://x/y.jpg".to_string()],
            score: 0,
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["_id"], "p1");
        assert_eq!(json["creator"]["_id"], "u1");
        assert_eq!(json["mediaURLs"][0], "http://x/y.jpg");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn create_post_requires_title_and_community() {
        let input: CreatePost =
            serde_json::from_str(r#"{"title":"T","community":"c1"}"#).unwrap();
        assert!(input.media_urls.is_empty());

        let result: Result<CreatePost, _> = serde_json::from_str(r#"{"title":"T"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn votes_keep_one_direction() {
        let (mut up, mut down) = (Vec::new(), Vec::new());
        let (mut ups, mut downs) = (5, 2);

        cast_vote(&mut up, &mut down, "a", Vote::Down, &mut ups, &mut downs);
        assert_eq!((ups, downs), (5, 3));
        cast_vote(&mut up, &mut down, "a", Vote::Down, &mut ups, &mut downs);
        assert_eq!((ups, downs), (5, 3));
        cast_vote(&mut up, &mut down, "a", Vote::Up, &mut ups, &mut downs);
        assert_eq!((ups, downs), (6, 2));
        assert_eq!(up, vec!["a".to_string()]);
        assert!(down.is_empty());
    }
}
