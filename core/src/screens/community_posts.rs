use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    action_failed, redirect_for, settle_vote, CommentsSection, FetchState, Navigation, Notice,
    ScreenScope,
};
use crate::api::ApiClient;
use crate::error::Result;
use crate::types::{NewPost, Post};
use crate::votes::{VoteDirection, VoteLedger, VoteState};

/// Posts of one community, with delete for the author and voting for everyone.
pub struct CommunityPostsScreen {
    api: ApiClient,
    scope: ScreenScope,
    community_id: String,
    pub posts: FetchState<Vec<Post>>,
    votes: VoteLedger,
    logged_in_user: Option<String>,
    pub notice: Option<Notice>,
}

impl CommunityPostsScreen {
    pub fn new(api: ApiClient, community_id: impl Into<String>) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            community_id: community_id.into(),
            posts: FetchState::Loading,
            votes: VoteLedger::default(),
            logged_in_user: None,
            notice: None,
        }
    }

    pub fn community_id(&self) -> &str {
        &self.community_id
    }

    pub async fn load(&mut self) -> Navigation {
        if self.community_id.is_empty() {
            self.posts = FetchState::Error("community id is missing".to_string());
            return Navigation::Stay;
        }
        self.logged_in_user = self.api.current_user_id().ok();

        let ticket = self.scope.begin();
        self.posts = FetchState::Loading;
        let result = fetch_posts(
            &self.api,
            &self.community_id,
            self.logged_in_user.as_deref(),
            ticket.token(),
        )
        .await;
        if self.scope.discards(&ticket, &result) {
            return Navigation::Stay;
        }
        let navigation = redirect_for(&result);
        self.posts = match result {
            Ok((posts, votes)) => {
                self.votes = votes;
                FetchState::from_collection(Ok(posts))
            }
            Err(e) => FetchState::Error(e.to_string()),
        };
        debug!(community_id = %self.community_id, state = self.posts.phase(), "posts settled");
        navigation
    }

    /// Only the author may delete a post.
    pub fn can_delete(&self, post: &Post) -> bool {
        self.logged_in_user.as_deref() == Some(post.creator.id())
    }

    pub fn vote_state(&self, post_id: &str) -> VoteState {
        self.votes.state(post_id)
    }

    pub fn open_post(&self, post_id: &str) -> Navigation {
        Navigation::Post(post_id.to_string())
    }

    pub fn open_create_post(&self) -> Navigation {
        Navigation::CreatePost(self.community_id.clone())
    }

    /// Comment thread for one of the listed posts.
    pub fn comments_section(&self, post_id: &str) -> CommentsSection {
        CommentsSection::new(self.api.clone(), post_id)
    }

    pub async fn delete_post(&mut self, post_id: &str) -> Result<Navigation> {
        let owned = self
            .posts
            .items()
            .iter()
            .find(|p| p.id == post_id)
            .is_some_and(|p| self.can_delete(p));
        if !owned {
            self.notice = Some(Notice::error("You can only delete your own posts."));
            return Ok(Navigation::Stay);
        }

        let token = self.scope.action_token();
        if let Err(e) = self.api.delete_post(post_id, &token).await {
            return action_failed(&mut self.notice, "Failed to delete post.", e);
        }
        Ok(self.load().await)
    }

    /// Create a post in this community, then re-fetch the list.
    pub async fn create_post(&mut self, mut post: NewPost) -> Result<Navigation> {
        post.community = self.community_id.clone();
        let token = self.scope.action_token();
        if let Err(e) = self.api.create_post(&post, &token).await {
            return action_failed(&mut self.notice, "Failed to create post.", e);
        }
        Ok(self.load().await)
    }

    pub async fn upvote_post(&mut self, post_id: &str) -> Result<Navigation> {
        self.vote(post_id, VoteDirection::Up).await
    }

    pub async fn downvote_post(&mut self, post_id: &str) -> Result<Navigation> {
        self.vote(post_id, VoteDirection::Down).await
    }

    async fn vote(&mut self, post_id: &str, direction: VoteDirection) -> Result<Navigation> {
        let Some(items) = self.posts.ready_mut() else {
            return Ok(Navigation::Stay);
        };
        let Some(pending) = self.votes.begin(items, post_id, direction) else {
            return Ok(Navigation::Stay);
        };

        let token = self.scope.action_token();
        let result = match direction {
            VoteDirection::Up => self.api.upvote_post(post_id, &token).await,
            VoteDirection::Down => self.api.downvote_post(post_id, &token).await,
        };

        let items = self.posts.ready_mut().map(Vec::as_mut_slice).unwrap_or_default();
        settle_vote(&mut self.votes, items, &pending, result, &mut self.notice)
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}

async fn fetch_posts(
    api: &ApiClient,
    community_id: &str,
    user_id: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(Vec<Post>, VoteLedger)> {
    let posts = api.list_posts_by_community(community_id, cancel).await?;
    let votes = match user_id {
        Some(user_id) if !posts.is_empty() => {
            let user = api.get_user(user_id, cancel).await?;
            VoteLedger::from_lists(&user.upvoted_posts, &user.downvoted_posts)
        }
        _ => VoteLedger::default(),
    };
    Ok((posts, votes))
}
