use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{action_failed, redirect_for, settle_vote, FetchState, Navigation, Notice, ScreenScope};
use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::types::{Comment, NewComment};
use crate::votes::{VoteDirection, VoteLedger, VoteState};

/// Comments shown while the section is collapsed.
pub const COLLAPSED_COUNT: usize = 2;

/// Placeholder for a post without comments.
pub const NO_COMMENTS: &str = "No comments yet";

/// Comment thread under one post: newest first, votes, and a reply box.
pub struct CommentsSection {
    api: ApiClient,
    scope: ScreenScope,
    post_id: String,
    pub comments: FetchState<Vec<Comment>>,
    votes: VoteLedger,
    show_all: bool,
    pub draft: String,
    pub notice: Option<Notice>,
}

impl CommentsSection {
    pub fn new(api: ApiClient, post_id: impl Into<String>) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            post_id: post_id.into(),
            comments: FetchState::Loading,
            votes: VoteLedger::default(),
            show_all: false,
            draft: String::new(),
            notice: None,
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    /// Fetch the thread and the user's votes on it. A 404 for the thread means
    /// it has no comments yet.
    pub async fn load(&mut self) -> Navigation {
        let ticket = self.scope.begin();
        self.comments = FetchState::Loading;
        let result = fetch_thread(&self.api, &self.post_id, ticket.token()).await;
        if self.scope.discards(&ticket, &result) {
            return Navigation::Stay;
        }
        let navigation = redirect_for(&result);
        self.comments = match result {
            Ok((comments, votes)) => {
                self.votes = votes;
                FetchState::from_collection(Ok(comments))
            }
            Err(e) => FetchState::Error(e.to_string()),
        };
        debug!(post_id = %self.post_id, state = self.comments.phase(), "comments settled");
        navigation
    }

    /// Comments on display: the first `COLLAPSED_COUNT` unless expanded.
    pub fn visible(&self) -> &[Comment] {
        let items = self.comments.items();
        if self.show_all {
            items
        } else {
            &items[..items.len().min(COLLAPSED_COUNT)]
        }
    }

    /// Comments hidden by the collapsed view.
    pub fn hidden_count(&self) -> usize {
        self.comments.items().len() - self.visible().len()
    }

    pub fn is_expanded(&self) -> bool {
        self.show_all
    }

    pub fn toggle_show_all(&mut self) {
        self.show_all = !self.show_all;
    }

    pub fn vote_state(&self, comment_id: &str) -> VoteState {
        self.votes.state(comment_id)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Post the draft as a reply, then re-fetch the thread.
    pub async fn add_comment(&mut self) -> Result<Navigation> {
        let content = self.draft.trim();
        if content.is_empty() {
            self.notice = Some(Notice::error("Comment cannot be empty!"));
            return Ok(Navigation::Stay);
        }
        let creator = match self.api.current_user_id() {
            Ok(id) => id,
            Err(e) => return action_failed(&mut self.notice, "Failed to add comment.", e),
        };
        let comment = NewComment {
            content: content.to_string(),
            parent: self.post_id.clone(),
            creator,
        };

        let token = self.scope.action_token();
        if let Err(e) = self.api.add_comment(&self.post_id, &comment, &token).await {
            return action_failed(&mut self.notice, "Failed to add comment.", e);
        }
        self.draft.clear();
        Ok(self.load().await)
    }

    pub async fn upvote(&mut self, comment_id: &str) -> Result<Navigation> {
        self.vote(comment_id, VoteDirection::Up).await
    }

    pub async fn downvote(&mut self, comment_id: &str) -> Result<Navigation> {
        self.vote(comment_id, VoteDirection::Down).await
    }

    async fn vote(&mut self, comment_id: &str, direction: VoteDirection) -> Result<Navigation> {
        let Some(items) = self.comments.ready_mut() else {
            return Ok(Navigation::Stay);
        };
        let Some(pending) = self.votes.begin(items, comment_id, direction) else {
            debug!(comment_id, ?direction, "vote unchanged, nothing to send");
            return Ok(Navigation::Stay);
        };

        let token = self.scope.action_token();
        let result = match direction {
            VoteDirection::Up => self.api.upvote_comment(comment_id, &token).await,
            VoteDirection::Down => self.api.downvote_comment(comment_id, &token).await,
        };

        let items = self.comments.ready_mut().map(Vec::as_mut_slice).unwrap_or_default();
        settle_vote(&mut self.votes, items, &pending, result, &mut self.notice)
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}

async fn fetch_thread(
    api: &ApiClient,
    post_id: &str,
    cancel: &CancellationToken,
) -> Result<(Vec<Comment>, VoteLedger)> {
    let mut comments = match api.list_comments(post_id, cancel).await {
        Ok(comments) => comments,
        Err(ApiError::NotFound) => Vec::new(),
        Err(e) => return Err(e),
    };
    if comments.is_empty() {
        return Ok((comments, VoteLedger::default()));
    }
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let user_id = api.current_user_id()?;
    let user = api.get_user(&user_id, cancel).await?;
    let votes = VoteLedger::from_lists(&user.upvoted_comments, &user.downvoted_comments);
    Ok((comments, votes))
}
