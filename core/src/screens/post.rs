use tracing::debug;

use super::{redirect_for, CommentsSection, FetchState, Navigation, ScreenScope};
use crate::api::ApiClient;
use crate::types::Post;

/// A single post with its comment thread.
pub struct PostScreen {
    api: ApiClient,
    scope: ScreenScope,
    post_id: String,
    pub post: FetchState<Post>,
    pub comments: CommentsSection,
}

impl PostScreen {
    pub fn new(api: ApiClient, post_id: impl Into<String>) -> Self {
        let post_id = post_id.into();
        Self {
            comments: CommentsSection::new(api.clone(), post_id.clone()),
            api,
            scope: ScreenScope::new(),
            post_id,
            post: FetchState::Loading,
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    /// Fetch the post, then its comments. A missing post leaves the thread
    /// unloaded.
    pub async fn load(&mut self) -> Navigation {
        let ticket = self.scope.begin();
        self.post = FetchState::Loading;
        let result = self.api.get_post(&self.post_id, ticket.token()).await;
        if self.scope.discards(&ticket, &result) {
            return Navigation::Stay;
        }
        let navigation = redirect_for(&result);
        self.post = FetchState::from_entity(result);
        debug!(post_id = %self.post_id, state = self.post.phase(), "post settled");

        if self.post.ready().is_none() {
            return navigation;
        }
        self.comments.load().await
    }

    pub fn open_community(&self) -> Navigation {
        match self.post.ready() {
            Some(post) => Navigation::CommunityPosts(post.community.id().to_string()),
            None => Navigation::Back,
        }
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
        self.comments.unmount();
    }
}
