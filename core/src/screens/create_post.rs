use tracing::debug;

use super::{action_failed, InFlight, Navigation, Notice, ScreenScope};
use crate::api::ApiClient;
use crate::error::Result;
use crate::types::NewPost;

/// New-post form bound to one community.
pub struct CreatePostScreen {
    api: ApiClient,
    scope: ScreenScope,
    community_id: String,
    pub title: String,
    pub description: String,
    pub media_urls: Vec<String>,
    pub submitting: bool,
    pub notice: Option<Notice>,
}

impl CreatePostScreen {
    pub fn new(api: ApiClient, community_id: impl Into<String>) -> Self {
        Self {
            api,
            scope: ScreenScope::new(),
            community_id: community_id.into(),
            title: String::new(),
            description: String::new(),
            media_urls: Vec::new(),
            submitting: false,
            notice: None,
        }
    }

    pub fn community_id(&self) -> &str {
        &self.community_id
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Attach a media link; blank input is ignored.
    pub fn add_media_url(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.media_urls.push(url.to_string());
        }
    }

    pub fn remove_media_url(&mut self, index: usize) {
        if index < self.media_urls.len() {
            self.media_urls.remove(index);
        }
    }

    pub fn draft(&self) -> NewPost {
        NewPost {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            media_urls: self.media_urls.clone(),
            community: self.community_id.clone(),
        }
    }

    /// Send the post once. A second submit while one is in flight does
    /// nothing.
    pub async fn submit(&mut self) -> Result<Navigation> {
        if self.submitting {
            return Ok(Navigation::Stay);
        }
        if self.community_id.is_empty() {
            self.notice = Some(Notice::error("No community selected."));
            return Ok(Navigation::Stay);
        }
        let post = self.draft();
        if post.title.is_empty() {
            self.notice = Some(Notice::error("Title is required."));
            return Ok(Navigation::Stay);
        }

        let outcome = {
            let _in_flight = InFlight::start(&mut self.submitting);
            self.api.create_post(&post, &self.scope.action_token()).await
        };

        match outcome {
            Ok(created) => {
                debug!(post_id = %created.id, community_id = %self.community_id, "post created");
                self.notice = Some(Notice::success("Post created."));
                Ok(Navigation::Back)
            }
            Err(e) => action_failed(&mut self.notice, "Failed to create post.", e),
        }
    }

    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}
