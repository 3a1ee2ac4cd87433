//! Executes forum operations over a `Transport`.
//!
//! # Design
//! `ApiClient` combines the stateless `ForumClient` with a transport and a
//! session store. Every operation except sign-in and sign-up is protected:
//! the bearer token is read from the session store right before dispatch,
//! and a missing token fails with `MissingSession` without touching the
//! network. Every operation takes a `CancellationToken`; cancelling it
//! resolves the call with `ApiError::Cancelled`. Failures are logged once
//! here and returned unchanged. Nothing is retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ForumClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::{SessionKey, SessionStore};
use crate::transport::Transport;
use crate::types::{
    AuthSession, Comment, Community, Credentials, NewComment, NewPost, NewUser, Post,
    UpdateComment, UpdatePost, UpdateUser, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Protected,
}

#[derive(Clone)]
pub struct ApiClient {
    client: ForumClient,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            client: ForumClient::new(base_url),
            transport,
            session,
        }
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Logged-in user id, or `MissingSession` when nobody is logged in.
    pub fn current_user_id(&self) -> Result<String> {
        self.session.require(SessionKey::UserId)
    }

    async fn send(
        &self,
        request: HttpRequest,
        access: Access,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let request = match access {
            Access::Public => request,
            Access::Protected => {
                let token = self.session.require(SessionKey::AuthToken)?;
                request.with_bearer(&token)
            }
        };
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        debug!(method = %request.method, url = %request.path, "dispatching request");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            response = self.transport.execute(request) => response,
        }
    }

    /// Send, parse, and log any failure before handing it back.
    async fn call<T>(
        &self,
        what: &str,
        request: Result<HttpRequest>,
        access: Access,
        cancel: &CancellationToken,
        parse: impl FnOnce(&ForumClient, HttpResponse) -> Result<T>,
    ) -> Result<T> {
        let outcome = match request {
            Ok(request) => match self.send(request, access, cancel).await {
                Ok(response) => parse(&self.client, response),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            match e {
                ApiError::Cancelled => debug!(operation = what, "request cancelled"),
                ApiError::NotFound => debug!(operation = what, "not found"),
                _ => warn!(operation = what, error = %e, "request failed"),
            }
        }
        outcome
    }

    // --- posts ---

    pub async fn list_posts(&self, cancel: &CancellationToken) -> Result<Vec<Post>> {
        let req = Ok(self.client.build_list_posts());
        self.call("list posts", req, Access::Protected, cancel, |c, r| c.parse_documents(r))
            .await
    }

    pub async fn list_posts_by_community(
        &self,
        community_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Post>> {
        let req = Ok(self.client.build_list_posts_by_community(community_id));
        self.call("list community posts", req, Access::Protected, cancel, |c, r| {
            c.parse_documents(r)
        })
        .await
    }

    pub async fn get_post(&self, id: &str, cancel: &CancellationToken) -> Result<Post> {
        let req = Ok(self.client.build_get_post(id));
        self.call("get post", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn create_post(&self, post: &NewPost, cancel: &CancellationToken) -> Result<Post> {
        let req = self.client.build_create_post(post);
        self.call("create post", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn update_post(
        &self,
        id: &str,
        update: &UpdatePost,
        cancel: &CancellationToken,
    ) -> Result<Post> {
        let req = self.client.build_update_post(id, update);
        self.call("update post", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn delete_post(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let req = Ok(self.client.build_delete_post(id));
        self.call("delete post", req, Access::Protected, cancel, |c, r| c.parse_deleted(r))
            .await
    }

    pub async fn upvote_post(&self, id: &str, cancel: &CancellationToken) -> Result<Post> {
        let req = Ok(self.client.build_upvote_post(id));
        self.call("upvote post", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn downvote_post(&self, id: &str, cancel: &CancellationToken) -> Result<Post> {
        let req = Ok(self.client.build_downvote_post(id));
        self.call("downvote post", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    // --- communities ---

    pub async fn list_communities(&self, cancel: &CancellationToken) -> Result<Vec<Community>> {
        let req = Ok(self.client.build_list_communities());
        self.call("list communities", req, Access::Protected, cancel, |c, r| {
            c.parse_documents(r)
        })
        .await
    }

    pub async fn get_community(&self, id: &str, cancel: &CancellationToken) -> Result<Community> {
        let req = Ok(self.client.build_get_community(id));
        self.call("get community", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    // --- comments ---

    pub async fn list_comments(
        &self,
        post_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>> {
        let req = Ok(self.client.build_list_comments(post_id));
        self.call("list comments", req, Access::Protected, cancel, |c, r| {
            c.parse_documents(r)
        })
        .await
    }

    pub async fn add_comment(
        &self,
        post_id: &str,
        comment: &NewComment,
        cancel: &CancellationToken,
    ) -> Result<Comment> {
        let req = self.client.build_add_comment(post_id, comment);
        self.call("add comment", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn update_comment(
        &self,
        id: &str,
        update: &UpdateComment,
        cancel: &CancellationToken,
    ) -> Result<Comment> {
        let req = self.client.build_update_comment(id, update);
        self.call("update comment", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn delete_comment(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let req = Ok(self.client.build_delete_comment(id));
        self.call("delete comment", req, Access::Protected, cancel, |c, r| {
            c.parse_deleted(r)
        })
        .await
    }

    pub async fn upvote_comment(&self, id: &str, cancel: &CancellationToken) -> Result<Comment> {
        let req = Ok(self.client.build_upvote_comment(id));
        self.call("upvote comment", req, Access::Protected, cancel, |c, r| c.parse_data(r))
            .await
    }

    pub async fn downvote_comment(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Comment> {
        let req = Ok(self.client.build_downvote_comment(id));
        self.call("downvote comment", req, Access::Protected, cancel, |c, r| {
            c.parse_data(r)
        })
        .await
    }

    // --- users ---

    pub async fn list_users(&self, cancel: &CancellationToken) -> Result<Vec<User>> {
        let req = Ok(self.client.build_list_users());
        self.call("list users", req, Access::Protected, cancel, |c, r| c.parse_documents(r))
            .await
    }

    pub async fn get_user(&self, id: &str, cancel: &CancellationToken) -> Result<User> {
        let req = Ok(self.client.build_get_user(id));
        self.call("get user", req, Access::Protected, cancel, |c, r| c.parse_user(r))
            .await
    }

    pub async fn create_user(&self, user: &NewUser, cancel: &CancellationToken) -> Result<User> {
        let req = self.client.build_create_user(user);
        self.call("create user", req, Access::Protected, cancel, |c, r| c.parse_user(r))
            .await
    }

    pub async fn update_user(
        &self,
        id: &str,
        update: &UpdateUser,
        cancel: &CancellationToken,
    ) -> Result<User> {
        let req = self.client.build_update_user(id, update);
        self.call("update user", req, Access::Protected, cancel, |c, r| c.parse_user(r))
            .await
    }

    pub async fn delete_user(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let req = Ok(self.client.build_delete_user(id));
        self.call("delete user", req, Access::Protected, cancel, |c, r| c.parse_deleted(r))
            .await
    }

    // --- auth ---

    /// Authenticate and persist the returned token and user id.
    pub async fn sign_in(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<AuthSession> {
        let req = self.client.build_sign_in(credentials);
        let session = self
            .call("sign in", req, Access::Public, cancel, |c, r| c.parse_auth(r))
            .await?;
        self.store_session(&session)?;
        Ok(session)
    }

    /// Register and persist the returned token and user id.
    pub async fn sign_up(&self, user: &NewUser, cancel: &CancellationToken) -> Result<AuthSession> {
        let req = self.client.build_sign_up(user);
        let session = self
            .call("sign up", req, Access::Public, cancel, |c, r| c.parse_auth(r))
            .await?;
        self.store_session(&session)?;
        Ok(session)
    }

    /// Forget the session. Subsequent protected calls fail locally.
    pub fn sign_out(&self) -> Result<()> {
        self.session.clear()?;
        info!("session cleared");
        Ok(())
    }

    fn store_session(&self, session: &AuthSession) -> Result<()> {
        self.session.set(SessionKey::AuthToken, &session.token)?;
        self.session.set(SessionKey::UserId, &session.user.id)?;
        info!(user_id = %session.user.id, "session stored");
        Ok(())
    }
}
