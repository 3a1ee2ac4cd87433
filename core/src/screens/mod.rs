//! Screen controllers: view state for one resource plus the user actions that
//! mutate it.
//!
//! # Design
//! Every screen follows the same lifecycle. A fetch enters
//! `FetchState::Loading` and settles into `Ready`, `Empty` or `Error`.
//! `Error` is terminal for that fetch; nothing retries on its own.
//!
//! After a mutation, screens reconcile with one policy:
//! - structural changes (create, delete, add comment) re-fetch the collection;
//! - counter changes (votes) patch the item in place, optimistically, then
//!   adopt the counts the server confirms or revert on failure. A 2xx reply
//!   whose body cannot be read still recorded the vote; the local counts stay.
//!
//! Each screen owns a `ScreenScope`. Fetches take a `FetchTicket` from it;
//! starting a new fetch cancels the previous ticket, and results for a ticket
//! that is no longer current are dropped. Unmounting (or dropping the scope)
//! cancels every outstanding request.
//!
//! A missing session never shows up as a retryable error: screens answer
//! with `Navigation::Login`.

mod comments;
mod community_posts;
mod create_post;
mod home;
mod login;
mod post;
mod register;
mod user;

pub use comments::{CommentsSection, COLLAPSED_COUNT, NO_COMMENTS};
pub use community_posts::CommunityPostsScreen;
pub use create_post::CreatePostScreen;
pub use home::HomeScreen;
pub use login::LoginScreen;
pub use post::PostScreen;
pub use register::RegisterScreen;
pub use user::UserScreen;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{ApiError, Result};
use crate::votes::{PendingVote, Votable, VoteLedger};

/// Phase of a fetch-backed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
    Loading,
    Ready(T),
    Empty,
    Error(String),
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Loading
    }
}

impl<T> FetchState<T> {
    /// Single-entity fetch: found ⇒ `Ready`, 404 ⇒ `Empty`, anything else ⇒ `Error`.
    pub fn from_entity(result: Result<T>) -> Self {
        match result {
            Ok(value) => FetchState::Ready(value),
            Err(ApiError::NotFound) => FetchState::Empty,
            Err(e) => FetchState::Error(e.to_string()),
        }
    }

    /// Phase name for logs.
    pub fn phase(&self) -> &'static str {
        match self {
            FetchState::Loading => "loading",
            FetchState::Ready(_) => "ready",
            FetchState::Empty => "empty",
            FetchState::Error(_) => "error",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> FetchState<Vec<T>> {
    /// Collection fetch: non-empty ⇒ `Ready`, empty ⇒ `Empty`, rejected ⇒ `Error`.
    pub fn from_collection(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => FetchState::Empty,
            Ok(items) => FetchState::Ready(items),
            Err(e) => FetchState::Error(e.to_string()),
        }
    }

    /// Items on display; empty for every phase but `Ready`.
    pub fn items(&self) -> &[T] {
        match self {
            FetchState::Ready(items) => items,
            _ => &[],
        }
    }
}

/// Where the host should take the user next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Back,
    Home,
    Login,
    Register,
    User(String),
    CommunityPosts(String),
    Post(String),
    CreatePost(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }
}

/// Cancellation handle for one fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    token: CancellationToken,
}

impl FetchTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Request lifetime of one mounted screen.
#[derive(Debug)]
pub struct ScreenScope {
    root: CancellationToken,
    current: Option<CancellationToken>,
    generation: u64,
}

impl Default for ScreenScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenScope {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            current: None,
            generation: 0,
        }
    }

    /// Start a fetch, superseding whichever fetch was in flight.
    pub fn begin(&mut self) -> FetchTicket {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = self.root.child_token();
        self.current = Some(token.clone());
        FetchTicket {
            generation: self.generation,
            token,
        }
    }

    /// Whether results for `ticket` may still be applied.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && !ticket.token.is_cancelled()
    }

    /// Token for a mutation: lives as long as the screen, unaffected by fetches.
    pub fn action_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Clone of the mount token, for hosts that unmount from another task.
    pub fn handle(&self) -> CancellationToken {
        self.root.clone()
    }

    /// True when `result` for `ticket` must be dropped: superseded, unmounted
    /// or cancelled.
    pub fn discards<T>(&self, ticket: &FetchTicket, result: &Result<T>) -> bool {
        !self.is_current(ticket) || matches!(result, Err(ApiError::Cancelled))
    }

    pub fn unmount(&mut self) {
        self.root.cancel();
        self.current = None;
    }

    pub fn is_mounted(&self) -> bool {
        !self.root.is_cancelled()
    }
}

impl Drop for ScreenScope {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Holds a form's `submitting` flag up while a submit is in flight. Dropping
/// the submit future lowers it too.
pub(crate) struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    pub(crate) fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Login when a fetch failed for lack of a session, otherwise stay.
pub(crate) fn redirect_for<T>(result: &Result<T>) -> Navigation {
    match result {
        Err(e) if e.requires_login() => Navigation::Login,
        _ => Navigation::Stay,
    }
}

/// Shared failure handling for user actions: a session problem becomes a
/// redirect, anything else becomes an error notice and is handed back.
pub(crate) fn action_failed(
    notice: &mut Option<Notice>,
    message: &str,
    err: ApiError,
) -> Result<Navigation> {
    if err.requires_login() {
        *notice = Some(Notice::error("Please log in again."));
        return Ok(Navigation::Login);
    }
    if !matches!(err, ApiError::Cancelled) {
        *notice = Some(Notice::error(message));
    }
    Err(err)
}

/// Reconcile an optimistic vote with the server's answer.
pub(crate) fn settle_vote<T: Votable>(
    votes: &mut VoteLedger,
    items: &mut [T],
    pending: &PendingVote,
    result: Result<T>,
    notice: &mut Option<Notice>,
) -> Result<Navigation> {
    match result {
        Ok(confirmed) => {
            votes.confirm(items, pending, confirmed.counts());
            Ok(Navigation::Stay)
        }
        Err(e @ (ApiError::MalformedResponse(_) | ApiError::Deserialization(_))) => {
            warn!(id = %pending.id, error = %e, "vote accepted with an unreadable reply, keeping local counts");
            Ok(Navigation::Stay)
        }
        Err(e) => {
            votes.revert(items, pending);
            action_failed(notice, "Could not record your vote.", e)
        }
    }
}
