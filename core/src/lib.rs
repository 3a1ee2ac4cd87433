//! Client core for the community forum service.
//!
//! # Overview
//! `ForumClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. `ApiClient` drives it over a `Transport`,
//! adds the bearer token from a `SessionStore`, and exposes one async method
//! per forum operation. The `screens` module holds the view state and user
//! actions of each screen on top of `ApiClient`.
//!
//! # Design
//! - `ForumClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - Response bodies are decoded into typed envelopes. Invalid JSON and a
//!   wrong envelope shape are distinct errors.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod screens;
pub mod session;
pub mod transport;
pub mod types;
pub mod votes;

#[cfg(test)]
mod test_support;

pub use api::ApiClient;
pub use client::ForumClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, Result, SessionError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileSessionStore, MemorySessionStore, SessionKey, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AuthSession, Comment, Community, Credentials, NewComment, NewPost, NewUser, Post, UpdateComment,
    UpdatePost, UpdateUser, User, UserRef,
};
pub use votes::{VoteDirection, VoteState};
