//! Stateless HTTP request builder and response parser for the forum API.
//!
//! # Design
//! `ForumClient` holds only a `base_url` and carries no mutable state between
//! calls. Every endpoint has a `build_*` method that produces an
//! `HttpRequest`; responses are parsed by envelope shape rather than per
//! endpoint, because the service wraps everything in one of four envelopes:
//!
//! | Shape | Parser |
//! |---|---|
//! | `{ data: { documents: [...] } }` | `parse_documents` |
//! | `{ data: {...} }` | `parse_data` |
//! | `{ data: { user: {...} } }` | `parse_user` |
//! | `{ token, data: { user: {...} } }` | `parse_auth` |
//!
//! Builders never attach credentials; `ApiClient` decides which requests are
//! protected and adds the bearer token itself.

use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthEnvelope, AuthSession, Credentials, Documents, Envelope, NewComment, NewPost, NewUser,
    UpdateComment, UpdatePost, UpdateUser, User, UserPayload,
};

/// Versioned path prefix shared by every endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Bytes escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn segment(id: &str) -> PercentEncode<'_> {
    utf8_percent_encode(id, SEGMENT)
}

/// Synchronous, stateless client for the forum API.
#[derive(Debug, Clone)]
pub struct ForumClient {
    base_url: String,
}

impl ForumClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn bodiless(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    fn with_json<T: Serialize>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    // --- posts ---

    pub fn build_list_posts(&self) -> HttpRequest {
        self.bodiless(HttpMethod::Get, "/posts")
    }

    pub fn build_list_posts_by_community(&self, community_id: &str) -> HttpRequest {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("community", community_id)
            .finish();
        self.bodiless(HttpMethod::Get, &format!("/posts?{query}"))
    }

    pub fn build_get_post(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Get, &format!("/posts/{}", segment(id)))
    }

    pub fn build_create_post(&self, input: &NewPost) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Post, "/posts", input)
    }

    pub fn build_update_post(&self, id: &str, input: &UpdatePost) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Put, &format!("/posts/{}", segment(id)), input)
    }

    pub fn build_delete_post(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Delete, &format!("/posts/{}", segment(id)))
    }

    pub fn build_upvote_post(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Post, &format!("/posts/{}/upvote", segment(id)))
    }

    pub fn build_downvote_post(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Post, &format!("/posts/{}/downvote", segment(id)))
    }

    // --- communities ---

    pub fn build_list_communities(&self) -> HttpRequest {
        self.bodiless(HttpMethod::Get, "/communities")
    }

    pub fn build_get_community(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Get, &format!("/communities/{}", segment(id)))
    }

    // --- comments ---

    pub fn build_list_comments(&self, post_id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Get, &format!("/posts/{}/comments", segment(post_id)))
    }

    pub fn build_add_comment(&self, post_id: &str, input: &NewComment) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Post, &format!("/posts/{}/comments", segment(post_id)), input)
    }

    pub fn build_update_comment(&self, id: &str, input: &UpdateComment) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Put, &format!("/comments/{}", segment(id)), input)
    }

    pub fn build_delete_comment(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Delete, &format!("/comments/{}", segment(id)))
    }

    pub fn build_upvote_comment(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Post, &format!("/comments/{}/upvote", segment(id)))
    }

    pub fn build_downvote_comment(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Post, &format!("/comments/{}/downvote", segment(id)))
    }

    // --- users ---

    pub fn build_list_users(&self) -> HttpRequest {
        self.bodiless(HttpMethod::Get, "/users")
    }

    pub fn build_get_user(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Get, &format!("/users/{}", segment(id)))
    }

    pub fn build_create_user(&self, input: &NewUser) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Post, "/users", input)
    }

    pub fn build_update_user(&self, id: &str, input: &UpdateUser) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Put, &format!("/users/{}", segment(id)), input)
    }

    pub fn build_delete_user(&self, id: &str) -> HttpRequest {
        self.bodiless(HttpMethod::Delete, &format!("/users/{}", segment(id)))
    }

    // --- auth ---

    pub fn build_sign_in(&self, credentials: &Credentials) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Post, "/users/signin", credentials)
    }

    pub fn build_sign_up(&self, input: &NewUser) -> Result<HttpRequest> {
        self.with_json(HttpMethod::Post, "/users/signup", input)
    }

    // --- parsers ---

    /// `{ data: { documents: [...] } }`
    pub fn parse_documents<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Vec<T>> {
        let envelope: Envelope<Documents<T>> = decode(response)?;
        Ok(envelope.data.documents)
    }

    /// `{ data: {...} }`
    pub fn parse_data<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T> {
        let envelope: Envelope<T> = decode(response)?;
        Ok(envelope.data)
    }

    /// `{ data: { user: {...} } }`
    pub fn parse_user(&self, response: HttpResponse) -> Result<User> {
        let envelope: Envelope<UserPayload> = decode(response)?;
        Ok(envelope.data.user)
    }

    /// `{ token, data: { user: {...} } }`. An empty token counts as malformed.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<AuthSession> {
        let envelope: AuthEnvelope = decode(response)?;
        if envelope.token.is_empty() {
            return Err(ApiError::MalformedResponse("empty auth token".to_string()));
        }
        if envelope.data.user.id.is_empty() {
            return Err(ApiError::MalformedResponse("auth response without user id".to_string()));
        }
        Ok(AuthSession {
            token: envelope.token,
            user: envelope.data.user,
        })
    }

    /// Deletes answer 200 with a body or 204 without one; either is success
    /// and the body is ignored.
    pub fn parse_deleted(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }
}

/// Check the status, then decode in two steps so "not JSON" and "JSON of the
/// wrong shape" surface as different errors.
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    check_status(&response)?;
    let value: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<()> {
    match response.status {
        _ if response.is_success() => Ok(()),
        404 => Err(ApiError::NotFound),
        401 | 403 => Err(ApiError::Unauthorized {
            status: response.status,
        }),
        status => Err(ApiError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}
