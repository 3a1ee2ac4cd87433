//! Scripted transport and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::{MemorySessionStore, SessionKey, SessionStore};
use crate::transport::Transport;

pub const BASE_URL: &str = "http://forum.test";

enum Step {
    Reply(Result<HttpResponse>),
    Stall,
}

/// Replays queued responses in order and records every request it sees.
/// Running out of script is a transport failure.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: serde_json::Value) {
        self.script.lock().unwrap().push_back(Step::Reply(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })));
    }

    pub fn respond_raw(&self, status: u16, body: &str) {
        self.script.lock().unwrap().push_back(Step::Reply(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })));
    }

    pub fn fail(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Reply(Err(ApiError::Transport(message.to_string()))));
    }

    /// The next request never answers.
    pub fn stall(&self) {
        self.script.lock().unwrap().push_back(Step::Stall);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.seen.lock().unwrap().push(request);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => reply,
            Some(Step::Stall) => std::future::pending().await,
            None => Err(ApiError::Transport("script exhausted".to_string())),
        }
    }
}

/// An `ApiClient` over a scripted transport and a memory store that already
/// holds a session for user `u1`.
pub fn signed_in_api() -> (ApiClient, Arc<ScriptedTransport>, Arc<MemorySessionStore>) {
    let (api, transport, session) = anonymous_api();
    session.set(SessionKey::AuthToken, "tok").unwrap();
    session.set(SessionKey::UserId, "u1").unwrap();
    (api, transport, session)
}

pub fn anonymous_api() -> (ApiClient, Arc<ScriptedTransport>, Arc<MemorySessionStore>) {
    let transport = ScriptedTransport::new();
    let session = Arc::new(MemorySessionStore::new());
    let api = ApiClient::new(BASE_URL, transport.clone(), session.clone());
    (api, transport, session)
}

pub fn documents(items: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "data": { "documents": items } })
}

pub fn comment_json(id: &str, created_at: &str, upvotes: i64, downvotes: i64) -> serde_json::Value {
    json!({
        "_id": id,
        "content": format!("comment {id}"),
        "parent": "p1",
        "creator": { "_id": "u2", "username": "bob" },
        "upvotes": upvotes,
        "downvotes": downvotes,
        "createdAt": created_at,
    })
}

pub fn post_json(id: &str, creator: &str, upvotes: i64, downvotes: i64) -> serde_json::Value {
    json!({
        "_id": id,
        "creator": { "_id": creator, "username": format!("user-{creator}") },
        "community": "c1",
        "title": format!("title {id}"),
        "description": "body",
        "mediaURLs": [],
        "upvotes": upvotes,
        "downvotes": downvotes,
    })
}

pub fn user_json(
    id: &str,
    upvoted_comments: &[&str],
    downvoted_comments: &[&str],
) -> serde_json::Value {
    json!({
        "data": {
            "user": {
                "_id": id,
                "username": "ann",
                "email": "ann@example.com",
                "upvotedComments": upvoted_comments,
                "downvotedComments": downvoted_comments,
            }
        }
    })
}
