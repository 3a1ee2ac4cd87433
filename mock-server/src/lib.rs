//! In-memory forum backend used by the client's integration tests and for
//! local development. State lives only as long as the process.

pub mod model;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use model::{
    cast_vote, Comment, Community, CreateComment, CreatePost, Post, PostFilter, SignIn, SignUp,
    UpdateComment, UpdatePost, UpdateUser, User, Vote,
};

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct Db {
    accounts: HashMap<String, Account>,
    /// bearer token -> user id
    tokens: HashMap<String, String>,
    communities: HashMap<String, Community>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
}

impl Db {
    fn issue_token(&mut self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn email_taken(&self, email: &str) -> bool {
        self.accounts.values().any(|a| a.user.email == email)
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a community and return its id. The API has no route for this.
    pub async fn seed_community(&self, name: &str, description: &str) -> String {
        let community = Community {
            id: new_id(),
            name: name.to_string(),
            description: description.to_string(),
            moderators: Vec::new(),
            user_flairs: Vec::new(),
            post_flairs: Vec::new(),
            score: 0,
            created_at: Utc::now(),
        };
        let id = community.id.clone();
        self.db.write().await.communities.insert(id.clone(), community);
        id
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ServerError {
    BadRequest(&'static str),
    Unauthorized,
    Forbidden,
    NotFound(&'static str),
    Conflict(&'static str),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication required"),
            ServerError::Forbidden => (StatusCode::FORBIDDEN, "not allowed"),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::Conflict(m) => (StatusCode::CONFLICT, m),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

type Reply<T> = Result<T, ServerError>;

/// Id of the user owning the request's bearer token.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ServerError::Unauthorized)?;
        let db = state.db.read().await;
        db.tokens
            .get(token)
            .cloned()
            .map(AuthUser)
            .ok_or(ServerError::Unauthorized)
    }
}

pub fn app() -> Router {
    app_with(AppState::default())
}

pub fn app_with(state: AppState) -> Router {
    let api = Router::new()
        .route("/users/signup", post(sign_up))
        .route("/users/signin", post(sign_in))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/communities", get(list_communities))
        .route("/communities/{id}", get(get_community))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/upvote", post(upvote_post))
        .route("/posts/{id}/downvote", post(downvote_post))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/comments/{id}/upvote", post(upvote_comment))
        .route("/comments/{id}/downvote", post(downvote_comment));
    Router::new().nest("/api/v1", api).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, AppState::default()).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn data<T: Serialize>(value: &T) -> Json<Value> {
    Json(json!({ "data": value }))
}

fn documents<T: Serialize>(items: Vec<T>) -> Json<Value> {
    Json(json!({ "data": { "documents": items } }))
}

fn user_data(user: &User) -> Json<Value> {
    Json(json!({ "data": { "user": user } }))
}

fn auth_reply(token: &str, user: &User) -> Json<Value> {
    Json(json!({ "token": token, "data": { "user": user } }))
}

fn require(value: &str, message: &'static str) -> Reply<()> {
    if value.trim().is_empty() {
        Err(ServerError::BadRequest(message))
    } else {
        Ok(())
    }
}

// --- auth ---

fn register(db: &mut Db, input: SignUp) -> Reply<User> {
    require(&input.username, "username is required")?;
    require(&input.email, "email is required")?;
    require(&input.password, "password is required")?;
    if db.email_taken(&input.email) {
        return Err(ServerError::Conflict("email already registered"));
    }
    let user = User {
        id: new_id(),
        username: input.username,
        email: input.email,
        role: "user".to_string(),
        ..User::default()
    };
    db.accounts.insert(
        user.id.clone(),
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    Ok(user)
}

async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUp>,
) -> Reply<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    let user = register(&mut db, input)?;
    let token = db.issue_token(&user.id);
    info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, auth_reply(&token, &user)))
}

async fn sign_in(State(state): State<AppState>, Json(input): Json<SignIn>) -> Reply<Json<Value>> {
    let mut db = state.db.write().await;
    let user = db
        .accounts
        .values()
        .find(|a| a.user.email == input.email && a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or(ServerError::Unauthorized)?;
    let token = db.issue_token(&user.id);
    info!(user_id = %user.id, "user signed in");
    Ok(auth_reply(&token, &user))
}

// --- users ---

async fn list_users(State(state): State<AppState>, _auth: AuthUser) -> Json<Value> {
    let db = state.db.read().await;
    let mut users: Vec<User> = db.accounts.values().map(|a| a.user.clone()).collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    documents(users)
}

async fn create_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(input): Json<SignUp>,
) -> Reply<(StatusCode, Json<Value>)> {
    let mut db = state.db.write().await;
    let user = register(&mut db, input)?;
    Ok((StatusCode::CREATED, user_data(&user)))
}

async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    let db = state.db.read().await;
    let account = db.accounts.get(&id).ok_or(ServerError::NotFound("user not found"))?;
    Ok(user_data(&account.user))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> Reply<Json<Value>> {
    let mut db = state.db.write().await;
    if !db.accounts.contains_key(&id) {
        return Err(ServerError::NotFound("user not found"));
    }
    if caller != id {
        return Err(ServerError::Forbidden);
    }
    if let Some(email) = &input.email {
        if db.accounts.values().any(|a| a.user.id != id && &a.user.email == email) {
            return Err(ServerError::Conflict("email already registered"));
        }
    }
    let account = db.accounts.get_mut(&id).ok_or(ServerError::NotFound("user not found"))?;
    if let Some(username) = input.username {
        account.user.username = username;
    }
    if let Some(email) = input.email {
        account.user.email = email;
    }
    if let Some(about) = input.about {
        account.user.about = about;
    }
    Ok(user_data(&account.user))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<StatusCode> {
    let mut db = state.db.write().await;
    if !db.accounts.contains_key(&id) {
        return Err(ServerError::NotFound("user not found"));
    }
    if caller != id {
        return Err(ServerError::Forbidden);
    }
    db.accounts.remove(&id);
    db.tokens.retain(|_, user_id| *user_id != id);
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- communities ---

async fn list_communities(State(state): State<AppState>, _auth: AuthUser) -> Json<Value> {
    let db = state.db.read().await;
    let mut communities: Vec<Community> = db.communities.values().cloned().collect();
    communities.sort_by(|a, b| a.name.cmp(&b.name));
    documents(communities)
}

async fn get_community(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    let db = state.db.read().await;
    db.communities
        .get(&id)
        .map(data)
        .ok_or(ServerError::NotFound("community not found"))
}

// --- posts ---

async fn list_posts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<PostFilter>,
) -> Json<Value> {
    let db = state.db.read().await;
    let mut posts: Vec<Post> = db
        .posts
        .values()
        .filter(|p| filter.community.as_deref().map_or(true, |c| p.community == c))
        .cloned()
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    documents(posts)
}

async fn create_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(input): Json<CreatePost>,
) -> Reply<(StatusCode, Json<Value>)> {
    require(&input.title, "title is required")?;
    let mut db = state.db.write().await;
    if !db.communities.contains_key(&input.community) {
        return Err(ServerError::NotFound("community not found"));
    }
    let creator = db
        .accounts
        .get(&caller)
        .map(|a| a.user.summary())
        .ok_or(ServerError::Unauthorized)?;
    let post = Post {
        id: new_id(),
        creator,
        community: input.community,
        title: input.title,
        description: input.description,
        media_urls: input.media_urls,
        score: 0,
        upvotes: 0,
        downvotes: 0,
        created_at: Utc::now(),
    };
    db.posts.insert(post.id.clone(), post.clone());
    info!(post_id = %post.id, community = %post.community, "post created");
    Ok((StatusCode::CREATED, data(&post)))
}

async fn get_post(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    let db = state.db.read().await;
    db.posts.get(&id).map(data).ok_or(ServerError::NotFound("post not found"))
}

async fn update_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdatePost>,
) -> Reply<Json<Value>> {
    let mut db = state.db.write().await;
    let post = db.posts.get_mut(&id).ok_or(ServerError::NotFound("post not found"))?;
    if post.creator.id != caller {
        return Err(ServerError::Forbidden);
    }
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(description) = input.description {
        post.description = description;
    }
    if let Some(media_urls) = input.media_urls {
        post.media_urls = media_urls;
    }
    Ok(data(&*post))
}

async fn delete_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<StatusCode> {
    let mut db = state.db.write().await;
    let post = db.posts.get(&id).ok_or(ServerError::NotFound("post not found"))?;
    if post.creator.id != caller {
        return Err(ServerError::Forbidden);
    }
    db.posts.remove(&id);
    db.comments.retain(|_, c| c.parent != id);
    info!(post_id = %id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn vote_post(state: &AppState, caller: &str, id: &str, vote: Vote) -> Reply<Json<Value>> {
    let mut guard = state.db.write().await;
    let db = &mut *guard;
    let post = db.posts.get_mut(id).ok_or(ServerError::NotFound("post not found"))?;
    let account = db.accounts.get_mut(caller).ok_or(ServerError::Unauthorized)?;
    cast_vote(
        &mut account.user.upvoted_posts,
        &mut account.user.downvoted_posts,
        id,
        vote,
        &mut post.upvotes,
        &mut post.downvotes,
    );
    post.score = post.upvotes - post.downvotes;
    debug!(post_id = %id, ?vote, upvotes = post.upvotes, downvotes = post.downvotes, "post vote");
    Ok(data(&*post))
}

async fn upvote_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    vote_post(&state, &caller, &id, Vote::Up).await
}

async fn downvote_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    vote_post(&state, &caller, &id, Vote::Down).await
}

// --- comments ---

async fn list_comments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(post_id): Path<String>,
) -> Reply<Json<Value>> {
    let db = state.db.read().await;
    if !db.posts.contains_key(&post_id) {
        return Err(ServerError::NotFound("post not found"));
    }
    let mut comments: Vec<Comment> = db
        .comments
        .values()
        .filter(|c| c.parent == post_id)
        .cloned()
        .collect();
    if comments.is_empty() {
        return Err(ServerError::NotFound("no comments for this post"));
    }
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(documents(comments))
}

async fn add_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(post_id): Path<String>,
    Json(input): Json<CreateComment>,
) -> Reply<(StatusCode, Json<Value>)> {
    require(&input.content, "content is required")?;
    let mut db = state.db.write().await;
    if !db.posts.contains_key(&post_id) {
        return Err(ServerError::NotFound("post not found"));
    }
    let creator = db
        .accounts
        .get(&caller)
        .map(|a| a.user.summary())
        .ok_or(ServerError::Unauthorized)?;
    let comment = Comment {
        id: new_id(),
        content: input.content,
        parent: post_id,
        creator,
        upvotes: 0,
        downvotes: 0,
        created_at: Utc::now(),
    };
    db.comments.insert(comment.id.clone(), comment.clone());
    info!(comment_id = %comment.id, post_id = %comment.parent, "comment added");
    Ok((StatusCode::CREATED, data(&comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateComment>,
) -> Reply<Json<Value>> {
    let mut db = state.db.write().await;
    let comment = db
        .comments
        .get_mut(&id)
        .ok_or(ServerError::NotFound("comment not found"))?;
    if comment.creator.id != caller {
        return Err(ServerError::Forbidden);
    }
    if let Some(content) = input.content {
        require(&content, "content is required")?;
        comment.content = content;
    }
    Ok(data(&*comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<StatusCode> {
    let mut db = state.db.write().await;
    let comment = db
        .comments
        .get(&id)
        .ok_or(ServerError::NotFound("comment not found"))?;
    if comment.creator.id != caller {
        return Err(ServerError::Forbidden);
    }
    db.comments.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn vote_comment(state: &AppState, caller: &str, id: &str, vote: Vote) -> Reply<Json<Value>> {
    let mut guard = state.db.write().await;
    let db = &mut *guard;
    let comment = db
        .comments
        .get_mut(id)
        .ok_or(ServerError::NotFound("comment not found"))?;
    let account = db.accounts.get_mut(caller).ok_or(ServerError::Unauthorized)?;
    cast_vote(
        &mut account.user.upvoted_comments,
        &mut account.user.downvoted_comments,
        id,
        vote,
        &mut comment.upvotes,
        &mut comment.downvotes,
    );
    debug!(comment_id = %id, ?vote, upvotes = comment.upvotes, downvotes = comment.downvotes, "comment vote");
    Ok(data(&*comment))
}

async fn upvote_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    vote_comment(&state, &caller, &id, Vote::Up).await
}

async fn downvote_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    vote_comment(&state, &caller, &id, Vote::Down).await
}
