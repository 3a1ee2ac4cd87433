//! End-to-end forum flow against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the screen
//! controllers over real HTTP through `UreqTransport`, with the session kept
//! in a file so a "restart" can be simulated by reopening it.

use std::sync::Arc;
use std::time::Duration;

use forum_core::screens::{
    CommunityPostsScreen, CreatePostScreen, FetchState, HomeScreen, LoginScreen, Navigation,
    PostScreen, RegisterScreen, UserScreen,
};
use forum_core::{
    ApiClient, ApiError, FileSessionStore, MemorySessionStore, NewUser, SessionStore,
    UreqTransport, VoteState,
};
use mock_server::AppState;
use tokio_util::sync::CancellationToken;

/// Serve a fresh mock server with one community; returns its base URL and
/// the community id.
async fn start_server() -> (String, String) {
    let state = AppState::new();
    let community = state.seed_community("rust", "").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with(listener, state));
    (format!("http://{addr}"), community)
}

fn api(base_url: &str, session: Arc<dyn SessionStore>) -> ApiClient {
    let transport = Arc::new(UreqTransport::new(Duration::from_secs(5)));
    ApiClient::new(base_url, transport, session)
}

#[tokio::test(flavor = "multi_thread")]
async fn forum_lifecycle() {
    let (base_url, community) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let session = Arc::new(FileSessionStore::open(&session_path).unwrap());
    let ann = api(&base_url, session.clone());

    // Step 1: register, which also logs in.
    let mut register = RegisterScreen::new(ann.clone());
    register.username = "ann".to_string();
    register.email = "ann@example.com".to_string();
    register.password = "hunter2".to_string();
    assert_eq!(register.submit().await.unwrap(), Navigation::Home);
    assert!(session.is_authenticated());
    assert!(session_path.exists());

    // Step 2: the community directory.
    let mut home = HomeScreen::new(ann.clone());
    assert_eq!(home.load().await, Navigation::Stay);
    let communities = home.communities.items();
    assert_eq!(communities.len(), 1);
    assert_eq!(communities[0].description_or_placeholder(), "No description available");

    // Step 3: an empty community, then a new post in it.
    let mut posts = CommunityPostsScreen::new(ann.clone(), community.clone());
    posts.load().await;
    assert_eq!(posts.posts, FetchState::Empty);

    let mut create = CreatePostScreen::new(ann.clone(), community.clone());
    create.set_title("T");
    create.set_description("D");
    create.add_media_url("http://x/y.jpg");
    assert_eq!(create.submit().await.unwrap(), Navigation::Back);

    posts.load().await;
    let post = posts.posts.items()[0].clone();
    assert_eq!(post.title, "T");
    assert_eq!(post.media_urls, vec!["http://x/y.jpg".to_string()]);
    assert!(posts.can_delete(&post));

    // Step 4: votes patch in place and agree with the server.
    posts.upvote_post(&post.id).await.unwrap();
    assert_eq!(posts.vote_state(&post.id), VoteState::Upvoted);
    posts.downvote_post(&post.id).await.unwrap();
    let voted = &posts.posts.items()[0];
    assert_eq!((voted.upvotes, voted.downvotes), (0, 1));

    // Step 5: post detail with an empty thread, then two comments.
    let mut detail = PostScreen::new(ann.clone(), post.id.clone());
    assert_eq!(detail.load().await, Navigation::Stay);
    assert!(detail.post.ready().is_some());
    assert_eq!(detail.comments.comments, FetchState::Empty);

    detail.comments.set_draft("first");
    detail.comments.add_comment().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    detail.comments.set_draft("second");
    detail.comments.add_comment().await.unwrap();

    let visible = detail.comments.visible();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].content, "second");
    assert_eq!(visible[0].author(), "ann");

    let comment_id = visible[1].id.clone();
    detail.comments.upvote(&comment_id).await.unwrap();
    assert_eq!(detail.comments.vote_state(&comment_id), VoteState::Upvoted);

    // Step 6: someone else cannot delete ann's post.
    let bob = api(&base_url, Arc::new(MemorySessionStore::new()));
    let cancel = CancellationToken::new();
    let signup = NewUser {
        username: "bob".to_string(),
        email: "bob@example.com".to_string(),
        password: "pw".to_string(),
    };
    bob.sign_up(&signup, &cancel).await.unwrap();
    let err = bob.delete_post(&post.id, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 403 }));

    // Step 7: the session survives a restart and the profile shows the votes.
    let reopened = Arc::new(FileSessionStore::open(&session_path).unwrap());
    let restarted = api(&base_url, reopened.clone());
    let mut profile = UserScreen::new(restarted.clone());
    assert_eq!(profile.load().await, Navigation::Stay);
    let user = profile.user.ready().unwrap();
    assert_eq!(user.username, "ann");
    assert_eq!(user.downvoted_posts, vec![post.id.clone()]);
    assert_eq!(user.upvoted_comments, vec![comment_id.clone()]);

    // Step 8: logout, then log back in.
    assert_eq!(profile.logout().unwrap(), Navigation::Login);
    assert!(!reopened.is_authenticated());

    let mut login = LoginScreen::new(restarted.clone());
    assert_eq!(login.mount(), Navigation::Stay);
    login.email = "ann@example.com".to_string();
    login.password = "wrong".to_string();
    assert_eq!(login.submit().await.unwrap(), Navigation::Stay);
    login.password = "hunter2".to_string();
    assert_eq!(login.submit().await.unwrap(), Navigation::Home);

    // Step 9: delete the post; the list re-fetches to empty.
    let mut posts = CommunityPostsScreen::new(restarted, community);
    posts.load().await;
    assert_eq!(posts.delete_post(&post.id).await.unwrap(), Navigation::Stay);
    assert_eq!(posts.posts, FetchState::Empty);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = Arc::new(MemorySessionStore::new());
    let client = api(&format!("http://{addr}"), session);
    let creds = forum_core::Credentials {
        email: "a@b.c".to_string(),
        password: "pw".to_string(),
    };
    let err = client.sign_in(&creds, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_token_sends_screens_to_login() {
    let (base_url, _community) = start_server().await;
    let session = Arc::new(MemorySessionStore::new());
    session.set(forum_core::SessionKey::AuthToken, "stale").unwrap();
    session.set(forum_core::SessionKey::UserId, "u1").unwrap();

    let mut home = HomeScreen::new(api(&base_url, session));
    assert_eq!(home.load().await, Navigation::Login);
    assert!(matches!(home.communities, FetchState::Error(_)));
}
