//! forum - command-line client for the community forum service.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forum_core::logging::{LogFormat, LoggingConfig};
use forum_core::screens::{
    CommentsSection, CommunityPostsScreen, CreatePostScreen, FetchState, HomeScreen, LoginScreen,
    Navigation, Notice, NoticeKind, PostScreen, RegisterScreen, UserScreen, NO_COMMENTS,
};
use forum_core::{ApiClient, ClientConfig, FileSessionStore, Post, UreqTransport, VoteState};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "forum")]
#[command(version, about = "Browse and post to a community forum", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "FORUM_API_URL")]
    api_url: Option<String>,

    /// Log output format: text, json or pretty
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        email: String,

        #[arg(long, env = "FORUM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in
    Register {
        username: String,
        email: String,

        #[arg(long, env = "FORUM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List communities
    Communities,

    /// List the posts of a community
    Posts { community: String },

    /// Show a post and its comments
    Post {
        id: String,

        /// Show every comment instead of the newest two
        #[arg(short, long)]
        all: bool,
    },

    /// Create a post in a community
    CreatePost {
        community: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Media URL to attach (repeatable)
        #[arg(long = "media", value_name = "URL")]
        media: Vec<String>,
    },

    /// Delete one of your posts
    DeletePost { community: String, id: String },

    /// Comment on a post
    Comment { post: String, content: String },

    /// Vote on a post
    VotePost {
        community: String,
        id: String,

        /// Downvote instead of upvote
        #[arg(long)]
        down: bool,
    },

    /// Vote on a comment
    VoteComment {
        post: String,
        id: String,

        /// Downvote instead of upvote
        #[arg(long)]
        down: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load().context("failed to load configuration")?;
    config.apply_api_url(cli.api_url.clone());
    let format = cli.log_format.unwrap_or(config.logging.format);
    LoggingConfig::new(format, config.logging.level.clone(), cli.verbose).init();

    let api = build_api(&config)?;
    debug!(base_url = %config.api.base_url, "client ready");

    // Dropping the command future on interrupt drops its screens, which
    // cancels their in-flight requests.
    let outcome = tokio::select! {
        result = run_command(cli.command, api) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("interrupted")),
    };
    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn build_api(config: &ClientConfig) -> Result<ApiClient> {
    let path = config.session_path()?;
    let session = FileSessionStore::open(&path)
        .with_context(|| format!("failed to open session file {}", path.display()))?;
    let transport = UreqTransport::new(config.timeout());
    Ok(ApiClient::new(&config.api.base_url, Arc::new(transport), Arc::new(session)))
}

async fn run_command(command: Commands, api: ApiClient) -> Result<()> {
    match command {
        Commands::Login { email, password } => login(api, email, password).await,
        Commands::Register {
            username,
            email,
            password,
        } => register(api, username, email, password).await,
        Commands::Logout => logout(api),
        Commands::Whoami => whoami(api).await,
        Commands::Communities => communities(api).await,
        Commands::Posts { community } => posts(api, &community).await,
        Commands::Post { id, all } => show_post(api, &id, all).await,
        Commands::CreatePost {
            community,
            title,
            description,
            media,
        } => create_post(api, &community, title, description, media).await,
        Commands::DeletePost { community, id } => delete_post(api, &community, &id).await,
        Commands::Comment { post, content } => comment(api, &post, content).await,
        Commands::VotePost { community, id, down } => vote_post(api, &community, &id, down).await,
        Commands::VoteComment { post, id, down } => vote_comment(api, &post, &id, down).await,
    }
}

/// Print a notice and turn a redirect to login into an error.
fn settle(navigation: Navigation, notice: Option<&Notice>) -> Result<()> {
    if let Some(notice) = notice {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice.message),
            NoticeKind::Error => eprintln!("{}", notice.message),
        }
    }
    if navigation == Navigation::Login {
        bail!("not logged in; run `forum login <email>`");
    }
    Ok(())
}

fn vote_marker(state: VoteState) -> &'static str {
    match state {
        VoteState::Upvoted => "^",
        VoteState::Downvoted => "v",
        VoteState::None => " ",
    }
}

fn print_post_line(post: &Post, state: VoteState, own: bool) {
    println!(
        "{} {}  +{}/-{}  {}  by {}{}",
        vote_marker(state),
        post.id,
        post.upvotes,
        post.downvotes,
        post.title,
        post.creator.display_name(),
        if own { " (yours)" } else { "" },
    );
}

async fn login(api: ApiClient, email: String, password: String) -> Result<()> {
    let mut screen = LoginScreen::new(api);
    if screen.mount() == Navigation::Home {
        println!("Already logged in.");
        return Ok(());
    }
    screen.email = email;
    screen.password = password;
    let navigation = screen.submit().await;
    settle(Navigation::Stay, screen.notice.as_ref())?;
    if navigation? != Navigation::Home {
        bail!("login failed");
    }
    Ok(())
}

async fn register(api: ApiClient, username: String, email: String, password: String) -> Result<()> {
    let mut screen = RegisterScreen::new(api);
    screen.username = username;
    screen.email = email;
    screen.password = password;
    let navigation = screen.submit().await;
    settle(Navigation::Stay, screen.notice.as_ref())?;
    if navigation? != Navigation::Home {
        bail!("registration failed");
    }
    Ok(())
}

fn logout(api: ApiClient) -> Result<()> {
    UserScreen::new(api).logout()?;
    println!("Logged out.");
    Ok(())
}

async fn whoami(api: ApiClient) -> Result<()> {
    let mut screen = UserScreen::new(api);
    let navigation = screen.load().await;
    settle(navigation, screen.notice.as_ref())?;
    match &screen.user {
        FetchState::Ready(user) => {
            println!("{} <{}>", user.username, user.email);
            println!("karma: {}", user.karma);
            if !user.about.is_empty() {
                println!("{}", user.about);
            }
            Ok(())
        }
        FetchState::Error(message) => bail!("{message}"),
        _ => bail!("user not found"),
    }
}

async fn communities(api: ApiClient) -> Result<()> {
    let mut screen = HomeScreen::new(api);
    let navigation = screen.load().await;
    settle(navigation, None)?;
    match &screen.communities {
        FetchState::Ready(communities) => {
            for community in communities {
                println!(
                    "{}  {}  {}",
                    community.id,
                    community.name,
                    community.description_or_placeholder()
                );
            }
            Ok(())
        }
        FetchState::Empty => {
            println!("No communities yet.");
            Ok(())
        }
        FetchState::Error(message) => bail!("{message}"),
        FetchState::Loading => Ok(()),
    }
}

async fn load_posts(api: ApiClient, community: &str) -> Result<CommunityPostsScreen> {
    let mut screen = CommunityPostsScreen::new(api, community);
    let navigation = screen.load().await;
    settle(navigation, None)?;
    if let FetchState::Error(message) = &screen.posts {
        bail!("{message}");
    }
    Ok(screen)
}

async fn posts(api: ApiClient, community: &str) -> Result<()> {
    let screen = load_posts(api, community).await?;
    if screen.posts == FetchState::Empty {
        println!("No posts in this community yet.");
    }
    for post in screen.posts.items() {
        print_post_line(post, screen.vote_state(&post.id), screen.can_delete(post));
    }
    Ok(())
}

async fn show_post(api: ApiClient, id: &str, all: bool) -> Result<()> {
    let mut screen = PostScreen::new(api, id);
    let navigation = screen.load().await;
    settle(navigation, None)?;
    let post = match &screen.post {
        FetchState::Ready(post) => post,
        FetchState::Error(message) => bail!("{message}"),
        _ => bail!("post not found"),
    };

    println!("{}", post.title);
    println!(
        "by {}  +{}/-{}",
        post.creator.display_name(),
        post.upvotes,
        post.downvotes
    );
    if let Some(created_at) = post.created_at {
        println!("{}", created_at.format("%Y-%m-%d %H:%M"));
    }
    if !post.description.is_empty() {
        println!("\n{}", post.description);
    }
    for url in &post.media_urls {
        println!("[media] {url}");
    }
    println!();

    print_comments(&mut screen.comments, all)
}

fn print_comments(section: &mut CommentsSection, all: bool) -> Result<()> {
    match &section.comments {
        FetchState::Error(message) => bail!("{message}"),
        FetchState::Empty | FetchState::Loading => {
            println!("{NO_COMMENTS}");
            return Ok(());
        }
        FetchState::Ready(_) => {}
    }
    if all && !section.is_expanded() {
        section.toggle_show_all();
    }
    for comment in section.visible() {
        println!(
            "{} {}  +{}/-{}  {}: {}",
            vote_marker(section.vote_state(&comment.id)),
            comment.id,
            comment.upvotes,
            comment.downvotes,
            comment.author(),
            comment.content
        );
    }
    let hidden = section.hidden_count();
    if hidden > 0 {
        println!("... {hidden} more (use --all)");
    }
    Ok(())
}

async fn create_post(
    api: ApiClient,
    community: &str,
    title: String,
    description: String,
    media: Vec<String>,
) -> Result<()> {
    let mut screen = CreatePostScreen::new(api, community);
    screen.set_title(title);
    screen.set_description(description);
    for url in &media {
        screen.add_media_url(url);
    }
    let navigation = screen.submit().await;
    settle(Navigation::Stay, screen.notice.as_ref())?;
    match navigation? {
        Navigation::Back => Ok(()),
        Navigation::Login => settle(Navigation::Login, None),
        _ => bail!("post was not created"),
    }
}

async fn delete_post(api: ApiClient, community: &str, id: &str) -> Result<()> {
    let mut screen = load_posts(api, community).await?;
    let navigation = screen.delete_post(id).await;
    settle(Navigation::Stay, screen.notice.as_ref())?;
    settle(navigation?, None)?;
    if screen.notice.is_none() {
        println!("Deleted.");
    }
    Ok(())
}

async fn comment(api: ApiClient, post: &str, content: String) -> Result<()> {
    let mut section = CommentsSection::new(api, post);
    let navigation = section.load().await;
    settle(navigation, None)?;
    section.set_draft(content);
    let navigation = section.add_comment().await;
    settle(Navigation::Stay, section.notice.as_ref())?;
    settle(navigation?, None)?;
    print_comments(&mut section, false)
}

async fn vote_post(api: ApiClient, community: &str, id: &str, down: bool) -> Result<()> {
    let mut screen = load_posts(api, community).await?;
    let navigation = if down {
        screen.downvote_post(id).await
    } else {
        screen.upvote_post(id).await
    };
    settle(Navigation::Stay, screen.notice.as_ref())?;
    settle(navigation?, None)?;
    match screen.posts.items().iter().find(|p| p.id == id) {
        Some(post) => print_post_line(post, screen.vote_state(id), screen.can_delete(post)),
        None => bail!("no post {id} in this community"),
    }
    Ok(())
}

async fn vote_comment(api: ApiClient, post: &str, id: &str, down: bool) -> Result<()> {
    let mut section = CommentsSection::new(api, post);
    let navigation = section.load().await;
    settle(navigation, None)?;
    let navigation = if down {
        section.downvote(id).await
    } else {
        section.upvote(id).await
    };
    settle(Navigation::Stay, section.notice.as_ref())?;
    settle(navigation?, None)?;
    if !section.comments.items().iter().any(|c| c.id == id) {
        bail!("no comment {id} on this post");
    }
    print_comments(&mut section, true)
}
