use clap::Parser;
use tracing_subscriber::EnvFilter;

use polis::api::ApiClient;
use polis::config::{Cli, Command, Config};
use polis::events::ProfileEvents;
use polis::models::{ProfileImage, UpdateProfileRequest};
use polis::session::SessionStore;
use polis::storage::PersistenceBridge;
use polis::views::{CommunityDetail, CommunityList, PostCard, ProfileView, SettingsView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    let bridge = PersistenceBridge::from_config(&config)?;
    let events = ProfileEvents::new();
    let api = ApiClient::new(&config.api)?
        .with_persistence(bridge.clone())
        .with_events(events);
    let session = SessionStore::new(api.clone(), bridge);
    session.restore();

    run(cli.command, &api, &session).await
}

async fn run(command: Command, api: &ApiClient, session: &SessionStore) -> anyhow::Result<()> {
    let joined = session.joined();

    match command {
        Command::Login { email, password } => {
            let state = session.login(&email, &password).await?;
            println!(
                "Logged in as {} (id {})",
                state.username.unwrap_or_default(),
                state.user_id.unwrap_or_default()
            );
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let response = session.register(&username, &email, &password).await?;
            println!(
                "{}",
                response
                    .message
                    .unwrap_or_else(|| "Registration complete".to_string())
            );
        }
        Command::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        Command::Whoami => {
            let state = session.state();
            match state.token {
                Some(_) => println!(
                    "{} <{}> (id {})",
                    state.username.unwrap_or_default(),
                    state.email.unwrap_or_default(),
                    state.user_id.unwrap_or_default()
                ),
                None => println!("Not logged in"),
            }
        }
        Command::Refresh => {
            let state = session.refresh_profile().await?;
            println!("Refreshed: {}", state.username.unwrap_or_default());
        }
        Command::Profile { username } => match ProfileView::load(&username, api).await {
            Some(view) => {
                println!("{} (@{})", view.display_name(), view.profile.username);
                if let Some(bio) = view.profile.bio.as_deref().filter(|b| !b.is_empty()) {
                    println!("{}", bio);
                }
                println!(
                    "{} followers, {} following{}",
                    view.followers(),
                    view.following_count,
                    if view.is_following() { " (following)" } else { "" }
                );
                for card in &view.posts {
                    print_post(card);
                }
            }
            None => println!("User {} not found", username),
        },
        Command::Search { query } => {
            for user in api.search_users(&query).await {
                println!("{}\t{}", user.id, user.username);
            }
        }
        Command::Follow { user_id } => {
            let response = api.follow_user(user_id).await?;
            println!("Following ({} followers)", response.followers_count);
        }
        Command::Unfollow { user_id } => {
            let response = api.unfollow_user(user_id).await?;
            println!("Unfollowed ({} followers)", response.followers_count);
        }
        Command::Followers { user_id, page } => {
            for user in api.get_followers(user_id, page).await {
                println!("{}\t{}", user.id, user.username);
            }
        }
        Command::Following { user_id, page } => {
            for user in api.get_following(user_id, page).await {
                println!("{}\t{}", user.id, user.username);
            }
        }
        Command::Communities => {
            let list = CommunityList::load(api, joined).await?;
            for entry in list.entries() {
                println!(
                    "{}\t{}\t{} members{}{}",
                    entry.id(),
                    entry.community.name,
                    entry.members(),
                    if entry.trending { "\ttrending" } else { "" },
                    if entry.is_joined() { "\tjoined" } else { "" }
                );
            }
        }
        Command::Community { id } => {
            let detail = CommunityDetail::load(&id, api, joined).await?;
            println!(
                "{} ({} members{})",
                detail.community.name,
                detail.members(),
                if detail.is_joined() { ", joined" } else { "" }
            );
            println!("{}", detail.community.description);
            for post in detail.posts {
                print_post(&PostCard::new(post));
            }
        }
        Command::Join { id } => {
            let response = api.join_community(&id).await?;
            joined.join(&id);
            println!("{}", response.message.unwrap_or_else(|| format!("Joined {}", id)));
        }
        Command::Leave { id } => {
            let response = api.leave_community(&id).await?;
            joined.leave(&id);
            println!("{}", response.message.unwrap_or_else(|| format!("Left {}", id)));
        }
        Command::Posts { user_id } => {
            for post in api.get_posts_by_user(user_id).await? {
                print_post(&PostCard::new(post));
            }
        }
        Command::Like { post_id } => {
            if !session.is_authenticated() {
                anyhow::bail!("Log in to like posts");
            }
            let response = api.like_post(post_id).await?;
            match response.likes_count {
                Some(count) => println!("Post {} now has {} likes", post_id, count),
                None => println!("Toggled like on post {}", post_id),
            }
        }
        Command::SetUsername { username } => {
            let mut view = SettingsView::new(session);
            view.set_username(username);
            view.submit(api, session).await?;
            println!("Username updated to {}", view.username);
        }
        Command::UpdateProfile {
            display_name,
            bio,
            image,
        } => {
            let profile_image = match image {
                Some(path) => Some(ProfileImage::from_path(&path)?),
                None => None,
            };
            let request = UpdateProfileRequest {
                display_name,
                bio,
                profile_image,
            };
            let response = api.update_profile(&request).await;
            if !response.success {
                anyhow::bail!(response
                    .message
                    .unwrap_or_else(|| "Profile update failed".to_string()));
            }
            println!("Profile updated");
        }
    }

    Ok(())
}

fn print_post(card: &PostCard) {
    println!(
        "[{}] {} · {} · {} likes",
        card.id(),
        card.author(),
        card.created_label(),
        card.likes().count
    );
    println!("  {}", card.content());
}
