//! GrabGrub CLI - share and find surplus food from the terminal

mod render;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use grabgrub_core::application::{AppState, ExpirySweeper, ListingService};
use grabgrub_core::domain::image::encode_data_url;
use grabgrub_core::domain::{
    DealDraft, ExpiryClock, Listing, ListingDraft, ListingFilter, ListingId, PostDraft, TimeFilter,
};
use grabgrub_core::error::AppError;
use grabgrub_core::port::id_provider::UuidProvider;
use grabgrub_core::port::time_provider::SystemTimeProvider;
use grabgrub_core::port::{KeyValueStore, TimeProvider};
use grabgrub_infra_sqlite::{open_database, SqliteKeyValueStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "~/.grabgrub/storage.db";

#[derive(Parser)]
#[command(name = "grabgrub")]
#[command(about = "Share and find surplus food on campus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage file
    #[arg(long, env = "GRABGRUB_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Interpret dates and times at this UTC offset (e.g. -05:00) instead of the local zone
    #[arg(long, env = "GRABGRUB_UTC_OFFSET")]
    utc_offset: Option<FixedOffset>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Browse without an account
    Guest,

    /// Show who is signed in
    Whoami,

    /// Free food posts
    #[command(subcommand)]
    Post(PostCommand),

    /// Food deals
    #[command(subcommand)]
    Deal(DealCommand),

    /// Remove expired posts and deals now
    Sweep,
}

#[derive(Subcommand)]
enum PostCommand {
    /// Share surplus food
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        location: String,
        /// Pickup date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Pickup start (HH:MM)
        #[arg(long)]
        start: String,
        /// Pickup end (HH:MM); the post expires at this time
        #[arg(long)]
        end: String,
        #[arg(long)]
        note: String,
        /// Attach a photo (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },

    /// List active posts
    List(ListArgs),

    /// Show one post
    Show { id: ListingId },

    /// Delete one of your posts
    Delete { id: ListingId },

    /// Watch a post's time left until it expires
    Countdown { id: ListingId },
}

#[derive(Subcommand)]
enum DealCommand {
    /// Share a deal
    New {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        store: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        discount: String,
        /// Last day of the deal (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<String>,
        /// Attach a photo (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },

    /// List active deals
    List(ListArgs),

    /// Show one deal
    Show { id: ListingId },

    /// Delete one of your deals
    Delete { id: ListingId },
}

#[derive(Args)]
struct ListArgs {
    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,

    /// Only listings expiring soon: hour, today or final
    #[arg(long, default_value = "any")]
    expiring: TimeFilter,
}

impl ListArgs {
    fn filter(self) -> ListingFilter {
        ListingFilter::new(self.search, self.expiring)
    }
}

/// Read attachments and encode them as data URLs
async fn load_images(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        images.push(encode_data_url(&name, mime.essence_str(), &bytes)?);
    }
    Ok(images)
}

async fn open_state(db_path: &Path, clock: ExpiryClock) -> Result<AppState> {
    let pool = open_database(db_path)
        .await
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteKeyValueStore::new(pool, time_provider.clone()));
    Ok(AppState::new(
        store,
        Arc::new(UuidProvider),
        time_provider,
        clock,
    ))
}

async fn require_user(state: &AppState, action: &str) -> Result<String> {
    match state.current_user_id().await? {
        Some(id) => Ok(id),
        None => bail!("You must be logged in to {}", action),
    }
}

async fn create_listing<D: ListingDraft>(
    state: &AppState,
    service: &ListingService<D::Listing>,
    draft: D,
) -> Result<D::Listing> {
    let creator = require_user(state, "share").await?;
    Ok(service.create(draft, Some(&creator)).await?)
}

async fn delete_listing<T: Listing>(
    state: &AppState,
    service: &ListingService<T>,
    id: ListingId,
) -> Result<()> {
    let requester = require_user(state, "delete").await?;
    let removed = service.delete(id, Some(&requester)).await?;
    println!(
        "{}",
        format!("✓ Deleted {} {} ({})", T::KIND, id, removed.title()).green().bold()
    );
    Ok(())
}

async fn contact(state: &AppState, creator_id: Option<&str>) -> Result<Option<String>> {
    match creator_id {
        Some(id) => Ok(state.auth.user_email(id).await?),
        None => Ok(None),
    }
}

async fn run_post(state: &AppState, command: PostCommand) -> Result<()> {
    match command {
        PostCommand::New {
            title,
            location,
            date,
            start,
            end,
            note,
            images,
        } => {
            let draft = PostDraft {
                title,
                location,
                pickup_date: date,
                start_time: start,
                end_time: end,
                note,
                images: load_images(&images).await?,
            };
            let post = create_listing(state, &state.posts, draft).await?;
            println!("{}", "✓ Post shared".green().bold());
            println!();
            println!("{}", render::post_table(state, &[post]));
        }

        PostCommand::List(args) => {
            let posts = state.posts.search(&args.filter()).await?;
            if posts.is_empty() {
                println!("{}", "No active posts".yellow());
            } else {
                println!("{}", render::post_table(state, &posts));
            }
        }

        PostCommand::Show { id } => {
            let post = state.posts.get(id).await?;
            let contact = contact(state, post.creator_id.as_deref()).await?;
            render::post_card(state, &post, contact.as_deref());
        }

        PostCommand::Delete { id } => delete_listing(state, &state.posts, id).await?,

        PostCommand::Countdown { id } => {
            let post = state.posts.get(id).await?;
            println!("{}", post.title.cyan().bold());

            let handle = state.countdown(&post.end_date_time).spawn();
            let mut frames = handle.frames();
            loop {
                let frame = *frames.borrow_and_update();
                print!("\r  {}        ", render::badge(&frame));
                std::io::Write::flush(&mut std::io::stdout())?;
                if frame.is_expired() {
                    break;
                }
                tokio::select! {
                    changed = frames.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            println!();
            handle.stop();
            handle.join().await;
        }
    }
    Ok(())
}

async fn run_deal(state: &AppState, command: DealCommand) -> Result<()> {
    match command {
        DealCommand::New {
            title,
            store,
            location,
            description,
            discount,
            expires,
            images,
        } => {
            let draft = DealDraft {
                title,
                store,
                location,
                description,
                discount,
                expiration_date: expires,
                images: load_images(&images).await?,
            };
            let deal = create_listing(state, &state.deals, draft).await?;
            println!("{}", "✓ Deal shared".green().bold());
            println!();
            println!("{}", render::deal_table(&[deal]));
        }

        DealCommand::List(args) => {
            let deals = state.deals.search(&args.filter()).await?;
            if deals.is_empty() {
                println!("{}", "No active deals".yellow());
            } else {
                println!("{}", render::deal_table(&deals));
            }
        }

        DealCommand::Show { id } => {
            let deal = state.deals.get(id).await?;
            let contact = contact(state, deal.creator_id.as_deref()).await?;
            render::deal_card(&deal, contact.as_deref());
        }

        DealCommand::Delete { id } => delete_listing(state, &state.deals, id).await?,
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let clock = match cli.utc_offset {
        Some(offset) => ExpiryClock::with_offset(offset),
        None => ExpiryClock::local(),
    };
    let db_path = PathBuf::from(shellexpand::tilde(&cli.db_path).into_owned());
    let state = open_state(&db_path, clock).await?;

    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let user = state.auth.signup(&name, &email, &password).await?;
            println!("{}", format!("✓ Welcome, {}!", user.name).green().bold());
        }

        Commands::Login { email, password } => {
            let user = state.auth.login(&email, &password).await?;
            println!("{}", format!("✓ Logged in as {}", user.name).green().bold());
        }

        Commands::Logout => {
            state.auth.logout().await?;
            println!("{}", "✓ Logged out".green().bold());
        }

        Commands::Guest => {
            state.auth.continue_as_guest().await?;
            println!("{}", "✓ Browsing as guest".green().bold());
        }

        Commands::Whoami => {
            let session = state.session().await?;
            match (&session.user, session.is_guest) {
                (Some(user), _) => println!("{} <{}>", user.name.bold(), user.email),
                (None, true) => println!("{}", "Guest".yellow()),
                (None, false) => println!("{}", "Not logged in".yellow()),
            }
        }

        Commands::Post(command) => run_post(&state, command).await?,

        Commands::Deal(command) => run_deal(&state, command).await?,

        Commands::Sweep => {
            let sweeper = ExpirySweeper::new(
                state.posts.clone(),
                state.deals.clone(),
                grabgrub_core::application::constants::DEFAULT_SWEEP_INTERVAL,
            );
            let stats = sweeper.sweep_once().await?;
            println!(
                "{} {} expired posts, {} expired deals removed",
                "✓".green(),
                stats.posts_removed,
                stats.deals_removed
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never mix with command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let user_error = e
                .downcast_ref::<AppError>()
                .is_some_and(AppError::is_user_error);
            if user_error {
                eprintln!("{} {}", "✗".red().bold(), e);
            } else {
                eprintln!("{} {:#}", "✗".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}
