use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use weylo::dialog::{AutoConfirm, Confirmer};
use weylo::models::{Comment, Confession, Id, ReportReason, Visibility};
use weylo::{
    ClientConfig, EntityStore, FeedLoader, HttpRemoteClient, LoadOutcome, LoggingClient, NetworkFirst, Reconciler,
    RemoteClient,
};

#[derive(Parser)]
#[command(name = "weylo", about = "Weylo confessions client")]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the confession feed
    Feed {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Print one confession and its comments
    Show { id: Id },
    Like { id: Id },
    Unlike { id: Id },
    Toggle { id: Id },
    Comment {
        id: Id,
        text: String,
        #[arg(long)]
        anonymous: bool,
    },
    DeleteComment { id: Id, comment_id: Id },
    /// Submit a new confession for moderation
    Post {
        text: String,
        #[arg(long)]
        public: bool,
    },
    Delete { id: Id },
    /// Reasons: spam, harassment, hate_speech, inappropriate, other
    Report {
        id: Id,
        reason: ReportReason,
        #[arg(long)]
        description: Option<String>,
    },
}

/// Asks on the terminal.
struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            use std::io::{BufRead, Write};
            print!("{prompt} [y/N] ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).is_ok()
                && matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

fn print_confession(c: &Confession) {
    let by = c.author.as_ref().map(|a| a.username.as_str()).unwrap_or("anonymous");
    let liked = if c.is_liked { "♥" } else { "♡" };
    println!(
        "#{} [{}] {} {} {} likes, {} comments ({:?})\n    {}",
        c.id,
        c.created_at.format("%Y-%m-%d %H:%M"),
        by,
        liked,
        c.likes_count,
        c.comments_count,
        c.status,
        c.content
    );
}

fn print_comment(c: &Comment) {
    let by = c.author.as_ref().map(|a| a.username.as_str()).unwrap_or("anonymous");
    println!("    - #{} {}: {}", c.id, by, c.content);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env only in debug builds; release reads the real environment
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    info!(api = %config.api_url, page_size = config.page_size, serialize = config.serialize_mutations, "starting weylo client");

    let http = HttpRemoteClient::new(&config).context("building HTTP client")?;
    let client: Arc<dyn RemoteClient> = Arc::new(LoggingClient::new(NetworkFirst::new(http)));
    let store = Arc::new(EntityStore::new());
    let confirmer: Arc<dyn Confirmer> = if cli.yes { Arc::new(AutoConfirm(true)) } else { Arc::new(StdinConfirmer) };
    let reconciler = Reconciler::from_config(&config, store.clone(), client.clone()).with_confirmer(confirmer);

    match cli.command {
        Command::Feed { pages } => {
            let loader = FeedLoader::new(store.clone(), client.clone(), config.page_size);
            for _ in 0..pages.max(1) {
                match loader.load_more().await.context("loading feed")? {
                    LoadOutcome::Loaded(_) => {}
                    LoadOutcome::Exhausted | LoadOutcome::InFlight => break,
                }
            }
            for c in store.list() {
                print_confession(&c);
            }
            let more = if loader.has_more() { ", more available" } else { "" };
            println!("{} confessions{more}", store.len());
        }
        Command::Show { id } => {
            let c = reconciler.refresh_confession(id).await?;
            print_confession(&c);
            for comment in reconciler.load_comments(id).await? {
                print_comment(&comment);
            }
        }
        Command::Like { id } => {
            reconciler.refresh_confession(id).await?;
            print_confession(&reconciler.like(id).await?);
        }
        Command::Unlike { id } => {
            reconciler.refresh_confession(id).await?;
            print_confession(&reconciler.unlike(id).await?);
        }
        Command::Toggle { id } => {
            reconciler.refresh_confession(id).await?;
            print_confession(&reconciler.toggle_like(id).await?);
        }
        Command::Comment { id, text, anonymous } => {
            reconciler.refresh_confession(id).await?;
            print_comment(&reconciler.add_comment(id, &text, anonymous).await?);
        }
        Command::DeleteComment { id, comment_id } => {
            reconciler.refresh_confession(id).await?;
            reconciler.load_comments(id).await?;
            reconciler.delete_comment(id, comment_id).await?;
            println!("comment #{comment_id} deleted");
        }
        Command::Post { text, public } => {
            let visibility = if public { Visibility::Public } else { Visibility::Anonymous };
            print_confession(&reconciler.create_confession(&text, visibility).await?);
        }
        Command::Delete { id } => {
            reconciler.refresh_confession(id).await?;
            reconciler.delete_confession(id).await?;
            println!("confession #{id} deleted");
        }
        Command::Report { id, reason, description } => {
            reconciler.report_confession(id, reason, description.as_deref()).await?;
            println!("confession #{id} reported");
        }
    }
    Ok(())
}

/// Fail fast on a malformed API URL; warn when mutations cannot work.
fn validate_env_vars() {
    use std::env;

    if let Ok(url) = env::var("WEYLO_API_URL") {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            eprintln!("WEYLO_API_URL must start with http:// or https:// (got '{url}')");
            std::process::exit(1);
        }
    }

    if env::var("WEYLO_API_TOKEN").map(|t| t.trim().is_empty()).unwrap_or(true) {
        eprintln!("Warning: WEYLO_API_TOKEN not set; reading works but likes, comments and posts will be refused");
    }
}
