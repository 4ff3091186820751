//! Posting CLI entrypoint.
//!
//! Operator tooling around the posting library:
//! - `xpost post` - Post text with optional media
//! - `xpost doctor` - Deployment self-check (credentials, connectivity)

#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio::time::Instant;

use xpost::config::Config;
use xpost::doctor::{self, DoctorArgs};
use xpost::media::MediaAsset;
use xpost::service::PostService;

/// Resilient posting client CLI.
#[derive(Parser)]
#[command(name = "xpost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post text with optional media.
    ///
    /// Media goes through the upload strategy chain (chunked first, then the
    /// single-request fallbacks) before the post is created.
    ///
    /// Example: xpost post "hello" --media clip.mp4
    Post(PostArgs),

    /// Deployment self-check.
    ///
    /// Verifies credentials (masked), probes endpoint reachability, and
    /// optionally round-trips against the live API. Exit codes: 0 healthy,
    /// 1 failing, 2 warnings.
    Doctor(DoctorArgs),
}

/// Arguments for the `xpost post` command.
#[derive(Args, Debug)]
struct PostArgs {
    /// Text of the post.
    text: String,

    /// Media file to attach.
    #[arg(long)]
    media: Option<PathBuf>,

    /// Overall deadline in seconds for the whole operation.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Output the receipt as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging.
    // Write logs to stderr so stdout is clean for JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Post(args) => post(args).await,
        Commands::Doctor(args) => doctor::run(&args).await,
    }
}

async fn post(args: PostArgs) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let service = PostService::new(config)?;

    let asset = match &args.media {
        Some(path) => Some(MediaAsset::from_path(path).await?),
        None => None,
    };
    let deadline = args
        .deadline_secs
        .map(|secs| Instant::now() + std::time::Duration::from_secs(secs));

    let receipt = service.post(&args.text, asset, deadline).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!("posted: {}", receipt.tweet_id);
        if let Some(media_id) = &receipt.media_id {
            println!("media:  {media_id}");
        }
    }
    Ok(())
}
