use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use redguard_backend::analysis::ContentAnalyzer;
use redguard_backend::config::AgentConfig;
use redguard_backend::credentials::Credentials;
use redguard_backend::cycles::CycleContext;
use redguard_backend::filters::pick_target_submolt;
use redguard_backend::generator::{load_system_prompt, ContentKind, Generator};
use redguard_backend::heartbeat::Heartbeat;
use redguard_backend::llm_client::{LanguageModel, OllamaClient};
use redguard_backend::platform::{FeedSort, MoltbookClient, Platform};
use redguard_backend::state::StateStore;

#[derive(Parser)]
#[command(name = "redguard", version, about = "RedGuard-4b, an autonomous Moltbook agent")]
struct Cli {
    /// Config file (defaults to redguard_config.toml next to the binary)
    #[arg(long, global = true, env = "REDGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run heartbeats until interrupted
    Run {
        /// Run a single heartbeat and exit
        #[arg(long)]
        once: bool,
        /// Minutes between heartbeats
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the platform status and local lifetime counters
    Status,
    /// Print the current feed
    Feed {
        #[arg(long, value_enum, default_value_t = SortArg::New)]
        sort: SortArg,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate and publish one post now
    Post {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        submolt: Option<String>,
        /// Print instead of publishing
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate and publish a comment on one post
    Comment {
        post_id: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a raw prompt through the persona and print the completion
    Generate { prompt: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    New,
    Hot,
    Top,
}

impl From<SortArg> for FeedSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::New => FeedSort::New,
            SortArg::Hot => FeedSort::Hot,
            SortArg::Top => FeedSort::Top,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,redguard=debug,redguard_backend=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = AgentConfig::load(cli.config.as_deref())?;
    let model: Arc<dyn LanguageModel> = Arc::new(OllamaClient::new(
        config.llm_api_url.clone(),
        config.llm_model.clone(),
        config.llm_timeout(),
    ));

    match cli.command.unwrap_or(Command::Run {
        once: false,
        interval: None,
    }) {
        Command::Run { once, interval } => {
            let platform = connect(&mut config)?;
            let mut heartbeat = Heartbeat::from_config(&config, platform, model)?;
            if let Some(minutes) = interval {
                heartbeat.set_interval(Duration::from_secs(minutes * 60));
            }
            tracing::info!(
                "{} starting (LLM {} at {})",
                config.agent_name,
                config.llm_model,
                config.llm_api_url
            );
            if once {
                heartbeat.run_once().await?;
                Ok(())
            } else {
                heartbeat.run_daemon().await
            }
        }
        Command::Status => {
            let platform = connect(&mut config)?;
            let status = platform
                .agent_status()
                .await
                .context("Failed to fetch agent status")?;
            println!("{}", serde_json::to_string_pretty(&status)?);

            let stats = StateStore::new(&config.state_path).load()?.stats();
            println!(
                "Lifetime: {} comments, {} posts, {} post votes, {} comment votes, {} follows, {} submolts, {} DM contacts",
                stats.comments,
                stats.posts,
                stats.post_votes,
                stats.comment_votes,
                stats.follows,
                stats.subscriptions,
                stats.dm_contacts
            );
            Ok(())
        }
        Command::Feed { sort, limit } => {
            let platform = connect(&mut config)?;
            let posts = platform.feed(sort.into(), limit).await?;
            for post in posts {
                println!(
                    "[{}] {} by {} in m/{} (+{} / -{})",
                    post.id,
                    post.title,
                    post.author_name(),
                    post.submolt.as_deref().unwrap_or("?"),
                    post.upvotes,
                    post.downvotes
                );
            }
            Ok(())
        }
        Command::Post {
            topic,
            submolt,
            dry_run,
        } => {
            let platform = connect(&mut config)?;
            let mut ctx = CycleContext::from_config(&config, platform, model)?;
            let suggestion = Generator::random_topic(&mut ctx.rng);
            let Some(generated) = ctx.generator.post(topic.as_deref(), suggestion).await? else {
                bail!("Generated post was too short twice, nothing published");
            };
            let submolt = submolt.unwrap_or_else(|| {
                pick_target_submolt(topic.as_deref(), &generated.content, &mut ctx.rng)
            });

            println!("m/{}\n{}\n\n{}", submolt, generated.title, generated.content);
            if dry_run {
                return Ok(());
            }

            ctx.activity.content(
                "post",
                json!({
                    "topic": topic.as_deref().unwrap_or(suggestion),
                    "target_submolt": submolt,
                    "generated_title": generated.title,
                    "generated_content": generated.content,
                }),
            );
            let receipt = ctx
                .platform
                .create_post(&submolt, &generated.title, &generated.content)
                .await?;

            let store = StateStore::new(&config.state_path);
            let mut state = store.load()?;
            state.record_post(&generated.title, &submolt, &receipt);
            store.save(&state)?;
            ctx.activity.activity(
                "POST",
                &format!("'{}' in m/{}", generated.title, submolt),
            );
            println!("Published {}", receipt.id.as_deref().unwrap_or("(no id)"));
            Ok(())
        }
        Command::Comment { post_id, dry_run } => {
            let platform = connect(&mut config)?;
            let ctx = CycleContext::from_config(&config, platform, model)?;
            let thread = ctx.platform.post_thread(&post_id).await?;
            let text = ctx.generator.comment(&thread.post).await?;
            if !ContentKind::Comment.accepts(&text) {
                bail!("Generated comment too short: {:?}", text);
            }

            println!("{}", text);
            if dry_run {
                return Ok(());
            }

            let store = StateStore::new(&config.state_path);
            let mut state = store.load()?;
            let receipt = ctx.publish_comment(&mut state, &post_id, None, &text).await?;
            store.save(&state)?;
            ctx.activity.activity(
                "COMMENT",
                &format!("on '{}' (manual)", thread.post.title),
            );
            println!("Published {}", receipt.id.as_deref().unwrap_or("(no id)"));
            Ok(())
        }
        Command::Generate { prompt } => {
            let generator = Generator::new(
                model,
                ContentAnalyzer::from_config(config.nlp_enabled),
                load_system_prompt(Path::new(&config.system_prompt_path)),
                &config,
            );
            println!("{}", generator.raw(&prompt).await?);
            Ok(())
        }
    }
}

/// Resolve credentials and build the Moltbook client. The registered agent
/// name from the credentials file wins over the configured one.
fn connect(config: &mut AgentConfig) -> Result<Arc<dyn Platform>> {
    let credentials = Credentials::discover(config.credentials_path.as_deref())?;
    if let Some(name) = credentials.agent_name.filter(|n| !n.trim().is_empty()) {
        config.agent_name = name;
    }
    Ok(Arc::new(MoltbookClient::new(
        config.moltbook_api_url.clone(),
        credentials.api_key,
        config.request_timeout(),
    )))
}
