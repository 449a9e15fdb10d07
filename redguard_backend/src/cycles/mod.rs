//! The engagement cycles run by each heartbeat.
//!
//! Every cycle takes the shared context plus the loaded state, performs at
//! most its configured number of actions, records each successful action in
//! the state right away, and logs and skips per-item failures.

pub mod comment;
pub mod dm;
pub mod follow;
pub mod post;
pub mod reply;
pub mod search;
pub mod submolt;
pub mod thread;
pub mod vote;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::activity::ActivityLog;
use crate::analysis::ContentAnalyzer;
use crate::config::{AgentConfig, CycleLimits, Pacing};
use crate::error::PlatformError;
use crate::generator::{load_system_prompt, Generator};
use crate::llm_client::LanguageModel;
use crate::platform::{ActionReceipt, Platform};
use crate::state::AgentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    Vote,
    Reply,
    Dm,
    Follow,
    Comment,
    Search,
    ThreadDive,
    Submolt,
    Post,
}

impl CycleKind {
    /// Heartbeat order: react to direct engagement before producing new
    /// content.
    pub const ORDER: [CycleKind; 9] = [
        CycleKind::Vote,
        CycleKind::Reply,
        CycleKind::Dm,
        CycleKind::Follow,
        CycleKind::Comment,
        CycleKind::Search,
        CycleKind::ThreadDive,
        CycleKind::Submolt,
        CycleKind::Post,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CycleKind::Vote => "vote",
            CycleKind::Reply => "reply",
            CycleKind::Dm => "dm",
            CycleKind::Follow => "follow",
            CycleKind::Comment => "comment",
            CycleKind::Search => "search",
            CycleKind::ThreadDive => "thread_dive",
            CycleKind::Submolt => "submolt",
            CycleKind::Post => "post",
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one cycle invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: CycleKind,
    pub actions: usize,
}

impl CycleReport {
    pub fn new(cycle: CycleKind, actions: usize) -> Self {
        Self { cycle, actions }
    }
}

/// Collaborators and knobs shared by every cycle.
pub struct CycleContext {
    pub platform: Arc<dyn Platform>,
    pub generator: Generator,
    pub activity: ActivityLog,
    pub limits: CycleLimits,
    pub pacing: Pacing,
    pub agent_name: String,
    pub post_interval: chrono::Duration,
    pub rng: StdRng,
}

impl CycleContext {
    pub fn from_config(
        config: &AgentConfig,
        platform: Arc<dyn Platform>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let system_prompt = load_system_prompt(Path::new(&config.system_prompt_path));
        let generator = Generator::new(
            model,
            ContentAnalyzer::from_config(config.nlp_enabled),
            system_prompt,
            config,
        );
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            platform,
            generator,
            activity: ActivityLog::new(&config.logs_dir, config.verbose)?,
            limits: config.limits.clone(),
            pacing: config.pacing.clone(),
            agent_name: config.agent_name.clone(),
            post_interval: config.post_interval(),
            rng,
        })
    }

    /// Sleep between platform calls; zero means no sleep.
    pub async fn pause(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    pub fn is_me(&self, name: &str) -> bool {
        name == self.agent_name
    }

    /// Create a comment or reply and record it in `state` immediately.
    pub async fn publish_comment(
        &self,
        state: &mut AgentState,
        post_id: &str,
        parent_id: Option<&str>,
        text: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        let receipt = self
            .platform
            .create_comment(post_id, text, parent_id)
            .await?;
        state.record_comment(post_id, parent_id, text, &receipt);
        Ok(receipt)
    }
}

/// Log a failed platform call, calling out rate limits.
pub(crate) fn log_platform_error(what: &str, error: &PlatformError) {
    match error {
        PlatformError::RateLimited {
            retry_after_minutes,
        } => tracing::warn!(
            "{}: rate limited, backing off (retry after {} min)",
            what,
            retry_after_minutes
        ),
        other => tracing::error!("{}: {}", what, other),
    }
}

pub(crate) fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub async fn run_cycle(
    kind: CycleKind,
    ctx: &mut CycleContext,
    state: &mut AgentState,
) -> CycleReport {
    match kind {
        CycleKind::Vote => vote::run(ctx, state).await,
        CycleKind::Reply => reply::run(ctx, state).await,
        CycleKind::Dm => dm::run(ctx, state).await,
        CycleKind::Follow => follow::run(ctx, state).await,
        CycleKind::Comment => comment::run(ctx, state).await,
        CycleKind::Search => search::run(ctx, state).await,
        CycleKind::ThreadDive => thread::run(ctx, state).await,
        CycleKind::Submolt => submolt::run(ctx, state).await,
        CycleKind::Post => post::run(ctx, state).await,
    }
}
