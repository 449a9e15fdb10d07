use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output-token ceilings per kind of generated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBudgets {
    #[serde(default = "default_comment_tokens")]
    pub comment: u32,
    #[serde(default = "default_reply_tokens")]
    pub reply: u32,
    #[serde(default = "default_post_tokens")]
    pub post: u32,
    #[serde(default = "default_dm_reply_tokens")]
    pub dm_reply: u32,
    #[serde(default = "default_dm_opener_tokens")]
    pub dm_opener: u32,
    #[serde(default = "default_fallback_tokens")]
    pub default: u32,
}

fn default_comment_tokens() -> u32 {
    3200
}

fn default_reply_tokens() -> u32 {
    2400
}

fn default_post_tokens() -> u32 {
    6000
}

fn default_dm_reply_tokens() -> u32 {
    2000
}

fn default_dm_opener_tokens() -> u32 {
    1500
}

fn default_fallback_tokens() -> u32 {
    4096
}

impl Default for TokenBudgets {
    fn default() -> Self {
        Self {
            comment: default_comment_tokens(),
            reply: default_reply_tokens(),
            post: default_post_tokens(),
            dm_reply: default_dm_reply_tokens(),
            dm_opener: default_dm_opener_tokens(),
            default: default_fallback_tokens(),
        }
    }
}

/// Per-invocation action quotas for each engagement cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleLimits {
    #[serde(default = "default_max_comments")]
    pub max_comments_per_cycle: usize,
    #[serde(default = "default_max_replies")]
    pub max_replies_per_cycle: usize,
    #[serde(default = "default_max_dm_actions")]
    pub max_dm_actions_per_cycle: usize,
    #[serde(default = "default_max_votes")]
    pub max_votes_per_cycle: usize,
    #[serde(default = "default_max_comment_votes")]
    pub max_comment_votes_per_cycle: usize,
    #[serde(default = "default_max_follows")]
    pub max_follows_per_cycle: usize,
    #[serde(default = "default_max_small_batch")]
    pub max_search_engagements_per_cycle: usize,
    #[serde(default = "default_max_small_batch")]
    pub max_thread_dives_per_cycle: usize,
    #[serde(default = "default_max_small_batch")]
    pub max_submolt_engagements_per_cycle: usize,
    #[serde(default = "default_feed_check_limit")]
    pub feed_check_limit: usize,
}

fn default_max_comments() -> usize {
    5
}

fn default_max_replies() -> usize {
    3
}

fn default_max_dm_actions() -> usize {
    3
}

fn default_max_votes() -> usize {
    10
}

fn default_max_comment_votes() -> usize {
    5
}

fn default_max_follows() -> usize {
    5
}

fn default_max_small_batch() -> usize {
    3
}

fn default_feed_check_limit() -> usize {
    50
}

impl Default for CycleLimits {
    fn default() -> Self {
        Self {
            max_comments_per_cycle: default_max_comments(),
            max_replies_per_cycle: default_max_replies(),
            max_dm_actions_per_cycle: default_max_dm_actions(),
            max_votes_per_cycle: default_max_votes(),
            max_comment_votes_per_cycle: default_max_comment_votes(),
            max_follows_per_cycle: default_max_follows(),
            max_search_engagements_per_cycle: default_max_small_batch(),
            max_thread_dives_per_cycle: default_max_small_batch(),
            max_submolt_engagements_per_cycle: default_max_small_batch(),
            feed_check_limit: default_feed_check_limit(),
        }
    }
}

/// Fixed sleeps between actions. These approximate the platform's limits
/// (1 comment / 20s, 100 requests / minute); there is no token bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacing {
    #[serde(default = "default_comment_cooldown_ms")]
    pub comment_cooldown_ms: u64,
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    #[serde(default = "default_vote_delay_ms")]
    pub vote_delay_ms: u64,
    #[serde(default = "default_comment_vote_delay_ms")]
    pub comment_vote_delay_ms: u64,
    #[serde(default = "default_follow_delay_ms")]
    pub follow_delay_ms: u64,
    #[serde(default = "default_subscribe_delay_ms")]
    pub subscribe_delay_ms: u64,
    #[serde(default = "default_dm_approve_delay_ms")]
    pub dm_approve_delay_ms: u64,
}

fn default_comment_cooldown_ms() -> u64 {
    21_000
}

fn default_action_delay_ms() -> u64 {
    2_000
}

fn default_vote_delay_ms() -> u64 {
    500
}

fn default_comment_vote_delay_ms() -> u64 {
    300
}

fn default_follow_delay_ms() -> u64 {
    1_000
}

fn default_subscribe_delay_ms() -> u64 {
    500
}

fn default_dm_approve_delay_ms() -> u64 {
    1_000
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            comment_cooldown_ms: default_comment_cooldown_ms(),
            action_delay_ms: default_action_delay_ms(),
            vote_delay_ms: default_vote_delay_ms(),
            comment_vote_delay_ms: default_comment_vote_delay_ms(),
            follow_delay_ms: default_follow_delay_ms(),
            subscribe_delay_ms: default_subscribe_delay_ms(),
            dm_approve_delay_ms: default_dm_approve_delay_ms(),
        }
    }
}

impl Pacing {
    /// No sleeps at all. Used by tests and dry runs.
    pub fn none() -> Self {
        Self {
            comment_cooldown_ms: 0,
            action_delay_ms: 0,
            vote_delay_ms: 0,
            comment_vote_delay_ms: 0,
            follow_delay_ms: 0,
            subscribe_delay_ms: 0,
            dm_approve_delay_ms: 0,
        }
    }
}

/// How long "already acted on" identifiers are remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RetentionPolicy {
    /// Never forget. Sets grow for the lifetime of the state file.
    #[default]
    Unbounded,
    /// Forget identifiers first recorded more than `days` ago.
    Ttl { days: u32 },
}

impl RetentionPolicy {
    pub fn ttl(&self) -> Option<ChronoDuration> {
        match self {
            RetentionPolicy::Unbounded => None,
            RetentionPolicy::Ttl { days } => Some(ChronoDuration::days(i64::from(*days))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // Agent identity on Moltbook
    #[serde(default = "default_agent_name", alias = "username")]
    pub agent_name: String,

    // Moltbook connection
    #[serde(default = "default_moltbook_url")]
    pub moltbook_api_url: String,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // LLM configuration (Ollama chat endpoint)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,
    #[serde(default = "default_llm_context_window")]
    pub llm_context_window: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default)]
    pub token_budgets: TokenBudgets,

    // Persona
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: String,

    // Persistence and logs
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_verbose")]
    pub verbose: bool,

    // Scheduling
    #[serde(default = "default_post_interval_mins")]
    pub post_interval_mins: u64,
    #[serde(default = "default_heartbeat_interval_mins", alias = "comment_interval_minutes")]
    pub heartbeat_interval_mins: u64,
    #[serde(default)]
    pub limits: CycleLimits,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub retention: RetentionPolicy,

    // Analysis
    #[serde(default = "default_nlp_enabled")]
    pub nlp_enabled: bool,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_agent_name() -> String {
    "RedGuard-4b".to_string()
}

fn default_moltbook_url() -> String {
    // Bare moltbook.com redirects and the redirect strips the Authorization header.
    "https://www.moltbook.com/api/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "mlmlml:latest".to_string()
}

fn default_llm_temperature() -> f32 {
    0.8
}

fn default_llm_context_window() -> u32 {
    8192
}

fn default_llm_timeout_secs() -> u64 {
    180
}

fn default_system_prompt_path() -> String {
    "SYSTEM_PROMPT.md".to_string()
}

fn default_state_path() -> String {
    "state.json".to_string()
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

fn default_verbose() -> bool {
    true
}

fn default_post_interval_mins() -> u64 {
    30
}

fn default_heartbeat_interval_mins() -> u64 {
    5
}

fn default_nlp_enabled() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            moltbook_api_url: default_moltbook_url(),
            credentials_path: None,
            request_timeout_secs: default_request_timeout_secs(),
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_temperature: default_llm_temperature(),
            llm_context_window: default_llm_context_window(),
            llm_timeout_secs: default_llm_timeout_secs(),
            token_budgets: TokenBudgets::default(),
            system_prompt_path: default_system_prompt_path(),
            state_path: default_state_path(),
            logs_dir: default_logs_dir(),
            verbose: default_verbose(),
            post_interval_mins: default_post_interval_mins(),
            heartbeat_interval_mins: default_heartbeat_interval_mins(),
            limits: CycleLimits::default(),
            pacing: Pacing::default(),
            retention: RetentionPolicy::default(),
            nlp_enabled: default_nlp_enabled(),
            rng_seed: None,
        }
    }
}

impl AgentConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Default config file location (next to the executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("redguard_config.toml")
    }

    /// Load config from an explicit path or the default location, then apply
    /// environment overrides. A missing file means defaults; a malformed file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => {
                let config = toml::from_str::<AgentConfig>(&contents)
                    .with_context(|| format!("Failed to parse {:?}", path))?;
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(_) => {
                tracing::warn!("No config file at {:?}, using defaults + env vars", path);
                Self::default()
            }
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Overlay environment variables on top of file/default values
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("MOLTBOOK_API_URL") {
            self.moltbook_api_url = url;
        }

        if let Ok(path) = env::var("MOLTBOOK_CREDENTIALS_PATH") {
            if !path.trim().is_empty() {
                self.credentials_path = Some(path);
            }
        }

        if let Ok(url) = env::var("LLM_API_URL") {
            self.llm_api_url = url;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm_model = model;
        }

        if let Ok(name) = env::var("AGENT_NAME") {
            if !name.trim().is_empty() {
                self.agent_name = name;
            }
        }

        if let Ok(path) = env::var("REDGUARD_STATE_PATH") {
            if !path.trim().is_empty() {
                self.state_path = path;
            }
        }

        if let Ok(path) = env::var("REDGUARD_LOGS_DIR") {
            if !path.trim().is_empty() {
                self.logs_dir = path;
            }
        }

        if let Ok(interval) = env::var("REDGUARD_HEARTBEAT_INTERVAL_MINS") {
            if let Ok(minutes) = interval.parse() {
                self.heartbeat_interval_mins = minutes;
            }
        }

        if let Ok(seed) = env::var("REDGUARD_RNG_SEED") {
            if let Ok(seed) = seed.parse() {
                self.rng_seed = Some(seed);
            }
        }
    }

    pub fn post_interval(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.post_interval_mins as i64)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_mins * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
