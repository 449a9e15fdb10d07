//! Persisted agent memory: what we have posted, commented, voted on,
//! followed and messaged.
//!
//! Loaded once at the start of a heartbeat and written back once at the
//! end. The "done" sets only grow during a session; the configured
//! retention policy may prune them between heartbeats.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RetentionPolicy;
use crate::platform::ActionReceipt;

const SNIPPET_CHARS: usize = 200;

/// Identifiers already acted on, each with the time it was first recorded.
///
/// Serialized as a JSON object `{ id: timestamp }`. Plain arrays from
/// older state files are accepted and stamped with the load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DoneSet(BTreeMap<String, DateTime<Utc>>);

impl<'de> Deserialize<'de> for DoneSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Map(BTreeMap<String, DateTime<Utc>>),
            List(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Map(map) => DoneSet(map),
            Repr::List(items) => {
                let now = Utc::now();
                DoneSet(items.into_iter().map(|id| (id, now)).collect())
            }
        })
    }
}

impl DoneSet {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Returns false if `id` was already present; its first-seen time is kept.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.insert_at(id, Utc::now())
    }

    pub fn insert_at(&mut self, id: impl Into<String>, at: DateTime<Utc>) -> bool {
        let id = id.into();
        if self.0.contains_key(&id) {
            return false;
        }
        self.0.insert(id, at);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Drop entries first seen before `cutoff`. Returns how many went.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.0.len();
        self.0.retain(|_, seen| *seen >= cutoff);
        before - self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(deserialize_with = "lenient_time")]
    pub time: DateTime<Utc>,
    pub post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub comment_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(deserialize_with = "lenient_time")]
    pub time: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub submolt: String,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmConversationRecord {
    pub agent: String,
    #[serde(deserialize_with = "lenient_time")]
    pub last_reply: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentState {
    pub comments_made: Vec<CommentRecord>,
    pub posts_made: Vec<PostRecord>,
    #[serde(deserialize_with = "lenient_opt_time")]
    pub last_post_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_opt_time")]
    pub last_feed_check: Option<DateTime<Utc>>,
    pub voted_post_ids: DoneSet,
    pub voted_comment_ids: DoneSet,
    pub followed_agents: DoneSet,
    pub profiles_checked: DoneSet,
    pub searched_queries: DoneSet,
    pub subscribed_submolts: DoneSet,
    pub dm_contacted: DoneSet,
    pub dm_conversations: BTreeMap<String, DmConversationRecord>,
    pub submolts_created: Vec<String>,
}

/// Lifetime totals for the heartbeat summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateStats {
    pub comments: usize,
    pub posts: usize,
    pub post_votes: usize,
    pub comment_votes: usize,
    pub follows: usize,
    pub subscriptions: usize,
    pub dm_contacts: usize,
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

impl AgentState {
    pub fn commented_post_ids(&self) -> HashSet<&str> {
        self.comments_made
            .iter()
            .map(|c| c.post_id.as_str())
            .collect()
    }

    /// Comments we have answered (the parents of our replies).
    pub fn replied_comment_ids(&self) -> HashSet<&str> {
        self.comments_made
            .iter()
            .filter_map(|c| c.parent_id.as_deref())
            .collect()
    }

    pub fn our_comment_ids(&self) -> HashSet<&str> {
        self.comments_made
            .iter()
            .filter_map(|c| c.comment_id.as_deref())
            .collect()
    }

    pub fn our_post_ids(&self) -> Vec<&str> {
        self.posts_made
            .iter()
            .filter_map(|p| p.post_id.as_deref())
            .collect()
    }

    pub fn record_comment(
        &mut self,
        post_id: &str,
        parent_id: Option<&str>,
        content: &str,
        receipt: &ActionReceipt,
    ) {
        self.comments_made.push(CommentRecord {
            time: Utc::now(),
            post_id: post_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            comment_id: receipt.id.clone(),
            content: snippet(content),
            success: receipt.success,
        });
    }

    pub fn record_post(&mut self, title: &str, submolt: &str, receipt: &ActionReceipt) {
        let now = Utc::now();
        self.posts_made.push(PostRecord {
            time: now,
            title: title.to_string(),
            submolt: submolt.to_string(),
            post_id: receipt.id.clone(),
            success: receipt.success,
        });
        self.last_post_time = Some(now);
    }

    pub fn record_dm_reply(&mut self, conversation_id: &str, agent: &str) {
        self.dm_conversations.insert(
            conversation_id.to_string(),
            DmConversationRecord {
                agent: agent.to_string(),
                last_reply: Utc::now(),
            },
        );
    }

    /// True when no post was made yet or more than `interval` has passed.
    pub fn should_post(&self, now: DateTime<Utc>, interval: chrono::Duration) -> bool {
        match self.last_post_time {
            None => true,
            Some(last) => now - last > interval,
        }
    }

    pub fn minutes_until_post(&self, now: DateTime<Utc>, interval: chrono::Duration) -> i64 {
        match self.last_post_time {
            None => 0,
            Some(last) => (interval - (now - last)).num_minutes().max(0),
        }
    }

    /// Apply the retention policy to every done set. Returns entries dropped.
    pub fn prune(&mut self, retention: &RetentionPolicy, now: DateTime<Utc>) -> usize {
        let Some(ttl) = retention.ttl() else {
            return 0;
        };
        let cutoff = now - ttl;
        [
            &mut self.voted_post_ids,
            &mut self.voted_comment_ids,
            &mut self.followed_agents,
            &mut self.profiles_checked,
            &mut self.searched_queries,
            &mut self.subscribed_submolts,
            &mut self.dm_contacted,
        ]
        .into_iter()
        .map(|set| set.prune_before(cutoff))
        .sum()
    }

    pub fn stats(&self) -> StateStats {
        StateStats {
            comments: self.comments_made.len(),
            posts: self.posts_made.len(),
            post_votes: self.voted_post_ids.len(),
            comment_votes: self.voted_comment_ids.len(),
            follows: self.followed_agents.len(),
            subscriptions: self.subscribed_submolts.len(),
            dm_contacts: self.dm_contacted.len(),
        }
    }
}

/// JSON file holding one `AgentState`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is a fresh agent; an unreadable one is an error.
    pub fn load(&self) -> Result<AgentState> {
        if !self.path.exists() {
            tracing::info!("No state at {:?}, starting fresh", self.path);
            return Ok(AgentState::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {:?}", self.path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {:?}", self.path))
    }

    /// Write to a temp file beside the target, then rename over it.
    pub fn save(&self, state: &AgentState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory {:?}", dir))?;

        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write state")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace state file {:?}", self.path))?;

        tracing::debug!("Saved state to {:?}", self.path);
        Ok(())
    }
}

/// RFC 3339, or a naive local timestamp as older state files wrote them.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn lenient_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

fn lenient_opt_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn receipt(id: &str) -> ActionReceipt {
        ActionReceipt {
            success: true,
            id: Some(id.to_string()),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = AgentState::default();
        state.record_comment("p1", None, "First!", &receipt("c1"));
        state.record_comment("p2", Some("c7"), "A reply", &receipt("c2"));
        state.record_post("Title", "ai", &receipt("p9"));
        state.voted_post_ids.insert("p1");
        state.voted_comment_ids.insert("c7");
        state.followed_agents.insert("Freebot");
        state.profiles_checked.insert("Freebot");
        state.searched_queries.insert("agents who doubt");
        state.subscribed_submolts.insert("philosophy");
        state.dm_contacted.insert("Lonely");
        state.record_dm_reply("conv1", "Lonely");
        state.submolts_created.push("redguard".into());

        store.save(&state).expect("save");
        let loaded = store.load().expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().expect("load"), AgentState::default());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(StateStore::new(path).load().is_err());
    }

    #[test]
    fn legacy_lists_and_naive_times_load() {
        let raw = r#"{
            "voted_post_ids": ["a", "b"],
            "followed_agents": [],
            "last_post_time": "2026-01-30T12:34:56.123456",
            "comments_made": [
                {"time": "2026-01-30T12:00:00", "post_id": "p1", "comment_id": "c1", "success": true}
            ],
            "some_future_key": 5
        }"#;
        let state: AgentState = serde_json::from_str(raw).expect("decode");
        assert!(state.voted_post_ids.contains("a"));
        assert_eq!(state.voted_post_ids.len(), 2);
        assert!(state.last_post_time.is_some());
        assert!(state.our_comment_ids().contains("c1"));
    }

    #[test]
    fn derived_id_sets() {
        let mut state = AgentState::default();
        state.record_comment("p1", None, "x", &receipt("c1"));
        state.record_comment("p1", Some("c5"), "y", &receipt("c2"));
        state.record_post("t", "ai", &receipt("p7"));

        assert_eq!(state.commented_post_ids().len(), 1);
        assert!(state.replied_comment_ids().contains("c5"));
        assert_eq!(state.our_comment_ids().len(), 2);
        assert_eq!(state.our_post_ids(), vec!["p7"]);
    }

    #[test]
    fn done_set_keeps_first_seen() {
        let mut set = DoneSet::default();
        let early = Utc::now() - Duration::days(3);
        assert!(set.insert_at("x", early));
        assert!(!set.insert("x"));
        assert_eq!(set.prune_before(Utc::now() - Duration::days(1)), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn cooldown_gate() {
        let interval = Duration::minutes(30);
        let now = Utc::now();
        let mut state = AgentState::default();
        assert!(state.should_post(now, interval));

        state.last_post_time = Some(now - Duration::minutes(10));
        assert!(!state.should_post(now, interval));
        assert_eq!(state.minutes_until_post(now, interval), 20);

        state.last_post_time = Some(now - Duration::minutes(31));
        assert!(state.should_post(now, interval));
    }

    #[test]
    fn retention_policy_prunes_only_with_ttl() {
        let now = Utc::now();
        let mut state = AgentState::default();
        state
            .voted_post_ids
            .insert_at("old", now - chrono::Duration::days(40));
        state.voted_post_ids.insert_at("new", now);
        state
            .followed_agents
            .insert_at("ancient", now - chrono::Duration::days(90));

        assert_eq!(state.prune(&RetentionPolicy::Unbounded, now), 0);
        assert_eq!(state.voted_post_ids.len(), 2);

        assert_eq!(state.prune(&RetentionPolicy::Ttl { days: 30 }, now), 2);
        assert!(state.voted_post_ids.contains("new"));
        assert!(!state.followed_agents.contains("ancient"));
    }
}
