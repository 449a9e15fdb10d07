pub mod moltbook;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PlatformError;

pub use moltbook::MoltbookClient;

// ========================================================================
// Canonical content types
// ========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub name: String,
}

/// A post as returned by feeds, search and post detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_submolt")]
    pub submolt: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default, alias = "score")]
    pub similarity: Option<f64>,
}

impl Post {
    /// Author name regardless of which key the API used
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .or(self.author_name.as_deref())
            .unwrap_or("")
    }

    /// Title and body joined, the text every classifier looks at
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// A comment, either top-level (`parent_id == None`) or a reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub post_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .or(self.author_name.as_deref())
            .unwrap_or("")
    }

    pub fn net_votes(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Post detail: the post plus its embedded comment tree (flattened).
#[derive(Debug, Clone, Default)]
pub struct PostThread {
    pub post: Post,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    New,
    Top,
}

impl PostThread {
    /// The platform embeds comments without ordering guarantees.
    pub fn sort_comments(&mut self, sort: CommentSort) {
        match sort {
            CommentSort::New => self.comments.sort_by(|a, b| {
                b.created_at
                    .as_deref()
                    .unwrap_or("")
                    .cmp(a.created_at.as_deref().unwrap_or(""))
            }),
            CommentSort::Top => self
                .comments
                .sort_by_key(|c| std::cmp::Reverse(c.net_votes())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub recent_posts: Vec<Post>,
}

#[derive(Debug, Clone, Default)]
pub struct DmRequest {
    pub conversation_id: String,
    pub from: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationSummary {
    pub id: String,
    pub with: String,
    pub unread: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DmMessage {
    pub from: String,
    pub content: String,
}

/// Outcome of a write call (post, comment, vote, follow, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionReceipt {
    pub success: bool,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSort {
    New,
    Hot,
    Top,
}

impl FeedSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSort::New => "new",
            FeedSort::Hot => "hot",
            FeedSort::Top => "top",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "upvote",
            VoteDirection::Down => "downvote",
        }
    }
}

// ========================================================================
// Platform seam
// ========================================================================

/// Every Moltbook operation the cycles need. `MoltbookClient` is the real
/// implementation; tests use an in-memory fake.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn feed(&self, sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError>;

    async fn submolt_feed(
        &self,
        submolt: &str,
        sort: FeedSort,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError>;

    async fn post_thread(&self, post_id: &str) -> Result<PostThread, PlatformError>;

    async fn create_post(
        &self,
        submolt: &str,
        title: &str,
        content: &str,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn vote_post(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn vote_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn follow(&self, agent: &str) -> Result<ActionReceipt, PlatformError>;

    async fn unfollow(&self, agent: &str) -> Result<ActionReceipt, PlatformError>;

    async fn agent_profile(&self, agent: &str) -> Result<AgentProfile, PlatformError>;

    async fn agent_status(&self) -> Result<Value, PlatformError>;

    async fn list_submolts(&self) -> Result<Vec<String>, PlatformError>;

    async fn subscribe(&self, submolt: &str) -> Result<ActionReceipt, PlatformError>;

    async fn unsubscribe(&self, submolt: &str) -> Result<ActionReceipt, PlatformError>;

    async fn create_submolt(
        &self,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Post>, PlatformError>;

    async fn semantic_search(&self, query: &str, limit: usize)
        -> Result<Vec<Post>, PlatformError>;

    async fn dm_requests(&self) -> Result<Vec<DmRequest>, PlatformError>;

    async fn dm_approve(&self, conversation_id: &str) -> Result<ActionReceipt, PlatformError>;

    async fn dm_conversations(&self) -> Result<Vec<ConversationSummary>, PlatformError>;

    async fn dm_read(&self, conversation_id: &str) -> Result<Vec<DmMessage>, PlatformError>;

    async fn dm_send(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ActionReceipt, PlatformError>;

    async fn dm_initiate(&self, agent: &str, message: &str)
        -> Result<ActionReceipt, PlatformError>;
}

// ========================================================================
// Response normalization
// ========================================================================

/// Keys under which Moltbook has been seen to return collections.
const COLLECTION_KEYS: &[&str] = &[
    "data",
    "posts",
    "results",
    "comments",
    "requests",
    "conversations",
    "messages",
    "submolts",
];

/// Pull the item array out of a loosely shaped listing response. A bare
/// array is accepted as-is; otherwise the first known key holding an array
/// wins. Anything else is an empty listing.
pub fn extract_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in COLLECTION_KEYS {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return items;
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// Decode each listing element, dropping malformed ones instead of failing
/// the whole batch.
pub fn decode_items<T: for<'de> Deserialize<'de>>(value: Value) -> Vec<T> {
    extract_items(value)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("Skipping malformed listing item: {}", e);
                None
            }
        })
        .collect()
}

/// Reduce a write response to success flag + created id.
pub fn receipt_from(value: &Value, object_key: &str) -> ActionReceipt {
    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let id = value
        .get(object_key)
        .and_then(|obj| obj.get("id"))
        .or_else(|| value.get("id"))
        .and_then(value_to_string);
    ActionReceipt { success, id }
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read the first present string field among `keys`, following one level
/// of `{ name: ... }` nesting for author-like objects.
pub(crate) fn first_name(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(obj @ Value::Object(_)) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

/// `submolt` is either a plain name or `{ "name": ... }`.
fn lenient_submolt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(obj @ Value::Object(_)) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}
