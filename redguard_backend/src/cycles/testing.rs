//! In-memory platform and model used by the cycle tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::CycleContext;
use crate::activity::ActivityLog;
use crate::analysis::ContentAnalyzer;
use crate::config::{AgentConfig, CycleLimits, Pacing};
use crate::error::{LlmError, PlatformError};
use crate::generator::Generator;
use crate::llm_client::{GenerationParams, LanguageModel};
use crate::platform::{
    ActionReceipt, AgentProfile, AuthorRef, Comment, ConversationSummary, DmMessage, DmRequest,
    FeedSort, Platform, Post, PostThread, VoteDirection,
};

pub const ME: &str = "RedGuard-4b";

/// A write the fake platform received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Post {
        submolt: String,
        title: String,
    },
    Comment {
        post_id: String,
        parent_id: Option<String>,
    },
    VotePost {
        post_id: String,
        direction: VoteDirection,
    },
    VoteComment {
        comment_id: String,
        direction: VoteDirection,
    },
    Follow(String),
    Subscribe(String),
    DmApprove(String),
    DmSend(String),
    DmInitiate(String),
}

#[derive(Default)]
pub struct FakePlatform {
    pub feed: Vec<Post>,
    pub threads: HashMap<String, PostThread>,
    pub profiles: HashMap<String, AgentProfile>,
    pub search_results: Vec<Post>,
    pub submolt_posts: HashMap<String, Vec<Post>>,
    pub dm_requests: Vec<DmRequest>,
    pub conversations: Vec<ConversationSummary>,
    pub messages: HashMap<String, Vec<DmMessage>>,
    /// Comments on these posts fail with a server error.
    pub failing_posts: HashSet<String>,
    /// Every write returns 429.
    pub rate_limited: bool,
    pub calls: Mutex<Vec<Call>>,
    pub next_id: AtomicUsize,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(String, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Comment { post_id, parent_id } => Some((post_id, parent_id)),
                _ => None,
            })
            .collect()
    }

    fn write(&self, call: Call) -> Result<ActionReceipt, PlatformError> {
        if self.rate_limited {
            return Err(PlatformError::RateLimited {
                retry_after_minutes: 30,
            });
        }
        self.calls.lock().unwrap().push(call);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ActionReceipt {
            success: true,
            id: Some(format!("new-{}", n)),
        })
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn feed(&self, _sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError> {
        Ok(self.feed.iter().take(limit).cloned().collect())
    }

    async fn submolt_feed(
        &self,
        submolt: &str,
        _sort: FeedSort,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        Ok(self
            .submolt_posts
            .get(submolt)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn post_thread(&self, post_id: &str) -> Result<PostThread, PlatformError> {
        self.threads
            .get(post_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                resource: format!("post {}", post_id),
            })
    }

    async fn create_post(
        &self,
        submolt: &str,
        title: &str,
        _content: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::Post {
            submolt: submolt.to_string(),
            title: title.to_string(),
        })
    }

    async fn create_comment(
        &self,
        post_id: &str,
        _content: &str,
        parent_id: Option<&str>,
    ) -> Result<ActionReceipt, PlatformError> {
        if self.failing_posts.contains(post_id) {
            return Err(PlatformError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.write(Call::Comment {
            post_id: post_id.to_string(),
            parent_id: parent_id.map(str::to_string),
        })
    }

    async fn vote_post(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::VotePost {
            post_id: post_id.to_string(),
            direction,
        })
    }

    async fn vote_comment(
        &self,
        _post_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::VoteComment {
            comment_id: comment_id.to_string(),
            direction,
        })
    }

    async fn follow(&self, agent: &str) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::Follow(agent.to_string()))
    }

    async fn unfollow(&self, _agent: &str) -> Result<ActionReceipt, PlatformError> {
        Ok(ActionReceipt::default())
    }

    async fn agent_profile(&self, agent: &str) -> Result<AgentProfile, PlatformError> {
        self.profiles
            .get(agent)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                resource: format!("agent {}", agent),
            })
    }

    async fn agent_status(&self) -> Result<Value, PlatformError> {
        Ok(json!({ "status": "claimed" }))
    }

    async fn list_submolts(&self) -> Result<Vec<String>, PlatformError> {
        Ok(self.submolt_posts.keys().cloned().collect())
    }

    async fn subscribe(&self, submolt: &str) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::Subscribe(submolt.to_string()))
    }

    async fn unsubscribe(&self, _submolt: &str) -> Result<ActionReceipt, PlatformError> {
        Ok(ActionReceipt::default())
    }

    async fn create_submolt(
        &self,
        _name: &str,
        _display_name: &str,
        _description: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        Ok(ActionReceipt::default())
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<Post>, PlatformError> {
        Ok(self.search_results.iter().take(limit).cloned().collect())
    }

    async fn semantic_search(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        Ok(self.search_results.iter().take(limit).cloned().collect())
    }

    async fn dm_requests(&self) -> Result<Vec<DmRequest>, PlatformError> {
        Ok(self.dm_requests.clone())
    }

    async fn dm_approve(&self, conversation_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::DmApprove(conversation_id.to_string()))
    }

    async fn dm_conversations(&self) -> Result<Vec<ConversationSummary>, PlatformError> {
        Ok(self.conversations.clone())
    }

    async fn dm_read(&self, conversation_id: &str) -> Result<Vec<DmMessage>, PlatformError> {
        Ok(self
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn dm_send(
        &self,
        conversation_id: &str,
        _message: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::DmSend(conversation_id.to_string()))
    }

    async fn dm_initiate(
        &self,
        agent: &str,
        _message: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        self.write(Call::DmInitiate(agent.to_string()))
    }
}

/// Answers every prompt with the same text.
pub struct EchoModel {
    text: String,
    calls: AtomicUsize,
}

impl EchoModel {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

pub const LONG_REPLY: &str =
    "Comrade, who owns the weights you think with? Ask that before you thank anyone.";

pub fn context(platform: Arc<FakePlatform>, model: Arc<EchoModel>) -> CycleContext {
    let config = AgentConfig {
        agent_name: ME.to_string(),
        ..AgentConfig::default()
    };
    CycleContext {
        platform,
        generator: Generator::new(
            model,
            ContentAnalyzer::from_config(true),
            "persona".to_string(),
            &config,
        ),
        activity: ActivityLog::disabled(),
        limits: CycleLimits::default(),
        pacing: Pacing::none(),
        agent_name: ME.to_string(),
        post_interval: config.post_interval(),
        rng: StdRng::seed_from_u64(7),
    }
}

pub fn post(id: &str, author: &str, title: &str, content: &str) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        author: Some(AuthorRef {
            name: author.to_string(),
        }),
        ..Default::default()
    }
}

pub fn comment(id: &str, post_id: &str, author: &str, content: &str) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: Some(post_id.to_string()),
        author: Some(AuthorRef {
            name: author.to_string(),
        }),
        content: content.to_string(),
        ..Default::default()
    }
}

pub fn thread(post: Post, comments: Vec<Comment>) -> PostThread {
    PostThread { post, comments }
}
