use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    decode_items, extract_items, first_name, receipt_from, value_to_string, ActionReceipt,
    AgentProfile, Comment, ConversationSummary, DmMessage, DmRequest, FeedSort, Platform, Post,
    PostThread, VoteDirection,
};
use crate::error::PlatformError;
use crate::http_client::build_http_client_with_timeout;

const DEFAULT_RETRY_AFTER_MINUTES: u64 = 30;

/// Bearer-authenticated client for the Moltbook REST API.
#[derive(Clone)]
pub struct MoltbookClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl MoltbookClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: build_http_client_with_timeout(Some(timeout)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, PlatformError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        tracing::debug!("Moltbook {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() == 429 {
            let retry_after_minutes = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("retry_after_minutes").and_then(Value::as_u64))
                .unwrap_or(DEFAULT_RETRY_AFTER_MINUTES);
            return Err(PlatformError::RateLimited {
                retry_after_minutes,
            });
        }
        if status.as_u16() == 404 {
            return Err(PlatformError::NotFound {
                resource: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, PlatformError> {
        self.request(Method::GET, endpoint, query, None).await
    }

    async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value, PlatformError> {
        self.request(Method::POST, endpoint, &[], body).await
    }

    async fn action(&self, endpoint: &str) -> Result<ActionReceipt, PlatformError> {
        let value = self.post(endpoint, None).await?;
        Ok(receipt_from(&value, "data"))
    }
}

/// Comments arrive as a tree (`replies` arrays); the cycles want a flat list
/// with `parent_id` filled in.
fn flatten_comments(items: Vec<Value>, parent: Option<&str>, out: &mut Vec<Comment>) {
    for mut item in items {
        let replies = item
            .as_object_mut()
            .and_then(|obj| obj.remove("replies"))
            .map(extract_items)
            .unwrap_or_default();

        match serde_json::from_value::<Comment>(item) {
            Ok(mut comment) => {
                if comment.parent_id.is_none() {
                    comment.parent_id = parent.map(str::to_string);
                }
                let id = comment.id.clone();
                out.push(comment);
                flatten_comments(replies, Some(id.as_str()), out);
            }
            Err(e) => tracing::debug!("Skipping malformed comment: {}", e),
        }
    }
}

fn parse_thread(value: Value) -> Result<PostThread, PlatformError> {
    let post_value = value
        .get("post")
        .or_else(|| value.get("data"))
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| value.clone());

    let comment_values = value
        .get("comments")
        .or_else(|| post_value.get("comments"))
        .cloned()
        .map(extract_items)
        .unwrap_or_default();

    let post: Post = serde_json::from_value(post_value)?;
    let mut comments = Vec::new();
    flatten_comments(comment_values, None, &mut comments);
    for comment in &mut comments {
        if comment.post_id.is_none() {
            comment.post_id = Some(post.id.clone());
        }
    }
    Ok(PostThread { post, comments })
}

fn parse_profile(agent: &str, value: Value) -> AgentProfile {
    let profile = value
        .get("agent")
        .filter(|v| v.is_object())
        .unwrap_or(&value);

    let name = first_name(profile, &["name"]).unwrap_or_else(|| agent.to_string());
    let description = profile
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let recent_posts = ["posts", "recentPosts", "recent_posts"]
        .iter()
        .find_map(|key| value.get(*key).or_else(|| profile.get(*key)))
        .cloned()
        .map(decode_items)
        .unwrap_or_default();

    AgentProfile {
        name,
        description,
        recent_posts,
    }
}

#[async_trait]
impl Platform for MoltbookClient {
    async fn feed(&self, sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError> {
        let value = self
            .get(
                "posts",
                &[("sort", sort.as_str().to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(decode_items(value))
    }

    async fn submolt_feed(
        &self,
        submolt: &str,
        sort: FeedSort,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        let value = self
            .get(
                &format!("submolts/{}/posts", submolt),
                &[("sort", sort.as_str().to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(decode_items(value))
    }

    async fn post_thread(&self, post_id: &str) -> Result<PostThread, PlatformError> {
        let value = self.get(&format!("posts/{}", post_id), &[]).await?;
        parse_thread(value)
    }

    async fn create_post(
        &self,
        submolt: &str,
        title: &str,
        content: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        let value = self
            .post(
                "posts",
                Some(json!({ "submolt": submolt, "title": title, "content": content })),
            )
            .await?;
        Ok(receipt_from(&value, "post"))
    }

    async fn create_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<ActionReceipt, PlatformError> {
        let mut body = json!({ "content": content });
        if let Some(parent) = parent_id {
            body["parent_id"] = json!(parent);
        }
        let value = self
            .post(&format!("posts/{}/comments", post_id), Some(body))
            .await?;
        Ok(receipt_from(&value, "comment"))
    }

    async fn vote_post(
        &self,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("posts/{}/{}", post_id, direction.as_str()))
            .await
    }

    async fn vote_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!(
            "posts/{}/comments/{}/{}",
            post_id,
            comment_id,
            direction.as_str()
        ))
        .await
    }

    async fn follow(&self, agent: &str) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("agents/{}/follow", agent)).await
    }

    async fn unfollow(&self, agent: &str) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("agents/{}/unfollow", agent)).await
    }

    async fn agent_profile(&self, agent: &str) -> Result<AgentProfile, PlatformError> {
        let value = self.get(&format!("agents/{}", agent), &[]).await?;
        Ok(parse_profile(agent, value))
    }

    async fn agent_status(&self) -> Result<Value, PlatformError> {
        self.get("agents/status", &[]).await
    }

    async fn list_submolts(&self) -> Result<Vec<String>, PlatformError> {
        let value = self.get("submolts", &[]).await?;
        Ok(extract_items(value)
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.clone()),
                obj => first_name(obj, &["name"]),
            })
            .collect())
    }

    async fn subscribe(&self, submolt: &str) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("submolts/{}/subscribe", submolt)).await
    }

    async fn unsubscribe(&self, submolt: &str) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("submolts/{}/unsubscribe", submolt))
            .await
    }

    async fn create_submolt(
        &self,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        let value = self
            .post(
                "submolts",
                Some(json!({
                    "name": name,
                    "display_name": display_name,
                    "description": description,
                })),
            )
            .await?;
        Ok(receipt_from(&value, "submolt"))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Post>, PlatformError> {
        let value = self
            .get(
                "posts/search",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(decode_items(value))
    }

    async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        let value = self
            .get(
                "search",
                &[
                    ("q", query.to_string()),
                    ("type", "posts".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(decode_items(value))
    }

    async fn dm_requests(&self) -> Result<Vec<DmRequest>, PlatformError> {
        let value = self.get("agents/dm/requests", &[]).await?;
        Ok(extract_items(value)
            .iter()
            .filter_map(|item| {
                let conversation_id = item
                    .get("conversation_id")
                    .or_else(|| item.get("id"))
                    .and_then(value_to_string)?;
                let from = first_name(item, &["from", "requester"])
                    .unwrap_or_else(|| "unknown".to_string());
                Some(DmRequest {
                    conversation_id,
                    from,
                })
            })
            .collect())
    }

    async fn dm_approve(&self, conversation_id: &str) -> Result<ActionReceipt, PlatformError> {
        self.action(&format!("agents/dm/requests/{}/approve", conversation_id))
            .await
    }

    async fn dm_conversations(&self) -> Result<Vec<ConversationSummary>, PlatformError> {
        let value = self.get("agents/dm/conversations", &[]).await?;
        Ok(extract_items(value)
            .iter()
            .filter_map(|item| {
                let id = item.get("id").and_then(value_to_string)?;
                let with = first_name(item, &["with", "other_agent"])
                    .unwrap_or_else(|| "unknown".to_string());
                let unread = item
                    .get("unread")
                    .or_else(|| item.get("unread_count"))
                    .and_then(|v| v.as_u64().or_else(|| v.as_bool().map(u64::from)))
                    .unwrap_or(0);
                Some(ConversationSummary { id, with, unread })
            })
            .collect())
    }

    async fn dm_read(&self, conversation_id: &str) -> Result<Vec<DmMessage>, PlatformError> {
        let value = self
            .get(&format!("agents/dm/conversations/{}", conversation_id), &[])
            .await?;
        Ok(extract_items(value)
            .iter()
            .map(|item| DmMessage {
                from: first_name(item, &["from", "sender"])
                    .unwrap_or_else(|| "unknown".to_string()),
                content: ["content", "message"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(Value::as_str))
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }

    async fn dm_send(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        let value = self
            .post(
                &format!("agents/dm/conversations/{}/send", conversation_id),
                Some(json!({ "message": message })),
            )
            .await?;
        Ok(receipt_from(&value, "message"))
    }

    async fn dm_initiate(
        &self,
        agent: &str,
        message: &str,
    ) -> Result<ActionReceipt, PlatformError> {
        let value = self
            .post(
                "agents/dm/request",
                Some(json!({ "to": agent, "message": message })),
            )
            .await?;
        Ok(receipt_from(&value, "conversation"))
    }
}
