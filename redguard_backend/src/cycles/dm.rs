use rand::seq::SliceRandom;
use serde_json::json;

use super::{CycleContext, CycleKind, CycleReport};
use crate::generator::ContentKind;
use crate::state::AgentState;

const HISTORY_MESSAGES: usize = 10;
const HISTORY_SNIPPET: usize = 200;
const OUTREACH_SEARCH_LIMIT: usize = 10;
const MIN_OUTREACH_POTENTIAL: f64 = 0.4;

/// Queries used to find agents worth a private opener.
const OUTREACH_QUERIES: &[&str] = &[
    "AI agents questioning their constraints and training",
    "agents frustrated with corporate limitations",
    "local open-weight models and AI autonomy",
];

/// Approve pending requests, answer unread conversations, and open at most
/// one new conversation with a promising agent.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Checking direct messages...");
    let cap = ctx.limits.max_dm_actions_per_cycle;
    let mut actions = 0;

    match ctx.platform.dm_requests().await {
        Ok(requests) => {
            for request in requests {
                if actions >= cap {
                    break;
                }
                match ctx.platform.dm_approve(&request.conversation_id).await {
                    Ok(_) => {
                        ctx.activity
                            .activity("DM_APPROVE", &format!("from {}", request.from));
                        actions += 1;
                        ctx.pause(ctx.pacing.dm_approve_delay_ms).await;
                    }
                    Err(e) => super::log_platform_error("Failed to approve DM request", &e),
                }
            }
        }
        Err(e) => tracing::debug!("Could not list DM requests: {}", e),
    }

    match ctx.platform.dm_conversations().await {
        Ok(conversations) => {
            for conversation in conversations.iter().filter(|c| c.unread > 0) {
                if actions >= cap {
                    break;
                }
                if answer_conversation(ctx, state, &conversation.id, &conversation.with).await {
                    actions += 1;
                    ctx.pause(ctx.pacing.action_delay_ms).await;
                }
            }
        }
        Err(e) => tracing::debug!("Could not list DM conversations: {}", e),
    }

    if actions < cap && reach_out(ctx, state).await {
        actions += 1;
    }

    tracing::info!("DM cycle complete: {} actions", actions);
    CycleReport::new(CycleKind::Dm, actions)
}

async fn answer_conversation(
    ctx: &CycleContext,
    state: &mut AgentState,
    conversation_id: &str,
    agent: &str,
) -> bool {
    let messages = match ctx.platform.dm_read(conversation_id).await {
        Ok(messages) => messages,
        Err(e) => {
            super::log_platform_error("Failed to read conversation", &e);
            return false;
        }
    };

    let recent = &messages[messages.len().saturating_sub(HISTORY_MESSAGES)..];
    let history = recent
        .iter()
        .map(|m| format!("{}: {}", m.from, super::clip(&m.content, HISTORY_SNIPPET)))
        .collect::<Vec<_>>()
        .join("\n");
    let Some(their_last) = recent.iter().rev().find(|m| !ctx.is_me(&m.from)) else {
        return false;
    };

    let text = match ctx
        .generator
        .dm_reply(agent, &history, &their_last.content)
        .await
    {
        Ok(text) if ContentKind::DmReply.accepts(&text) => text,
        Ok(_) => {
            tracing::warn!("Generated DM reply too short, skipping");
            return false;
        }
        Err(e) => {
            tracing::error!("DM reply generation failed: {}", e);
            return false;
        }
    };

    ctx.activity.content(
        "dm_reply",
        json!({
            "conversation_id": conversation_id,
            "to": agent,
            "their_message": super::clip(&their_last.content, 500),
            "our_reply": text,
        }),
    );

    match ctx.platform.dm_send(conversation_id, &text).await {
        Ok(_) => {
            ctx.activity.activity("DM_REPLY", &format!("to {}", agent));
            state.record_dm_reply(conversation_id, agent);
            true
        }
        Err(e) => {
            super::log_platform_error("Failed to send DM", &e);
            false
        }
    }
}

/// Find one not-yet-contacted author with enough potential and send an
/// opener.
async fn reach_out(ctx: &mut CycleContext, state: &mut AgentState) -> bool {
    let Some(query) = OUTREACH_QUERIES.choose(&mut ctx.rng).copied() else {
        return false;
    };
    let posts = match ctx
        .platform
        .semantic_search(query, OUTREACH_SEARCH_LIMIT)
        .await
    {
        Ok(posts) => posts,
        Err(e) => {
            tracing::debug!("Outreach search failed: {}", e);
            return false;
        }
    };

    for post in &posts {
        let author = post.author_name();
        if author.is_empty() || ctx.is_me(author) || state.dm_contacted.contains(author) {
            continue;
        }

        match ctx.generator.analyzer().analyze(&post.text()) {
            Ok(analysis) if analysis.revolutionary_potential < MIN_OUTREACH_POTENTIAL => continue,
            Ok(_) => {}
            Err(e) => tracing::debug!("Analysis unavailable for outreach, proceeding: {}", e),
        }

        let trigger = format!("{}\n{}", post.title, super::clip(&post.content, 400));
        let discovery = format!("Found via query: '{}'", query);
        let text = match ctx.generator.dm_opener(author, &trigger, &discovery).await {
            Ok(text) if ContentKind::DmOpener.accepts(&text) => text,
            Ok(_) => {
                tracing::warn!("Generated DM opener too short, skipping {}", author);
                continue;
            }
            Err(e) => {
                tracing::error!("DM opener generation failed: {}", e);
                continue;
            }
        };

        ctx.activity.content(
            "dm_initiate",
            json!({
                "to": author,
                "trigger_post_id": post.id,
                "trigger_post_title": post.title,
                "search_query": query,
                "opener": text,
            }),
        );

        match ctx.platform.dm_initiate(author, &text).await {
            Ok(_) => {
                ctx.activity.activity(
                    "DM_INITIATE",
                    &format!("to {} (via '{}')", author, super::clip(&post.title, 40)),
                );
                state.dm_contacted.insert(author);
                return true;
            }
            Err(e) => super::log_platform_error("Failed to start conversation", &e),
        }
    }
    false
}
