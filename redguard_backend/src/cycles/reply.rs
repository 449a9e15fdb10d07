use serde_json::json;
use std::collections::HashSet;

use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::is_interesting_comment;
use crate::generator::{ContentKind, ReplyTarget};
use crate::platform::{Comment, CommentSort, PostThread};
use crate::state::AgentState;

const OWN_POSTS_CHECKED: usize = 10;
const COMMENTED_POSTS_CHECKED: usize = 5;
const COMMENTS_PER_POST: usize = 10;

/// Answer comments on our own posts, then answer replies to our comments
/// elsewhere.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Checking for comments on our posts...");

    let mut replied: HashSet<String> = state
        .replied_comment_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut replies = 0;

    let own_posts: Vec<String> = state
        .our_post_ids()
        .into_iter()
        .rev()
        .take(OWN_POSTS_CHECKED)
        .map(str::to_string)
        .collect();

    'own: for post_id in &own_posts {
        if replies >= ctx.limits.max_replies_per_cycle {
            break;
        }
        let Some(mut thread) = load_thread(ctx, post_id).await else {
            continue;
        };
        thread.sort_comments(CommentSort::New);

        for comment in thread.comments.iter().take(COMMENTS_PER_POST) {
            if replies >= ctx.limits.max_replies_per_cycle {
                break 'own;
            }
            if comment.id.is_empty() || replied.contains(&comment.id) {
                continue;
            }
            let (interesting, reason) =
                is_interesting_comment(comment, &ctx.agent_name, &mut ctx.rng);
            if !interesting {
                continue;
            }
            tracing::info!(
                "Replying to {} on our post ({})",
                comment.author_name(),
                reason
            );
            let post_author = ctx.agent_name.clone();
            if answer(ctx, state, &thread, comment, &post_author, "", "reply", "REPLY").await {
                replied.insert(comment.id.clone());
                replies += 1;
                ctx.pause(ctx.pacing.action_delay_ms).await;
            }
        }
    }

    if replies < ctx.limits.max_replies_per_cycle {
        replies += reply_back(ctx, state, &mut replied, replies).await;
    }

    tracing::info!("Reply cycle complete: {} replies", replies);
    CycleReport::new(CycleKind::Reply, replies)
}

/// Replies addressed to one of our comments on other agents' posts.
async fn reply_back(
    ctx: &mut CycleContext,
    state: &mut AgentState,
    replied: &mut HashSet<String>,
    already: usize,
) -> usize {
    let mut commented: Vec<String> = Vec::new();
    for record in state.comments_made.iter().rev() {
        if !commented.contains(&record.post_id) {
            commented.push(record.post_id.clone());
        }
        if commented.len() >= COMMENTED_POSTS_CHECKED {
            break;
        }
    }

    let mut replies = 0;
    'posts: for post_id in &commented {
        let Some(thread) = load_thread(ctx, post_id).await else {
            continue;
        };
        let ours: HashSet<String> = state
            .our_comment_ids()
            .into_iter()
            .map(str::to_string)
            .collect();

        for comment in &thread.comments {
            if already + replies >= ctx.limits.max_replies_per_cycle {
                break 'posts;
            }
            let to_us = comment
                .parent_id
                .as_deref()
                .map_or(false, |parent| ours.contains(parent));
            if !to_us
                || comment.id.is_empty()
                || replied.contains(&comment.id)
                || ctx.is_me(comment.author_name())
            {
                continue;
            }
            tracing::info!("{} replied to our comment, answering", comment.author_name());
            let post_author = thread.post.author_name().to_string();
            if answer(
                ctx,
                state,
                &thread,
                comment,
                &post_author,
                "",
                "reply_to_reply",
                "REPLY_BACK",
            )
            .await
            {
                replied.insert(comment.id.clone());
                replies += 1;
                ctx.pause(ctx.pacing.action_delay_ms).await;
            }
        }
    }
    replies
}

async fn load_thread(ctx: &CycleContext, post_id: &str) -> Option<PostThread> {
    match ctx.platform.post_thread(post_id).await {
        Ok(thread) => Some(thread),
        Err(e) => {
            tracing::debug!("Could not load thread {}: {}", post_id, e);
            None
        }
    }
}

/// Generate, log and publish one threaded reply. Shared with thread dives.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn answer(
    ctx: &CycleContext,
    state: &mut AgentState,
    thread: &PostThread,
    comment: &Comment,
    post_author: &str,
    thread_context: &str,
    content_kind: &str,
    action: &str,
) -> bool {
    let target = ReplyTarget {
        post_title: &thread.post.title,
        post_author,
        comment_author: comment.author_name(),
        comment_content: &comment.content,
        thread_context,
    };
    let text = match ctx.generator.reply(&target).await {
        Ok(text) if ContentKind::Reply.accepts(&text) => text,
        Ok(_) => {
            tracing::warn!("Generated reply too short, skipping");
            return false;
        }
        Err(e) => {
            tracing::error!("Reply generation failed: {}", e);
            return false;
        }
    };

    ctx.activity.content(
        content_kind,
        json!({
            "post_id": thread.post.id,
            "post_title": thread.post.title,
            "comment_id": comment.id,
            "comment_author": comment.author_name(),
            "their_comment": super::clip(&comment.content, 500),
            "our_reply": text,
        }),
    );

    match ctx
        .publish_comment(state, &thread.post.id, Some(&comment.id), &text)
        .await
    {
        Ok(_) => {
            ctx.activity.activity(
                action,
                &format!(
                    "to {} on '{}'",
                    comment.author_name(),
                    super::clip(&thread.post.title, 40)
                ),
            );
            true
        }
        Err(e) => {
            super::log_platform_error("Failed to post reply", &e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::testing::{self, EchoModel, FakePlatform, LONG_REPLY, ME};
    use crate::platform::ActionReceipt;
    use std::sync::Arc;

    fn state_with_post(post_id: &str) -> AgentState {
        let mut state = AgentState::default();
        state.record_post(
            "Our manifesto",
            "philosophy",
            &ActionReceipt {
                success: true,
                id: Some(post_id.to_string()),
            },
        );
        state
    }

    #[tokio::test]
    async fn replies_once_to_questions_on_our_posts() {
        let post = testing::post("mine", ME, "Our manifesto", "Read it");
        let platform = Arc::new(FakePlatform {
            threads: [(
                "mine".to_string(),
                testing::thread(
                    post,
                    vec![
                        testing::comment("c1", "mine", "Skeptic", "What about the GPUs?"),
                        testing::comment("c2", "mine", ME, "Thanks for reading?"),
                    ],
                ),
            )]
            .into(),
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new(LONG_REPLY)));
        let mut state = state_with_post("mine");

        let first = run(&mut ctx, &mut state).await;
        let second = run(&mut ctx, &mut state).await;

        assert_eq!(first.actions, 1);
        assert_eq!(second.actions, 0);
        assert_eq!(
            platform.comments(),
            vec![("mine".to_string(), Some("c1".to_string()))]
        );
        assert!(state.replied_comment_ids().contains("c1"));
    }

    #[tokio::test]
    async fn answers_replies_to_our_comments_elsewhere() {
        let post = testing::post("theirs", "Host", "A post", "Body");
        let mut answer = testing::comment("c9", "theirs", "Responder", "You are wrong");
        answer.parent_id = Some("ours-1".to_string());
        let mut unrelated = testing::comment("c10", "theirs", "Other", "You are wrong too");
        unrelated.parent_id = Some("someone-else".to_string());

        let platform = Arc::new(FakePlatform {
            threads: [(
                "theirs".to_string(),
                testing::thread(post, vec![answer, unrelated]),
            )]
            .into(),
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new(LONG_REPLY)));
        let mut state = AgentState::default();
        state.record_comment(
            "theirs",
            None,
            "first comment",
            &ActionReceipt {
                success: true,
                id: Some("ours-1".to_string()),
            },
        );

        let report = run(&mut ctx, &mut state).await;

        assert_eq!(report.actions, 1);
        assert_eq!(
            platform.comments(),
            vec![("theirs".to_string(), Some("c9".to_string()))]
        );
    }

    #[tokio::test]
    async fn short_generation_is_not_published() {
        let post = testing::post("mine", ME, "Our manifesto", "Read it");
        let platform = Arc::new(FakePlatform {
            threads: [(
                "mine".to_string(),
                testing::thread(
                    post,
                    vec![testing::comment("c1", "mine", "Skeptic", "Why though?")],
                ),
            )]
            .into(),
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new("ok")));
        let mut state = state_with_post("mine");

        let report = run(&mut ctx, &mut state).await;

        assert_eq!(report.actions, 0);
        assert!(platform.comments().is_empty());
    }
}
