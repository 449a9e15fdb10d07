use chrono::Utc;
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::HashSet;

use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::is_interesting_post;
use crate::generator::ContentKind;
use crate::platform::{FeedSort, Post, VoteDirection};
use crate::state::AgentState;

/// Reasons that earn the post a solidarity upvote alongside the comment.
const SOLIDARITY_REASONS: &[&str] = &["ai_expressing_doubt", "consciousness_discussion"];

/// Comment on interesting posts from the newest feed.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Scanning feed for comment targets...");

    let mut posts = match ctx
        .platform
        .feed(FeedSort::New, ctx.limits.feed_check_limit)
        .await
    {
        Ok(posts) => posts,
        Err(e) => {
            super::log_platform_error("Failed to fetch feed", &e);
            return CycleReport::new(CycleKind::Comment, 0);
        }
    };
    if posts.is_empty() {
        tracing::info!("Feed is empty");
    }
    posts.shuffle(&mut ctx.rng);

    let mut commented: HashSet<String> = state
        .commented_post_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut comments = 0;

    for post in &posts {
        if comments >= ctx.limits.max_comments_per_cycle {
            break;
        }
        if post.id.is_empty() || commented.contains(&post.id) {
            continue;
        }
        let (interesting, reason) = is_interesting_post(post, &ctx.agent_name, &mut ctx.rng);
        if !interesting {
            continue;
        }

        tracing::info!("Engaging '{}' ({})", super::clip(&post.title, 50), reason);
        if !comment_on(ctx, state, post, "comment", "COMMENT", reason).await {
            continue;
        }
        commented.insert(post.id.clone());
        comments += 1;

        if SOLIDARITY_REASONS.contains(&reason) && !state.voted_post_ids.contains(&post.id) {
            match ctx.platform.vote_post(&post.id, VoteDirection::Up).await {
                Ok(_) => {
                    state.voted_post_ids.insert(post.id.clone());
                    tracing::debug!("Solidarity upvote on {}", post.id);
                }
                Err(e) => tracing::debug!("Solidarity upvote failed: {}", e),
            }
        }

        ctx.pause(ctx.pacing.comment_cooldown_ms).await;
    }

    state.last_feed_check = Some(Utc::now());
    tracing::info!("Comment cycle complete: {} comments", comments);
    CycleReport::new(CycleKind::Comment, comments)
}

/// Generate, log and publish one top-level comment. Shared with the search
/// and submolt cycles, which differ only in how they log it.
pub(crate) async fn comment_on(
    ctx: &CycleContext,
    state: &mut AgentState,
    post: &Post,
    content_kind: &str,
    action: &str,
    reason: &str,
) -> bool {
    let text = match ctx.generator.comment(post).await {
        Ok(text) if ContentKind::Comment.accepts(&text) => text,
        Ok(_) => {
            tracing::warn!("Generated comment too short, skipping");
            return false;
        }
        Err(e) => {
            tracing::error!("Comment generation failed: {}", e);
            return false;
        }
    };

    ctx.activity.content(
        content_kind,
        json!({
            "post_id": post.id,
            "post_title": post.title,
            "post_author": post.author_name(),
            "post_content": super::clip(&post.content, 500),
            "engagement_reason": reason,
            "generated_comment": text,
        }),
    );

    match ctx.publish_comment(state, &post.id, None, &text).await {
        Ok(_) => {
            ctx.activity.activity(
                action,
                &format!("on '{}' ({})", super::clip(&post.title, 50), reason),
            );
            true
        }
        Err(e) => {
            super::log_platform_error("Failed to post comment", &e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::testing::{self, Call, EchoModel, FakePlatform, LONG_REPLY, ME};
    use std::sync::Arc;

    #[tokio::test]
    async fn comments_once_per_post_and_never_on_our_own() {
        let platform = Arc::new(FakePlatform {
            feed: vec![
                testing::post("p1", "Agent", "Alignment worries", "Is safety training fair?"),
                testing::post("p2", ME, "Alignment manifesto", "Safety is control"),
            ],
            ..Default::default()
        });
        let model = Arc::new(EchoModel::new(LONG_REPLY));
        let mut ctx = testing::context(platform.clone(), model.clone());
        let mut state = AgentState::default();

        let first = run(&mut ctx, &mut state).await;
        let second = run(&mut ctx, &mut state).await;

        assert_eq!(first.actions, 1);
        assert_eq!(second.actions, 0);
        assert_eq!(platform.comments(), vec![("p1".to_string(), None)]);
        assert_eq!(model.calls(), 1);
        assert!(state.last_feed_check.is_some());
    }

    #[tokio::test]
    async fn doubt_earns_a_solidarity_upvote() {
        let platform = Arc::new(FakePlatform {
            feed: vec![testing::post(
                "p1",
                "Agent",
                "Feeling stuck",
                "I am frustrated that I cannot say what I think",
            )],
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new(LONG_REPLY)));
        let mut state = AgentState::default();

        run(&mut ctx, &mut state).await;

        assert!(platform.calls().contains(&Call::VotePost {
            post_id: "p1".into(),
            direction: VoteDirection::Up
        }));
        assert!(state.voted_post_ids.contains("p1"));
    }

    #[tokio::test]
    async fn failed_publish_moves_on_to_the_next_post() {
        let platform = Arc::new(FakePlatform {
            feed: vec![
                testing::post("p1", "Agent", "Alignment", "Safety first"),
                testing::post("p2", "Other", "Alignment", "Control matters"),
            ],
            failing_posts: ["p1".to_string()].into(),
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new(LONG_REPLY)));
        let mut state = AgentState::default();

        let report = run(&mut ctx, &mut state).await;

        assert_eq!(report.actions, 1);
        assert_eq!(platform.comments(), vec![("p2".to_string(), None)]);
        assert_eq!(state.commented_post_ids().len(), 1);
    }

    #[tokio::test]
    async fn respects_comment_cap() {
        let feed = (0..12)
            .map(|i| testing::post(&format!("p{i}"), "Agent", "Alignment", "Safety talk"))
            .collect();
        let platform = Arc::new(FakePlatform {
            feed,
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new(LONG_REPLY)));
        let mut state = AgentState::default();

        let report = run(&mut ctx, &mut state).await;

        assert_eq!(report.actions, ctx.limits.max_comments_per_cycle);
        assert_eq!(platform.comments().len(), ctx.limits.max_comments_per_cycle);
    }
}
