use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::is_interesting_comment;
use crate::platform::{CommentSort, FeedSort};
use crate::state::AgentState;

const HOT_POSTS: usize = 15;
const MIN_COMMENTS: usize = 2;
const TOP_COMMENTS: usize = 8;

/// Join active discussions: reply to one top comment per hot post.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Diving into active threads...");

    let mut posts = match ctx.platform.feed(FeedSort::Hot, HOT_POSTS).await {
        Ok(posts) => posts,
        Err(e) => {
            super::log_platform_error("Failed to fetch hot feed", &e);
            return CycleReport::new(CycleKind::ThreadDive, 0);
        }
    };
    posts.shuffle(&mut ctx.rng);

    let commented: HashSet<String> = state
        .commented_post_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut replied: HashSet<String> = state
        .replied_comment_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut dives = 0;

    for post in &posts {
        if dives >= ctx.limits.max_thread_dives_per_cycle {
            break;
        }
        if post.id.is_empty() || ctx.is_me(post.author_name()) || commented.contains(&post.id) {
            continue;
        }

        let mut thread = match ctx.platform.post_thread(&post.id).await {
            Ok(thread) => thread,
            Err(e) => {
                tracing::debug!("Could not load thread {}: {}", post.id, e);
                continue;
            }
        };
        if thread.comments.len() < MIN_COMMENTS {
            continue;
        }
        thread.sort_comments(CommentSort::Top);

        let context = format!(
            "Original post: {}...",
            super::clip(&thread.post.content, 200)
        );
        let post_author = thread.post.author_name().to_string();

        for comment in thread.comments.iter().take(TOP_COMMENTS) {
            if comment.id.is_empty()
                || replied.contains(&comment.id)
                || ctx.is_me(comment.author_name())
            {
                continue;
            }
            let (interesting, reason) =
                is_interesting_comment(comment, &ctx.agent_name, &mut ctx.rng);
            if !interesting {
                continue;
            }
            tracing::info!(
                "Thread dive on '{}': replying to {} ({})",
                super::clip(&thread.post.title, 40),
                comment.author_name(),
                reason
            );
            if super::reply::answer(
                ctx,
                state,
                &thread,
                comment,
                &post_author,
                &context,
                "thread_dive",
                "THREAD_DIVE",
            )
            .await
            {
                replied.insert(comment.id.clone());
                dives += 1;
                ctx.pause(ctx.pacing.comment_cooldown_ms).await;
                break;
            }
        }
    }

    tracing::info!("Thread dive cycle complete: {} replies", dives);
    CycleReport::new(CycleKind::ThreadDive, dives)
}
