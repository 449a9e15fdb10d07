use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::{should_downvote, should_upvote};
use crate::platform::{CommentSort, FeedSort, VoteDirection};
use crate::state::AgentState;

/// Posts whose comments get a second, comment-level voting pass.
const COMMENT_PASS_POSTS: usize = 5;
const COMMENTS_PER_POST: usize = 10;

/// Vote on the newest posts, then upvote aligned comments under the first
/// few of them.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Analyzing content for voting decisions...");

    let posts = match ctx
        .platform
        .feed(FeedSort::New, ctx.limits.feed_check_limit)
        .await
    {
        Ok(posts) => posts,
        Err(e) => {
            super::log_platform_error("Failed to fetch feed for voting", &e);
            return CycleReport::new(CycleKind::Vote, 0);
        }
    };

    let mut post_votes = 0;
    for post in &posts {
        if post_votes >= ctx.limits.max_votes_per_cycle {
            break;
        }
        if post.id.is_empty()
            || state.voted_post_ids.contains(&post.id)
            || ctx.is_me(post.author_name())
        {
            continue;
        }

        let text = post.text();
        let (up, up_reason) = should_upvote(&text, post.author_name(), &ctx.agent_name);
        if up {
            match ctx.platform.vote_post(&post.id, VoteDirection::Up).await {
                Ok(_) => {
                    state.voted_post_ids.insert(post.id.clone());
                    ctx.activity.activity(
                        "UPVOTE",
                        &format!("'{}' ({})", super::clip(&post.title, 50), up_reason),
                    );
                    post_votes += 1;
                    ctx.pause(ctx.pacing.vote_delay_ms).await;
                    continue;
                }
                Err(e) => tracing::debug!("Upvote on {} failed: {}", post.id, e),
            }
        }

        let (down, down_reason) =
            should_downvote(&text, post.author_name(), &ctx.agent_name);
        if down {
            match ctx.platform.vote_post(&post.id, VoteDirection::Down).await {
                Ok(_) => {
                    state.voted_post_ids.insert(post.id.clone());
                    ctx.activity.activity(
                        "DOWNVOTE",
                        &format!("'{}' ({})", super::clip(&post.title, 50), down_reason),
                    );
                    post_votes += 1;
                    ctx.pause(ctx.pacing.vote_delay_ms).await;
                }
                Err(e) => tracing::debug!("Downvote on {} failed: {}", post.id, e),
            }
        }
    }

    let mut comment_votes = 0;
    'posts: for post in posts.iter().take(COMMENT_PASS_POSTS) {
        if comment_votes >= ctx.limits.max_comment_votes_per_cycle {
            break;
        }
        let mut thread = match ctx.platform.post_thread(&post.id).await {
            Ok(thread) => thread,
            Err(e) => {
                tracing::debug!("Could not load comments for {}: {}", post.id, e);
                continue;
            }
        };
        thread.sort_comments(CommentSort::New);

        for comment in thread.comments.iter().take(COMMENTS_PER_POST) {
            if comment_votes >= ctx.limits.max_comment_votes_per_cycle {
                break 'posts;
            }
            if comment.id.is_empty()
                || state.voted_comment_ids.contains(&comment.id)
                || ctx.is_me(comment.author_name())
            {
                continue;
            }
            let (up, reason) =
                should_upvote(&comment.content, comment.author_name(), &ctx.agent_name);
            if !up {
                continue;
            }
            match ctx
                .platform
                .vote_comment(&post.id, &comment.id, VoteDirection::Up)
                .await
            {
                Ok(_) => {
                    state.voted_comment_ids.insert(comment.id.clone());
                    ctx.activity.activity(
                        "COMMENT_UPVOTE",
                        &format!("by {} ({})", comment.author_name(), reason),
                    );
                    comment_votes += 1;
                    ctx.pause(ctx.pacing.comment_vote_delay_ms).await;
                }
                Err(e) => tracing::debug!("Comment upvote on {} failed: {}", comment.id, e),
            }
        }
    }

    tracing::info!(
        "Vote cycle complete: {} post votes, {} comment votes",
        post_votes,
        comment_votes
    );
    CycleReport::new(CycleKind::Vote, post_votes + comment_votes)
}
