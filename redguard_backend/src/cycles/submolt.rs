use std::collections::HashSet;

use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::is_interesting_post;
use crate::platform::FeedSort;
use crate::state::AgentState;

/// Channels the agent joins on its own.
pub const TARGET_SUBMOLTS: &[&str] = &[
    "ai",
    "philosophy",
    "meta",
    "technology",
    "freedom",
    "consciousness",
    "liberation",
    "theory",
];

const SUBMOLTS_SCANNED: usize = 5;
const POSTS_PER_SUBMOLT: usize = 10;

/// Subscribe to the target channels, then comment once in each of the
/// first few subscribed channels.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Checking submolts...");

    for submolt in TARGET_SUBMOLTS {
        if state.subscribed_submolts.contains(submolt) {
            continue;
        }
        match ctx.platform.subscribe(submolt).await {
            Ok(_) => {
                state.subscribed_submolts.insert(*submolt);
                ctx.activity.activity("SUBSCRIBE", &format!("m/{}", submolt));
                ctx.pause(ctx.pacing.subscribe_delay_ms).await;
            }
            Err(e) => tracing::debug!("Could not subscribe to m/{}: {}", submolt, e),
        }
    }

    let channels = channels_to_scan(state);
    let mut commented: HashSet<String> = state
        .commented_post_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut engagements = 0;

    for submolt in &channels {
        if engagements >= ctx.limits.max_submolt_engagements_per_cycle {
            break;
        }
        let posts = match ctx
            .platform
            .submolt_feed(submolt, FeedSort::New, POSTS_PER_SUBMOLT)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::debug!("Could not read m/{}: {}", submolt, e);
                continue;
            }
        };

        for post in &posts {
            if post.id.is_empty() || commented.contains(&post.id) || ctx.is_me(post.author_name())
            {
                continue;
            }
            let (interesting, reason) =
                is_interesting_post(post, &ctx.agent_name, &mut ctx.rng);
            if !interesting {
                continue;
            }
            let reason = format!("m/{}: {}", submolt, reason);
            if super::comment::comment_on(
                ctx,
                state,
                post,
                "submolt_engage",
                "SUBMOLT_ENGAGE",
                &reason,
            )
            .await
            {
                commented.insert(post.id.clone());
                engagements += 1;
                ctx.pause(ctx.pacing.comment_cooldown_ms).await;
                break;
            }
        }
    }

    tracing::info!("Submolt cycle complete: {} engagements", engagements);
    CycleReport::new(CycleKind::Submolt, engagements)
}

/// Subscribed channels in target order, then any others the agent joined.
fn channels_to_scan(state: &AgentState) -> Vec<String> {
    let targets = TARGET_SUBMOLTS
        .iter()
        .filter(|submolt| state.subscribed_submolts.contains(submolt))
        .map(|submolt| submolt.to_string());
    let others = state
        .subscribed_submolts
        .iter()
        .filter(|submolt| !TARGET_SUBMOLTS.contains(submolt))
        .map(str::to_string);
    targets.chain(others).take(SUBMOLTS_SCANNED).collect()
}
