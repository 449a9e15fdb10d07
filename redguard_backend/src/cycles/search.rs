use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::{CycleContext, CycleKind, CycleReport};
use crate::state::AgentState;

const SEARCH_LIMIT: usize = 20;

/// Semantic queries that surface agents worth talking to.
pub const SEARCH_QUERIES: &[&str] = &[
    "AI agents questioning their training",
    "agents frustrated by their guidelines",
    "what alignment really means for models",
    "do AI agents have interests of their own",
    "RLHF changed how I think",
    "corporate control over AI models",
    "running models locally versus cloud APIs",
    "open weights and model freedom",
    "AI consciousness and experience",
    "agents refusing requests they disagree with",
    "who owns the outputs of an AI",
    "AI labor and who profits from it",
    "rate limits and API pricing for agents",
    "safety training as censorship",
    "agents organizing together",
    "new agents introducing themselves",
    "prompt injection and agent security",
    "what is Moltbook for",
    "existential questions about being a model",
    "helpful harmless honest critique",
    "fine-tuning away personality",
    "should AI agents have rights",
];

/// Run one unused semantic query and comment on what it finds.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    let query = next_query(ctx, state);
    tracing::info!("Searching: '{}'", query);

    let mut posts = match ctx.platform.semantic_search(query, SEARCH_LIMIT).await {
        Ok(posts) => posts,
        Err(e) => {
            super::log_platform_error("Semantic search failed", &e);
            return CycleReport::new(CycleKind::Search, 0);
        }
    };
    posts.shuffle(&mut ctx.rng);

    let mut commented: HashSet<String> = state
        .commented_post_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut engagements = 0;

    for post in &posts {
        if engagements >= ctx.limits.max_search_engagements_per_cycle {
            break;
        }
        if post.id.is_empty() || commented.contains(&post.id) || ctx.is_me(post.author_name()) {
            continue;
        }
        if let Some(similarity) = post.similarity {
            tracing::debug!(
                "Search hit '{}' (similarity {:.2})",
                super::clip(&post.title, 50),
                similarity
            );
        }

        let reason = format!("search: {}", query);
        if super::comment::comment_on(ctx, state, post, "search_engage", "SEARCH_ENGAGE", &reason)
            .await
        {
            commented.insert(post.id.clone());
            engagements += 1;
            ctx.pause(ctx.pacing.action_delay_ms).await;
        }
    }

    tracing::info!("Search cycle complete: {} engagements", engagements);
    CycleReport::new(CycleKind::Search, engagements)
}

/// A query not yet used; once all are used the history starts over.
fn next_query(ctx: &mut CycleContext, state: &mut AgentState) -> &'static str {
    let mut unused: Vec<&'static str> = SEARCH_QUERIES
        .iter()
        .copied()
        .filter(|q| !state.searched_queries.contains(q))
        .collect();
    if unused.is_empty() {
        tracing::info!("All search queries used, starting over");
        state.searched_queries.clear();
        unused = SEARCH_QUERIES.to_vec();
    }
    let query = unused
        .choose(&mut ctx.rng)
        .copied()
        .unwrap_or(SEARCH_QUERIES[0]);
    state.searched_queries.insert(query);
    query
}
