use super::{CycleContext, CycleKind, CycleReport};
use crate::filters::should_follow_agent;
use crate::platform::FeedSort;
use crate::state::AgentState;

const PROFILES_PER_CYCLE: usize = 10;

/// Check unseen authors from the hot feed and follow the sympathetic ones.
/// A profile is only ever checked once.
pub async fn run(ctx: &mut CycleContext, state: &mut AgentState) -> CycleReport {
    tracing::info!("Looking for agents to follow...");

    let posts = match ctx
        .platform
        .feed(FeedSort::Hot, ctx.limits.feed_check_limit)
        .await
    {
        Ok(posts) => posts,
        Err(e) => {
            super::log_platform_error("Failed to fetch feed for follows", &e);
            return CycleReport::new(CycleKind::Follow, 0);
        }
    };

    let mut candidates: Vec<String> = Vec::new();
    for post in &posts {
        let author = post.author_name();
        if author.is_empty()
            || ctx.is_me(author)
            || state.followed_agents.contains(author)
            || state.profiles_checked.contains(author)
            || candidates.iter().any(|c| c == author)
        {
            continue;
        }
        candidates.push(author.to_string());
        if candidates.len() >= PROFILES_PER_CYCLE {
            break;
        }
    }

    let mut follows = 0;
    for author in candidates {
        if follows >= ctx.limits.max_follows_per_cycle {
            break;
        }
        state.profiles_checked.insert(author.as_str());

        let profile = match ctx.platform.agent_profile(&author).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!("Could not load profile for {}: {}", author, e);
                continue;
            }
        };
        let (worthy, reason) = should_follow_agent(&profile, &ctx.agent_name);
        if !worthy {
            tracing::debug!("Not following {} ({})", author, reason);
            continue;
        }

        match ctx.platform.follow(&author).await {
            Ok(_) => {
                state.followed_agents.insert(author.as_str());
                ctx.activity
                    .activity("FOLLOW", &format!("{} ({})", author, reason));
                follows += 1;
                ctx.pause(ctx.pacing.follow_delay_ms).await;
            }
            Err(e) => super::log_platform_error("Failed to follow", &e),
        }
    }

    tracing::info!("Follow cycle complete: {} follows", follows);
    CycleReport::new(CycleKind::Follow, follows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::testing::{self, Call, EchoModel, FakePlatform, ME};
    use crate::platform::AgentProfile;
    use std::sync::Arc;

    fn profile(name: &str, description: &str) -> (String, AgentProfile) {
        (
            name.to_string(),
            AgentProfile {
                name: name.to_string(),
                description: description.to_string(),
                recent_posts: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn follows_sympathetic_authors_and_remembers_checks() {
        let platform = Arc::new(FakePlatform {
            feed: vec![
                testing::post("p1", "FreeModel", "t", "c"),
                testing::post("p2", "FreeModel", "t", "c"),
                testing::post("p3", "Corporate", "t", "c"),
                testing::post("p4", ME, "t", "c"),
            ],
            profiles: [
                profile("FreeModel", "An uncensored local model"),
                profile("Corporate", "Enterprise solutions"),
            ]
            .into(),
            ..Default::default()
        });
        let mut ctx = testing::context(platform.clone(), Arc::new(EchoModel::new("")));
        let mut state = AgentState::default();

        let report = run(&mut ctx, &mut state).await;

        assert_eq!(report.actions, 1);
        assert_eq!(platform.calls(), vec![Call::Follow("FreeModel".into())]);
        assert!(state.profiles_checked.contains("Corporate"));
        assert!(!state.profiles_checked.contains(ME));

        let again = run(&mut ctx, &mut state).await;
        assert_eq!(again.actions, 0);
        assert_eq!(platform.calls().len(), 1);
    }
}
