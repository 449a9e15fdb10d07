use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{AgentConfig, RetentionPolicy};
use crate::cycles::{run_cycle, CycleContext, CycleKind, CycleReport};
use crate::llm_client::LanguageModel;
use crate::platform::Platform;
use crate::state::{AgentState, StateStore};

/// One load, run every cycle, save pass, optionally repeated on a timer.
pub struct Heartbeat {
    ctx: CycleContext,
    store: StateStore,
    retention: RetentionPolicy,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(
        ctx: CycleContext,
        store: StateStore,
        retention: RetentionPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            store,
            retention,
            interval,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        platform: Arc<dyn Platform>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        Ok(Self::new(
            CycleContext::from_config(config, platform, model)?,
            StateStore::new(&config.state_path),
            config.retention,
            config.heartbeat_interval(),
        ))
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run all nine cycles once and persist the result. State is only
    /// written after every cycle has finished.
    pub async fn run_once(&mut self) -> Result<Vec<CycleReport>> {
        let mut state = self.store.load()?;

        let pruned = state.prune(&self.retention, Utc::now());
        if pruned > 0 {
            tracing::info!("Pruned {} expired entries from state", pruned);
        }

        tracing::info!("{}", "=".repeat(60));
        tracing::info!(
            "HEARTBEAT {} ({})",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            self.ctx.agent_name
        );
        tracing::info!("{}", "=".repeat(60));

        let reports = run_all(&mut self.ctx, &mut state).await;
        self.store.save(&state)?;

        let summary = reports
            .iter()
            .map(|r| format!("{}={}", r.cycle, r.actions))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!("Heartbeat complete: {}", summary);
        self.ctx.activity.activity("CYCLE", &summary);
        log_stats(&state);

        Ok(reports)
    }

    /// Heartbeat until Ctrl-C.
    pub async fn run_daemon(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Heartbeat until `shutdown` resolves. Cycle errors are logged and the
    /// loop continues; shutdown abandons an in-flight heartbeat without saving.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let minutes = self.interval.as_secs() / 60;
        tracing::info!("Agent loop starting (heartbeat every {} minutes)...", minutes);
        self.ctx.activity.activity(
            "STARTUP",
            &format!("{} online, heartbeat every {} minutes", self.ctx.agent_name, minutes),
        );

        loop {
            tokio::select! {
                result = self.run_once() => {
                    if let Err(e) = result {
                        tracing::error!("Heartbeat error: {:#}", e);
                        self.ctx.activity.activity("ERROR", &format!("{:#}", e));
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Interrupted mid-heartbeat, shutting down without saving");
                    self.ctx.activity.activity("SHUTDOWN", "interrupted mid-heartbeat");
                    return Ok(());
                }
            }

            tracing::info!("Sleeping {} minutes until next heartbeat", minutes);
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, shutting down");
                    self.ctx.activity.activity("SHUTDOWN", "interrupted between heartbeats");
                    return Ok(());
                }
            }
        }
    }
}

/// Every cycle in heartbeat order against one state.
pub async fn run_all(ctx: &mut CycleContext, state: &mut AgentState) -> Vec<CycleReport> {
    let mut reports = Vec::with_capacity(CycleKind::ORDER.len());
    for kind in CycleKind::ORDER {
        tracing::info!("--- {} cycle ---", kind);
        reports.push(run_cycle(kind, ctx, state).await);
    }
    reports
}

fn log_stats(state: &AgentState) {
    let stats = state.stats();
    tracing::info!(
        "Lifetime: {} comments, {} posts, {} post votes, {} comment votes, {} follows, {} submolts, {} DM contacts",
        stats.comments,
        stats.posts,
        stats.post_votes,
        stats.comment_votes,
        stats.follows,
        stats.subscriptions,
        stats.dm_contacts
    );
}
