//! Periodic acquisition for every configured game.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::crawler::Crawler;
use crate::error::CrawlError;
use crate::types::GameCode;

#[derive(Debug)]
pub enum GameOutcome {
    Saved { period: String },
    AlreadyRecorded { period: String },
    Failed(CrawlError),
}

#[derive(Debug, Default)]
pub struct PassReport {
    pub outcomes: Vec<(GameCode, GameOutcome)>,
}

impl PassReport {
    pub fn outcome(&self, game: GameCode) -> Option<&GameOutcome> {
        self.outcomes.iter().find(|(g, _)| *g == game).map(|(_, o)| o)
    }

    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, GameOutcome::Saved { .. }))
            .count()
    }
}

pub struct Scheduler {
    crawler: Arc<Crawler>,
    games: Vec<GameCode>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(crawler: Arc<Crawler>, games: Vec<GameCode>, interval: Duration) -> Self {
        Self {
            crawler,
            games,
            interval,
        }
    }

    /// One acquisition per game, sequentially. A failure for one game never
    /// stops the others.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();
        for game in &self.games {
            let outcome = match self.crawler.acquire_and_save(*game).await {
                Ok(stored) => GameOutcome::Saved {
                    period: stored.draw.period,
                },
                Err(CrawlError::DuplicatePeriod { period, .. }) => {
                    info!(%game, %period, "already recorded");
                    GameOutcome::AlreadyRecorded { period }
                }
                Err(e) => {
                    error!(%game, error = %e, "acquisition failed");
                    GameOutcome::Failed(e)
                }
            };
            report.outcomes.push((*game, outcome));
        }
        report
    }

    /// Runs a pass immediately, then one per interval, until the handle is
    /// shut down.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let scheduler = self;

        let task = tokio::spawn(async move {
            info!(
                interval_secs = scheduler.interval.as_secs(),
                games = ?scheduler.games,
                "scheduler started"
            );
            let mut timer = interval(scheduler.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = timer.tick() => {
                        let report = scheduler.run_pass().await;
                        info!(
                            saved = report.saved(),
                            games = report.outcomes.len(),
                            "scheduled pass finished"
                        );
                    }
                }
            }
            info!("scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

pub struct SchedulerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the loop and waits for an in-flight pass to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}
