use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moodloop_common::classification::ClassificationResult;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, ClassifyError};
use crate::interaction::Interaction;
use crate::playback::PlaybackCoordinator;
use crate::sampler::{FrameSampler, SampleError};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("cycle task aborted: {0}")]
    Aborted(String),
}

type CycleOutcome = Result<ClassificationResult, CycleError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub started: u64,
    pub skipped_busy: u64,
    pub skipped_not_ready: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Runs capture → classify → coordinate once per tick.
///
/// At most one cycle is in flight. A tick that fires while one is pending is
/// dropped, not queued. The capture and classify steps run on a spawned task
/// and report back over a channel, so the coordinator is only ever touched
/// from this loop and interactions are handled while a request is pending.
pub struct LoopDriver {
    sampler: Arc<FrameSampler>,
    classifier: Arc<dyn Classifier>,
    coordinator: PlaybackCoordinator,
    period: Duration,
    in_flight: bool,
    stats: LoopStats,
}

impl LoopDriver {
    pub fn new(
        sampler: Arc<FrameSampler>,
        classifier: Arc<dyn Classifier>,
        coordinator: PlaybackCoordinator,
        period: Duration,
    ) -> Self {
        Self {
            sampler,
            classifier,
            coordinator,
            period,
            in_flight: false,
            stats: LoopStats::default(),
        }
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Drive the loop until `shutdown` resolves. A cycle still in flight at
    /// that point is abandoned and its result never applied.
    pub async fn run<S>(mut self, mut interactions: mpsc::Receiver<Interaction>, shutdown: S) -> Self
    where
        S: Future<Output = ()>,
    {
        let (done_tx, mut done_rx) = mpsc::channel::<CycleOutcome>(1);
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        let mut listening = true;
        self.in_flight = false;

        info!(period = ?self.period, "sampling loop started");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(stats = ?self.stats, in_flight = self.in_flight, "sampling loop stopping");
                    break;
                }
                event = interactions.recv(), if listening => match event {
                    Some(Interaction) => {
                        self.coordinator.on_interaction();
                    }
                    None => {
                        debug!("interaction subscription ended");
                        listening = false;
                    }
                },
                Some(outcome) = done_rx.recv() => self.finish_cycle(outcome),
                _ = ticker.tick() => self.on_tick(&done_tx),
            }
        }

        self
    }

    fn on_tick(&mut self, done: &mpsc::Sender<CycleOutcome>) {
        self.stats.ticks += 1;

        if self.in_flight {
            self.stats.skipped_busy += 1;
            debug!(skipped = self.stats.skipped_busy, "previous cycle still in flight, skipping tick");
            return;
        }
        if !self.sampler.is_ready() {
            self.stats.skipped_not_ready += 1;
            debug!("camera not ready, skipping tick");
            return;
        }

        self.in_flight = true;
        self.stats.started += 1;

        let sampler = Arc::clone(&self.sampler);
        let classifier = Arc::clone(&self.classifier);
        let done = done.clone();
        tokio::spawn(async move {
            // A panic inside the cycle must still be reported, or in_flight
            // would never clear.
            let cycle = tokio::spawn(async move { run_cycle(&sampler, classifier.as_ref()).await });
            let outcome = cycle
                .await
                .unwrap_or_else(|e| Err(CycleError::Aborted(e.to_string())));
            if done.send(outcome).await.is_err() {
                debug!("loop stopped before cycle finished");
            }
        });
    }

    fn finish_cycle(&mut self, outcome: CycleOutcome) {
        self.in_flight = false;
        match outcome {
            Ok(result) => {
                self.stats.completed += 1;
                let transition = self.coordinator.apply(&result);
                debug!(label = result.label, ?transition, "cycle complete");
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(error = %e, "cycle failed, playback state unchanged");
            }
        }
    }
}

async fn run_cycle(sampler: &FrameSampler, classifier: &dyn Classifier) -> CycleOutcome {
    let frame = sampler.capture().await?;
    Ok(classifier.classify(&frame).await?)
}
