//! Scenario scheduling: staged ramps driving concurrent workers.
//!
//! A scenario moves through `Pending -> Ramping(stage) -> Draining ->
//! Completed`, driven by an explicit ticker rather than callbacks. Workers are
//! retired only between request cycles; an in-flight request always completes
//! before its worker stops.

use crate::cycle::RequestCycle;
use crate::outcome::Operation;
use crate::recorder::OutcomeRecorder;
use crate::scenario::{Model, ScenarioError, ScenarioProfile};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Scheduling tick for target recomputation and request issuance.
const TICK: Duration = Duration::from_millis(100);

/// Backoff for a worker whose cycle had nothing to do.
const IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Interval between realized-vs-target rate log lines.
const RATE_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioState {
    Pending,
    Ramping(usize),
    Draining,
    Completed,
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioState::Pending => write!(f, "pending"),
            ScenarioState::Ramping(stage) => write!(f, "ramping(stage {stage})"),
            ScenarioState::Draining => write!(f, "draining"),
            ScenarioState::Completed => write!(f, "completed"),
        }
    }
}

/// Final accounting for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub operation: Operation,
    pub model: Model,
    /// Request cycles handed to workers
    pub issued: u64,
    /// Request cycles that ran to completion
    pub completed: u64,
    /// Arrival-rate ticks dropped because all workers were busy
    pub dropped: u64,
    pub duration_secs: f64,
}

/// Signal broadcast to concurrency-ramp workers on every tick.
#[derive(Debug, Clone, Copy)]
struct RampSignal {
    target: u64,
    draining: bool,
}

/// Runs one scenario to completion.
pub struct ScenarioRunner {
    profile: ScenarioProfile,
    cycle: Arc<dyn RequestCycle>,
    recorder: Arc<OutcomeRecorder>,
    base_seed: u64,
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicU64>,
}

impl ScenarioRunner {
    pub fn new(
        profile: ScenarioProfile,
        cycle: Arc<dyn RequestCycle>,
        recorder: Arc<OutcomeRecorder>,
        base_seed: u64,
    ) -> Self {
        Self {
            profile,
            cycle,
            recorder,
            base_seed,
            active: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Gauge of currently active workers, for observation while running.
    pub fn active_workers(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Run the scenario through its full state machine.
    pub async fn run(self) -> Result<ScenarioResult, ScenarioError> {
        self.profile.validate()?;
        let name = self.profile.name();

        info!(
            scenario = %name,
            model = %self.profile.model,
            stages = self.profile.stages.len(),
            total = ?self.profile.total_duration(),
            "scenario starting"
        );

        match self.profile.model {
            Model::ConcurrencyRamp => self.run_concurrency_ramp(name).await,
            Model::ArrivalRate => self.run_arrival_rate(name).await,
        }
    }

    async fn run_concurrency_ramp(self, name: String) -> Result<ScenarioResult, ScenarioError> {
        let (signal_tx, _keepalive) = watch::channel(RampSignal {
            target: 0,
            draining: false,
        });

        let total = self.profile.total_duration();
        let start = Instant::now();
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        let mut state = ScenarioState::Pending;

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            if let Some(stage) = self.profile.stage_at(elapsed) {
                state = transition(state, ScenarioState::Ramping(stage), &name);
            }

            let target = self.profile.level_at(elapsed).round() as u64;

            // Workers are spawned on demand and parked when the target falls;
            // a parked worker costs nothing but its task.
            while (handles.len() as u64) < target {
                let index = handles.len() as u64;
                handles.push(tokio::spawn(ramp_worker(
                    index,
                    signal_tx.subscribe(),
                    Arc::clone(&self.cycle),
                    Arc::clone(&self.recorder),
                    Arc::clone(&self.active),
                    Arc::clone(&self.completed),
                    self.base_seed.wrapping_add(index),
                )));
            }

            let _ = signal_tx.send(RampSignal {
                target,
                draining: false,
            });
        }

        state = transition(state, ScenarioState::Draining, &name);
        let _ = signal_tx.send(RampSignal {
            target: 0,
            draining: true,
        });
        for handle in handles {
            let _ = handle.await;
        }
        transition(state, ScenarioState::Completed, &name);

        let completed = self.completed.load(Ordering::Relaxed);
        Ok(ScenarioResult {
            name,
            operation: self.profile.operation,
            model: self.profile.model,
            issued: completed,
            completed,
            dropped: 0,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    async fn run_arrival_rate(self, name: String) -> Result<ScenarioResult, ScenarioError> {
        let queue_capacity = self.profile.preallocated_workers;
        let (ticket_tx, ticket_rx) = mpsc::channel::<()>(queue_capacity);
        let ticket_rx = Arc::new(Mutex::new(ticket_rx));

        let mut handles = Vec::with_capacity(self.profile.preallocated_workers);
        for index in 0..self.profile.preallocated_workers as u64 {
            handles.push(tokio::spawn(rate_worker(
                Arc::clone(&ticket_rx),
                Arc::clone(&self.cycle),
                Arc::clone(&self.recorder),
                Arc::clone(&self.active),
                Arc::clone(&self.completed),
                self.base_seed.wrapping_add(index),
            )));
        }

        let total = self.profile.total_duration();
        let start = Instant::now();
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = ScenarioState::Pending;
        let mut issued = 0u64;
        let mut dropped = 0u64;
        let mut accumulator = 0.0f64;
        let mut last_log = start;
        let mut last_completed = 0u64;

        'ticking: loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            if let Some(stage) = self.profile.stage_at(elapsed) {
                state = transition(state, ScenarioState::Ramping(stage), &name);
            }

            let rate = self.profile.level_at(elapsed);
            accumulator += rate * TICK.as_secs_f64();
            while accumulator >= 1.0 {
                accumulator -= 1.0;
                match ticket_tx.try_send(()) {
                    Ok(()) => issued += 1,
                    Err(mpsc::error::TrySendError::Full(())) => {
                        // All workers busy and the queue is full: the tick is
                        // shed and realized rate falls below target.
                        dropped += 1;
                    }
                    Err(mpsc::error::TrySendError::Closed(())) => break 'ticking,
                }
            }

            // Realized vs target rate is an observability signal, not an error
            if last_log.elapsed() >= RATE_LOG_INTERVAL {
                let completed = self.completed.load(Ordering::Relaxed);
                let realized =
                    (completed - last_completed) as f64 / last_log.elapsed().as_secs_f64();
                info!(
                    scenario = %name,
                    target_rate = format!("{rate:.1}/s"),
                    realized_rate = format!("{realized:.1}/s"),
                    "arrival rate"
                );
                last_log = Instant::now();
                last_completed = completed;
            }
        }

        state = transition(state, ScenarioState::Draining, &name);
        drop(ticket_tx);
        for handle in handles {
            let _ = handle.await;
        }
        transition(state, ScenarioState::Completed, &name);

        if dropped > 0 {
            warn!(
                scenario = %name,
                dropped,
                "issuance ticks shed because all preallocated workers were busy"
            );
        }

        Ok(ScenarioResult {
            name,
            operation: self.profile.operation,
            model: self.profile.model,
            issued,
            completed: self.completed.load(Ordering::Relaxed),
            dropped,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Log and apply a state transition, ignoring self-transitions.
fn transition(current: ScenarioState, next: ScenarioState, name: &str) -> ScenarioState {
    if current != next {
        info!(scenario = %name, from = %current, to = %next, "scenario state");
    }
    next
}

/// Worker for the concurrency-ramp model.
///
/// Active while its index is below the broadcast target; parks between cycles
/// when the target falls and resumes when it rises again.
async fn ramp_worker(
    index: u64,
    mut signal_rx: watch::Receiver<RampSignal>,
    cycle: Arc<dyn RequestCycle>,
    recorder: Arc<OutcomeRecorder>,
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicU64>,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut running = false;

    loop {
        let signal = *signal_rx.borrow_and_update();
        if signal.draining {
            break;
        }

        if signal.target > index {
            if !running {
                active.fetch_add(1, Ordering::SeqCst);
                running = true;
            }
            match cycle.execute(&mut rng).await {
                Some(outcome) => {
                    recorder.record(outcome);
                    completed.fetch_add(1, Ordering::Relaxed);
                }
                None => sleep(IDLE_BACKOFF).await,
            }
        } else {
            if running {
                active.fetch_sub(1, Ordering::SeqCst);
                running = false;
            }
            if signal_rx.changed().await.is_err() {
                break;
            }
        }
    }

    if running {
        active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Worker for the arrival-rate model: consumes cycle tickets until the
/// scheduler drops the sender, then drains out.
async fn rate_worker(
    tickets: Arc<Mutex<mpsc::Receiver<()>>>,
    cycle: Arc<dyn RequestCycle>,
    recorder: Arc<OutcomeRecorder>,
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicU64>,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);

    loop {
        // Only one waiter receives each ticket, so holding the lock across
        // the recv is equivalent to competing on the channel directly.
        let ticket = { tickets.lock().await.recv().await };
        match ticket {
            Some(()) => {
                active.fetch_add(1, Ordering::SeqCst);
                match cycle.execute(&mut rng).await {
                    Some(outcome) => {
                        recorder.record(outcome);
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => sleep(IDLE_BACKOFF).await,
                }
                active.fetch_sub(1, Ordering::SeqCst);
            }
            None => break,
        }
    }
}
