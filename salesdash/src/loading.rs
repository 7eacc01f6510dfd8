//! Loading State Coordinator: many loading flags, one flicker-free signal.
//!
//! ```text
//! Idle/Done --any flag on--> Loading --all flags off--> SettlingMinimumTime --timer--> Done
//!                               ^                              |
//!                               +-------- any flag on ---------+
//! ```
//!
//! The coordinator owns at most one timer. Every transition out of
//! `SettlingMinimumTime` aborts it, and a cycle counter makes a timer that
//! already woke up a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Timing of the loading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingOptions {
    /// Shortest time the loading signal stays on once shown.
    #[serde(with = "humantime_serde")]
    pub minimum_loading_time: Duration,
    /// Pause before turning the signal off once the minimum has passed.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            minimum_loading_time: Duration::from_millis(500),
            settle_delay: Duration::from_millis(50),
        }
    }
}

/// Phase of the loading cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingPhase {
    /// Nothing observed yet, or torn down.
    #[default]
    Idle,
    /// At least one operation is loading.
    Loading,
    /// Every operation finished; waiting out the minimum display time.
    SettlingMinimumTime,
    /// The signal is off until an operation starts loading again.
    Done,
}

/// What the UI should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadingSnapshot {
    /// Keep the skeleton on screen.
    pub show_loading: bool,
    /// Completed share of the current cycle's operations, 0 to 100.
    pub progress: u8,
    /// Current phase.
    pub phase: LoadingPhase,
}

#[derive(Debug, Default)]
struct LoadingState {
    phase: LoadingPhase,
    started_at: Option<Instant>,
    flags: BTreeMap<SmolStr, bool>,
    completed: BTreeSet<SmolStr>,
    timer: Option<JoinHandle<()>>,
    cycle: u64,
}

impl LoadingState {
    fn progress(&self) -> u8 {
        if self.phase != LoadingPhase::Loading {
            return 100;
        }
        let total = self.flags.len();
        if total == 0 {
            return 0;
        }
        let done = self.completed.len().min(total);
        u8::try_from(done * 100 / total).unwrap_or(100)
    }

    fn snapshot(&self) -> LoadingSnapshot {
        let show_loading = matches!(
            self.phase,
            LoadingPhase::Loading | LoadingPhase::SettlingMinimumTime
        );
        LoadingSnapshot {
            show_loading,
            progress: if self.phase == LoadingPhase::Idle {
                0
            } else {
                self.progress()
            },
            phase: self.phase,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<LoadingState>,
    signal: watch::Sender<LoadingSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoadingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: LoadingSnapshot) {
        self.signal.send_if_modified(|current| {
            let changed = *current != snapshot;
            *current = snapshot;
            changed
        });
    }
}

/// Merges per-operation loading flags into one signal with a minimum
/// display time.
///
/// Deferred flips run on the current Tokio runtime. Without a runtime the
/// signal turns off immediately instead.
///
/// # Examples
///
/// ```
/// use salesdash::loading::LoadingCoordinator;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let loading = LoadingCoordinator::default();
/// let snapshot = loading.observe([("totals", true), ("chart", true)]);
/// assert!(snapshot.show_loading);
/// assert_eq!(loading.observe([("totals", false), ("chart", true)]).progress, 50);
/// # }
/// ```
#[derive(Debug)]
pub struct LoadingCoordinator {
    options: LoadingOptions,
    shared: Arc<Shared>,
}

impl Default for LoadingCoordinator {
    fn default() -> Self {
        Self::new(LoadingOptions::default())
    }
}

impl LoadingCoordinator {
    /// Creates an idle coordinator.
    pub fn new(options: LoadingOptions) -> Self {
        let (signal, _) = watch::channel(LoadingSnapshot::default());
        Self {
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(LoadingState::default()),
                signal,
            }),
        }
    }

    /// The timing options in use.
    pub fn options(&self) -> &LoadingOptions {
        &self.options
    }

    /// Receiver for every change of the signal, deferred flips included.
    pub fn subscribe(&self) -> watch::Receiver<LoadingSnapshot> {
        self.shared.signal.subscribe()
    }

    /// The current signal.
    pub fn snapshot(&self) -> LoadingSnapshot {
        self.shared.lock().snapshot()
    }

    /// Feeds the complete set of operation flags and returns the signal.
    pub fn observe<I, K>(&self, flags: I) -> LoadingSnapshot
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<SmolStr>,
    {
        let flags: BTreeMap<SmolStr, bool> =
            flags.into_iter().map(|(name, on)| (name.into(), on)).collect();
        let any_loading = flags.values().any(|on| *on);

        let mut state = self.shared.lock();
        match (state.phase, any_loading) {
            (LoadingPhase::Idle | LoadingPhase::Done, true) => {
                self.start_cycle(&mut state);
            }
            (LoadingPhase::SettlingMinimumTime, true) => {
                debug!("operation restarted before the loading signal cleared");
                self.start_cycle(&mut state);
            }
            _ => {}
        }

        state.flags = flags;
        if state.phase == LoadingPhase::Loading {
            let finished: Vec<SmolStr> = state
                .flags
                .iter()
                .filter(|(_, on)| !**on)
                .map(|(name, _)| name.clone())
                .collect();
            state.completed.extend(finished);

            if !any_loading {
                self.begin_settling(&mut state);
            }
        }

        let snapshot = state.snapshot();
        drop(state);
        self.shared.publish(snapshot);
        snapshot
    }

    /// Clears every flag and aborts a pending flip.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.cancel_timer();
        state.cycle += 1;
        state.phase = LoadingPhase::Idle;
        state.started_at = None;
        state.flags.clear();
        state.completed.clear();
        let snapshot = state.snapshot();
        drop(state);
        self.shared.publish(snapshot);
    }

    fn start_cycle(&self, state: &mut LoadingState) {
        state.cancel_timer();
        state.cycle += 1;
        state.phase = LoadingPhase::Loading;
        state.started_at = Some(Instant::now());
        state.completed.clear();
        trace!(cycle = state.cycle, "loading cycle started");
    }

    fn begin_settling(&self, state: &mut LoadingState) {
        let elapsed = state
            .started_at
            .map_or(Duration::ZERO, |started| started.elapsed());
        let delay = match self.options.minimum_loading_time.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => self.options.settle_delay,
        };

        state.phase = LoadingPhase::SettlingMinimumTime;
        let cycle = state.cycle;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            state.phase = LoadingPhase::Done;
            return;
        };

        debug!(
            cycle,
            elapsed_ms = elapsed.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            "loading finished, holding signal"
        );
        let shared = Arc::downgrade(&self.shared);
        state.timer = Some(runtime.spawn(finish_cycle(shared, cycle, delay)));
    }
}

async fn finish_cycle(shared: Weak<Shared>, cycle: u64, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut state = shared.lock();
    if state.cycle != cycle || state.phase != LoadingPhase::SettlingMinimumTime {
        return;
    }
    state.phase = LoadingPhase::Done;
    state.timer = None;
    let snapshot = state.snapshot();
    drop(state);
    trace!(cycle, "loading signal cleared");
    shared.publish(snapshot);
}

impl Drop for LoadingCoordinator {
    fn drop(&mut self) {
        self.shared.lock().cancel_timer();
    }
}
