//! Upload progress — state, tracking and the simulated reporter.
//!
//! DESIGN
//! ======
//! True transfer progress is not observable from here, so the default
//! [`SimulatedProgress`] advances a fixed step on a fixed cadence and stops
//! short of completion. Only the coordinator moves the phase; reporters can
//! only raise the percentage while the phase is `Uploading`, and never to 100.
//!
//! The timer lives in a [`ProgressTicker`] guard. Dropping or stopping the
//! guard aborts the task, so every exit path of an upload (success,
//! failure, cancellation, or the caller dropping the future) tears it down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ProgressConfig;

/// Highest percentage a reporter may set; 100 is reserved for success.
const REPORTED_CEILING: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    Idle,
    Uploading,
    Finalizing,
    Succeeded,
    Failed,
}

impl UploadPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Finalizing => "finalizing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub progress: u8,
    pub phase: UploadPhase,
}

impl UploadState {
    pub const IDLE: Self = Self { progress: 0, phase: UploadPhase::Idle };
}

// =============================================================================
// TRACKER
// =============================================================================

/// Shared handle to one upload's state.
///
/// Progress and phase change together under one lock. When built with
/// [`UploadTracker::with_events`], every change is also sent on the channel.
#[derive(Debug, Clone)]
pub struct UploadTracker {
    state: Arc<Mutex<UploadState>>,
    events: Option<mpsc::UnboundedSender<UploadState>>,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(UploadState::IDLE)), events: None }
    }

    /// Tracker that forwards each state change to `events`.
    #[must_use]
    pub fn with_events(events: mpsc::UnboundedSender<UploadState>) -> Self {
        Self { state: Arc::new(Mutex::new(UploadState::IDLE)), events: Some(events) }
    }

    #[must_use]
    pub fn state(&self) -> UploadState {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Raise progress by `step`, bounded by `cap` (itself bounded by 99).
    ///
    /// No-op unless the phase is `Uploading`. Returns the new value when it changed.
    pub fn advance(&self, step: u8, cap: u8) -> Option<u8> {
        let cap = cap.min(REPORTED_CEILING);
        self.update(|s| {
            if s.phase != UploadPhase::Uploading {
                return false;
            }
            let next = s.progress.saturating_add(step).min(cap);
            if next <= s.progress {
                return false;
            }
            s.progress = next;
            true
        })
        .map(|s| s.progress)
    }

    /// `Idle → Uploading` at 0%. Returns the phase found instead when not idle.
    pub(crate) fn begin(&self) -> Result<(), UploadPhase> {
        let mut found = UploadPhase::Idle;
        let changed = self.update(|s| {
            found = s.phase;
            if s.phase != UploadPhase::Idle {
                return false;
            }
            *s = UploadState { progress: 0, phase: UploadPhase::Uploading };
            true
        });
        if changed.is_some() { Ok(()) } else { Err(found) }
    }

    pub(crate) fn finalize(&self) {
        self.update(|s| {
            if s.phase != UploadPhase::Uploading {
                return false;
            }
            s.phase = UploadPhase::Finalizing;
            true
        });
    }

    pub(crate) fn succeed(&self) {
        self.update(|s| {
            if !matches!(s.phase, UploadPhase::Uploading | UploadPhase::Finalizing) {
                return false;
            }
            *s = UploadState { progress: 100, phase: UploadPhase::Succeeded };
            true
        });
    }

    pub(crate) fn fail(&self) {
        self.update(|s| {
            if s.phase.is_terminal() {
                return false;
            }
            s.phase = UploadPhase::Failed;
            true
        });
    }

    /// Apply `change` under the lock; emit and return the new state if it reports a change.
    fn update(&self, change: impl FnOnce(&mut UploadState) -> bool) -> Option<UploadState> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !change(&mut state) {
            return None;
        }
        let snapshot = *state;
        if let Some(events) = &self.events {
            // A closed receiver only means nobody is watching any more.
            if events.send(snapshot).is_err() {
                tracing::trace!("upload: progress listener gone");
            }
        }
        Some(snapshot)
    }
}

// =============================================================================
// REPORTER
// =============================================================================

/// Source of progress updates for an in-flight upload.
///
/// Implementations call [`UploadTracker::advance`]; the returned ticker must
/// stop all reporting when stopped or dropped.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, tracker: UploadTracker) -> ProgressTicker;
}

/// Guard for a running progress task. Aborts the task exactly once.
#[derive(Debug)]
pub struct ProgressTicker {
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    #[must_use]
    pub fn spawned(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Ticker with nothing behind it, for reporters driven from elsewhere.
    #[must_use]
    pub fn inert() -> Self {
        Self { task: None }
    }

    /// Stop reporting. Returns `true` if a task was still attached.
    pub fn stop(mut self) -> bool {
        self.cancel()
    }

    fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fixed-cadence fake progress: `+step` every `interval`, capped at `cap`.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedProgress {
    config: ProgressConfig,
}

impl SimulatedProgress {
    #[must_use]
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }
}

impl Default for SimulatedProgress {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}

impl ProgressReporter for SimulatedProgress {
    fn start(&self, tracker: UploadTracker) -> ProgressTicker {
        let ProgressConfig { step, cap, interval } = self.config;
        let interval = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tracker.advance(step, cap).is_none() && tracker.state().phase != UploadPhase::Uploading {
                    break;
                }
            }
        });
        ProgressTicker::spawned(task)
    }
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
