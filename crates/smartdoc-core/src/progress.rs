//! Cosmetic progress simulation
//!
//! Produces a time-driven percentage across fixed, labeled phases. It knows
//! nothing about the real backend call and must never gate result display.
//! Dropping the `run` future stops the ticker.

use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// One labeled step of the animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPhase {
    pub id: &'static str,
    pub label: &'static str,
    pub duration: Duration,
}

/// The standard five phases (9000 ms total)
pub const DEFAULT_PHASES: [ProgressPhase; 5] = [
    ProgressPhase {
        id: "upload",
        label: "Uploading documents...",
        duration: Duration::from_millis(1000),
    },
    ProgressPhase {
        id: "extract",
        label: "Extracting text content...",
        duration: Duration::from_millis(1500),
    },
    ProgressPhase {
        id: "process",
        label: "Running AI analysis...",
        duration: Duration::from_millis(3000),
    },
    ProgressPhase {
        id: "analyze",
        label: "Detecting contradictions...",
        duration: Duration::from_millis(2000),
    },
    ProgressPhase {
        id: "report",
        label: "Generating detailed report...",
        duration: Duration::from_millis(1500),
    },
];

/// Display state of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Pending,
    Active,
    Completed,
}

/// Receives animation updates
pub trait ProgressSink {
    /// Phase states changed; `active` is the label of the running phase, if any
    fn phase_changed(&mut self, states: &[PhaseState], active: Option<&ProgressPhase>);

    /// Overall completion in [0, 100]
    fn percent(&mut self, value: f64);
}

/// Sink that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn phase_changed(&mut self, _states: &[PhaseState], _active: Option<&ProgressPhase>) {}

    fn percent(&mut self, _value: f64) {}
}

/// Time-driven phase animation
#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    phases: Vec<ProgressPhase>,
    tick: Duration,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_PHASES.to_vec(), Duration::from_millis(16))
    }
}

impl ProgressSimulator {
    pub fn new(phases: Vec<ProgressPhase>, tick: Duration) -> Self {
        Self {
            phases,
            // A zero period would make `interval` panic
            tick: tick.max(Duration::from_millis(1)),
        }
    }

    /// Sum of nominal phase durations
    pub fn nominal_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }

    /// Play the animation to completion
    ///
    /// Phase `i` of `n` interpolates from `i/n` to `(i+1)/n` of 100% over its
    /// nominal duration; the value reported is monotonically non-decreasing.
    pub async fn run(&self, sink: &mut dyn ProgressSink) {
        let count = self.phases.len();
        let mut states = vec![PhaseState::Pending; count];

        for (index, phase) in self.phases.iter().enumerate() {
            for state in states.iter_mut().take(index) {
                *state = PhaseState::Completed;
            }
            states[index] = PhaseState::Active;
            sink.phase_changed(&states, Some(phase));
            debug!(phase = phase.id, "Progress phase started");

            let from = index as f64 / count as f64 * 100.0;
            let to = (index + 1) as f64 / count as f64 * 100.0;

            let started = Instant::now();
            let mut ticker = interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let fraction = phase_fraction(started.elapsed(), phase.duration);
                sink.percent(from + (to - from) * fraction);
                if fraction >= 1.0 {
                    break;
                }
            }
        }

        states.fill(PhaseState::Completed);
        sink.phase_changed(&states, None);
    }
}

fn phase_fraction(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}
