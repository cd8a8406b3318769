//! Caller-supplied timing collection for the median-curve builder.
//!
//! The builder reports the wall time of each of its stages to a
//! [`TimingSink`]. Nothing is recorded globally; callers that want numbers
//! pass a [`StageTimings`] and read it afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Stages of the median-curve builder, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Folding repeated times within each series.
    CollapseDuplicates,
    /// Building the sorted union of all times.
    Timeline,
    /// Integrating median derivatives into segment curves.
    Integrate,
    /// Assigning series to segments.
    Assign,
    /// Fitting each series against its segment curve.
    Shifts,
    /// Re-centring segments on their weighted-mean series.
    Balance,
}

impl Stage {
    /// All stages, in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::CollapseDuplicates,
        Stage::Timeline,
        Stage::Integrate,
        Stage::Assign,
        Stage::Shifts,
        Stage::Balance,
    ];

    /// Short stage name for logs and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::CollapseDuplicates => "collapse_duplicates",
            Stage::Timeline => "timeline",
            Stage::Integrate => "integrate",
            Stage::Assign => "assign",
            Stage::Shifts => "shifts",
            Stage::Balance => "balance",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Receiver of per-stage elapsed times.
pub trait TimingSink: Send + Sync {
    /// Record that `stage` took `elapsed`.
    fn record(&self, stage: Stage, elapsed: Duration);
}

/// Sink that discards all timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTimings;

impl TimingSink for NoopTimings {
    fn record(&self, _stage: Stage, _elapsed: Duration) {}
}

/// Accumulating sink. Lock-free, so one instance can be shared by threads
/// running analyses concurrently.
#[derive(Debug, Default)]
pub struct StageTimings {
    nanos: [AtomicU64; 6],
    calls: [AtomicU64; 6],
}

impl StageTimings {
    /// Create a sink with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time recorded for `stage`.
    #[must_use]
    pub fn total(&self, stage: Stage) -> Duration {
        Duration::from_nanos(self.nanos[stage.index()].load(Ordering::Relaxed))
    }

    /// Number of recordings for `stage`.
    #[must_use]
    pub fn calls(&self, stage: Stage) -> u64 {
        self.calls[stage.index()].load(Ordering::Relaxed)
    }

    /// Totals for every stage, in execution order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Stage, Duration)> {
        Stage::ALL.iter().map(|&s| (s, self.total(s))).collect()
    }

    /// Zero all counters.
    pub fn reset(&self) {
        for counter in self.nanos.iter().chain(self.calls.iter()) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl TimingSink for StageTimings {
    fn record(&self, stage: Stage, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos[stage.index()].fetch_add(nanos, Ordering::Relaxed);
        self.calls[stage.index()].fetch_add(1, Ordering::Relaxed);
    }
}

/// Stopwatch that reports the time since the previous lap to a sink.
pub(crate) struct Lap<'a> {
    sink: &'a dyn TimingSink,
    start: Instant,
}

impl<'a> Lap<'a> {
    pub(crate) fn start(sink: &'a dyn TimingSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }

    pub(crate) fn lap(&mut self, stage: Stage) {
        let now = Instant::now();
        self.sink.record(stage, now - self.start);
        self.start = now;
    }
}
