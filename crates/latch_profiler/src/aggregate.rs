//! Rolling per-category timings (CPU total, GPU total, frame time)

use latch_metrics::{Ema, TimingStats};

/// All-time stats plus two moving averages: a slow one for display and a fast
/// one the stutter check compares against.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTimings {
    stats: TimingStats,
    smoothed: Ema,
    baseline: Ema,
    stutter_threshold_ms: f32,
    stuttering: bool,
}

impl CategoryTimings {
    pub fn new(smoothing_frames: u32, baseline_frames: u32, stutter_threshold_ms: f32) -> Self {
        Self {
            stats: TimingStats::new(),
            smoothed: Ema::new(smoothing_frames),
            baseline: Ema::new(baseline_frames),
            stutter_threshold_ms,
            stuttering: false,
        }
    }

    pub fn add_sample(&mut self, ms: f32) {
        // Compare before folding the sample into the baseline.
        self.stuttering =
            self.baseline.is_seeded() && ms > self.baseline.value() + self.stutter_threshold_ms;
        self.baseline.update(ms);
        self.smoothed.update(ms);
        self.stats.add_sample(ms);
    }

    /// Clears averages, min/max and the stutter flag. `last` is kept.
    pub fn reset(&mut self) {
        self.stats.clear();
        self.smoothed.reset();
        self.baseline.reset();
        self.stuttering = false;
    }

    pub fn set_stutter_threshold_ms(&mut self, threshold_ms: f32) {
        self.stutter_threshold_ms = threshold_ms;
    }

    pub fn last(&self) -> f32 {
        self.stats.last()
    }

    /// Smoothed average (EMA).
    pub fn avg(&self) -> f32 {
        self.smoothed.value()
    }

    /// Mean over every sample since the last reset.
    pub fn mean(&self) -> f32 {
        self.stats.average()
    }

    pub fn min(&self) -> f32 {
        self.stats.min()
    }

    pub fn max(&self) -> f32 {
        self.stats.max()
    }

    /// The fast average stutter is measured against.
    pub fn baseline(&self) -> f32 {
        self.baseline.value()
    }

    pub fn sample_count(&self) -> u64 {
        self.stats.sample_count()
    }

    pub fn is_stuttering(&self) -> bool {
        self.stuttering
    }
}
