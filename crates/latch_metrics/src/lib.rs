//! Latch Metrics - Common utilities for performance tracking
//!
//! Small, allocation-free value types that the profiler and the runtime build
//! their statistics on.
//!
//! # Usage
//!
//! ```
//! use latch_metrics::{Ema, TimingStats};
//!
//! let mut stats = TimingStats::new();
//! let mut smoothed = Ema::new(20);
//! for sample in [16.0, 17.0, 15.5] {
//!     stats.add_sample(sample);
//!     smoothed.update(sample);
//! }
//! assert_eq!(stats.last(), 15.5);
//! assert!(stats.min() <= smoothed.value() && smoothed.value() <= stats.max());
//! ```

mod counter;
mod ema;
mod frame_timer;
mod ring_buffer;
mod timing_stats;

pub use counter::Counter;
pub use ema::Ema;
pub use frame_timer::FrameTimer;
pub use ring_buffer::RingBuffer;
pub use timing_stats::TimingStats;

/// Milliseconds in a [`std::time::Duration`], as the `f32` every stat here works in.
#[inline]
pub fn duration_ms(duration: std::time::Duration) -> f32 {
    (duration.as_secs_f64() * 1000.0) as f32
}
