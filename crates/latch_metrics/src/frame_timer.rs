//! Frame timing utilities

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Measures wall-clock time between successive [`tick`](FrameTimer::tick)s and
/// keeps a short history for FPS readouts.
pub struct FrameTimer {
    last_tick: Instant,
    frame_times: RingBuffer<Duration>,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_tick: Instant::now(),
            frame_times: RingBuffer::new(capacity),
        }
    }

    /// Marks a frame boundary and returns the time since the previous one.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.frame_times.push(delta);
        delta
    }

    /// Frames currently in the history window.
    pub fn sample_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn fps(&self) -> f64 {
        let avg = self.frame_times.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_times.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.frame_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_records_delta() {
        let mut timer = FrameTimer::new(8);
        std::thread::sleep(Duration::from_millis(2));
        let delta = timer.tick();

        assert!(delta >= Duration::from_millis(2));
        assert!(timer.fps() > 0.0);
        assert!(timer.frame_time_ms() >= 2.0);
        assert_eq!(timer.sample_count(), 1);

        let (min, max) = timer.frame_time_range_ms();
        assert!(min <= max);
    }

    #[test]
    fn test_no_frames() {
        let timer = FrameTimer::new(8);
        assert_eq!(timer.fps(), 0.0);
        assert_eq!(timer.frame_time_ms(), 0.0);
        assert_eq!(timer.frame_time_range_ms(), (0.0, 0.0));
    }
}
