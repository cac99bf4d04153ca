//! Exponential moving average over a fixed frame window

/// `value = value * (1 - 1/window) + sample / window`
///
/// The first sample seeds the average directly so a fresh average does not
/// have to climb up from zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    value: f32,
    feedback: f32,
    seeded: bool,
}

impl Ema {
    /// `window` is the number of frames to accumulate over; 0 is treated as 1.
    pub fn new(window: u32) -> Self {
        Self {
            value: 0.0,
            feedback: 1.0 / window.max(1) as f32,
            seeded: false,
        }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        if self.seeded {
            self.value = self.value * (1.0 - self.feedback) + sample * self.feedback;
        } else {
            self.value = sample;
            self.seeded = true;
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.seeded = false;
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// False until the first sample after construction or [`reset`](Self::reset).
    #[inline]
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}
