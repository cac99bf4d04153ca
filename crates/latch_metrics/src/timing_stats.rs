//! All-time timing statistics for one category (CPU, GPU, frame)

/// Running min/max/mean over every sample since the last [`clear`](Self::clear).
///
/// `last` survives a clear: it always holds the most recent sample until a new
/// one overwrites it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    min: f32,
    max: f32,
    last: f32,
    sum: f64,
    count: u64,
}

impl TimingStats {
    pub fn new() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            last: 0.0,
            sum: 0.0,
            count: 0,
        }
    }

    pub fn add_sample(&mut self, sample: f32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
        self.last = sample;
        self.sum += sample as f64;
        self.count += 1;
    }

    pub fn clear(&mut self) {
        *self = Self {
            last: self.last,
            ..Self::new()
        };
    }

    /// Mean of all samples, 0 when empty.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum / self.count as f64) as f32
    }

    /// `+inf` until the first sample.
    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    /// `-inf` until the first sample.
    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn last(&self) -> f32 {
        self.last
    }

    #[inline]
    pub fn sample_count(&self) -> u64 {
        self.count
    }
}

impl Default for TimingStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = TimingStats::new();
        assert_eq!(stats.average(), 0.0);
        assert_eq!(stats.min(), f32::INFINITY);
        assert_eq!(stats.max(), f32::NEG_INFINITY);
        assert_eq!(stats.sample_count(), 0);
    }

    #[test]
    fn test_add_sample() {
        let mut stats = TimingStats::new();
        stats.add_sample(4.0);
        stats.add_sample(2.0);
        stats.add_sample(6.0);

        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 6.0);
        assert_eq!(stats.last(), 6.0);
        assert_eq!(stats.average(), 4.0);
        assert_eq!(stats.sample_count(), 3);
    }

    #[test]
    fn test_clear_keeps_last() {
        let mut stats = TimingStats::new();
        stats.add_sample(3.0);
        stats.add_sample(9.0);
        stats.clear();

        assert_eq!(stats.average(), 0.0);
        assert_eq!(stats.min(), f32::INFINITY);
        assert_eq!(stats.max(), f32::NEG_INFINITY);
        assert_eq!(stats.sample_count(), 0);
        assert_eq!(stats.last(), 9.0);

        stats.add_sample(1.0);
        assert_eq!(stats.last(), 1.0);
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 1.0);
    }
}
