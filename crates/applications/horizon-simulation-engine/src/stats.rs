//! Summary statistics over utilization values

use serde::{Deserialize, Serialize};

/// Summary of a set of utilization values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Single-pass accumulator (Welford)
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(&self) -> SeriesStats {
        if self.count == 0 {
            return SeriesStats::default();
        }
        SeriesStats {
            count: self.count,
            mean: self.mean,
            std: (self.m2 / self.count as f64).sqrt(),
            min: self.min,
            max: self.max,
        }
    }
}

impl Extend<f64> for RunningStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl SeriesStats {
    pub fn of(values: &[f32]) -> Self {
        let mut stats = RunningStats::new();
        stats.extend(values.iter().map(|v| f64::from(*v)));
        stats.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let stats = SeriesStats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_empty_is_zeroed() {
        assert_eq!(SeriesStats::of(&[]), SeriesStats::default());
    }

    #[test]
    fn test_single_value() {
        let stats = SeriesStats::of(&[42.5]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.min, 42.5);
        assert_eq!(stats.max, 42.5);
    }
}
