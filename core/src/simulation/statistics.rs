//! Summary statistics over a sorted sample buffer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u32,
    pub percentage: f64,
}

/// `sorted` must be non-empty and ascending.
///
/// Sums run over samples divided by the largest magnitude, so values near
/// `f64::MAX` still give a finite mean and standard deviation.
pub fn describe(sorted: &[f64]) -> Statistics {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len() as f64;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let scale = match min.abs().max(max.abs()) {
        s if s > 0.0 => s,
        _ => 1.0,
    };

    let scaled_mean = sorted.iter().map(|x| x / scale).sum::<f64>() / n;
    let scaled_variance = sorted
        .iter()
        .map(|x| (x / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / n;

    Statistics {
        mean: scaled_mean * scale,
        median: median(sorted),
        std_dev: scaled_variance.sqrt() * scale,
        min,
        max,
    }
}

/// Middle element, or the average of the two middle elements when even.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        let (a, b) = (sorted[n / 2 - 1], sorted[n / 2]);
        a + (b - a) / 2.0
    }
}

/// Element at floor(p × N), clamped to the buffer. No interpolation.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let idx = (p * n as f64).floor().max(0.0) as usize;
    sorted[idx.min(n - 1)]
}

pub fn percentiles(sorted: &[f64]) -> Percentiles {
    Percentiles {
        p10: percentile(sorted, 0.10),
        p50: percentile(sorted, 0.50),
        p90: percentile(sorted, 0.90),
        p95: percentile(sorted, 0.95),
        p99: percentile(sorted, 0.99),
    }
}

/// Equal-width bins over [min, max].
///
/// Bins are half-open except the last, which also takes the maximum.
/// When every sample is identical the width is zero and all samples
/// land in the last bin.
pub fn histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    debug_assert!(bins > 0);
    let n = sorted.len();
    let min = sorted[0];
    let max = sorted[n - 1];
    let width = (max - min) / bins as f64;
    let last = bins - 1;

    let mut counts = vec![0u32; bins];
    for &x in sorted {
        let idx = if width > 0.0 {
            (((x - min) / width).floor() as usize).min(last)
        } else {
            last
        };
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            range_start: min + i as f64 * width,
            range_end: if i == last { max } else { min + (i + 1) as f64 * width },
            count,
            percentage: count as f64 / n as f64 * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), 2.5);
    }

    #[test]
    fn population_std_dev() {
        let stats = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn near_max_samples_stay_finite() {
        let stats = describe(&[1.0e308, 1.5e308, 1.7e308]);
        assert!(stats.mean.is_finite() && stats.std_dev.is_finite());
        assert!((stats.mean / 1.4e308 - 1.0).abs() < 1e-12);
        assert!((median(&[1.5e308, 1.7e308]) / 1.6e308 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_zero_samples() {
        let stats = describe(&[0.0; 4]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn percentile_index_is_floor_and_clamped() {
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(percentile(&data, 0.10), 1.0);
        assert_eq!(percentile(&data, 0.99), 9.0);
        assert_eq!(percentile(&data, 1.0), 9.0);
        assert_eq!(percentile(&data, 0.0), 0.0);
    }

    #[test]
    fn maximum_lands_in_last_bin() {
        let data: Vec<f64> = (0..=20).map(|i| i as f64).collect();
        let bins = histogram(&data, 20);
        assert_eq!(bins.len(), 20);
        // 19.0 and 20.0 both in the closed final bin
        assert_eq!(bins[19].count, 2);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[19].range_end, 20.0);
        let total: u32 = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 21);
    }

    #[test]
    fn constant_samples_fill_last_bin() {
        let data = vec![4.0; 50];
        let bins = histogram(&data, 20);
        assert_eq!(bins[19].count, 50);
        assert_eq!(bins[19].percentage, 100.0);
        assert!(bins[..19].iter().all(|b| b.count == 0));
    }
}
