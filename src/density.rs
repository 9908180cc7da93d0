//! Gaussian kernel density estimate for the bias distribution shading.
//!
//! Approximate by nature: the curve is only used to shade the chart, so the
//! kernel and bandwidth are configuration rather than a correctness contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KdeConfig {
    pub bandwidth: f64,
    /// Closed interval the curve is sampled over.
    pub extent: (f64, f64),
    pub samples: usize,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0.5,
            extent: (-2.0, 2.0),
            samples: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensitySample {
    pub x: f64,
    pub density: f64,
}

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Density sampled at `samples` evenly spaced points across `extent`,
/// ascending in x. Non-finite inputs are ignored. Returns an empty curve
/// when there is nothing to estimate or the configuration is degenerate.
pub fn estimate(values: &[f64], cfg: &KdeConfig) -> Vec<DensitySample> {
    let points: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (lo, hi) = cfg.extent;
    let h = cfg.bandwidth;
    if points.is_empty() || cfg.samples == 0 || !(h > 0.0) || !(hi >= lo) {
        return Vec::new();
    }
    let norm = INV_SQRT_2PI / (points.len() as f64 * h);
    let step = if cfg.samples > 1 {
        (hi - lo) / (cfg.samples - 1) as f64
    } else {
        0.0
    };
    (0..cfg.samples)
        .map(|i| {
            let x = lo + step * i as f64;
            let sum: f64 = points
                .iter()
                .map(|p| {
                    let u = (x - p) / h;
                    (-0.5 * u * u).exp()
                })
                .sum();
            DensitySample { x, density: sum * norm }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_ascending_and_sized() {
        let cfg = KdeConfig::default();
        let curve = estimate(&[-1.0, 0.0, 1.0], &cfg);
        assert_eq!(curve.len(), 64);
        assert_eq!(curve[0].x, -2.0);
        assert!((curve[63].x - 2.0).abs() < 1e-12);
        assert!(curve.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn peak_sits_on_the_mass() {
        let cfg = KdeConfig {
            samples: 41,
            ..Default::default()
        };
        let curve = estimate(&[1.0, 1.0, 1.1], &cfg);
        let peak = curve
            .iter()
            .max_by(|a, b| a.density.partial_cmp(&b.density).unwrap())
            .unwrap();
        assert!((peak.x - 1.0).abs() <= 0.2, "peak at {}", peak.x);
    }

    #[test]
    fn integrates_to_about_one_when_mass_is_inside() {
        let cfg = KdeConfig {
            bandwidth: 0.2,
            extent: (-4.0, 4.0),
            samples: 801,
        };
        let curve = estimate(&[-0.5, 0.0, 0.5], &cfg);
        let dx = 8.0 / 800.0;
        let area: f64 = curve.iter().map(|s| s.density * dx).sum();
        assert!((area - 1.0).abs() < 0.01, "area {}", area);
    }

    #[test]
    fn degenerate_inputs_give_empty_curve() {
        let cfg = KdeConfig::default();
        assert!(estimate(&[], &cfg).is_empty());
        assert!(estimate(&[f64::NAN], &cfg).is_empty());
        let zero_bw = KdeConfig { bandwidth: 0.0, ..cfg };
        assert!(estimate(&[0.0], &zero_bw).is_empty());
    }
}
