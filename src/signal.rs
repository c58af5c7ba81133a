//! Altitude-gain signal preparation.
//!
//! Segmentation works on a signed altitude-gain signal derived from the raw
//! altitudes. Two derivations exist:
//!
//! - **Pointwise** (full-resolution `.fit` traces): `gain[i] = alt[i] - alt[i-1]`.
//! - **Rolling window** (coarse GPX routes): `gain[i] = alt[i] - alt[i-window+1]`.
//!
//! Points whose gain cannot be computed carry `None`. Dense traces are first
//! decimated to every Nth sample so that segments are stable.

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How the altitude-gain signal is derived from altitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMode {
    /// Delta against the immediately preceding point
    Pointwise,
    /// Delta against the point `window - 1` positions earlier
    RollingWindow { window: usize },
}

impl GainMode {
    /// Number of leading points that have no defined gain.
    pub fn undefined_head(&self) -> usize {
        match self {
            GainMode::Pointwise => 1,
            GainMode::RollingWindow { window } => (*window).max(2) - 1,
        }
    }
}

/// Indices kept when down-sampling to one point every `step` points.
///
/// The first point is always kept. A step of 0 is treated as 1.
pub fn decimated_indices(len: usize, step: usize) -> Vec<usize> {
    (0..len).step_by(step.max(1)).collect()
}

/// Pointwise altitude gains. `gains[0]` is always `None`.
pub fn pointwise_gains(altitudes: &[f64]) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(altitudes.len());
    if altitudes.is_empty() {
        return gains;
    }
    gains.push(None);
    gains.extend(altitudes.windows(2).map(|w| Some(w[1] - w[0])));
    gains
}

/// Pointwise gains computed with rayon.
/// Only worth it for long traces (> 10,000 samples).
#[cfg(feature = "parallel")]
pub fn pointwise_gains_parallel(altitudes: &[f64]) -> Vec<Option<f64>> {
    if altitudes.len() < 10_000 {
        return pointwise_gains(altitudes);
    }

    let mut gains = Vec::with_capacity(altitudes.len());
    gains.push(None);
    gains.par_extend(altitudes.par_windows(2).map(|w| Some(w[1] - w[0])));
    gains
}

/// Rolling-window altitude gains.
///
/// `gains[i] = altitudes[i] - altitudes[i - window + 1]` for `i >= window - 1`,
/// `None` before. Windows below 2 are raised to 2.
pub fn rolling_window_gains(altitudes: &[f64], window: usize) -> Vec<Option<f64>> {
    let lag = window.max(2) - 1;
    altitudes
        .iter()
        .enumerate()
        .map(|(i, &alt)| {
            if i >= lag {
                Some(alt - altitudes[i - lag])
            } else {
                None
            }
        })
        .collect()
}

/// Derive the gain signal for the given mode.
pub fn altitude_gains(altitudes: &[f64], mode: GainMode) -> Vec<Option<f64>> {
    match mode {
        #[cfg(feature = "parallel")]
        GainMode::Pointwise => pointwise_gains_parallel(altitudes),
        #[cfg(not(feature = "parallel"))]
        GainMode::Pointwise => pointwise_gains(altitudes),
        GainMode::RollingWindow { window } => rolling_window_gains(altitudes, window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointwise_gains() {
        let gains = pointwise_gains(&[1.0, 5.0, 12.0, -8.0]);
        assert_eq!(gains, vec![None, Some(4.0), Some(7.0), Some(-20.0)]);
    }

    #[test]
    fn test_pointwise_gains_empty_and_single() {
        assert!(pointwise_gains(&[]).is_empty());
        assert_eq!(pointwise_gains(&[42.0]), vec![None]);
    }

    #[test]
    fn test_rolling_window_gains() {
        let altitudes = [100.0, 101.0, 103.0, 106.0, 110.0, 115.0, 114.0, 112.0];
        let gains = rolling_window_gains(&altitudes, 6);

        assert_eq!(gains.len(), altitudes.len());
        assert!(gains[..5].iter().all(Option::is_none));
        assert_eq!(gains[5], Some(15.0)); // 115 - 100
        assert_eq!(gains[6], Some(13.0)); // 114 - 101
        assert_eq!(gains[7], Some(9.0)); // 112 - 103
    }

    #[test]
    fn test_rolling_window_of_two_is_pointwise() {
        let altitudes = [3.0, 4.0, 2.0];
        assert_eq!(
            rolling_window_gains(&altitudes, 2),
            pointwise_gains(&altitudes)
        );
    }

    #[test]
    fn test_rolling_window_shorter_than_window() {
        let gains = rolling_window_gains(&[1.0, 2.0, 3.0], 6);
        assert!(gains.iter().all(Option::is_none));
    }

    #[test]
    fn test_undefined_head() {
        assert_eq!(GainMode::Pointwise.undefined_head(), 1);
        assert_eq!(GainMode::RollingWindow { window: 6 }.undefined_head(), 5);
    }

    #[test]
    fn test_decimated_indices() {
        assert_eq!(decimated_indices(45, 20), vec![0, 20, 40]);
        assert_eq!(decimated_indices(40, 20), vec![0, 20]);
        assert_eq!(decimated_indices(3, 0), vec![0, 1, 2]);
        assert!(decimated_indices(0, 20).is_empty());
    }

    #[test]
    fn test_altitude_gains_dispatch() {
        let altitudes = [10.0, 12.0, 11.0];
        assert_eq!(
            altitude_gains(&altitudes, GainMode::Pointwise),
            vec![None, Some(2.0), Some(-1.0)]
        );
        assert_eq!(
            altitude_gains(&altitudes, GainMode::RollingWindow { window: 3 }),
            vec![None, None, Some(1.0)]
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let altitudes: Vec<f64> = (0..20_000).map(|i| ((i as f64) * 0.01).sin() * 50.0).collect();
        assert_eq!(
            pointwise_gains_parallel(&altitudes),
            pointwise_gains(&altitudes)
        );
    }
}
