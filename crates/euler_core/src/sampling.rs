use crate::curve::{ExactCurve, Point};
use crate::error::{SampleFailure, SampleTarget};
use crate::traits::ScalarCurve;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXACT_POINTS: usize = 200;

/// Largest exact-curve resolution a run may request.
pub const MAX_EXACT_POINTS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingSettings {
    pub exact_points: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            exact_points: DEFAULT_EXACT_POINTS,
        }
    }
}

impl SamplingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.exact_points > MAX_EXACT_POINTS {
            bail!(
                "exact_points ({}) must be at most {MAX_EXACT_POINTS}.",
                self.exact_points
            );
        }
        Ok(())
    }
}

/// Samples g on `num_points` evenly spaced times from `t0` to `t_end`
/// inclusive. Fewer than two points are raised to two.
///
/// A failure at any grid point discards the whole curve.
pub fn sample_exact(
    g: &impl ScalarCurve,
    t0: f64,
    t_end: f64,
    num_points: usize,
) -> Result<ExactCurve, SampleFailure> {
    let num_points = num_points.max(2);
    let spacing = (t_end - t0) / (num_points - 1) as f64;

    let mut points = Vec::with_capacity(num_points.min(MAX_EXACT_POINTS));
    for i in 0..num_points {
        let t = t0 + i as f64 * spacing;
        let y = g.value(t).map_err(|source| SampleFailure {
            target: SampleTarget::ExactCurve,
            t,
            source,
        })?;
        points.push(Point { t, y });
    }
    Ok(ExactCurve::from_points(points))
}
