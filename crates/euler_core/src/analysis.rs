use crate::curve::Trajectory;
use crate::error::{SampleFailure, SampleTarget};
use crate::traits::ScalarCurve;
use serde::Serialize;

/// Largest |y_euler - g(t)| over the trajectory's own grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub max_error: f64,
    pub compared: usize,
}

/// Compares each trajectory point with g at the same t.
///
/// All-or-nothing: if g fails anywhere there is no meaningful maximum, so
/// the failure is returned instead.
pub fn max_abs_error(
    g: &impl ScalarCurve,
    trajectory: &Trajectory,
) -> Result<ErrorSummary, SampleFailure> {
    let mut max_error = 0.0_f64;
    let mut compared = 0usize;

    for point in trajectory {
        let exact = g.value(point.t).map_err(|source| SampleFailure {
            target: SampleTarget::ErrorAnalysis,
            t: point.t,
            source,
        })?;
        let err = (point.y - exact).abs();
        if err > max_error {
            max_error = err;
        }
        compared += 1;
    }

    Ok(ErrorSummary {
        max_error,
        compared,
    })
}
