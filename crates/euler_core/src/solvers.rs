use crate::curve::Trajectory;
use crate::error::{EvalError, StepFailure};
use crate::traits::{ScalarOde, Steppable};
use anyhow::{bail, Result};

/// Upper bound on the number of steps a single run may take.
pub const MAX_STEPS: usize = 50_000_000;

/// Fraction of `dt` by which accumulated time may fall short of `t_end` and
/// still count as having reached it.
pub const END_TOLERANCE: f64 = 1e-9;

/// Points reserved up front; longer runs grow the trajectory as they go.
const INITIAL_CAPACITY: usize = 4096;

/// Explicit (forward) Euler stepper: y_next = y + dt * f(y, t).
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler;

impl Steppable for Euler {
    fn step(
        &mut self,
        ode: &impl ScalarOde,
        t: &mut f64,
        y: &mut f64,
        dt: f64,
    ) -> Result<(), EvalError> {
        let slope = ode.slope(*y, *t)?;
        *y += dt * slope;
        *t += dt;
        Ok(())
    }
}

/// Result of an Euler run.
///
/// `failure` is set when the derivative could not be evaluated; the
/// trajectory then ends at the last point that was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Integration {
    pub trajectory: Trajectory,
    pub failure: Option<StepFailure>,
}

impl Integration {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Checks that stepping from `t0` to `t_end` by `dt` is possible and
/// bounded, without evaluating anything.
pub fn check_step(t0: f64, t_end: f64, dt: f64) -> Result<()> {
    if !t0.is_finite() || !t_end.is_finite() {
        bail!("t0 and t_end must be finite.");
    }
    if !dt.is_finite() || dt <= 0.0 {
        bail!("Step size dt must be positive.");
    }
    if t_end <= t0 {
        bail!("t_end ({t_end}) must be greater than t0 ({t0}).");
    }
    if t0 + dt <= t0 || t_end + dt <= t_end {
        bail!("Step size dt = {dt} is too small to advance t over [{t0}, {t_end}].");
    }
    let estimated = ((t_end - t0) / dt).ceil();
    if estimated > MAX_STEPS as f64 {
        bail!(
            "Integration would take about {estimated} steps; at most {MAX_STEPS} are allowed."
        );
    }
    Ok(())
}

/// Integrates dy/dt = f(y, t) from (t0, y0) until t reaches `t_end`.
///
/// Time is advanced by repeated addition of `dt`, so the last point may sit
/// past `t_end` when the interval is not a multiple of `dt`, and carries the
/// rounding drift of the additions. Stepping stops once `t` is within
/// `END_TOLERANCE * dt` of `t_end`, so drift alone never adds an extra step.
/// Errors are returned only for invalid arguments; an evaluation failure
/// truncates the trajectory and is reported through `Integration::failure`.
pub fn integrate(
    ode: &impl ScalarOde,
    t0: f64,
    y0: f64,
    t_end: f64,
    dt: f64,
) -> Result<Integration> {
    if !y0.is_finite() {
        bail!("y0 must be finite.");
    }
    check_step(t0, t_end, dt)?;
    let estimated = ((t_end - t0) / dt).ceil() as usize;

    tracing::debug!(t0, y0, t_end, dt, "starting Euler integration");

    let mut stepper = Euler;
    let capacity = estimated.saturating_add(2).min(INITIAL_CAPACITY);
    let mut trajectory = Trajectory::with_capacity(capacity);
    let mut t = t0;
    let mut y = y0;
    let mut step = 0usize;
    trajectory.push(t, y);

    let stop = t_end - dt * END_TOLERANCE;
    while t < stop {
        step += 1;
        if let Err(source) = stepper.step(ode, &mut t, &mut y, dt) {
            let failure = StepFailure { step, t, y, source };
            tracing::warn!(
                step,
                t,
                y,
                points = trajectory.len(),
                error = %failure.source,
                "Euler integration stopped early"
            );
            return Ok(Integration {
                trajectory,
                failure: Some(failure),
            });
        }
        trajectory.push(t, y);
    }

    tracing::debug!(points = trajectory.len(), t_final = t, "Euler integration finished");
    Ok(Integration {
        trajectory,
        failure: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Point;
    use approx::assert_abs_diff_eq;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn euler_step_updates_state() {
        let ode = |y: f64, _t: f64| -> Result<f64, EvalError> { Ok(y) };
        let mut t = 0.0;
        let mut y = 1.0;
        Euler.step(&ode, &mut t, &mut y, 0.5).expect("step");
        assert_eq!((t, y), (0.5, 1.5));
    }

    #[test]
    fn failed_step_leaves_state_untouched() {
        let ode = |_y: f64, _t: f64| -> Result<f64, EvalError> { Err(EvalError::DivisionByZero) };
        let mut t = 1.0;
        let mut y = 2.0;
        assert!(Euler.step(&ode, &mut t, &mut y, 0.5).is_err());
        assert_eq!((t, y), (1.0, 2.0));
    }

    #[test]
    fn exponential_growth_matches_hand_computation() {
        let ode = |y: f64, _t: f64| -> Result<f64, EvalError> { Ok(y) };
        let run = integrate(&ode, 0.0, 1.0, 1.0, 0.5).expect("integration");
        assert!(run.is_complete());
        assert_eq!(
            run.trajectory.points(),
            &[
                Point::new(0.0, 1.0),
                Point::new(0.5, 1.5),
                Point::new(1.0, 2.25)
            ]
        );
    }

    #[test]
    fn step_count_over_long_interval() {
        let ode = |y: f64, t: f64| -> Result<f64, EvalError> { Ok(-2.0 * y + t) };
        let run = integrate(&ode, 0.0, 1.0, 5.0, 0.1).expect("integration");
        assert_eq!(run.trajectory.len(), 51);
        let last = run.trajectory.last().expect("non-empty");
        assert_abs_diff_eq!(last.t, 5.0, epsilon = 1e-9);
        // Accumulated, not recomputed from the step index.
        assert_ne!(last.t.to_bits(), 5.0f64.to_bits());
    }

    #[test]
    fn accumulated_time_may_overshoot() {
        let ode = |_y: f64, _t: f64| -> Result<f64, EvalError> { Ok(0.0) };
        let run = integrate(&ode, 0.0, 0.0, 1.0, 0.3).expect("integration");
        let times = run.trajectory.times();
        assert_eq!(times.len(), 5);
        assert!(times[4] > 1.0);
        assert_abs_diff_eq!(times[4], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn failure_truncates_but_keeps_progress() {
        // Fails on the third evaluation.
        let ode = |y: f64, t: f64| -> Result<f64, EvalError> {
            if t > 0.15 {
                Err(EvalError::Domain {
                    function: "sqrt",
                    argument: -t,
                })
            } else {
                Ok(y)
            }
        };
        let run = integrate(&ode, 0.0, 1.0, 1.0, 0.1).expect("integration");
        assert_eq!(run.trajectory.len(), 3);
        let failure = run.failure.expect("failure should be reported");
        assert_eq!(failure.step, 3);
        assert_abs_diff_eq!(failure.t, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(failure.y, 1.21, epsilon = 1e-12);
    }

    #[test]
    fn failure_on_first_step_keeps_initial_point() {
        let ode = |_y: f64, _t: f64| -> Result<f64, EvalError> { Err(EvalError::DivisionByZero) };
        let run = integrate(&ode, 0.0, 4.0, 1.0, 0.1).expect("integration");
        assert_eq!(run.trajectory.points(), &[Point::new(0.0, 4.0)]);
        assert_eq!(run.failure.map(|f| f.step), Some(1));
    }

    #[test]
    fn integrate_rejects_invalid_inputs() {
        let ode = |y: f64, _t: f64| -> Result<f64, EvalError> { Ok(y) };
        assert_err_contains(integrate(&ode, 0.0, 1.0, 1.0, 0.0), "dt must be positive");
        assert_err_contains(integrate(&ode, 0.0, 1.0, 1.0, -0.1), "dt must be positive");
        assert_err_contains(integrate(&ode, 0.0, 1.0, 1.0, f64::NAN), "dt must be positive");
        assert_err_contains(integrate(&ode, 0.0, f64::NAN, 1.0, 0.1), "finite");
        assert_err_contains(integrate(&ode, 1.0, 1.0, 1.0, 0.1), "greater than t0");
        assert_err_contains(integrate(&ode, 2.0, 1.0, 1.0, 0.1), "greater than t0");
        assert_err_contains(integrate(&ode, 1e20, 1.0, 2e20, 1.0), "too small");
        assert_err_contains(integrate(&ode, 0.0, 1.0, 1e9, 1e-3), "at most");
    }

    #[test]
    fn step_check_matches_integrate() {
        assert!(check_step(0.0, 5.0, 0.1).is_ok());
        assert_err_contains(check_step(0.0, 5.0, 1e-8), "at most");
        assert_err_contains(check_step(1e20, 2e20, 1.0), "too small");
        assert_err_contains(check_step(3.0, 3.0, 0.1), "greater than t0");
    }

    #[test]
    fn long_runs_grow_past_the_initial_reservation() {
        let ode = |_y: f64, _t: f64| -> Result<f64, EvalError> { Ok(1.0) };
        let run = integrate(&ode, 0.0, 0.0, 10_000.0, 1.0).expect("integration");
        assert!(run.is_complete());
        assert_eq!(run.trajectory.len(), 10_001);
        assert_eq!(run.trajectory.last(), Some(&Point::new(10_000.0, 10_000.0)));
    }
}
