use crate::error::EvalError;

/// A scalar first-order ODE dy/dt = f(y, t).
pub trait ScalarOde {
    /// Evaluates the slope at (y, t).
    fn slope(&self, y: f64, t: f64) -> Result<f64, EvalError>;
}

/// A scalar function of time, typically the exact solution g(t).
pub trait ScalarCurve {
    fn value(&self, t: f64) -> Result<f64, EvalError>;
}

impl<F> ScalarOde for F
where
    F: Fn(f64, f64) -> Result<f64, EvalError>,
{
    fn slope(&self, y: f64, t: f64) -> Result<f64, EvalError> {
        self(y, t)
    }
}

impl<F> ScalarCurve for F
where
    F: Fn(f64) -> Result<f64, EvalError>,
{
    fn value(&self, t: f64) -> Result<f64, EvalError> {
        self(t)
    }
}

/// A solver that advances a scalar ODE by one fixed step.
pub trait Steppable {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// y: current state (updated after step)
    ///
    /// On failure neither `t` nor `y` is modified.
    fn step(&mut self, ode: &impl ScalarOde, t: &mut f64, y: &mut f64, dt: f64)
        -> Result<(), EvalError>;
}
