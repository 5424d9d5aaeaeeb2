//! Adapters turning a compiled `Expression` into the scalar functions the
//! integrator and samplers consume.
//!
//! Each call re-evaluates the expression from scratch against the
//! whitelist, so repeated calls with equal arguments give equal results.

use crate::environment::Environment;
use crate::equation_engine::Expression;
use crate::error::EvalError;
use crate::traits::{ScalarCurve, ScalarOde};

/// The derivative f(y, t), with `y` and `t` bound on every call.
#[derive(Debug, Clone)]
pub struct Derivative {
    expression: Expression,
    env: Environment,
}

impl Derivative {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            env: Environment::whitelist(),
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl ScalarOde for Derivative {
    fn slope(&self, y: f64, t: f64) -> Result<f64, EvalError> {
        self.expression.evaluate_in(&self.env, &[("y", y), ("t", t)])
    }
}

/// The exact solution g(t), with `t` bound on every call.
#[derive(Debug, Clone)]
pub struct ExactSolution {
    expression: Expression,
    env: Environment,
}

impl ExactSolution {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            env: Environment::whitelist(),
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl ScalarCurve for ExactSolution {
    fn value(&self, t: f64) -> Result<f64, EvalError> {
        self.expression.evaluate_in(&self.env, &[("t", t)])
    }
}

pub fn make_derivative(expression: Expression) -> Derivative {
    Derivative::new(expression)
}

pub fn make_exact(expression: Expression) -> ExactSolution {
    ExactSolution::new(expression)
}
