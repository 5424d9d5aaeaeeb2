//! Error taxonomy for the expression sandbox and the numeric drivers.
//!
//! `ParseError` is raised once, when text is compiled. `EvalError` can be
//! raised by any evaluation. `StepFailure` and `SampleFailure` wrap an
//! `EvalError` with the point at which it happened so a front end can print
//! a message naming both the expression and the input.

use thiserror::Error;

/// Text is not a syntactically valid expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid number literal '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("missing ')' for '(' at position {position}")]
    UnclosedParen { position: usize },
    #[error("expression is nested too deeply at position {position}")]
    TooDeep { position: usize },
    #[error("expression is too long (more than {limit} tokens)")]
    TooLong { limit: usize },
}

/// A compiled expression failed while being evaluated.
///
/// Names outside the whitelist and the call bindings surface as
/// `UnknownName`; there is no other namespace to fall back to.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("name '{name}' is not defined")]
    UnknownName { name: String },
    #[error("'{name}' is a function and cannot be used as a number")]
    NotANumber { name: String },
    #[error("'{name}' is not a function")]
    NotCallable { name: String },
    #[error("{function}() takes {expected} argument(s) ({found} given)")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("math domain error in {function}({argument})")]
    Domain {
        function: &'static str,
        argument: f64,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("numerical result out of range in {operation}")]
    Overflow { operation: &'static str },
    #[error("expression evaluated to a non-finite value ({value})")]
    NonFinite { value: f64 },
    #[error("malformed bytecode: {0}")]
    Malformed(&'static str),
}

/// The derivative failed during an Euler step.
///
/// `step` is the 1-based index of the step that could not be taken; the
/// trajectory holds every point computed before it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("f(y, t) failed at step {step} (y = {y}, t = {t}): {source}")]
pub struct StepFailure {
    pub step: usize,
    pub t: f64,
    pub y: f64,
    #[source]
    pub source: EvalError,
}

/// What an all-or-nothing sampling pass was computing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTarget {
    ExactCurve,
    ErrorAnalysis,
}

impl std::fmt::Display for SampleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleTarget::ExactCurve => write!(f, "exact curve"),
            SampleTarget::ErrorAnalysis => write!(f, "error analysis"),
        }
    }
}

/// g(t) failed at one grid point, discarding the whole sampled result.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("g(t) failed at t = {t} while computing the {target}: {source}")]
pub struct SampleFailure {
    pub target: SampleTarget,
    pub t: f64,
    #[source]
    pub source: EvalError,
}
