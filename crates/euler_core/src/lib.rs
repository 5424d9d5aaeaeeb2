pub mod analysis;
pub mod comparison;
pub mod curve;
pub mod environment;
pub mod equation_engine;
pub mod error;
pub mod functions;
pub mod sampling;
pub mod settings;
pub mod solvers;
/// The `euler_core` crate provides the numeric engine behind Euler Plot.
/// It compiles user-typed formulas, integrates dy/dt = f(y, t) with the
/// explicit Euler method and compares the result against an exact g(t).
///
/// Key components:
/// - **Equation Engine**: Tokenizer, parser and bytecode VM for sandboxed expressions.
/// - **Environment**: The whitelist of constants and math functions an expression may use.
/// - **Functions**: `Derivative` (f(y, t)) and `ExactSolution` (g(t)) adapters.
/// - **Solvers**: The `Euler` stepper and the `integrate` driver with partial-failure results.
/// - **Sampling / Analysis**: Exact-curve sampling and maximum absolute error.
/// - **Comparison**: A full run bundled into a `ComparisonReport`.
pub mod traits;

pub use comparison::{run_comparison, ComparisonReport, ReportView};
pub use equation_engine::{compile, evaluate, Expression};
pub use error::{EvalError, ParseError, SampleFailure, StepFailure};
pub use functions::{make_derivative, make_exact, Derivative, ExactSolution};
pub use sampling::SamplingSettings;
pub use settings::RunSettings;
