//! WASM bindings for the Euler Plot core.
//!
//! The browser front end owns prompting and plotting; this crate hands it
//! compiled expressions and plain-data run results.

mod problem;

pub use problem::{check_expression, WasmEulerProblem};
