//! Compiled derivative/exact pair and the run entry point.

use euler_core::comparison::{run_comparison, ReportView};
use euler_core::equation_engine::Expression;
use euler_core::functions::{Derivative, ExactSolution};
use euler_core::sampling::SamplingSettings;
use euler_core::settings::RunSettings;
use euler_core::traits::{ScalarCurve, ScalarOde};
use js_sys::Float64Array;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmEulerProblem {
    derivative: Derivative,
    exact: ExactSolution,
}

pub(crate) fn compile_labeled(label: &str, text: &str) -> Result<Expression, String> {
    Expression::compile(text).map_err(|e| format!("There was a problem with {label}: {e}"))
}

pub(crate) fn build_view(
    derivative: &Derivative,
    exact: &ExactSolution,
    settings: RunSettings,
    exact_points: u32,
) -> anyhow::Result<ReportView> {
    let sampling = SamplingSettings {
        exact_points: exact_points as usize,
    };
    let report = run_comparison(derivative, exact, &settings, &sampling)?;
    Ok(report.view())
}

#[wasm_bindgen]
impl WasmEulerProblem {
    #[wasm_bindgen(constructor)]
    pub fn new(derivative: &str, exact: &str) -> Result<WasmEulerProblem, JsValue> {
        console_error_panic_hook::set_once();

        let derivative =
            compile_labeled("f(y, t)", derivative).map_err(|e| JsValue::from_str(&e))?;
        let exact = compile_labeled("g(t)", exact).map_err(|e| JsValue::from_str(&e))?;

        Ok(WasmEulerProblem {
            derivative: Derivative::new(derivative),
            exact: ExactSolution::new(exact),
        })
    }

    pub fn derivative_source(&self) -> String {
        self.derivative.expression().source().to_string()
    }

    pub fn exact_source(&self) -> String {
        self.exact.expression().source().to_string()
    }

    pub fn evaluate_derivative(&self, y: f64, t: f64) -> Result<f64, JsValue> {
        self.derivative
            .slope(y, t)
            .map_err(|e| JsValue::from_str(&format!("f(y, t) failed at y={y}, t={t}: {e}")))
    }

    pub fn evaluate_exact(&self, t: f64) -> Result<f64, JsValue> {
        self.exact
            .value(t)
            .map_err(|e| JsValue::from_str(&format!("g(t) failed at t={t}: {e}")))
    }

    /// g(t) at each requested time, failing as a whole on the first error.
    pub fn evaluate_exact_many(&self, times: &[f64]) -> Result<Float64Array, JsValue> {
        let mut values = Vec::with_capacity(times.len());
        for &t in times {
            values.push(self.evaluate_exact(t)?);
        }
        Ok(Float64Array::from(values.as_slice()))
    }

    /// Runs the comparison and returns a `ReportView` as a JS object.
    pub fn run(
        &self,
        dt: f64,
        t0: f64,
        t_end: f64,
        y0: f64,
        exact_points: u32,
    ) -> Result<JsValue, JsValue> {
        let settings = RunSettings { dt, t0, t_end, y0 };
        let view = build_view(&self.derivative, &self.exact, settings, exact_points)
            .map_err(|e| JsValue::from_str(&format!("Euler run failed: {e:#}")))?;
        to_value(&view).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

/// Returns `None` when `text` compiles, otherwise a message for the user.
#[wasm_bindgen]
pub fn check_expression(text: &str) -> Option<String> {
    Expression::compile(text).err().map(|e| e.to_string())
}
