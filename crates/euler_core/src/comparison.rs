//! Runs the full comparison: Euler trajectory, exact curve and error metric.
//!
//! Only invalid settings abort a run. Evaluation failures are recorded in
//! the report so the caller can still present whatever was computed.

use crate::analysis::{max_abs_error, ErrorSummary};
use crate::curve::{ExactCurve, Trajectory};
use crate::error::{SampleFailure, StepFailure};
use crate::functions::{Derivative, ExactSolution};
use crate::sampling::{sample_exact, SamplingSettings};
use crate::settings::RunSettings;
use crate::solvers::integrate;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub derivative_source: String,
    pub exact_source: String,
    pub settings: RunSettings,
    pub trajectory: Trajectory,
    pub truncation: Option<StepFailure>,
    pub exact_curve: Result<ExactCurve, SampleFailure>,
    pub error: Result<ErrorSummary, SampleFailure>,
}

pub fn run_comparison(
    derivative: &Derivative,
    exact: &ExactSolution,
    settings: &RunSettings,
    sampling: &SamplingSettings,
) -> Result<ComparisonReport> {
    settings.validate().context("Invalid run settings.")?;
    sampling.validate().context("Invalid sampling settings.")?;

    let integration = integrate(
        derivative,
        settings.t0,
        settings.y0,
        settings.t_end,
        settings.dt,
    )
    .context("Euler integration could not start.")?;

    let exact_curve = sample_exact(exact, settings.t0, settings.t_end, sampling.exact_points);
    if let Err(failure) = &exact_curve {
        tracing::warn!(
            expression = exact.expression().source(),
            t = failure.t,
            error = %failure.source,
            "omitting exact curve"
        );
    }

    let error = max_abs_error(exact, &integration.trajectory);
    if let Err(failure) = &error {
        tracing::warn!(
            expression = exact.expression().source(),
            t = failure.t,
            error = %failure.source,
            "omitting maximum error"
        );
    }

    Ok(ComparisonReport {
        derivative_source: derivative.expression().source().to_string(),
        exact_source: exact.expression().source().to_string(),
        settings: *settings,
        trajectory: integration.trajectory,
        truncation: integration.failure,
        exact_curve,
        error,
    })
}

impl ComparisonReport {
    /// One line per failure, naming the expression and the failing input.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(failure) = &self.truncation {
            warnings.push(format!(
                "Stopped the Euler computation early: f(y, t) = {} failed at y = {}, t = {} (step {}): {}",
                self.derivative_source, failure.y, failure.t, failure.step, failure.source
            ));
        }
        if let Err(failure) = &self.exact_curve {
            warnings.push(format!(
                "Could not generate the exact curve: g(t) = {} failed at t = {}: {}",
                self.exact_source, failure.t, failure.source
            ));
        }
        if let Err(failure) = &self.error {
            warnings.push(format!(
                "Could not compute the maximum error: g(t) = {} failed at t = {}: {}",
                self.exact_source, failure.t, failure.source
            ));
        }
        warnings
    }

    pub fn view(&self) -> ReportView {
        ReportView {
            derivative: self.derivative_source.clone(),
            exact: self.exact_source.clone(),
            settings: self.settings,
            trajectory: SeriesView {
                t: self.trajectory.times(),
                y: self.trajectory.values(),
            },
            exact_curve: self.exact_curve.as_ref().ok().map(|curve| SeriesView {
                t: curve.times(),
                y: curve.values(),
            }),
            max_error: self.error.as_ref().ok().copied(),
            warnings: self.warnings(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}

/// Plain-data form of a report, for plotting front ends and JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub derivative: String,
    pub exact: String,
    pub settings: RunSettings,
    pub trajectory: SeriesView,
    pub exact_curve: Option<SeriesView>,
    pub max_error: Option<ErrorSummary>,
    pub warnings: Vec<String>,
}
