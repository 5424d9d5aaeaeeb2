use crate::config::CliConfig;
use crate::prompt::Prompter;
use crate::report::{write_sample_table, write_summary};
use anyhow::{Context, Result};
use euler_core::comparison::{run_comparison, ComparisonReport};
use euler_core::functions::{make_derivative, make_exact};
use euler_core::settings::RunSettings;
use euler_core::solvers::check_step;
use std::fs;
use std::io::{BufRead, Write};

const DT_PROMPT: &str = "Enter delta t (time step, must be > 0): ";

/// Runs one interactive session: prompts, computes, prints, exports.
pub fn run<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    config: &CliConfig,
) -> Result<ComparisonReport> {
    writeln!(prompter.output(), "=== Euler's Method vs Exact Solution ===")?;

    let derivative = make_derivative(prompter.expression(
        "f(y, t)  (derivative dy/dt)",
        "use variables y and t, e.g., -2*y + t",
    )?);
    let exact = make_exact(prompter.expression(
        "g(t)  (exact solution in terms of t)",
        "use variable t, e.g., t/2 - 0.25 + 1.25*exp(-2*t)",
    )?);

    let mut dt = prompter.positive_float(DT_PROMPT)?;
    let t0 = prompter.float("Enter start time t0 (press Enter for 0): ", Some(0.0))?;
    let t_end = prompter.float_above("Enter end time t_end (must be > t0): ", t0, "t0")?;
    // dt can only be judged against the interval, so it is re-asked here.
    while let Err(e) = check_step(t0, t_end, dt) {
        writeln!(prompter.output(), "  {e} Please choose another delta t.")?;
        dt = prompter.positive_float(DT_PROMPT)?;
    }
    let y0 = prompter.float("Enter starting value y0 at t0: ", None)?;

    let settings = RunSettings { dt, t0, t_end, y0 };
    tracing::debug!(?settings, exact_points = config.exact_points, "inputs accepted");
    let sampling = config.sampling();

    let out = prompter.output();
    writeln!(out)?;
    writeln!(out, "Computing Euler steps...")?;
    let report = run_comparison(&derivative, &exact, &settings, &sampling)?;
    writeln!(out, "  Done. Computed {} points.", report.trajectory.len())?;

    write_sample_table(out, &report.trajectory, config.table_rows)?;
    write_summary(out, &report)?;

    if let Some(path) = &config.export_path {
        let exported = serde_json::to_string_pretty(&report.view())
            .context("Failed to serialize the run.")
            .and_then(|json| {
                fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))
            });
        match exported {
            Ok(()) => writeln!(out, "Run data written to {}", path.display())?,
            Err(e) => writeln!(out, "Could not export the run: {e:#}")?,
        }
    }

    writeln!(out)?;
    writeln!(out, "Thanks for using the Euler plotter!")?;
    Ok(report)
}
