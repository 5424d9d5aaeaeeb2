use euler_core::comparison::ComparisonReport;
use euler_core::curve::Trajectory;
use std::io::{self, Write};

/// Prints the first `count` (t, y) pairs of the trajectory.
pub fn write_sample_table(
    out: &mut impl Write,
    trajectory: &Trajectory,
    count: usize,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Sample of the Euler (t, y) values:")?;
    writeln!(out, "{:>12}  {:>16}", "t", "y_euler")?;
    writeln!(out, "{}", "-".repeat(31))?;

    let shown = count.min(trajectory.len());
    for point in trajectory.iter().take(shown) {
        writeln!(out, "{:12.6}  {:16.8}", point.t, point.y)?;
    }

    if trajectory.len() > shown {
        writeln!(out, "... ({} more points)", trajectory.len() - shown)?;
    }
    Ok(())
}

/// Prints every warning, the error metric and the closing echo of inputs.
pub fn write_summary(out: &mut impl Write, report: &ComparisonReport) -> io::Result<()> {
    for warning in report.warnings() {
        writeln!(out)?;
        writeln!(out, "{warning}")?;
    }

    if report.exact_curve.is_err() {
        writeln!(out, "The Euler approximation is still available.")?;
    }

    if let Ok(summary) = &report.error {
        writeln!(out)?;
        writeln!(
            out,
            "Maximum absolute error at Euler grid points ({} points): {:.6e}",
            summary.compared, summary.max_error
        )?;
    }

    writeln!(out)?;
    writeln!(out, "f(y, t) you entered:  {}", report.derivative_source)?;
    writeln!(out, "g(t) you entered:     {}", report.exact_source)?;
    Ok(())
}

/// Named `[t, y]` series for a plot window: the exact curve when it could
/// be sampled, then the Euler trajectory.
#[cfg_attr(not(feature = "plot"), allow(dead_code))]
pub fn plot_series(report: &ComparisonReport) -> Vec<(String, Vec<[f64; 2]>)> {
    let mut series = Vec::with_capacity(2);
    if let Ok(curve) = &report.exact_curve {
        series.push((
            format!("Exact g(t) = {}", report.exact_source),
            curve.points().iter().map(|p| [p.t, p.y]).collect(),
        ));
    }
    series.push((
        format!("Euler (dt = {})", report.settings.dt),
        report.trajectory.iter().map(|p| [p.t, p.y]).collect(),
    ));
    series
}
