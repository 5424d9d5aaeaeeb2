use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Inputs of one Euler run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub dt: f64,
    pub t0: f64,
    pub t_end: f64,
    pub y0: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dt: 0.1,
            t0: 0.0,
            t_end: 5.0,
            y0: 1.0,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || !self.t0.is_finite() || !self.t_end.is_finite() {
            bail!("dt, t0 and t_end must be finite.");
        }
        if !self.y0.is_finite() {
            bail!("y0 must be finite.");
        }
        if self.dt <= 0.0 {
            bail!("Step size dt must be positive.");
        }
        if self.t_end <= self.t0 {
            bail!(
                "t_end ({}) must be greater than t0 ({}).",
                self.t_end,
                self.t0
            );
        }
        Ok(())
    }
}
