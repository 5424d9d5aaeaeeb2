//! Line-oriented prompting that re-asks until the answer is usable.

use anyhow::{bail, Result};
use euler_core::equation_engine::Expression;
use std::io::{BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("Input ended before all values were entered.");
        }
        Ok(line.trim().to_string())
    }

    /// Asks for an expression until one compiles.
    pub fn expression(&mut self, name: &str, hint: &str) -> Result<Expression> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "Enter {name}")?;
            writeln!(self.output, "  Tip: {hint}")?;
            let text = self.read_line("  >>> ")?;

            if text.is_empty() {
                writeln!(self.output, "  You did not enter anything. Please try again.")?;
                continue;
            }

            match Expression::compile(&text) {
                Ok(expression) => return Ok(expression),
                Err(e) => {
                    writeln!(self.output, "  There was a problem with your expression:")?;
                    writeln!(self.output, "    {e}")?;
                    writeln!(self.output, "  Please try again.")?;
                }
            }
        }
    }

    /// Asks for a finite number. With a default, an empty answer selects it.
    pub fn float(&mut self, prompt: &str, default: Option<f64>) -> Result<f64> {
        loop {
            let raw = self.read_line(prompt)?;
            if raw.is_empty() {
                if let Some(value) = default {
                    return Ok(value);
                }
            }
            match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => return Ok(value),
                _ => writeln!(
                    self.output,
                    "  Please enter a valid number (e.g., 0, 1.5, -2, 3.14)."
                )?,
            }
        }
    }

    pub fn positive_float(&mut self, prompt: &str) -> Result<f64> {
        loop {
            let value = self.float(prompt, None)?;
            if value <= 0.0 {
                writeln!(
                    self.output,
                    "  The value must be positive (greater than 0). Please try again."
                )?;
            } else {
                return Ok(value);
            }
        }
    }

    /// Asks until the number is strictly greater than `lower`.
    pub fn float_above(&mut self, prompt: &str, lower: f64, lower_name: &str) -> Result<f64> {
        loop {
            let value = self.float(prompt, None)?;
            if value <= lower {
                writeln!(
                    self.output,
                    "  The value must be greater than {lower_name}. Please try again."
                )?;
            } else {
                return Ok(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(prompter: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(prompter.into_output()).unwrap()
    }

    #[test]
    fn expression_reprompts_on_empty_and_invalid_input() {
        let mut p = prompter("\n2 * (y\n-2*y + t\n");
        let expr = p.expression("f(y, t)", "use y and t").unwrap();
        assert_eq!(expr.source(), "-2*y + t");

        let out = transcript(p);
        assert!(out.contains("You did not enter anything"));
        assert!(out.contains("There was a problem with your expression"));
        assert_eq!(out.matches("Enter f(y, t)").count(), 3);
    }

    #[test]
    fn float_uses_default_only_when_given() {
        let mut p = prompter("\nabc\ninf\n2.5\n");
        assert_eq!(p.float("t0: ", Some(0.0)).unwrap(), 0.0);
        assert_eq!(p.float("y0: ", None).unwrap(), 2.5);
        assert_eq!(transcript(p).matches("Please enter a valid number").count(), 2);
    }

    #[test]
    fn positive_and_lower_bounded_values() {
        let mut p = prompter("0\n-1\n0.1\n3\n4\n");
        assert_eq!(p.positive_float("dt: ").unwrap(), 0.1);
        assert_eq!(p.float_above("t_end: ", 3.0, "t0").unwrap(), 4.0);
        let out = transcript(p);
        assert_eq!(out.matches("must be positive").count(), 2);
        assert!(out.contains("must be greater than t0"));
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut p = prompter("");
        let err = p.float("dt: ", None).unwrap_err();
        assert!(err.to_string().contains("Input ended"));
    }
}
