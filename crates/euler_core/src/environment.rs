use crate::error::EvalError;
use std::collections::HashMap;
use std::f64::consts::{E, PI};

/// Functions callable from a sandboxed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Exp,
    Log,
    Log10,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    Fabs,
    Abs,
    Pow,
    Min,
    Max,
}

enum Arity {
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }

    fn describe(&self) -> &'static str {
        match *self {
            Arity::Exactly(1) => "exactly 1",
            Arity::Exactly(_) => "exactly 2",
            Arity::Between(..) => "1 or 2",
            Arity::AtLeast(_) => "at least 2",
        }
    }
}

impl MathFn {
    pub const ALL: [MathFn; 20] = [
        MathFn::Sin,
        MathFn::Cos,
        MathFn::Tan,
        MathFn::Asin,
        MathFn::Acos,
        MathFn::Atan,
        MathFn::Sqrt,
        MathFn::Exp,
        MathFn::Log,
        MathFn::Log10,
        MathFn::Sinh,
        MathFn::Cosh,
        MathFn::Tanh,
        MathFn::Floor,
        MathFn::Ceil,
        MathFn::Fabs,
        MathFn::Abs,
        MathFn::Pow,
        MathFn::Min,
        MathFn::Max,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Asin => "asin",
            MathFn::Acos => "acos",
            MathFn::Atan => "atan",
            MathFn::Sqrt => "sqrt",
            MathFn::Exp => "exp",
            MathFn::Log => "log",
            MathFn::Log10 => "log10",
            MathFn::Sinh => "sinh",
            MathFn::Cosh => "cosh",
            MathFn::Tanh => "tanh",
            MathFn::Floor => "floor",
            MathFn::Ceil => "ceil",
            MathFn::Fabs => "fabs",
            MathFn::Abs => "abs",
            MathFn::Pow => "pow",
            MathFn::Min => "min",
            MathFn::Max => "max",
        }
    }

    fn arity(self) -> Arity {
        match self {
            MathFn::Log => Arity::Between(1, 2),
            MathFn::Pow => Arity::Exactly(2),
            MathFn::Min | MathFn::Max => Arity::AtLeast(2),
            _ => Arity::Exactly(1),
        }
    }

    /// Applies the function, reporting domain and range failures instead of
    /// returning NaN or an infinity produced from finite input.
    pub fn call(self, args: &[f64]) -> Result<f64, EvalError> {
        let arity = self.arity();
        if !arity.accepts(args.len()) {
            return Err(EvalError::Arity {
                function: self.name(),
                expected: arity.describe(),
                found: args.len(),
            });
        }

        let x = args[0];
        let domain = |argument: f64| EvalError::Domain {
            function: self.name(),
            argument,
        };

        let value = match self {
            MathFn::Sin => x.sin(),
            MathFn::Cos => x.cos(),
            MathFn::Tan => x.tan(),
            MathFn::Asin | MathFn::Acos if x.abs() > 1.0 => return Err(domain(x)),
            MathFn::Asin => x.asin(),
            MathFn::Acos => x.acos(),
            MathFn::Atan => x.atan(),
            MathFn::Sqrt if x < 0.0 => return Err(domain(x)),
            MathFn::Sqrt => x.sqrt(),
            MathFn::Exp => x.exp(),
            MathFn::Log | MathFn::Log10 if x <= 0.0 => return Err(domain(x)),
            MathFn::Log => match args.get(1) {
                None => x.ln(),
                Some(&base) if base <= 0.0 => return Err(domain(base)),
                Some(&base) if base == 1.0 => return Err(EvalError::DivisionByZero),
                Some(&base) => x.ln() / base.ln(),
            },
            MathFn::Log10 => x.log10(),
            MathFn::Sinh => x.sinh(),
            MathFn::Cosh => x.cosh(),
            MathFn::Tanh => x.tanh(),
            MathFn::Floor | MathFn::Ceil if !x.is_finite() => return Err(domain(x)),
            MathFn::Floor => x.floor(),
            MathFn::Ceil => x.ceil(),
            MathFn::Fabs | MathFn::Abs => x.abs(),
            MathFn::Pow => {
                let exponent = args[1];
                if x == 0.0 && exponent < 0.0 {
                    return Err(domain(x));
                }
                if x < 0.0 && exponent.fract() != 0.0 && exponent.is_finite() {
                    return Err(domain(x));
                }
                x.powf(exponent)
            }
            MathFn::Min => args[1..].iter().fold(x, |acc, &v| if v < acc { v } else { acc }),
            MathFn::Max => args[1..].iter().fold(x, |acc, &v| if v > acc { v } else { acc }),
        };

        check_result(self.name(), args, value)
    }
}

fn check_result(operation: &'static str, args: &[f64], value: f64) -> Result<f64, EvalError> {
    if value.is_nan() && !args.iter().any(|a| a.is_nan()) {
        return Err(EvalError::Domain {
            function: operation,
            argument: args[0],
        });
    }
    if value.is_infinite() && args.iter().all(|a| a.is_finite()) {
        return Err(EvalError::Overflow { operation });
    }
    Ok(value)
}

/// The `**` operator: like `pow()`, except that a zero base with a negative
/// exponent is a division by zero.
pub(crate) fn power(base: f64, exponent: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 && exponent.is_finite() {
        return Err(EvalError::Domain {
            function: "**",
            argument: base,
        });
    }
    check_result("**", &[base, exponent], base.powf(exponent))
}

/// What a name resolves to inside an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    Constant(f64),
    Function(MathFn),
}

/// The fixed set of names an expression may use besides its bindings.
///
/// Built by `whitelist()` and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Environment {
    entries: HashMap<&'static str, Entry>,
}

impl Environment {
    pub fn whitelist() -> Self {
        let mut entries = HashMap::with_capacity(MathFn::ALL.len() + 2);
        entries.insert("pi", Entry::Constant(PI));
        entries.insert("e", Entry::Constant(E));
        for func in MathFn::ALL {
            entries.insert(func.name(), Entry::Function(func));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<Entry> {
        self.entries.get(name).copied()
    }

    /// Whitelisted names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::whitelist()
    }
}

/// Per-call view of the whitelist with the bound variables layered on top.
///
/// Bindings shadow whitelist entries of the same name. A name found in
/// neither is undefined.
pub struct Scope<'a> {
    env: &'a Environment,
    bindings: &'a [(&'a str, f64)],
}

impl<'a> Scope<'a> {
    pub fn new(env: &'a Environment, bindings: &'a [(&'a str, f64)]) -> Self {
        Self { env, bindings }
    }

    pub fn lookup(&self, name: &str) -> Option<Entry> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .map(|&(_, value)| Entry::Constant(value))
            .or_else(|| self.env.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn whitelist_contains_exactly_the_documented_names() {
        let env = Environment::whitelist();
        assert_eq!(
            env.names(),
            vec![
                "abs", "acos", "asin", "atan", "ceil", "cos", "cosh", "e", "exp", "fabs", "floor",
                "log", "log10", "max", "min", "pi", "pow", "sin", "sinh", "sqrt", "tan", "tanh",
            ]
        );
        assert!(env.get("__import__").is_none());
        assert!(env.get("open").is_none());
    }

    #[test]
    fn bindings_shadow_whitelist_entries() {
        let env = Environment::whitelist();
        let bindings = [("e", 2.0), ("t", 0.5)];
        let scope = Scope::new(&env, &bindings);
        assert_eq!(scope.lookup("e"), Some(Entry::Constant(2.0)));
        assert_eq!(scope.lookup("t"), Some(Entry::Constant(0.5)));
        assert_eq!(scope.lookup("sin"), Some(Entry::Function(MathFn::Sin)));
        assert_eq!(scope.lookup("z"), None);
    }

    #[test]
    fn domain_errors_are_reported() {
        assert!(matches!(
            MathFn::Sqrt.call(&[-1.0]),
            Err(EvalError::Domain { function: "sqrt", .. })
        ));
        assert!(matches!(
            MathFn::Log.call(&[0.0]),
            Err(EvalError::Domain { function: "log", .. })
        ));
        assert!(matches!(
            MathFn::Log10.call(&[-3.0]),
            Err(EvalError::Domain { .. })
        ));
        assert!(matches!(MathFn::Asin.call(&[1.5]), Err(EvalError::Domain { .. })));
        assert!(matches!(
            MathFn::Pow.call(&[-8.0, 1.0 / 3.0]),
            Err(EvalError::Domain { .. })
        ));
        assert!(matches!(
            MathFn::Log.call(&[8.0, 1.0]),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(
            MathFn::Exp.call(&[1000.0]),
            Err(EvalError::Overflow { operation: "exp" })
        ));
        assert!(matches!(
            power(10.0, 400.0),
            Err(EvalError::Overflow { operation: "**" })
        ));
    }

    #[test]
    fn arity_is_checked() {
        assert!(matches!(
            MathFn::Sin.call(&[1.0, 2.0]),
            Err(EvalError::Arity { function: "sin", found: 2, .. })
        ));
        assert!(matches!(
            MathFn::Max.call(&[1.0]),
            Err(EvalError::Arity { function: "max", .. })
        ));
    }

    #[test]
    fn variadic_and_two_argument_functions() {
        assert_eq!(MathFn::Min.call(&[3.0, -1.0, 2.0]), Ok(-1.0));
        assert_eq!(MathFn::Max.call(&[3.0, -1.0, 7.5]), Ok(7.5));
        assert_relative_eq!(MathFn::Log.call(&[8.0, 2.0]).unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(MathFn::Pow.call(&[-2.0, 3.0]), Ok(-8.0));
    }

    #[test]
    fn power_operator_rules() {
        assert_eq!(power(0.0, -1.0), Err(EvalError::DivisionByZero));
        assert_eq!(power(2.0, -1.0), Ok(0.5));
        assert!(matches!(power(-4.0, 0.5), Err(EvalError::Domain { .. })));
    }
}
