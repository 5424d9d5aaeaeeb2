use crate::environment::{power, Entry, Environment, Scope};
use crate::error::{EvalError, ParseError};
use std::collections::HashMap;
use std::str::FromStr;

/// OpCodes for the stack-based virtual machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Resolves the name in slot `idx` against the scope and pushes its value.
    LoadName(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ** b).
    Pow,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops `argc` arguments and calls the function named in slot `name`.
    Call { name: usize, argc: usize },
}

/// A compiled sequence of operations plus the names it refers to.
///
/// Names are kept as text until evaluation; the bytecode itself carries no
/// reference to any namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    pub names: Vec<String>,
}

/// Stack-based virtual machine for evaluating compiled expressions.
///
/// Every name is resolved through the supplied `Scope`, which is the only
/// source of values and functions the VM can reach.
pub struct VM;

impl VM {
    pub fn execute(
        bytecode: &Bytecode,
        scope: &Scope<'_>,
        stack: &mut Vec<f64>,
    ) -> Result<f64, EvalError> {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(value) => stack.push(value),
                OpCode::LoadName(idx) => {
                    let name = name_at(bytecode, idx)?;
                    match scope.lookup(name) {
                        Some(Entry::Constant(value)) => stack.push(value),
                        Some(Entry::Function(_)) => {
                            return Err(EvalError::NotANumber {
                                name: name.to_string(),
                            })
                        }
                        None => {
                            return Err(EvalError::UnknownName {
                                name: name.to_string(),
                            })
                        }
                    }
                }
                OpCode::Add => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack)?;
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    stack.push(a / b);
                }
                OpCode::Pow => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(power(a, b)?);
                }
                OpCode::Neg => {
                    let a = stack.pop().ok_or(EvalError::Malformed("stack underflow"))?;
                    stack.push(-a);
                }
                OpCode::Call { name, argc } => {
                    let name = name_at(bytecode, name)?;
                    let start = stack
                        .len()
                        .checked_sub(argc)
                        .ok_or(EvalError::Malformed("stack underflow"))?;
                    let value = match scope.lookup(name) {
                        Some(Entry::Function(func)) => func.call(&stack[start..])?,
                        Some(Entry::Constant(_)) => {
                            return Err(EvalError::NotCallable {
                                name: name.to_string(),
                            })
                        }
                        None => {
                            return Err(EvalError::UnknownName {
                                name: name.to_string(),
                            })
                        }
                    };
                    stack.truncate(start);
                    stack.push(value);
                }
            }
        }

        let result = stack.pop().ok_or(EvalError::Malformed("empty program"))?;
        if !stack.is_empty() {
            return Err(EvalError::Malformed("values left on stack"));
        }
        if !result.is_finite() {
            return Err(EvalError::NonFinite { value: result });
        }
        Ok(result)
    }
}

fn name_at(bytecode: &Bytecode, idx: usize) -> Result<&str, EvalError> {
    bytecode
        .names
        .get(idx)
        .map(String::as_str)
        .ok_or(EvalError::Malformed("name slot out of range"))
}

fn pop_pair(stack: &mut Vec<f64>) -> Result<(f64, f64), EvalError> {
    let b = stack.pop().ok_or(EvalError::Malformed("stack underflow"))?;
    let a = stack.pop().ok_or(EvalError::Malformed("stack underflow"))?;
    Ok((a, b))
}

// --- AST & Compiler ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Lowers an AST into `Bytecode`, interning each distinct name into a slot.
#[derive(Default)]
pub struct Compiler {
    slots: HashMap<String, usize>,
    names: Vec<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(mut self, expr: &Expr) -> Bytecode {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops);
        Bytecode {
            ops,
            names: self.names,
        }
    }

    fn slot(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.slots.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.slots.insert(name.to_string(), idx);
        idx
    }

    fn compile_recursive(&mut self, expr: &Expr, ops: &mut Vec<OpCode>) {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Name(name) => {
                let idx = self.slot(name);
                ops.push(OpCode::LoadName(idx));
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops);
                ops.push(OpCode::Neg);
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops);
                self.compile_recursive(right, ops);
                ops.push(match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Pow => OpCode::Pow,
                });
            }
            Expr::Call(func, args) => {
                for arg in args {
                    self.compile_recursive(arg, ops);
                }
                let name = self.slot(func);
                ops.push(OpCode::Call {
                    name,
                    argc: args.len(),
                });
            }
        }
    }
}

// --- Parser ---

/// Deepest nesting of parentheses, calls, signs and exponents accepted.
pub const MAX_DEPTH: usize = 200;

/// Longest expression accepted, counted in tokens.
pub const MAX_TOKENS: usize = 1000;

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(token.unexpected()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    position: usize,
}

impl Spanned {
    fn unexpected(&self) -> ParseError {
        let found = match &self.token {
            Token::Number(n) => format!("number {n}"),
            Token::Identifier(name) => format!("name '{name}'"),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::DoubleStar => "'**'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        };
        ParseError::UnexpectedToken {
            found,
            position: self.position,
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(&(idx, marker)) = chars.peek() {
                if marker == 'e' || marker == 'E' {
                    let rest = &input[idx + 1..];
                    let digits_at = usize::from(rest.starts_with(|ch: char| ch == '+' || ch == '-'));
                    if rest[digits_at..].starts_with(|ch: char| ch.is_ascii_digit()) {
                        literal.push(marker);
                        chars.next();
                        if digits_at == 1 {
                            if let Some((_, sign)) = chars.next() {
                                literal.push(sign);
                            }
                        }
                        while let Some(&(_, d)) = chars.peek() {
                            if d.is_ascii_digit() {
                                literal.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
            }
            if literal == "." {
                return Err(ParseError::UnexpectedChar { ch: '.', position });
            }
            let value = literal
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    literal: literal.clone(),
                    position,
                })?;
            tokens.push(Spanned {
                token: Token::Number(value),
                position,
            });
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Spanned {
                token: Token::Identifier(ident),
                position,
            });
        } else {
            chars.next();
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => {
                    if let Some(&(_, '*')) = chars.peek() {
                        chars.next();
                        Token::DoubleStar
                    } else {
                        Token::Star
                    }
                }
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                _ => return Err(ParseError::UnexpectedChar { ch: c, position }),
            };
            tokens.push(Spanned { token, position });
        }
        if tokens.len() > MAX_TOKENS {
            return Err(ParseError::TooLong { limit: MAX_TOKENS });
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|spanned| &spanned.token)
    }

    fn consume(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn expect_close(&mut self, open_position: usize) -> Result<(), ParseError> {
        match self.consume() {
            Some(Spanned {
                token: Token::RParen,
                ..
            }) => Ok(()),
            Some(other) => Err(other.unexpected()),
            None => Err(ParseError::UnclosedParen {
                position: open_position,
            }),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_product()?;

        while let Some(token) = self.peek_token() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek_token() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Every level of nesting passes through here, so this is where depth is
    // bounded.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            let position = self
                .peek()
                .or_else(|| self.tokens.last())
                .map_or(0, |spanned| spanned.position);
            return Err(ParseError::TooDeep { position });
        }
        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    fn parse_signed(&mut self) -> Result<Expr, ParseError> {
        match self.peek_token() {
            Some(Token::Minus) => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // The exponent is parsed as a unary so that `2**-1` works and `2**3**2`
    // groups to the right.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        match self.peek_token() {
            Some(Token::DoubleStar | Token::Caret) => {
                self.consume();
                let exponent = self.parse_unary()?;
                Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)))
            }
            _ => Ok(base),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let spanned = self.consume().ok_or(ParseError::UnexpectedEnd)?;
        match &spanned.token {
            Token::Number(n) => Ok(Expr::Number(*n)),
            Token::Identifier(name) => {
                if let Some(Token::LParen) = self.peek_token() {
                    let open = self.consume().map_or(spanned.position, |s| s.position);
                    let args = self.parse_arguments(open)?;
                    Ok(Expr::Call(name.clone(), args))
                } else {
                    Ok(Expr::Name(name.clone()))
                }
            }
            Token::LParen => {
                let expr = self.parse_sum()?;
                self.expect_close(spanned.position)?;
                Ok(expr)
            }
            _ => Err(spanned.unexpected()),
        }
    }

    fn parse_arguments(&mut self, open_position: usize) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        loop {
            if let Some(Token::RParen) = self.peek_token() {
                self.consume();
                return Ok(args);
            }
            args.push(self.parse_sum()?);
            match self.peek_token() {
                Some(Token::Comma) => {
                    self.consume();
                }
                Some(_) | None => {
                    self.expect_close(open_position)?;
                    return Ok(args);
                }
            }
        }
    }
}

// --- Expression ---

/// User-supplied text together with its compiled form.
///
/// Compiling checks syntax only; whether each name is defined is decided
/// when the expression is evaluated against a `Scope`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    bytecode: Bytecode,
}

impl Expression {
    pub fn compile(text: &str) -> Result<Self, ParseError> {
        let ast = parse(text)?;
        let bytecode = Compiler::new().compile(&ast);
        tracing::debug!(source = text, ops = bytecode.ops.len(), "compiled expression");
        Ok(Self {
            source: text.trim().to_string(),
            bytecode,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Names referenced by the expression, in order of first appearance.
    pub fn names(&self) -> &[String] {
        &self.bytecode.names
    }

    /// Evaluates against `env` with `bindings` layered on top.
    pub fn evaluate_in(
        &self,
        env: &Environment,
        bindings: &[(&str, f64)],
    ) -> Result<f64, EvalError> {
        let scope = Scope::new(env, bindings);
        let mut stack = Vec::with_capacity(16);
        VM::execute(&self.bytecode, &scope, &mut stack)
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

/// Compiles `text` into an `Expression`.
pub fn compile(text: &str) -> Result<Expression, ParseError> {
    Expression::compile(text)
}

/// Evaluates `compiled` against a freshly built whitelist plus `bindings`.
pub fn evaluate(compiled: &Expression, bindings: &[(&str, f64)]) -> Result<f64, EvalError> {
    compiled.evaluate_in(&Environment::whitelist(), bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(text: &str, bindings: &[(&str, f64)]) -> Result<f64, EvalError> {
        evaluate(&compile(text).expect("expression should compile"), bindings)
    }

    #[test]
    fn evaluates_arithmetic_with_bindings() {
        assert_eq!(eval("2*y+t", &[("y", 3.0), ("t", 1.0)]), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3 - 4 / 2", &[]), Ok(7.0));
        assert_eq!(eval("-y + +t", &[("y", 2.0), ("t", 5.0)]), Ok(3.0));
    }

    #[test]
    fn power_precedence_and_associativity() {
        assert_eq!(eval("-2**2", &[]), Ok(-4.0));
        assert_eq!(eval("2**-1", &[]), Ok(0.5));
        assert_eq!(eval("2**3**2", &[]), Ok(512.0));
        assert_eq!(eval("2^3", &[]), Ok(8.0));
        assert_eq!(eval("3*2**2", &[]), Ok(12.0));
    }

    #[test]
    fn number_literals() {
        assert_eq!(eval(".5 + 5.", &[]), Ok(5.5));
        assert_eq!(eval("1e-3 * 2E+3", &[]), Ok(2.0));
        assert_relative_eq!(eval("2.5e1", &[]).unwrap(), 25.0);
    }

    #[test]
    fn whitelisted_functions_and_constants() {
        let value = eval("t - 0.5 + 0.5*exp(-2*t)", &[("t", 1.0)]).unwrap();
        assert_relative_eq!(value, 0.5 + 0.5 * (-2.0f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(eval("sin(pi/2)", &[]).unwrap(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(eval("log(e)", &[]).unwrap(), 1.0, epsilon = 1e-15);
        assert_eq!(eval("max(1, 4, 2,)", &[]), Ok(4.0));
        assert_eq!(eval("pow(2, 10)", &[]), Ok(1024.0));
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert_eq!(compile("   "), Err(ParseError::Empty));
        assert_eq!(compile("2 +"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(
            compile("(1 + 2"),
            Err(ParseError::UnclosedParen { position: 0 })
        ));
        assert!(matches!(
            compile("os.system('x')"),
            Err(ParseError::UnexpectedChar { ch: '.', position: 2 })
        ));
        assert!(matches!(
            compile("2 t"),
            Err(ParseError::UnexpectedToken { position: 2, .. })
        ));
        assert!(matches!(
            compile("y = 3"),
            Err(ParseError::UnexpectedChar { ch: '=', .. })
        ));
        assert!(matches!(compile("1..2"), Err(ParseError::InvalidNumber { .. })));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(compile(&nested), Err(ParseError::TooLong { .. })));

        let nested = format!("{}y{}", "(".repeat(MAX_DEPTH + 50), ")".repeat(MAX_DEPTH + 50));
        assert!(matches!(compile(&nested), Err(ParseError::TooDeep { .. })));

        let signs = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(matches!(compile(&signs), Err(ParseError::TooDeep { .. })));

        let calls = format!("{}t{}", "sin(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(matches!(compile(&calls), Err(ParseError::TooDeep { .. })));

        let nested = format!("{}y{}", "(".repeat(150), ")".repeat(150));
        assert_eq!(eval(&nested, &[("y", 2.5)]), Ok(2.5));
    }

    #[test]
    fn long_flat_chains_are_rejected() {
        let chain = format!("{}1", "1+".repeat(200_000));
        assert_eq!(
            compile(&chain),
            Err(ParseError::TooLong { limit: MAX_TOKENS })
        );

        let chain = format!("{}1", "1+".repeat(400));
        assert_eq!(eval(&chain, &[]), Ok(401.0));
    }

    #[test]
    fn undefined_names_are_eval_errors() {
        assert_eq!(
            eval("z", &[]),
            Err(EvalError::UnknownName {
                name: "z".to_string()
            })
        );
        assert_eq!(
            eval("__import__(y)", &[("y", 1.0)]),
            Err(EvalError::UnknownName {
                name: "__import__".to_string()
            })
        );
        // `t` is not bound for a derivative evaluated with `y` only.
        assert!(matches!(
            eval("y + t", &[("y", 1.0)]),
            Err(EvalError::UnknownName { .. })
        ));
    }

    #[test]
    fn type_errors_are_eval_errors() {
        assert!(matches!(
            eval("sin + 1", &[]),
            Err(EvalError::NotANumber { .. })
        ));
        assert!(matches!(
            eval("y(2)", &[("y", 1.0)]),
            Err(EvalError::NotCallable { .. })
        ));
        assert!(matches!(eval("sin()", &[]), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn runtime_failures_are_eval_errors() {
        assert_eq!(eval("1/(t-1)", &[("t", 1.0)]), Err(EvalError::DivisionByZero));
        assert!(matches!(
            eval("sqrt(y)", &[("y", -1.0)]),
            Err(EvalError::Domain { function: "sqrt", .. })
        ));
        assert!(matches!(
            eval("1e308 * 10", &[]),
            Err(EvalError::NonFinite { .. })
        ));
    }

    #[test]
    fn compiler_interns_names() {
        let expr = compile("y*y + t*sin(t)").unwrap();
        assert_eq!(expr.names(), ["y", "t", "sin"]);
        assert_eq!(expr.source(), "y*y + t*sin(t)");
        assert!(expr
            .bytecode()
            .ops
            .contains(&OpCode::Call { name: 2, argc: 1 }));
    }

    #[test]
    fn malformed_bytecode_is_rejected() {
        let env = Environment::whitelist();
        let scope = Scope::new(&env, &[]);
        let bytecode = Bytecode {
            ops: vec![OpCode::Add],
            names: Vec::new(),
        };
        let mut stack = Vec::new();
        assert!(matches!(
            VM::execute(&bytecode, &scope, &mut stack),
            Err(EvalError::Malformed(_))
        ));
    }

    #[test]
    fn from_str_matches_compile() {
        let parsed: Expression = "y - t".parse().unwrap();
        assert_eq!(parsed, compile("y - t").unwrap());
    }
}
