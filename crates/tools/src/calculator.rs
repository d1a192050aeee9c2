//! Calculator tool: evaluates mathematical expressions and solves
//! single-variable polynomial equations.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, exponentiation (`^` or `**`),
//! parentheses, unary sign, implicit multiplication (`2pi`, `3(x + 1)`),
//! the constants `pi` and `e`, and the functions `sqrt`, `sin`, `cos`,
//! `tan`, `ln`, `log` (base 10) and `abs`.
//!
//! `solve(expr, x)`, `solve(lhs = rhs, x)` and a bare `lhs = rhs` find the
//! roots of a polynomial of degree at most two in one unknown. Values are
//! parsed as polynomials in that unknown, so plain arithmetic is the
//! degree-zero case.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

const MAX_DEGREE: usize = 2;
const MAX_EXPONENT: f64 = 32.0;
const EPSILON: f64 = 1e-12;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression or solve an equation. Supports + - * / % ^, parentheses, \
         implicit multiplication, pi, e, and sqrt/sin/cos/tan/ln/log/abs. Solve linear or quadratic \
         equations with 'solve(x**2 + 2*x - 3, x)' or '2x + 1 = 7'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(2 + 3) * 4', or an equation to solve, e.g. 'solve(x**2 + 2*x - 3, x)'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let expr = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;

        calculate(expr).map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason,
        })
    }
}

/// Integral values print without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate an expression, or solve it when it is an equation, and render
/// the answer as text. Roots render as a sorted list, e.g. `[-3, 1]`.
pub fn calculate(input: &str) -> Result<String, String> {
    let tokens = tokenize(input)?;

    let is_solve = matches!(tokens.as_slice(), [Token::Ident(name), Token::LParen, ..] if name == "solve");
    if is_solve {
        let mut parser = Parser::new(&tokens[2..]);
        let equation = parser.parse_equation()?;
        if parser.peek() == Some(&Token::Comma) {
            parser.consume();
            match parser.consume() {
                Some(Token::Ident(var)) => parser.bind_variable(var)?,
                _ => return Err("Expected a variable name after ','".into()),
            }
        }
        parser.expect_rparen()?;
        parser.expect_end()?;
        return Ok(render_roots(&solve(&equation)?));
    }

    let mut parser = Parser::new(&tokens);
    let equation = parser.parse_equation()?;
    parser.expect_end()?;
    if tokens.contains(&Token::Equals) {
        return Ok(render_roots(&solve(&equation)?));
    }
    let value = parser.constant(&equation)?;
    if !value.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(format_number(value))
}

/// Evaluate a mathematical expression string to a number.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let poly = parser.parse_expr()?;
    parser.expect_end()?;
    let result = parser.constant(&poly)?;
    if !result.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(result)
}

// ── Polynomials in one unknown ────────────────────────────────────────────

/// Coefficients, lowest power first.
#[derive(Debug, Clone, PartialEq)]
struct Poly(Vec<f64>);

impl Poly {
    fn constant(value: f64) -> Self {
        Poly(vec![value])
    }

    fn variable() -> Self {
        Poly(vec![0.0, 1.0])
    }

    /// Degree after dropping negligible leading coefficients.
    fn degree(&self) -> usize {
        self.0
            .iter()
            .rposition(|c| c.abs() > EPSILON)
            .unwrap_or(0)
    }

    fn as_constant(&self) -> Option<f64> {
        (self.degree() == 0).then(|| self.0.first().copied().unwrap_or(0.0))
    }

    fn coefficient(&self, power: usize) -> f64 {
        self.0.get(power).copied().unwrap_or(0.0)
    }

    fn add(&self, other: &Poly) -> Poly {
        let len = self.0.len().max(other.0.len());
        Poly((0..len).map(|i| self.coefficient(i) + other.coefficient(i)).collect())
    }

    fn neg(&self) -> Poly {
        Poly(self.0.iter().map(|c| -c).collect())
    }

    fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.neg())
    }

    fn mul(&self, other: &Poly) -> Poly {
        let mut out = vec![0.0; self.0.len() + other.0.len() - 1];
        for (i, a) in self.0.iter().enumerate() {
            for (j, b) in other.0.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Poly(out)
    }

    fn scale(&self, factor: f64) -> Poly {
        Poly(self.0.iter().map(|c| c * factor).collect())
    }
}

// ── Solving ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Root {
    Real(f64),
    Complex { re: f64, im: f64 },
}

/// Roots of `poly = 0`, real ones ascending.
fn solve(poly: &Poly) -> Result<Vec<Root>, String> {
    let degree = poly.degree();
    if degree > MAX_DEGREE {
        return Err(format!(
            "Only equations up to degree {MAX_DEGREE} can be solved, got degree {degree}"
        ));
    }

    let (a, b, c) = (poly.coefficient(2), poly.coefficient(1), poly.coefficient(0));
    let roots = match degree {
        // A constant is either never zero or always zero; neither has roots to list.
        0 => Vec::new(),
        1 => vec![Root::Real(tidy(-c / b))],
        _ => {
            let discriminant = b * b - 4.0 * a * c;
            if discriminant.abs() <= EPSILON {
                vec![Root::Real(tidy(-b / (2.0 * a)))]
            } else if discriminant > 0.0 {
                // Numerically stable form; avoids cancellation in -b ± sqrt(d).
                let sign = if b < 0.0 { -1.0 } else { 1.0 };
                let q = -0.5 * (b + sign * discriminant.sqrt());
                let mut real = [tidy(q / a), tidy(c / q)];
                real.sort_by(|x, y| x.total_cmp(y));
                real.into_iter().map(Root::Real).collect()
            } else {
                let re = tidy(-b / (2.0 * a));
                let im = tidy((-discriminant).sqrt() / (2.0 * a).abs());
                vec![Root::Complex { re, im: -im }, Root::Complex { re, im }]
            }
        }
    };
    Ok(roots)
}

/// Snap values within rounding error of an integer to it.
fn tidy(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-9 { rounded + 0.0 } else { value }
}

fn render_roots(roots: &[Root]) -> String {
    let parts: Vec<String> = roots
        .iter()
        .map(|root| match *root {
            Root::Real(value) => format_number(value),
            Root::Complex { re, im } => {
                let imaginary = if im.abs() == 1.0 {
                    "I".to_string()
                } else {
                    format!("{}*I", format_number(im.abs()))
                };
                match (re == 0.0, im < 0.0) {
                    (true, true) => format!("-{imaginary}"),
                    (true, false) => imaginary,
                    (false, true) => format!("{} - {imaginary}", format_number(re)),
                    (false, false) => format!("{} + {imaginary}", format_number(re)),
                }
            }
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

// ── Recursive-descent parser ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    Equals,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' if chars.get(i + 1) == Some(&'*') => { tokens.push(Token::Caret); i += 2; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '%' => { tokens.push(Token::Percent); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            '=' if chars.get(i + 1) == Some(&'=') => { tokens.push(Token::Equals); i += 2; }
            '=' => { tokens.push(Token::Equals); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident.to_ascii_lowercase()));
            }
            c => return Err(format!("Unexpected character: '{}'", c)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// The single unknown seen so far, if any.
    variable: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            variable: None,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(format!("Unexpected token at position {}: {:?}", self.pos, tok)),
        }
    }

    fn bind_variable(&mut self, name: &str) -> Result<(), String> {
        if is_reserved(name) {
            return Err(format!("'{name}' cannot be used as a variable"));
        }
        match &self.variable {
            Some(seen) if seen != name => Err(format!("Expression has unknown '{seen}', not '{name}'")),
            _ => {
                self.variable = Some(name.to_string());
                Ok(())
            }
        }
    }

    /// The value of `poly`, which must not depend on the unknown.
    fn constant(&self, poly: &Poly) -> Result<f64, String> {
        poly.as_constant().ok_or_else(|| {
            format!("Unknown name: '{}'", self.variable.as_deref().unwrap_or_default())
        })
    }

    // equation = expr ('=' expr)?   (as lhs - rhs)
    fn parse_equation(&mut self) -> Result<Poly, String> {
        let lhs = self.parse_expr()?;
        if self.peek() == Some(&Token::Equals) {
            self.consume();
            let rhs = self.parse_expr()?;
            return Ok(lhs.sub(&rhs));
        }
        Ok(lhs)
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Poly, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left = left.add(&self.parse_term()?);
                }
                Token::Minus => {
                    self.consume();
                    left = left.sub(&self.parse_term()?);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '%')? unary)*
    //
    // A unary directly followed by a number, name or '(' multiplies.
    fn parse_term(&mut self) -> Result<Poly, String> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left = left.mul(&self.parse_unary()?);
                }
                Token::Number(_) | Token::Ident(_) | Token::LParen => {
                    left = left.mul(&self.parse_unary()?);
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    let divisor = right
                        .as_constant()
                        .ok_or("Cannot divide by an expression containing the unknown")?;
                    if divisor == 0.0 {
                        return Err("Division by zero".into());
                    }
                    left = left.scale(1.0 / divisor);
                }
                Token::Percent => {
                    self.consume();
                    let right = self.parse_unary()?;
                    let (Some(dividend), Some(divisor)) = (left.as_constant(), right.as_constant()) else {
                        return Err("Modulo needs plain numbers".into());
                    };
                    if divisor == 0.0 {
                        return Err("Modulo by zero".into());
                    }
                    left = Poly::constant(dividend % divisor);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<Poly, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(self.parse_unary()?.neg())
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary ('^' unary)?   (right-associative)
    fn parse_power(&mut self) -> Result<Poly, String> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self
                .parse_unary()?
                .as_constant()
                .ok_or("Exponents containing the unknown are not supported")?;
            if let Some(value) = base.as_constant() {
                return Ok(Poly::constant(value.powf(exponent)));
            }
            if exponent < 0.0 || exponent.fract() != 0.0 || exponent > MAX_EXPONENT {
                return Err(format!("Unsupported power of the unknown: {}", format_number(exponent)));
            }
            let mut out = Poly::constant(1.0);
            for _ in 0..exponent as usize {
                out = out.mul(&base);
            }
            return Ok(out);
        }
        Ok(base)
    }

    // primary = NUMBER | CONST | VAR | FUNC '(' expr ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Poly, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Poly::constant(*n)),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(val)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(Poly::constant(std::f64::consts::PI)),
                "e" => Ok(Poly::constant(std::f64::consts::E)),
                func => match function(func) {
                    Some(apply) => {
                        match self.consume() {
                            Some(Token::LParen) => {}
                            _ => return Err(format!("Expected '(' after {}", func)),
                        }
                        let arg = self.parse_expr()?;
                        self.expect_rparen()?;
                        let value = arg
                            .as_constant()
                            .ok_or_else(|| format!("{func} of an expression containing the unknown is not supported"))?;
                        apply(value).map(Poly::constant)
                    }
                    None if func == "solve" => Err("solve(...) must be the whole expression".into()),
                    None => {
                        self.bind_variable(func)?;
                        Ok(Poly::variable())
                    }
                },
            },
            Some(tok) => Err(format!("Unexpected token: {:?}", tok)),
            None => Err("Unexpected end of expression".into()),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), String> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err("Expected closing parenthesis".into()),
        }
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(name, "pi" | "e" | "solve") || function(name).is_some()
}

type Function = fn(f64) -> Result<f64, String>;

fn function(name: &str) -> Option<Function> {
    let f: Function = match name {
        "sqrt" => |x| {
            if x < 0.0 {
                Err("Square root of a negative number".into())
            } else {
                Ok(x.sqrt())
            }
        },
        "ln" => |x| {
            if x <= 0.0 {
                Err("Logarithm of a non-positive number".into())
            } else {
                Ok(x.ln())
            }
        },
        "log" => |x| {
            if x <= 0.0 {
                Err("Logarithm of a non-positive number".into())
            } else {
                Ok(x.log10())
            }
        },
        "sin" => |x| Ok(x.sin()),
        "cos" => |x| Ok(x.cos()),
        "tan" => |x| Ok(x.tan()),
        "abs" => |x| Ok(x.abs()),
        _ => return None,
    };
    Some(f)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_addition() {
        assert_eq!(evaluate("2+2").unwrap(), 4.0);
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
    }

    #[test]
    fn nested_parentheses() {
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn division_by_zero() {
        assert!(evaluate("1 / 0").is_err());
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("2 ^ -1").unwrap(), 0.5);
    }

    #[test]
    fn modulo() {
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
    }

    #[test]
    fn constants_and_functions() {
        assert!((evaluate("cos(pi)").unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(evaluate("sqrt(16) + abs(-2)").unwrap(), 6.0);
        assert!((evaluate("ln(e)").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(evaluate("log(1000)").unwrap(), 3.0);
    }

    #[test]
    fn domain_errors() {
        assert!(evaluate("sqrt(-1)").is_err());
        assert!(evaluate("ln(0)").is_err());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = evaluate("foo(2)").unwrap_err();
        assert!(err.contains("foo"));
    }

    #[test]
    fn invalid_expression() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(evaluate("2(3+4)").unwrap(), 14.0);
        assert_eq!(evaluate("(1 + 2)(3 + 4)").unwrap(), 21.0);
        assert!((evaluate("2pi").unwrap() - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(evaluate("3sqrt(16)").unwrap(), 12.0);
        assert_eq!(evaluate("2(3)^2").unwrap(), 18.0);
    }

    #[test]
    fn solves_quadratic() {
        assert_eq!(calculate("solve(x**2 + 2*x - 3, x)").unwrap(), "[-3, 1]");
        assert_eq!(calculate("solve(x^2 - 2x + 1, x)").unwrap(), "[1]");
        assert_eq!(calculate("solve(2y^2 - 8)").unwrap(), "[-2, 2]");
    }

    #[test]
    fn solves_equations_with_equals() {
        assert_eq!(calculate("2x + 1 = 7").unwrap(), "[3]");
        assert_eq!(calculate("solve(3(x - 1) = x + 5, x)").unwrap(), "[4]");

        let roots = calculate("x^2 = 2").unwrap();
        let values: Vec<f64> = roots
            .trim_matches(|c| c == '[' || c == ']')
            .split(", ")
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert!((values[0] + 2f64.sqrt()).abs() < 1e-12);
        assert!((values[1] - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn complex_roots() {
        assert_eq!(calculate("solve(x^2 + 1, x)").unwrap(), "[-I, I]");
        assert_eq!(calculate("solve(x^2 + 2x + 5, x)").unwrap(), "[-1 - 2*I, -1 + 2*I]");
    }

    #[test]
    fn solve_rejects_what_it_cannot_handle() {
        assert!(calculate("solve(x^3 - 8, x)").unwrap_err().contains("degree 3"));
        assert!(calculate("solve(x + y, x)").is_err());
        assert!(calculate("solve(y - 1, x)").is_err());
        assert!(calculate("solve(1 / x, x)").is_err());
        assert!(calculate("solve(sin(x), x)").is_err());
        assert_eq!(calculate("solve(5, x)").unwrap(), "[]");
    }

    #[test]
    fn plain_expressions_still_reject_unknowns() {
        assert!(calculate("2 + x").unwrap_err().contains("'x'"));
        assert_eq!(calculate("2 + 2").unwrap(), "4");
    }

    #[tokio::test]
    async fn tool_solves_equations() {
        let out = CalculatorTool
            .execute(serde_json::json!({"expression": "solve(x**2 + 2*x - 3, x)"}))
            .await
            .unwrap();
        assert_eq!(out, "[-3, 1]");
    }

    #[tokio::test]
    async fn tool_formats_integers() {
        let out = CalculatorTool
            .execute(serde_json::json!({"expression": "10 / 2"}))
            .await
            .unwrap();
        assert_eq!(out, "5");
    }

    #[tokio::test]
    async fn tool_formats_decimals() {
        let out = CalculatorTool
            .execute(serde_json::json!({"expression": "10 / 3"}))
            .await
            .unwrap();
        assert!(out.starts_with("3.333"));
    }

    #[tokio::test]
    async fn tool_reports_bad_expression() {
        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "2 + x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(err.to_string().starts_with("calculator failed"));
    }

    #[tokio::test]
    async fn tool_missing_expression() {
        let result = CalculatorTool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
