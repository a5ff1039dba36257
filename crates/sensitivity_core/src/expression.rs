//! Arithmetic expressions used as models in sweep files.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | call | variable | '(' sum ')'
//! ```
//!
//! Power is right-associative and binds tighter than unary minus, so
//! `-2^2` is `-4` and `2^3^2` is `512`.

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of, satisfy},
    combinator::{not, opt, peek, recognize},
    error::{ErrorKind, ParseError},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{pair, preceded, terminated},
};
use rand::{Rng, distr::Distribution};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::ModelError;
use crate::model::{Model, Outcome, Params};

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("failed to parse expression: {message}")]
    Parse { message: String },

    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("expression nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("invalid distribution {name}({a}, {b}): {reason}")]
    Distribution {
        name: &'static str,
        a: f64,
        b: f64,
        reason: &'static str,
    },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Deepest nesting of parentheses, calls, signs and powers the parser accepts
pub const MAX_NESTING: usize = 64;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Built-in functions: name and accepted argument count
const FUNCTIONS: &[(&str, Arity)] = &[
    ("sin", Arity::Exactly(1)),
    ("cos", Arity::Exactly(1)),
    ("tan", Arity::Exactly(1)),
    ("exp", Arity::Exactly(1)),
    ("ln", Arity::Exactly(1)),
    ("log", Arity::Exactly(1)),
    ("log10", Arity::Exactly(1)),
    ("sqrt", Arity::Exactly(1)),
    ("abs", Arity::Exactly(1)),
    ("min", Arity::AtLeast(2)),
    ("max", Arity::AtLeast(2)),
    ("pow", Arity::Exactly(2)),
    ("normal", Arity::Exactly(2)),
    ("uniform", Arity::Exactly(2)),
];

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Arity::Exactly(1) => "1",
            Arity::Exactly(2) => "2",
            Arity::AtLeast(2) => "at least 2",
            _ => "a different number of",
        }
    }
}

fn check_call(name: &str, got: usize) -> ExprResult<()> {
    let (_, arity) = FUNCTIONS
        .iter()
        .find(|(f, _)| *f == name)
        .ok_or_else(|| ExpressionError::UndefinedFunction {
            name: name.to_string(),
        })?;
    if arity.accepts(got) {
        Ok(())
    } else {
        Err(ExpressionError::Arity {
            name: name.to_string(),
            expected: arity.describe(),
            got,
        })
    }
}

/// A parsed expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression, checking function names and argument counts
    pub fn parse(input: &str) -> ExprResult<Self> {
        let root = match sum(input.trim(), 0) {
            Ok((remainder, expr)) if remainder.trim().is_empty() => expr,
            Ok((remainder, _)) => {
                return Err(ExpressionError::Parse {
                    message: format!("unexpected trailing characters: '{}'", remainder.trim()),
                });
            }
            Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
                return Err(ExpressionError::TooDeep { max: MAX_NESTING });
            }
            Err(e) => {
                return Err(ExpressionError::Parse {
                    message: format!("{e:?}"),
                });
            }
        };
        validate_calls(&root)?;
        Ok(Self {
            source: input.trim().to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Sorted, deduplicated names of all variables used
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        collect_variables(&self.root, &mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Evaluate with variables resolved by `lookup`; `pi` and `e` are
    /// available unless `lookup` defines them.
    pub fn evaluate_with<R: Rng + ?Sized>(
        &self,
        lookup: &dyn Fn(&str) -> Option<f64>,
        rng: &mut R,
    ) -> ExprResult<f64> {
        eval(&self.root, lookup, rng)
    }

    /// Evaluate against a model call's arguments using its seeded RNG
    pub fn evaluate(&self, params: &Params) -> ExprResult<f64> {
        let mut rng = params.rng();
        self.evaluate_with(&|name| params.get(name), &mut rng)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Expression::parse(&source).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Variable(name) => f.write_str(name),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn validate_calls(expr: &Expr) -> ExprResult<()> {
    match expr {
        Expr::Number(_) | Expr::Variable(_) => Ok(()),
        Expr::Neg(inner) => validate_calls(inner),
        Expr::Binary(_, lhs, rhs) => {
            validate_calls(lhs)?;
            validate_calls(rhs)
        }
        Expr::Call(name, args) => {
            check_call(name, args.len())?;
            args.iter().try_for_each(validate_calls)
        }
    }
}

fn collect_variables(expr: &Expr, vars: &mut Vec<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Variable(name) => vars.push(name.clone()),
        Expr::Neg(inner) => collect_variables(inner, vars),
        Expr::Binary(_, lhs, rhs) => {
            collect_variables(lhs, vars);
            collect_variables(rhs, vars);
        }
        Expr::Call(_, args) => {
            for arg in args {
                collect_variables(arg, vars);
            }
        }
    }
}

fn eval<R: Rng + ?Sized>(
    expr: &Expr,
    lookup: &dyn Fn(&str) -> Option<f64>,
    rng: &mut R,
) -> ExprResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Variable(name) => lookup(name)
            .or(match name.as_str() {
                "pi" => Some(std::f64::consts::PI),
                "e" => Some(std::f64::consts::E),
                _ => None,
            })
            .ok_or_else(|| ExpressionError::UndefinedVariable { name: name.clone() }),
        Expr::Neg(inner) => Ok(-eval(inner, lookup, rng)?),
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, lookup, rng)?;
            let rhs = eval(rhs, lookup, rng)?;
            Ok(op.apply(lhs, rhs))
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, lookup, rng))
                .collect::<ExprResult<Vec<f64>>>()?;
            call(name, &args, rng)
        }
    }
}

fn call<R: Rng + ?Sized>(name: &str, args: &[f64], rng: &mut R) -> ExprResult<f64> {
    check_call(name, args.len())?;
    let value = match name {
        "sin" => args[0].sin(),
        "cos" => args[0].cos(),
        "tan" => args[0].tan(),
        "exp" => args[0].exp(),
        "ln" | "log" => args[0].ln(),
        "log10" => args[0].log10(),
        "sqrt" => args[0].sqrt(),
        "abs" => args[0].abs(),
        "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "pow" => args[0].powf(args[1]),
        "normal" => {
            let (mean, std_dev) = (args[0], args[1]);
            rand_distr::Normal::new(mean, std_dev)
                .map(|d| d.sample(rng))
                .map_err(|_| ExpressionError::Distribution {
                    name: "normal",
                    a: mean,
                    b: std_dev,
                    reason: "std_dev must be non-negative and finite",
                })?
        }
        "uniform" => {
            let (low, high) = (args[0], args[1]);
            rand_distr::Uniform::<f64>::new_inclusive(low, high)
                .map(|d| d.sample(rng))
                .map_err(|_| ExpressionError::Distribution {
                    name: "uniform",
                    a: low,
                    b: high,
                    reason: "bounds must be finite with low <= high",
                })?
        }
        _ => {
            return Err(ExpressionError::UndefinedFunction {
                name: name.to_string(),
            });
        }
    };
    Ok(value)
}

// Parser functions using nom

type PError<'a> = nom::error::Error<&'a str>;
type PResult<'a, T> = IResult<&'a str, T, PError<'a>>;

fn symbol<'a>(c: char) -> impl Parser<&'a str, Output = char, Error = PError<'a>> {
    preceded(multispace0, char(c))
}

fn additive_op<'a>() -> impl Parser<&'a str, Output = char, Error = PError<'a>> {
    preceded(multispace0, one_of("+-"))
}

fn multiplicative_op<'a>() -> impl Parser<&'a str, Output = char, Error = PError<'a>> {
    // a lone '*' is multiplication, '**' is power
    preceded(
        multispace0,
        alt((terminated(char('*'), not(char('*'))), char('/'))),
    )
}

fn power_op<'a>() -> impl Parser<&'a str, Output = &'a str, Error = PError<'a>> {
    preceded(multispace0, alt((tag("**"), tag("^"))))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn number(input: &str) -> PResult<'_, Expr> {
    // only digit-led input, so names like `nan_rate` stay variables
    let (input, _) =
        peek(satisfy::<_, _, PError<'_>>(|c: char| c.is_ascii_digit() || c == '.')).parse(input)?;
    let (input, value) = double::<_, PError<'_>>(input)?;
    Ok((input, Expr::Number(value)))
}

/// One level deeper, or a failure once `MAX_NESTING` is reached
fn deeper(input: &str, depth: usize) -> Result<usize, nom::Err<PError<'_>>> {
    if depth >= MAX_NESTING {
        Err(nom::Err::Failure(PError::from_error_kind(input, ErrorKind::TooLarge)))
    } else {
        Ok(depth + 1)
    }
}

fn function_call(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = symbol('(').parse(input)?;
    let depth = deeper(input, depth)?;
    let (input, args) = separated_list0(symbol(','), |i| sum(i, depth)).parse(input)?;
    let (input, _) = symbol(')').parse(input)?;
    Ok((input, Expr::Call(name.to_string(), args)))
}

fn variable(input: &str) -> PResult<'_, Expr> {
    let (input, name) = identifier(input)?;
    Ok((input, Expr::Variable(name.to_string())))
}

fn parens(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, _) = symbol('(').parse(input)?;
    let depth = deeper(input, depth)?;
    let (input, expr) = sum(input, depth)?;
    let (input, _) = symbol(')').parse(input)?;
    Ok((input, expr))
}

fn primary(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, _) = multispace0::<_, PError<'_>>(input)?;
    alt((
        number,
        |i| function_call(i, depth),
        variable,
        |i| parens(i, depth),
    ))
    .parse(input)
}

fn power(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, base) = primary(input, depth)?;
    let (input, op) = opt(power_op()).parse(input)?;
    if op.is_none() {
        return Ok((input, base));
    }
    let (input, exponent) = unary(input, deeper(input, depth)?)?;
    Ok((
        input,
        Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
    ))
}

fn unary(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, sign) = opt(additive_op()).parse(input)?;
    match sign {
        Some('-') => {
            let (input, operand) = unary(input, deeper(input, depth)?)?;
            Ok((input, Expr::Neg(Box::new(operand))))
        }
        Some(_) => unary(input, deeper(input, depth)?),
        None => power(input, depth),
    }
}

fn product(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut left) = unary(input, depth)?;
    loop {
        let (rest, op) = opt(multiplicative_op()).parse(input)?;
        let op = match op {
            Some('*') => BinaryOp::Mul,
            Some(_) => BinaryOp::Div,
            None => return Ok((input, left)),
        };
        let (rest, right) = unary(rest, depth)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
}

fn sum(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut left) = product(input, depth)?;
    loop {
        let (rest, op) = opt(additive_op()).parse(input)?;
        let op = match op {
            Some('+') => BinaryOp::Add,
            Some(_) => BinaryOp::Sub,
            None => return Ok((input, left)),
        };
        let (rest, right) = product(rest, depth)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
}

/// A model defined by an expression over the swept and fixed arguments.
///
/// With `repeats > 1` the expression is evaluated that many times per
/// combination, drawing from one seeded generator, and the model returns
/// the samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionModel {
    pub expression: Expression,
    #[serde(default = "default_repeats")]
    pub repeats: usize,
}

fn default_repeats() -> usize {
    1
}

impl ExpressionModel {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            repeats: 1,
        }
    }

    pub fn parse(source: &str) -> ExprResult<Self> {
        Expression::parse(source).map(Self::new)
    }

    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }
}

impl Model for ExpressionModel {
    fn evaluate(&self, params: &Params) -> Result<Outcome, ModelError> {
        let lookup = |name: &str| params.get(name);
        let mut rng = params.rng();
        if self.repeats <= 1 {
            let value = self.expression.evaluate_with(&lookup, &mut rng)?;
            return Ok(Outcome::Scalar(value));
        }
        let samples = (0..self.repeats)
            .map(|_| self.expression.evaluate_with(&lookup, &mut rng))
            .collect::<ExprResult<Vec<f64>>>()?;
        Ok(Outcome::Samples(samples))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::model::FixedArgs;

    fn eval_str(source: &str) -> f64 {
        let mut rng = StdRng::seed_from_u64(0);
        Expression::parse(source)
            .unwrap()
            .evaluate_with(
                &|name| match name {
                    "x" => Some(3.0),
                    "y" => Some(4.0),
                    _ => None,
                },
                &mut rng,
            )
            .unwrap()
    }

    fn params(seed: u64) -> Params {
        Params::new(
            Arc::from(vec!["x_1".to_string(), "x_2".to_string()]),
            vec![10.0, 2.0],
            Arc::new(FixedArgs::new().with("c", 5.0)),
            0,
            seed,
        )
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("1 + 2 * 3"), 7.0);
        assert_eq!(eval_str("(1 + 2) * 3"), 9.0);
        assert_eq!(eval_str("10 - 4 - 3"), 3.0);
        assert_eq!(eval_str("8 / 4 / 2"), 1.0);
        assert_eq!(eval_str("x * y - 2"), 10.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(eval_str("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval_str("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval_str("-2 ^ 2"), -4.0);
        assert_eq!(eval_str("2 ^ -1"), 0.5);
        assert_eq!(eval_str("2 * 3 ** 2"), 18.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval_str("sqrt(x * x + y * y)"), 5.0);
        assert_eq!(eval_str("max(x, y, 1)"), 4.0);
        assert_eq!(eval_str("min(x, y)"), 3.0);
        assert_eq!(eval_str("pow(2, 10)"), 1024.0);
        assert_eq!(eval_str("abs(-x)"), 3.0);
        assert!((eval_str("cos(pi)") + 1.0).abs() < 1e-12);
        assert!((eval_str("ln(e)") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        assert_eq!(eval_str("1 / 0"), f64::INFINITY);
        assert!(eval_str("0 / 0").is_nan());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Expression::parse("1 +"),
            Err(ExpressionError::Parse { .. })
        ));
        assert!(matches!(
            Expression::parse("2 3"),
            Err(ExpressionError::Parse { .. })
        ));
        assert!(matches!(
            Expression::parse("foo(1)"),
            Err(ExpressionError::UndefinedFunction { name }) if name == "foo"
        ));
        assert!(matches!(
            Expression::parse("sin(1, 2)"),
            Err(ExpressionError::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(eval_str(&nested(MAX_NESTING - 1)), 1.0);
        assert!(matches!(
            Expression::parse(&nested(10_000)),
            Err(ExpressionError::TooDeep { max: MAX_NESTING })
        ));
        assert!(matches!(
            Expression::parse(&format!("{}x", "-".repeat(10_000))),
            Err(ExpressionError::TooDeep { .. })
        ));
        let calls = format!("{}1{}", "sin(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            Expression::parse(&calls),
            Err(ExpressionError::TooDeep { .. })
        ));
        // long flat sums are not nesting
        let flat = vec!["1"; 500].join(" + ");
        assert_eq!(eval_str(&flat), 500.0);
    }

    #[test]
    fn test_variables() {
        let expr = Expression::parse("x_1 ^ x_2 + c * x_1").unwrap();
        assert_eq!(expr.variables(), vec!["c", "x_1", "x_2"]);
    }

    #[test]
    fn test_model_uses_swept_and_fixed_arguments() {
        let model = ExpressionModel::parse("x_1 ^ x_2 + c").unwrap();
        assert_eq!(model.evaluate(&params(0)), Ok(Outcome::Scalar(105.0)));
    }

    #[test]
    fn test_model_unknown_variable() {
        let model = ExpressionModel::parse("x_1 + missing").unwrap();
        assert_eq!(
            model.evaluate(&params(0)),
            Err(ModelError::Expression(ExpressionError::UndefinedVariable {
                name: "missing".to_string()
            }))
        );
    }

    #[test]
    fn test_repeats_produce_seeded_samples() {
        let model = ExpressionModel::parse("x_1 + normal(0, 1)")
            .unwrap()
            .with_repeats(5);
        let Ok(Outcome::Samples(first)) = model.evaluate(&params(42)) else {
            panic!("expected samples");
        };
        let Ok(Outcome::Samples(second)) = model.evaluate(&params(42)) else {
            panic!("expected samples");
        };
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert!(first.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_uniform_bounds() {
        let model = ExpressionModel::parse("uniform(x_2, x_1)").unwrap().with_repeats(50);
        let Ok(Outcome::Samples(samples)) = model.evaluate(&params(1)) else {
            panic!("expected samples");
        };
        assert!(samples.iter().all(|v| (2.0..=10.0).contains(v)));

        let bad = ExpressionModel::parse("uniform(x_1, x_2)").unwrap();
        assert!(bad.evaluate(&params(1)).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let model: ExpressionModel =
            serde_json::from_str(r#"{"expression": "x_1 * 2"}"#).unwrap();
        assert_eq!(model.repeats, 1);
        assert_eq!(model.expression.source(), "x_1 * 2");
        assert!(serde_json::from_str::<ExpressionModel>(r#"{"expression": "x_1 *"}"#).is_err());
    }
}
