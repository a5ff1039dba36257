//! Number formats for table cells, e.g. `"${:,.0f}"` or `"{:.1%}"`.
//!
//! A format is literal text around exactly one `{...}` placeholder. The
//! placeholder holds an optional spec after a colon:
//!
//! ```text
//! {[0][:[+][,][.precision][f|%|e|g|d]]}
//! ```
//!
//! `{{` and `}}` are literal braces. The sign of a negative value is placed
//! inside the placeholder, so `"${:,.0f}"` renders -5 as `$-5`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const DEFAULT_PRECISION: usize = 6;

/// Error for a malformed number format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberFormatError {
    #[error("number format '{0}' has no {{}} placeholder")]
    MissingPlaceholder(String),
    #[error("number format '{0}' has more than one placeholder")]
    MultiplePlaceholders(String),
    #[error("number format '{0}' has unbalanced braces")]
    Unbalanced(String),
    #[error("invalid format spec '{spec}' in '{format}'")]
    InvalidSpec { format: String, spec: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// No type: integral values without decimals, others with up to six
    Default,
    Fixed,
    Percent,
    Exponent,
    General,
    Integer,
}

/// A parsed number format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    source: String,
    prefix: String,
    suffix: String,
    plus_sign: bool,
    grouping: bool,
    precision: Option<usize>,
    kind: Kind,
}

impl NumberFormat {
    pub fn parse(pattern: &str) -> Result<Self, NumberFormatError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec: Option<String> = None;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let literal = match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    '{'
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    '}'
                }
                '{' => {
                    if spec.is_some() {
                        return Err(NumberFormatError::MultiplePlaceholders(pattern.to_string()));
                    }
                    let mut body = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(NumberFormatError::Unbalanced(pattern.to_string()));
                            }
                            Some(c) => body.push(c),
                        }
                    }
                    spec = Some(body);
                    continue;
                }
                '}' => return Err(NumberFormatError::Unbalanced(pattern.to_string())),
                c => c,
            };
            if spec.is_some() {
                suffix.push(literal);
            } else {
                prefix.push(literal);
            }
        }

        let body = spec.ok_or_else(|| NumberFormatError::MissingPlaceholder(pattern.to_string()))?;
        let invalid = || NumberFormatError::InvalidSpec {
            format: pattern.to_string(),
            spec: body.clone(),
        };

        let field = body.strip_prefix('0').unwrap_or(&body);
        let spec = match field {
            "" => "",
            _ => field.strip_prefix(':').ok_or_else(invalid)?,
        };

        let mut rest = spec;
        let plus_sign = match rest.chars().next() {
            Some('+') => {
                rest = &rest[1..];
                true
            }
            Some('-') => {
                rest = &rest[1..];
                false
            }
            _ => false,
        };
        let grouping = rest.starts_with(',');
        if grouping {
            rest = &rest[1..];
        }
        let precision = match rest.strip_prefix('.') {
            Some(after_dot) => {
                let digits = after_dot.chars().take_while(char::is_ascii_digit).count();
                if digits == 0 {
                    return Err(invalid());
                }
                rest = &after_dot[digits..];
                Some(after_dot[..digits].parse::<usize>().map_err(|_| invalid())?)
            }
            None => None,
        };
        let kind = match rest {
            "" if precision.is_some() => Kind::General,
            "" => Kind::Default,
            "f" | "F" => Kind::Fixed,
            "%" => Kind::Percent,
            "e" | "E" => Kind::Exponent,
            "g" | "G" => Kind::General,
            "d" if precision.is_none() => Kind::Integer,
            _ => return Err(invalid()),
        };

        Ok(Self {
            source: pattern.to_string(),
            prefix,
            suffix,
            plus_sign,
            grouping,
            precision,
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render `value` through this format
    pub fn format(&self, value: f64) -> String {
        let number = if value.is_nan() {
            match self.kind {
                Kind::Percent => "nan%".to_string(),
                _ => "nan".to_string(),
            }
        } else {
            let body = self.render_magnitude(value.abs());
            let body = if self.grouping {
                group_thousands(&body)
            } else {
                body
            };
            let sign = if value < 0.0 {
                "-"
            } else if self.plus_sign {
                "+"
            } else {
                ""
            };
            format!("{sign}{body}")
        };
        format!("{}{}{}", self.prefix, number, self.suffix)
    }

    fn render_magnitude(&self, abs: f64) -> String {
        if abs.is_infinite() {
            return match self.kind {
                Kind::Percent => "inf%".to_string(),
                _ => "inf".to_string(),
            };
        }
        let precision = self.precision.unwrap_or(DEFAULT_PRECISION);
        match self.kind {
            Kind::Default => format_default(abs),
            Kind::Fixed => format!("{abs:.precision$}"),
            Kind::Percent => format!("{:.precision$}%", abs * 100.0),
            Kind::Exponent => format_exponent(abs, precision),
            Kind::General => format_general(abs, precision),
            Kind::Integer => format!("{abs:.0}"),
        }
    }
}

/// Default rendering: integral values without decimals, others with up to
/// six decimals and trailing zeros trimmed. NaN renders as `nan`.
pub fn format_default(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        return format!("{value:.0}");
    }
    let fixed = format!("{value:.6}");
    let trimmed = trim_fraction(&fixed);
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop trailing zeros after the decimal point, and the point itself if bare
fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn split_exponent(text: &str) -> (&str, i32) {
    match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{sign}{:02}", exponent.abs())
}

/// Scientific notation with a signed, two-digit exponent: `1.50e+03`
fn format_exponent(abs: f64, precision: usize) -> String {
    let text = format!("{abs:.precision$e}");
    let (mantissa, exponent) = split_exponent(&text);
    format!("{mantissa}{}", exponent_suffix(exponent))
}

/// Fixed or scientific notation depending on magnitude, with
/// `precision` significant digits and trailing zeros removed
fn format_general(abs: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if abs == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:.*e}", precision - 1, abs);
    let (mantissa, exponent) = split_exponent(&scientific);
    if exponent >= -4 && exponent < precision as i32 {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{abs:.decimals$}")).to_string()
    } else {
        format!("{}{}", trim_fraction(mantissa), exponent_suffix(exponent))
    }
}

/// Insert commas into the leading run of digits
fn group_thousands(text: &str) -> String {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, rest) = text.split_at(digits_end);

    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let grouped: String = result.chars().rev().collect();
    format!("{grouped}{rest}")
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for NumberFormat {
    type Err = NumberFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumberFormat::parse(s)
    }
}

impl Serialize for NumberFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for NumberFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        NumberFormat::parse(&source).map_err(serde::de::Error::custom)
    }
}

/// Render with `format` if given, otherwise with [`format_default`]
pub fn format_value(value: f64, format: Option<&NumberFormat>) -> String {
    match format {
        Some(format) => format.format(value),
        None => format_default(value),
    }
}
