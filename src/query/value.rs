//! SOQL literal formatting
//!
//! Converts typed scalar values into the literal tokens SOQL expects:
//!
//! ```text
//! NULL            → NULL
//! true            → TRUE
//! 42, 1.5         → 42, 1.5
//! "Done"          → 'Done'
//! "O'Brien"       → 'O\'Brien'
//! "last_n_days:30" → LAST_N_DAYS:30   (relative date literal, never quoted)
//! ```
//!
//! The relative-date vocabulary is closed. Any string outside it is quoted
//! and escaped, so field values can never be spliced in as query code.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Relative date keywords understood natively by SOQL
pub const DATE_LITERALS: &[&str] = &[
    "YESTERDAY",
    "TODAY",
    "TOMORROW",
    "LAST_WEEK",
    "THIS_WEEK",
    "NEXT_WEEK",
    "LAST_MONTH",
    "THIS_MONTH",
    "NEXT_MONTH",
    "LAST_90_DAYS",
    "NEXT_90_DAYS",
    "THIS_QUARTER",
    "LAST_QUARTER",
    "NEXT_QUARTER",
    "THIS_YEAR",
    "LAST_YEAR",
    "NEXT_YEAR",
    "THIS_FISCAL_QUARTER",
    "LAST_FISCAL_QUARTER",
    "NEXT_FISCAL_QUARTER",
    "THIS_FISCAL_YEAR",
    "LAST_FISCAL_YEAR",
    "NEXT_FISCAL_YEAR",
];

/// Parameterized relative date prefixes, used as `PREFIX:n`
pub const DATE_LITERAL_PREFIXES: &[&str] = &[
    "LAST_N_DAYS",
    "NEXT_N_DAYS",
    "LAST_N_WEEKS",
    "NEXT_N_WEEKS",
    "LAST_N_MONTHS",
    "NEXT_N_MONTHS",
    "LAST_N_QUARTERS",
    "NEXT_N_QUARTERS",
    "LAST_N_YEARS",
    "NEXT_N_YEARS",
    "LAST_N_FISCAL_QUARTERS",
    "NEXT_N_FISCAL_QUARTERS",
    "LAST_N_FISCAL_YEARS",
    "NEXT_N_FISCAL_YEARS",
];

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives = DATE_LITERAL_PREFIXES.join("|");
        Regex::new(&format!(r"^(?:{}):\d+$", alternatives))
            .expect("date literal prefix pattern is valid")
    })
}

/// Check whether a string is a SOQL relative date literal
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn is_date_literal(value: &str) -> bool {
    let upper = value.trim().to_uppercase();
    DATE_LITERALS.contains(&upper.as_str()) || prefix_pattern().is_match(&upper)
}

/// Escape backslashes and single quotes for a SOQL string literal
///
/// Backslashes go first so a trailing `\` in the input cannot pair with
/// the escape added for a following quote.
pub fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A scalar value that can appear in a WHERE condition
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Render as a SOQL literal token
    pub fn to_literal(&self) -> String {
        format_value(self)
    }
}

/// Format a value as a SOQL literal token
///
/// Total over all inputs. Non-finite floats have no SOQL spelling and
/// render as `NULL`.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) if x.is_finite() => x.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::Text(s) => format_text(s),
    }
}

fn format_text(s: &str) -> String {
    if is_date_literal(s) {
        s.trim().to_uppercase()
    } else {
        format!("'{}'", escape_string(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<&serde_json::Value> for Value {
    /// Booleans are matched before numbers; arrays and objects are
    /// stringified and treated as text.
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::from(&v)
    }
}

/// Right-hand side of a comparison: a single value or a list for IN / NOT IN
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

impl Operand {
    /// Check if this operand is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{}", value),
            Self::List(values) => {
                let items: Vec<String> = values.iter().map(format_value).collect();
                write!(f, "({})", items.join(", "))
            }
        }
    }
}

macro_rules! scalar_operand {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Self::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_operand!(Value, bool, i32, i64, u32, f32, f64, &str, String, &String);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Operand {
    fn from(values: &[T]) -> Self {
        Self::List(values.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Operand {
    fn from(values: [T; N]) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unquote(token: &str) -> String {
        token
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .map(|t| {
                let mut out = String::new();
                let mut chars = t.chars();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => out.extend(chars.next()),
                        other => out.push(other),
                    }
                }
                out
            })
            .unwrap_or_else(|| token.to_string())
    }

    /// Every quote inside the literal must follow an odd run of backslashes
    fn assert_quotes_escaped(token: &str) {
        let inner = &token[1..token.len() - 1];
        let bytes = inner.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\'' {
                let run = bytes[..i].iter().rev().take_while(|c| **c == b'\\').count();
                assert!(run % 2 == 1, "unescaped quote in {}", token);
            }
        }
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::Bool(true)), "TRUE");
        assert_eq!(format_value(&Value::Bool(false)), "FALSE");
        assert_eq!(format_value(&Value::Int(-42)), "-42");
        assert_eq!(format_value(&Value::Float(2.5)), "2.5");
        assert_eq!(format_value(&Value::from("Done")), "'Done'");
    }

    #[test]
    fn test_numeric_tokens_parse_back() {
        for x in [0.1, 7.25, -3.0, 1e-7, 123456.789] {
            let token = format_value(&Value::Float(x));
            assert_eq!(token.parse::<f64>().unwrap(), x);
        }
        for n in [0_i64, 1, -17, i64::MAX] {
            let token = format_value(&Value::Int(n));
            assert_eq!(token.parse::<i64>().unwrap(), n);
        }
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(format_value(&Value::Float(f64::NAN)), "NULL");
        assert_eq!(format_value(&Value::Float(f64::INFINITY)), "NULL");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let token = format_value(&Value::from("O'Brien's task"));
        assert_eq!(token, r"'O\'Brien\'s task'");
        assert_quotes_escaped(&token);
    }

    #[test]
    fn test_trailing_backslash_cannot_close_literal() {
        let token = format_value(&Value::from(r"x\' OR Name != '"));
        assert_eq!(token, r"'x\\\' OR Name != \''");
        assert_quotes_escaped(&token);

        for s in [r"\", r"a\", r"\'", r"\\'", r"it\'s"] {
            let token = format_value(&Value::from(s));
            assert_quotes_escaped(&token);
            let inner = &token[1..token.len() - 1];
            let trailing = inner.bytes().rev().take_while(|c| *c == b'\\').count();
            assert!(trailing % 2 == 0, "closing quote escaped in {}", token);
            assert_eq!(unquote(&token), s);
        }
    }

    #[test]
    fn test_strings_round_trip() {
        for s in ["plain", "it's", "''", "back\\slash", "", "multi word value", r"x\' OR Name != '", r"trail\"] {
            let token = format_value(&Value::from(s));
            assert_eq!(unquote(&token), s);
        }
    }

    #[test]
    fn test_date_literals_are_unquoted_and_uppercased() {
        assert_eq!(format_value(&Value::from("TODAY")), "TODAY");
        assert_eq!(format_value(&Value::from("today")), "TODAY");
        assert_eq!(format_value(&Value::from(" this_fiscal_year ")), "THIS_FISCAL_YEAR");
        assert_eq!(format_value(&Value::from("last_n_days:30")), "LAST_N_DAYS:30");
        assert_eq!(
            format_value(&Value::from("NEXT_N_FISCAL_QUARTERS:4")),
            "NEXT_N_FISCAL_QUARTERS:4"
        );
    }

    #[test]
    fn test_near_miss_date_literals_are_quoted() {
        assert_eq!(format_value(&Value::from("LAST_N_DAYS:")), "'LAST_N_DAYS:'");
        assert_eq!(format_value(&Value::from("LAST_N_DAYS:abc")), "'LAST_N_DAYS:abc'");
        assert_eq!(
            format_value(&Value::from("LAST_N_DAYS:30 OR Name != null")),
            "'LAST_N_DAYS:30 OR Name != null'"
        );
        assert_eq!(format_value(&Value::from("TODAYISH")), "'TODAYISH'");
        assert_eq!(format_value(&Value::from("LAST_N_HOURS:3")), "'LAST_N_HOURS:3'");
    }

    #[test]
    fn test_json_bool_is_not_numeric() {
        assert_eq!(Value::from(serde_json::json!(true)), Value::Bool(true));
        assert_eq!(Value::from(serde_json::json!(1)), Value::Int(1));
        assert_eq!(Value::from(serde_json::json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_json_compound_values_are_stringified() {
        let value = Value::from(serde_json::json!({"k": "it's"}));
        assert_eq!(format_value(&value), r#"'{"k":"it\'s"}'"#);
    }

    #[test]
    fn test_operand_list_rendering() {
        let operand = Operand::from(vec!["Done", "Blocked"]);
        assert!(operand.is_list());
        assert_eq!(operand.to_string(), "('Done', 'Blocked')");

        let operand = Operand::from([1, 2, 3]);
        assert_eq!(operand.to_string(), "(1, 2, 3)");

        assert!(!Operand::from("Done").is_list());
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
