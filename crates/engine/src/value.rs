use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Scalar cell value as decoded from the source sheet.
///
/// Values keep their source type so that an export writes numbers back as
/// numbers. Equality between cells (clusters, token lookup) always goes
/// through [`Value::as_text`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Blank,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// String form used for token lookup and cluster matching.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Blank => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Blank and whitespace-only values are never tokenized.
    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }
}

/// Shortest round-trip form; integral values print without a fraction.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        // -0 prints as "0"
        return "0".to_string();
    }
    format!("{}", n)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Value::Blank
        } else {
            Value::Text(s.to_string())
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Value::Blank
        } else {
            Value::Text(s)
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
