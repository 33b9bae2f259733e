use std::fmt;

use serde::{Deserialize, Serialize};

/// The value nodes agree on.
///
/// On the wire it is a bare JSON number or string, so the even-number demo
/// (`2`) and beacon values (`"slot7:0xab.."`) share one representation.
///
/// The derived ordering (integers first, then strings) is what the engine
/// uses to break ties between equally supported values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Int(_) => None,
            Value::Text(s) => Some(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_shape() {
        assert_eq!(serde_json::to_string(&Value::Int(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&Value::from("abc")).unwrap(), "\"abc\"");

        let v: Value = serde_json::from_str("12").unwrap();
        assert_eq!(v, Value::Int(12));
        let v: Value = serde_json::from_str("\"beef\"").unwrap();
        assert_eq!(v.as_text(), Some("beef"));
    }

    #[test]
    fn test_ordering_puts_integers_first() {
        let mut values = vec![Value::from("a"), Value::Int(9), Value::Int(-3)];
        values.sort();
        assert_eq!(values, vec![Value::Int(-3), Value::Int(9), Value::from("a")]);
    }
}
