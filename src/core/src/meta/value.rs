//! Typed values and their string decoders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Bool,
    Int,
    List,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::List => "list",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded tunable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

impl Value {
    /// Decode `raw` according to `kind`.
    pub fn decode(kind: FieldKind, raw: &str) -> Result<Self, String> {
        match kind {
            FieldKind::String => Ok(Value::String(raw.to_string())),
            FieldKind::Bool => parse_bool(raw).map(Value::Bool),
            FieldKind::Int => parse_int(raw).map(Value::Int),
            FieldKind::List => Ok(Value::List(parse_list(raw))),
        }
    }

    /// Canonical string form; decoding it yields the same value.
    pub fn encode(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::List(items) => items.join(","),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Value::String(_) => FieldKind::String,
            Value::Bool(_) => FieldKind::Bool,
            Value::Int(_) => FieldKind::Int,
            Value::List(_) => FieldKind::List,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Case-insensitive boolean: `y,yes,1,true,on` / `n,no,0,false,off`.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" | "1" | "true" | "on" => Ok(true),
        "n" | "no" | "0" | "false" | "off" => Ok(false),
        other => Err(format!("'{other}' is not a boolean (use yes/no, true/false, on/off, 1/0)")),
    }
}

pub fn parse_int(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| format!("'{}' is not a decimal integer: {e}", raw.trim()))
}

/// Comma-separated list; elements are trimmed and empty ones dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_truthy_tokens() {
        for raw in ["TRUE", " yes ", "1", "on", "Y", "True"] {
            assert_eq!(parse_bool(raw), Ok(true), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_bool_falsy_tokens() {
        for raw in ["No", "0", "off", "false", "n", "OFF"] {
            assert_eq!(parse_bool(raw), Ok(false), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_bool_rejects_other_words() {
        assert!(parse_bool("maybe").is_err());
        assert!(parse_bool("").is_err());
        assert!(parse_bool("2").is_err());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int(" -7 "), Ok(-7));
        assert!(parse_int("4.2").is_err());
        assert!(parse_int("ten").is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a,b, c"), vec!["a", "b", "c"]);
        assert_eq!(parse_list(""), Vec::<String>::new());
        assert_eq!(parse_list("a,,b,"), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_encode_is_stable() {
        let samples = [
            (FieldKind::Bool, "on"),
            (FieldKind::Bool, "NO"),
            (FieldKind::Int, "1000"),
            (FieldKind::List, "sbom.json,grype.json"),
            (FieldKind::String, "my-app:latest"),
        ];
        for (kind, raw) in samples {
            let value = Value::decode(kind, raw).unwrap();
            assert_eq!(value.kind(), kind);
            assert_eq!(Value::decode(kind, &value.encode()).unwrap(), value);
        }
    }
}
