//! Field descriptors and value resolution.
//!
//! A [`MetaField`] is resolved with a fixed precedence:
//!
//! 1. the flag slot, when present and not equal to the decoded default
//! 2. the environment variable, when set to a non-empty string
//! 3. the decoded default
//!
//! A flag passed with the default value is indistinguishable from an unset
//! flag, so an environment value still wins in that case.

use std::collections::HashMap;
use std::fmt;

use crate::error::{PipelineError, Result};

use super::value::{FieldKind, Value};

/// Read access to environment variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Where an evaluated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Env,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Flag => write!(f, "flag"),
            Source::Env => write!(f, "env"),
            Source::Default => write!(f, "default"),
        }
    }
}

/// Descriptor for one tunable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaField {
    /// Binding tag referenced by the config record (e.g. `ImageTag`).
    pub name: &'static str,
    /// Long flag name without dashes.
    pub flag: &'static str,
    pub description: &'static str,
    pub env_key: &'static str,
    pub kind: FieldKind,
    default: Value,
    /// Display form of `default`.
    default_raw: String,
    slot: Option<String>,
}

impl MetaField {
    /// Create a field, verifying the default decodes as `kind`.
    pub fn new(
        name: &'static str,
        flag: &'static str,
        env_key: &'static str,
        kind: FieldKind,
        default: &str,
        description: &'static str,
    ) -> Result<Self> {
        let value = Value::decode(kind, default).map_err(|reason| PipelineError::Decode {
            key: name.to_string(),
            value: default.to_string(),
            reason,
        })?;
        Ok(Self {
            name,
            flag,
            description,
            env_key,
            kind,
            default: value,
            default_raw: default.to_string(),
            slot: None,
        })
    }

    pub fn default_raw(&self) -> &str {
        &self.default_raw
    }

    /// Replace the default from its string form.
    pub fn set_default(&mut self, raw: &str) -> Result<()> {
        self.default = self.decode(raw, self.name)?;
        self.default_raw = raw.to_string();
        Ok(())
    }

    /// Replace the default with an already typed value (used when folding a
    /// config file). List items are kept verbatim.
    pub fn set_default_value(&mut self, value: Value) -> Result<()> {
        if value.kind() != self.kind {
            return Err(self.mismatch(self.kind, value.kind()));
        }
        self.default_raw = value.encode();
        self.default = value;
        Ok(())
    }

    pub fn default_value(&self) -> Result<Value> {
        Ok(self.default.clone())
    }

    /// Raw value written by the CLI parser.
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    pub fn set_slot(&mut self, raw: impl Into<String>) {
        self.slot = Some(raw.into());
    }

    pub fn clear_slot(&mut self) {
        self.slot = None;
    }

    /// Resolve the effective value.
    pub fn evaluate(&self, env: &dyn Environment) -> Result<Value> {
        self.evaluate_with_source(env).map(|(value, _)| value)
    }

    /// Resolve the effective value and report which layer supplied it.
    pub fn evaluate_with_source(&self, env: &dyn Environment) -> Result<(Value, Source)> {
        let default = self.default_value()?;

        if let Some(raw) = &self.slot {
            let flag_value = self.decode(raw, &format!("--{}", self.flag))?;
            if flag_value != default {
                return Ok((flag_value, Source::Flag));
            }
        }

        if let Some(raw) = env.var(self.env_key).filter(|v| !v.is_empty()) {
            return Ok((self.decode(&raw, self.env_key)?, Source::Env));
        }

        Ok((default, Source::Default))
    }

    pub fn evaluate_string(&self, env: &dyn Environment) -> Result<String> {
        match self.evaluate(env)? {
            Value::String(s) => Ok(s),
            other => Err(self.mismatch(FieldKind::String, other.kind())),
        }
    }

    pub fn evaluate_bool(&self, env: &dyn Environment) -> Result<bool> {
        match self.evaluate(env)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.mismatch(FieldKind::Bool, other.kind())),
        }
    }

    pub fn evaluate_int(&self, env: &dyn Environment) -> Result<i64> {
        match self.evaluate(env)? {
            Value::Int(i) => Ok(i),
            other => Err(self.mismatch(FieldKind::Int, other.kind())),
        }
    }

    pub fn evaluate_list(&self, env: &dyn Environment) -> Result<Vec<String>> {
        match self.evaluate(env)? {
            Value::List(items) => Ok(items),
            other => Err(self.mismatch(FieldKind::List, other.kind())),
        }
    }

    fn decode(&self, raw: &str, key: &str) -> Result<Value> {
        Value::decode(self.kind, raw).map_err(|reason| PipelineError::Decode {
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        })
    }

    fn mismatch(&self, expected: FieldKind, actual: FieldKind) -> PipelineError {
        PipelineError::TypeMismatch {
            field: self.name.to_string(),
            expected: expected.as_str(),
            actual: actual.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn tag_field() -> MetaField {
        MetaField::new(
            "ImageTag",
            "tag",
            "WFE_IMAGE_TAG",
            FieldKind::String,
            "my-app:latest",
            "Full image tag",
        )
        .unwrap()
    }

    #[test]
    fn test_env_used_when_flag_unset() {
        let field = tag_field();
        let value = field
            .evaluate_string(&env(&[("WFE_IMAGE_TAG", "x:1")]))
            .unwrap();
        assert_eq!(value, "x:1");
    }

    #[test]
    fn test_flag_overrides_env() {
        let mut field = tag_field();
        field.set_slot("y:2");
        let (value, source) = field
            .evaluate_with_source(&env(&[("WFE_IMAGE_TAG", "x:1")]))
            .unwrap();
        assert_eq!(value, Value::String("y:2".into()));
        assert_eq!(source, Source::Flag);
    }

    #[test]
    fn test_flag_equal_to_default_is_ignored() {
        let mut field = tag_field();
        field.set_slot("my-app:latest");
        let (value, source) = field
            .evaluate_with_source(&env(&[("WFE_IMAGE_TAG", "x:1")]))
            .unwrap();
        assert_eq!(value, Value::String("x:1".into()));
        assert_eq!(source, Source::Env);
    }

    #[test]
    fn test_empty_env_counts_as_unset() {
        let field = tag_field();
        let (value, source) = field
            .evaluate_with_source(&env(&[("WFE_IMAGE_TAG", "")]))
            .unwrap();
        assert_eq!(value, Value::String("my-app:latest".into()));
        assert_eq!(source, Source::Default);
    }

    #[test]
    fn test_bool_default_equality_uses_decoded_value() {
        let mut field = MetaField::new(
            "ImageBuildSquashLayers",
            "squash-layers",
            "WFE_IMAGE_BUILD_SQUASH_LAYERS",
            FieldKind::Bool,
            "false",
            "",
        )
        .unwrap();
        // "off" decodes to the default, so the env value wins
        field.set_slot("off");
        let value = field
            .evaluate_bool(&env(&[("WFE_IMAGE_BUILD_SQUASH_LAYERS", "yes")]))
            .unwrap();
        assert!(value);
    }

    #[test]
    fn test_bad_env_value_is_decode_error() {
        let field = MetaField::new("Flag", "flag", "WFE_FLAG", FieldKind::Bool, "true", "").unwrap();
        let err = field
            .evaluate(&env(&[("WFE_FLAG", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { ref key, .. } if key == "WFE_FLAG"));
    }

    #[test]
    fn test_bad_default_rejected_at_construction() {
        let result = MetaField::new("Interval", "interval", "WFE_I", FieldKind::Int, "soon", "");
        assert!(result.is_err());
    }

    #[test]
    fn test_typed_accessor_mismatch() {
        let field = tag_field();
        let err = field.evaluate_bool(&HashMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::TypeMismatch { .. }));
    }

    #[test]
    fn test_set_default_validates() {
        let mut field =
            MetaField::new("Interval", "interval", "WFE_I", FieldKind::Int, "5", "").unwrap();
        assert!(field.set_default("abc").is_err());
        assert_eq!(field.default_raw(), "5");
        field.set_default("10").unwrap();
        assert_eq!(field.evaluate_int(&HashMap::new()).unwrap(), 10);
    }

    #[test]
    fn test_precedence_law_random_triples() {
        const DEFAULT: &str = "d";
        let mut rng = rand::thread_rng();

        for _ in 0..500 {
            // Each layer is unset, equal to the default, or a distinct value.
            let pick = |rng: &mut rand::rngs::ThreadRng, name: &str| -> Option<String> {
                match rng.gen_range(0..3) {
                    0 => None,
                    1 => Some(DEFAULT.to_string()),
                    _ => Some(format!("{name}{}", rng.gen_range(0..4))),
                }
            };
            let flag = pick(&mut rng, "f");
            let env_value = pick(&mut rng, "e");

            let mut field =
                MetaField::new("Field", "field", "WFE_FIELD", FieldKind::String, DEFAULT, "")
                    .unwrap();
            if let Some(f) = &flag {
                field.set_slot(f.clone());
            }
            let mut vars = HashMap::new();
            if let Some(e) = &env_value {
                vars.insert("WFE_FIELD".to_string(), e.clone());
            }

            let expected = match (&flag, &env_value) {
                (Some(f), _) if f != DEFAULT => f.clone(),
                (_, Some(e)) => e.clone(),
                _ => DEFAULT.to_string(),
            };
            assert_eq!(
                field.evaluate_string(&vars).unwrap(),
                expected,
                "flag={flag:?} env={env_value:?}"
            );
        }
    }

    #[test]
    fn test_set_default_value_checks_kind() {
        let mut field = tag_field();
        assert!(field.set_default_value(Value::Bool(true)).is_err());
        field
            .set_default_value(Value::String("file:1".into()))
            .unwrap();
        assert_eq!(field.default_raw(), "file:1");
        assert_eq!(field.evaluate(&HashMap::new()).unwrap(), Value::String("file:1".into()));
    }
}
