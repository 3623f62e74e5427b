use std::fmt;

use thiserror::Error;

/// Workflow engine error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Unknown task, unknown CLI interface, missing field descriptor
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more required options are missing or invalid
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A string could not be decoded into the declared field type
    #[error("Decode error: {key}={value:?}: {reason}")]
    Decode {
        key: String,
        value: String,
        reason: String,
    },

    /// A typed accessor was used on a field of another kind
    #[error("Type mismatch: {field} is {actual}, not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The child process could not be started
    #[error("{label}: failed to start child process (exit {code})")]
    Spawn { label: String, code: i32 },

    /// The child process exited non-zero
    #[error("{label}: child process exited with code {code}")]
    ChildFailure { label: String, code: i32 },

    /// The context ended before the child exited
    #[error("{label}: canceled before the child process exited (exit {code})")]
    Canceled { label: String, code: i32 },

    /// The context ended and terminating the child failed
    #[error("{label}: failed to terminate child process (exit {code})")]
    KillFailed { label: String, code: i32 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Several independent failures, reported together
    #[error("{}", join_errors(.0))]
    Joined(Vec<PipelineError>),
}

impl PipelineError {
    /// Internal exit code carried by this error, when it came from a child process.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::Spawn { code, .. }
            | PipelineError::ChildFailure { code, .. }
            | PipelineError::Canceled { code, .. }
            | PipelineError::KillFailed { code, .. } => Some(*code),
            PipelineError::Validation(_) => Some(crate::exit::ExitCode::BadConfiguration.code()),
            _ => None,
        }
    }

    /// Whether the error stems from configuration rather than execution.
    pub fn is_configuration(&self) -> bool {
        match self {
            PipelineError::Configuration(_)
            | PipelineError::Validation(_)
            | PipelineError::Decode { .. }
            | PipelineError::TypeMismatch { .. } => true,
            PipelineError::Joined(errors) => errors.iter().all(|e| e.is_configuration()),
            _ => false,
        }
    }

    /// Combine a list of errors. Returns `Ok` for an empty list and the
    /// error itself for a single entry.
    pub fn join(mut errors: Vec<PipelineError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(PipelineError::Joined(errors)),
        }
    }
}

fn join_errors(errors: &[PipelineError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(err: toml::ser::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ValidationErrors> for PipelineError {
    fn from(errors: ValidationErrors) -> Self {
        PipelineError::Validation(errors)
    }
}

/// Accumulates validation messages so every missing parameter is reported at once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` when `value` is empty.
    pub fn require(&mut self, value: &str, message: impl Into<String>) {
        if value.trim().is_empty() {
            self.messages.push(message.into());
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// `Ok(())` when nothing was recorded, otherwise a single joined error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("\n"))
    }
}

/// Result type alias for workflow engine operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_join_every_message() {
        let mut errs = ValidationErrors::new();
        errs.require("", "Dockerfile required");
        errs.require("  ", "context required");
        errs.require("present", "never reported");

        let err = errs.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Dockerfile required\ncontext required");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validation_errors_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_decode_error_display() {
        let error = PipelineError::Decode {
            key: "WFE_IMAGE_BUILD_SQUASH_LAYERS".to_string(),
            value: "maybe".to_string(),
            reason: "not a boolean".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Decode error: WFE_IMAGE_BUILD_SQUASH_LAYERS=\"maybe\": not a boolean"
        );
    }

    #[test]
    fn test_child_failure_carries_exit_code() {
        let error = PipelineError::ChildFailure {
            label: "grype".to_string(),
            code: 7,
        };
        assert_eq!(error.exit_code(), Some(7));
        assert!(!error.is_configuration());
        assert_eq!(error.to_string(), "grype: child process exited with code 7");
    }

    #[test]
    fn test_join_single_and_many() {
        assert!(PipelineError::join(vec![]).is_ok());

        let single = PipelineError::join(vec![PipelineError::Configuration("a".into())]);
        assert!(matches!(single, Err(PipelineError::Configuration(_))));

        let many = PipelineError::join(vec![
            PipelineError::Configuration("a".into()),
            PipelineError::ChildFailure {
                label: "semgrep".into(),
                code: 1,
            },
        ])
        .unwrap_err();
        assert!(matches!(many, PipelineError::Joined(ref v) if v.len() == 2));
        assert!(many.to_string().contains("Configuration error: a\n"));
        assert!(!many.is_configuration());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: PipelineError = io_error.into();
        assert!(matches!(error, PipelineError::Io(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ bad");
        let error: PipelineError = result.unwrap_err().into();
        assert!(matches!(error, PipelineError::Serialization(_)));
    }
}
