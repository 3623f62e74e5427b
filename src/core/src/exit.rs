//! Exit codes for child processes driven by the runner.
//!
//! Codes below 256 are propagated from the child; the reserved values above
//! 229 describe what happened around the child (cancellation, spawn failure,
//! missing configuration).

use std::fmt;

use crate::error::{PipelineError, Result};

/// Outcome of one child-process invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Child exited zero (or a dry run).
    Ok,
    /// Child exited with a non-zero code.
    Child(i32),
    /// The context fired but terminating the child failed.
    KillFailure,
    /// The context fired and the child was terminated.
    ContextCancel,
    /// Spawn failed or the child ended without an exit code.
    Unknown,
    /// A required option was missing.
    BadConfiguration,
}

impl ExitCode {
    pub const KILL_FAILURE: i32 = 230;
    pub const CONTEXT_CANCEL: i32 = 231;
    pub const UNKNOWN: i32 = 232;
    pub const BAD_CONFIGURATION: i32 = 299;

    pub fn code(&self) -> i32 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::Child(code) => *code,
            ExitCode::KillFailure => Self::KILL_FAILURE,
            ExitCode::ContextCancel => Self::CONTEXT_CANCEL,
            ExitCode::Unknown => Self::UNKNOWN,
            ExitCode::BadConfiguration => Self::BAD_CONFIGURATION,
        }
    }

    /// Classify a raw child exit status code.
    pub fn from_child(code: i32) -> Self {
        if code == 0 {
            ExitCode::Ok
        } else {
            ExitCode::Child(code)
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExitCode::Ok)
    }

    /// Map the exit code onto the error kinds surfaced by tasks.
    pub fn into_result(self, label: &str) -> Result<()> {
        let label = label.to_string();
        let code = self.code();
        match self {
            ExitCode::Ok => Ok(()),
            ExitCode::Child(_) => Err(PipelineError::ChildFailure { label, code }),
            ExitCode::ContextCancel => Err(PipelineError::Canceled { label, code }),
            ExitCode::KillFailure => Err(PipelineError::KillFailed { label, code }),
            ExitCode::Unknown => Err(PipelineError::Spawn { label, code }),
            ExitCode::BadConfiguration => Err(PipelineError::Configuration(format!(
                "{label}: bad configuration (exit {code})"
            ))),
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Ok => write!(f, "ok"),
            ExitCode::Child(code) => write!(f, "exit {code}"),
            ExitCode::KillFailure => write!(f, "kill failure ({})", Self::KILL_FAILURE),
            ExitCode::ContextCancel => write!(f, "context canceled ({})", Self::CONTEXT_CANCEL),
            ExitCode::Unknown => write!(f, "unknown ({})", Self::UNKNOWN),
            ExitCode::BadConfiguration => {
                write!(f, "bad configuration ({})", Self::BAD_CONFIGURATION)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_codes_are_stable() {
        assert_eq!(ExitCode::Ok.code(), 0);
        assert_eq!(ExitCode::KillFailure.code(), 230);
        assert_eq!(ExitCode::ContextCancel.code(), 231);
        assert_eq!(ExitCode::Unknown.code(), 232);
        assert_eq!(ExitCode::BadConfiguration.code(), 299);
    }

    #[test]
    fn test_from_child() {
        assert_eq!(ExitCode::from_child(0), ExitCode::Ok);
        assert_eq!(ExitCode::from_child(4), ExitCode::Child(4));
        assert_eq!(ExitCode::from_child(4).code(), 4);
    }

    #[test]
    fn test_into_result_maps_error_kinds() {
        assert!(ExitCode::Ok.into_result("syft").is_ok());
        assert!(matches!(
            ExitCode::Child(2).into_result("syft"),
            Err(PipelineError::ChildFailure { code: 2, .. })
        ));
        assert!(matches!(
            ExitCode::ContextCancel.into_result("syft"),
            Err(PipelineError::Canceled { code: 231, .. })
        ));
        assert!(matches!(
            ExitCode::KillFailure.into_result("syft"),
            Err(PipelineError::KillFailed { code: 230, .. })
        ));
        assert!(matches!(
            ExitCode::Unknown.into_result("syft"),
            Err(PipelineError::Spawn { code: 232, .. })
        ));
        assert!(matches!(
            ExitCode::BadConfiguration.into_result("syft"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::Child(3).to_string(), "exit 3");
        assert_eq!(ExitCode::ContextCancel.to_string(), "context canceled (231)");
    }
}
