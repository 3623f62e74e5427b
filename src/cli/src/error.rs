//! CLI error classification and process exit codes.

use thiserror::Error;
use wfe_core::PipelineError;

/// Failure of one CLI invocation, classified by who has to act on it.
#[derive(Error, Debug)]
pub enum CliError {
    /// Bad flags, unknown task or pipeline, undecodable configuration.
    #[error("{0}")]
    UserInput(String),

    /// I/O outside of a task: unreadable config file, closed stdout.
    #[error("{0}")]
    System(String),

    /// A task returned an error.
    #[error("{0}")]
    Command(PipelineError),
}

impl CliError {
    pub const EXIT_USER_INPUT: i32 = 1;
    pub const EXIT_SYSTEM: i32 = 2;
    pub const EXIT_COMMAND: i32 = 3;

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UserInput(_) => Self::EXIT_USER_INPUT,
            CliError::System(_) => Self::EXIT_SYSTEM,
            CliError::Command(_) => Self::EXIT_COMMAND,
        }
    }

    /// Runner exit code behind a task failure, if any.
    pub fn internal_exit_code(&self) -> Option<i32> {
        match self {
            CliError::Command(e) => e.exit_code(),
            _ => None,
        }
    }

    /// Classify an error raised while loading or binding configuration.
    pub fn from_config_error(err: PipelineError) -> Self {
        match err {
            PipelineError::Io(e) => CliError::System(format!("failed to read config: {e}")),
            other => CliError::UserInput(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::System(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::UserInput("x".into()).exit_code(), 1);
        assert_eq!(CliError::System("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Command(PipelineError::Configuration("x".into())).exit_code(),
            3
        );
    }

    #[test]
    fn test_config_error_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            CliError::from_config_error(PipelineError::Io(io)),
            CliError::System(_)
        ));
        assert!(matches!(
            CliError::from_config_error(PipelineError::Serialization("bad".into())),
            CliError::UserInput(_)
        ));
    }

    #[test]
    fn test_internal_exit_code() {
        let err = CliError::Command(PipelineError::Canceled {
            label: "syft".into(),
            code: 231,
        });
        assert_eq!(err.internal_exit_code(), Some(231));
        assert_eq!(CliError::System("x".into()).internal_exit_code(), None);
    }
}
