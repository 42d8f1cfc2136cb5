//! CLI error type and its exit-code mapping.

use crate::exit_codes::ExitCode;
use sdx_report::{ConfigurationError, GenerateError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid job file {}: {source}", path.display())]
    Job {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid branding file {}: {source}", path.display())]
    Brand {
        path: PathBuf,
        #[source]
        source: ConfigurationError,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generate(GenerateError),

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[source] serde_json::Error),
}

impl From<GenerateError> for CliError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Configuration(e) => CliError::Configuration(e),
            other => CliError::Generate(other),
        }
    }
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Read { .. } | CliError::Write { .. } => ExitCode::IoError,
            CliError::Job { .. } | CliError::Brand { .. } | CliError::Configuration(_) => {
                ExitCode::ArgsError
            }
            CliError::Generate(_) | CliError::Manifest(_) => ExitCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let io = CliError::Read {
            path: PathBuf::from("job.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(io.exit_code(), ExitCode::IoError);

        let config: CliError = GenerateError::Configuration(ConfigurationError::NoFormats).into();
        assert!(matches!(config, CliError::Configuration(_)));
        assert_eq!(config.exit_code(), ExitCode::ArgsError);
    }
}
