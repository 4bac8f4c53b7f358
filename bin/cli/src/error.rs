//! Error context for CLI commands.

use postflow_core::AutomationId;
use std::fmt;
use std::path::PathBuf;

/// What the CLI was doing when a lower layer failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// An input file could not be read.
    ReadInput { path: PathBuf },
    /// An automation record could not be decoded.
    InvalidRecord { path: PathBuf },
    /// A consents file is not a consent set.
    InvalidConsents { path: PathBuf },
    /// Output could not be written.
    WriteOutput,
    /// The dry-run service failed outside the lifecycle guards.
    DryRun { automation_id: AutomationId },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadInput { path } => write!(f, "cannot read {}", path.display()),
            Self::InvalidRecord { path } => {
                write!(f, "{} is not a valid automation record", path.display())
            }
            Self::InvalidConsents { path } => {
                write!(f, "{} is not a valid consent set", path.display())
            }
            Self::WriteOutput => write!(f, "cannot write output"),
            Self::DryRun { automation_id } => {
                write!(f, "dry-run activation of {automation_id} failed")
            }
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_file() {
        let err = CliError::InvalidRecord {
            path: PathBuf::from("welcome.json"),
        };
        assert_eq!(err.to_string(), "welcome.json is not a valid automation record");
    }
}
