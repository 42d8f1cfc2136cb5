//! Exit codes for the sdx-report CLI.
//!
//! Exit code ranges:
//! - 0-1: Outputs written (1 when the run carried warnings)
//! - 10-19: User errors (bad arguments, job or branding file)
//! - 20-29: Internal errors

/// Process exit codes. Stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// All requested outputs written without warnings
    Clean = 0,

    /// Outputs written; the manifest lists warnings
    Warnings = 1,

    /// Invalid arguments, job or branding configuration
    ArgsError = 10,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error reading inputs or writing outputs
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Name used in JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Warnings => "OK_WARNINGS",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::Warnings.as_i32(), 1);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::IoError.to_string(), "ERR_IO (21)");
        assert_eq!(i32::from(ExitCode::Warnings), 1);
    }
}
