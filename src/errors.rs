//! Error types for codesum.

use std::path::PathBuf;

use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type for codesum operations.
#[derive(Debug, thiserror::Error)]
pub enum CodesumError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(WalkError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl From<WalkError> for CodesumError {
    /// Problems with the scan root get their own variants so they map to
    /// distinct exit codes.
    fn from(err: WalkError) -> Self {
        match err {
            WalkError::NotFound { path } => CodesumError::PathNotFound(path),
            WalkError::NotADirectory { path } => CodesumError::NotADirectory(path),
            WalkError::PermissionDenied { path } => CodesumError::PermissionDenied(path),
            other => CodesumError::Walk(other),
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &CodesumError) -> i32 {
    match error {
        CodesumError::PathNotFound(_) => 3,
        CodesumError::PermissionDenied(_) => 4,
        CodesumError::Walk(_) => 2,
        CodesumError::NotADirectory(_)
        | CodesumError::Io(_)
        | CodesumError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_errors_are_lifted() {
        let err: CodesumError = WalkError::NotFound {
            path: PathBuf::from("missing"),
        }
        .into();
        assert!(matches!(err, CodesumError::PathNotFound(_)));
        assert_eq!(exit_code(&err), 3);

        let err: CodesumError = WalkError::PermissionDenied {
            path: PathBuf::from("locked"),
        }
        .into();
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn test_other_walk_errors_keep_walk_code() {
        let source = glob::Pattern::new("[").unwrap_err();
        let err: CodesumError = WalkError::InvalidPattern {
            pattern: "[".into(),
            source,
        }
        .into();
        assert!(matches!(err, CodesumError::Walk(_)));
        assert_eq!(exit_code(&err), 2);
        assert!(err.to_string().contains("invalid exclude pattern"));
    }

    #[test]
    fn test_output_errors_exit_one() {
        let err: CodesumError = OutputError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(exit_code(&err), 1);
    }
}
