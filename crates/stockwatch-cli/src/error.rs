use std::path::PathBuf;

use thiserror::Error;

/// Exit code for a run that completed but could not quote every symbol or
/// hit a file problem it could work around. No [`CliError`] maps to it.
pub const PARTIAL_FAILURE: u8 = 3;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("watch directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Store(#[from] stockwatch_core::StoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotADirectory(_) => 2,
            Self::Store(_) => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use stockwatch_core::StoreError;

    use super::*;

    #[test]
    fn errors_never_share_the_partial_failure_code() {
        let errors = [
            CliError::NotADirectory(PathBuf::from("missing")),
            CliError::Store(StoreError::NotFound {
                path: PathBuf::from("stocks.json"),
            }),
            CliError::Serialization(
                serde_json::from_str::<u8>("x").expect_err("not a number"),
            ),
            CliError::Io(io::Error::other("disk gone")),
        ];

        for error in &errors {
            assert_ne!(error.exit_code(), PARTIAL_FAILURE, "{error}");
            assert_ne!(error.exit_code(), 0, "{error}");
        }
    }
}
