use domreplay_core::api::ReplayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Command(String),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    // 0: success
    // 11: config error
    // 20: io / bad invocation
    // 50: replay or uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Io(_) => 20,
            CliError::Command(_) => 20,
            CliError::Replay(ReplayError::Config(_)) => 11,
            CliError::Replay(ReplayError::Io(_)) => 20,
            CliError::Replay(_) => 50,
            CliError::Anyhow(_) => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 11);
        assert_eq!(
            CliError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x")).exit_code(),
            20
        );
        assert_eq!(
            CliError::Replay(ReplayError::TooFewEvents { count: 1 }).exit_code(),
            50
        );
        assert_eq!(
            CliError::Replay(ReplayError::Config("speed".into())).exit_code(),
            11
        );
    }
}
