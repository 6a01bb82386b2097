use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: String, message: String },
    Parse { path: String, message: String },
    InvalidSeparator(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {path}: {message}"),
            Self::Parse { path, message } => write!(f, "invalid settings in {path}: {message}"),
            Self::InvalidSeparator(s) => {
                write!(f, "separator must be a single ASCII character or \"tab\", got {s:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
