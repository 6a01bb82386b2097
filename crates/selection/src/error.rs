use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// An edit referenced a stable key that is not in the current catalog.
    UnknownKey(String),
    /// A group toggle referenced a group with no records.
    UnknownGroup(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "no record with key '{key}'"),
            Self::UnknownGroup(group) => write!(f, "no records in group '{group}'"),
        }
    }
}

impl std::error::Error for SelectionError {}
