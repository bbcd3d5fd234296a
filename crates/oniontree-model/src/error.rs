use std::path::PathBuf;
use thiserror::Error;

/// A descriptor that cannot be turned into a [`crate::ServiceEntry`].
///
/// Always scoped to a single file; the batch keeps going.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid descriptor YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("descriptor has no name")]
    MissingName,

    #[error("name {name:?} produces an empty slug")]
    EmptySlug { name: String },

    #[error("public key #{index} has no id")]
    MissingKeyId { index: usize },

    #[error("{path} is not under import root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} is not inside a tag directory")]
    MissingTag { path: PathBuf },

    #[error("tag directory of {path} is not valid UTF-8")]
    InvalidTag { path: PathBuf },
}
