use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("`{path}` already exists")]
    AlreadyExists { path: String },

    #[error("`{path}` does not exist")]
    NotFound { path: String },

    #[error("`{path}` is a dataset, expected a group")]
    NotAGroup { path: String },

    #[error("`{path}` is a group, expected a dataset")]
    NotADataset { path: String },

    #[error("invalid link name {name:?}")]
    InvalidName { name: String },

    #[error("shape {shape:?} does not hold {len} elements")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("not a cardstore container (bad magic)")]
    BadMagic,

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("container truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("failed to encode container: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode container: {0}")]
    Decode(#[source] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContainerError>;
