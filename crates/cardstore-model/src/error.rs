use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown type tag `{tag}`")]
    UnknownType { tag: String },

    #[error("type tag `{tag}` is already registered")]
    DuplicateType { tag: String },

    #[error("invalid schema for `{tag}`: {reason}")]
    InvalidSchema { tag: String, reason: String },

    #[error("`{name}` is not a declared collection")]
    UnknownCollection { name: String },

    #[error("collection `{collection}` requires a key")]
    KeyRequired { collection: String },

    #[error("collection `{collection}` is not keyed")]
    KeyNotAllowed { collection: String },

    #[error("collection `{collection}` does not accept key `{key}`")]
    KeyKindMismatch { collection: String, key: String },

    #[error("duplicate key `{key}` in `{collection}`")]
    DuplicateKey { collection: String, key: String },

    #[error("scalar collection `{collection}` is already set")]
    ScalarAlreadySet { collection: String },

    #[error("`{name}` is not a declared option")]
    UnknownOption { name: String },

    #[error("`{name}` holds {expected} values, got {found}")]
    ValueKindMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{name}` is not a declared primitive list")]
    UnknownList { name: String },

    #[error("bookkeeping for `{tag}` is inconsistent: {reason}")]
    BookkeepingMismatch { tag: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
