use std::fmt;

use cardstore_container::ContainerError;
use cardstore_model::ModelError;
use thiserror::Error;

/// Where in a document an error or diagnostic arose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub collection: String,
    pub type_tag: Option<String>,
    pub attribute: Option<String>,
}

impl Location {
    /// The document as a whole.
    pub fn document() -> Self {
        Self::default()
    }

    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_type(&self, tag: &str) -> Self {
        Self {
            type_tag: Some(tag.to_string()),
            attribute: None,
            ..self.clone()
        }
    }

    pub fn with_attribute(&self, name: &str) -> Self {
        Self {
            attribute: Some(name.to_string()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collection.is_empty() {
            f.write_str("<document>")?;
        } else {
            f.write_str(&self.collection)?;
        }
        if let Some(tag) = &self.type_tag {
            write!(f, "/{tag}")?;
        }
        if let Some(attr) = &self.attribute {
            write!(f, ".{attr}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{location}: unknown type tag `{tag}`")]
    UnknownType { location: Location, tag: String },

    #[error("{location}: unsupported attribute value: {detail}")]
    UnsupportedAttribute { location: Location, detail: String },

    #[error("{location}: malformed stored attribute: {detail}")]
    MalformedAttribute { location: Location, detail: String },

    #[error("unrecognized section `{name}`")]
    UnrecognizedSection { name: String },

    #[error("{location}: text cannot be represented as {encoding}")]
    EncodingMismatch {
        location: Location,
        encoding: &'static str,
    },

    #[error("unsupported text encoding `{label}`")]
    UnsupportedEncoding { label: String },

    #[error("document has no `{name}` header")]
    MissingHeader { name: &'static str },

    #[error("section `{name}` entered twice")]
    SectionReentered { name: String },

    #[error("{location}: matrix collections hold one type, found `{first}` and `{second}`")]
    MixedMatrixTypes {
        location: Location,
        first: String,
        second: String,
    },

    #[error("{location}: {source}")]
    Container {
        location: Location,
        #[source]
        source: ContainerError,
    },

    #[error("{location}: {source}")]
    Model {
        location: Location,
        #[source]
        source: ModelError,
    },
}

impl CodecError {
    pub fn unsupported(location: &Location, detail: impl Into<String>) -> Self {
        CodecError::UnsupportedAttribute {
            location: location.clone(),
            detail: detail.into(),
        }
    }

    pub fn malformed(location: &Location, detail: impl Into<String>) -> Self {
        CodecError::MalformedAttribute {
            location: location.clone(),
            detail: detail.into(),
        }
    }

    /// Attach `location` to a model error, turning registry misses into
    /// [`CodecError::UnknownType`].
    pub fn model(location: &Location, source: ModelError) -> Self {
        match source {
            ModelError::UnknownType { tag } => CodecError::UnknownType {
                location: location.with_type(&tag),
                tag,
            },
            source => CodecError::Model {
                location: location.clone(),
                source,
            },
        }
    }

    pub fn container(location: &Location, source: ContainerError) -> Self {
        CodecError::Container {
            location: location.clone(),
            source,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            CodecError::UnknownType { location, .. }
            | CodecError::UnsupportedAttribute { location, .. }
            | CodecError::MalformedAttribute { location, .. }
            | CodecError::EncodingMismatch { location, .. }
            | CodecError::MixedMatrixTypes { location, .. }
            | CodecError::Container { location, .. }
            | CodecError::Model { location, .. } => Some(location),
            CodecError::UnrecognizedSection { .. }
            | CodecError::UnsupportedEncoding { .. }
            | CodecError::MissingHeader { .. }
            | CodecError::SectionReentered { .. } => None,
        }
    }
}

impl From<ContainerError> for CodecError {
    fn from(source: ContainerError) -> Self {
        CodecError::container(&Location::document(), source)
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_renders_collection_type_and_attribute() {
        let loc = Location::collection("nodes").with_type("GRID").with_attribute("xyz");
        assert_eq!(loc.to_string(), "nodes/GRID.xyz");
        assert_eq!(Location::document().to_string(), "<document>");
    }

    #[test]
    fn registry_misses_become_unknown_type() {
        let err = CodecError::model(
            &Location::collection("elements"),
            ModelError::UnknownType { tag: "CFAKE".into() },
        );
        match err {
            CodecError::UnknownType { location, tag } => {
                assert_eq!(tag, "CFAKE");
                assert_eq!(location.type_tag.as_deref(), Some("CFAKE"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
