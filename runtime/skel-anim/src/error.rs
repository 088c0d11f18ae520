use thiserror::Error;

/// Error types for building and editing animation controllers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimError {
    /// A name or handle did not resolve. Stale arena keys end up here too.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// A fixed-size table is full
    #[error("Capacity exceeded: {what} is limited to {max} entries")]
    CapacityExceeded { what: &'static str, max: usize },

    /// Something with the same identity already exists
    #[error("Duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },

    /// A rig or skeleton description could not be turned into runtime data
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

impl AnimError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
