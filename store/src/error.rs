//! Error types for specification store operations.
//!
//! Provides a unified error type covering all failure modes: I/O, YAML
//! parsing, missing documents and missing keys within documents.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which family of document a lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Product-level document, keyed by product name.
    Product,
    /// Source-level document, keyed by source name then product name.
    Source,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => write!(f, "product"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure outside a specification
    /// document (e.g. the store configuration).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No document with the requested name was discovered.
    #[error("no {kind} specification named '{name}'")]
    NotFound { kind: DocumentKind, name: String },

    /// A document could not be parsed, or its top level is not a mapping.
    #[error("invalid specification document {}: {reason}", path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    /// A product's base fields or a source's fragment for it is present but
    /// not a mapping.
    #[error("product '{product}' must be a mapping, found {found} in {}", path.display())]
    NotAMapping {
        product: String,
        path: PathBuf,
        found: &'static str,
    },

    /// A source document does not have the source name as a top-level key.
    #[error("source '{source_name}' not defined as a top-level key in {}", path.display())]
    SourceKeyMissing { source_name: String, path: PathBuf },

    /// A product document does not have the product name as a top-level key.
    #[error("product '{product}' not defined as a top-level key in {}", path.display())]
    ProductKeyMissing { product: String, path: PathBuf },

    /// The source exists but does not offer the product.
    #[error("product '{product}' not offered by source '{source_name}' ({})", display_paths(files))]
    ProductNotOffered {
        product: String,
        source_name: String,
        files: Vec<PathBuf>,
    },

    /// The store was built without any product or source root.
    #[error("no specification roots configured")]
    NoRootsConfigured,
}

impl StoreError {
    /// Returns `true` for errors that mean "this lookup has no answer":
    /// a missing document or a missing key within one.
    ///
    /// Parse and I/O failures return `false`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::SourceKeyMissing { .. }
                | Self::ProductKeyMissing { .. }
                | Self::ProductNotOffered { .. }
        )
    }
}

fn display_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
