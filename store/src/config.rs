//! Store configuration.
//!
//! Defines the YAML-serializable configuration that tells a
//! [`SpecStore`](crate::SpecStore) where product and source documents live.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! product_roots:
//!   - product_params
//! source_roots:
//!   - product_inputs
//! extensions:
//!   - yaml
//!   - yml
//! ```
//!
//! Relative roots are resolved against the directory holding the
//! configuration file.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_version() -> String {
    product_spec_core::SPEC_CONTRACT_VERSION.to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string()]
}

/// Locations of specification documents.
///
/// # Examples
///
/// ```
/// use product_spec_store::StoreConfig;
///
/// let config = StoreConfig::new(vec!["params".into()], vec!["inputs".into()]);
/// assert!(config.accepts_extension("yml"));
/// assert!(!config.accepts_extension("json"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Configuration format version (e.g., `"1.0"`).
    #[serde(default = "default_version")]
    pub version: String,
    /// Directories scanned recursively for product documents.
    #[serde(default)]
    pub product_roots: Vec<PathBuf>,
    /// Directories scanned recursively for source documents.
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
    /// File extensions treated as documents, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl StoreConfig {
    /// Creates a configuration with the default extensions.
    pub fn new(product_roots: Vec<PathBuf>, source_roots: Vec<PathBuf>) -> Self {
        Self {
            version: default_version(),
            product_roots,
            source_roots,
            extensions: default_extensions(),
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// Relative roots are rewritten to be relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::StoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: StoreConfig = serde_yaml::from_reader(reader)?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::StoreError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if files with `extension` are treated as documents.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    fn rebase(&mut self, base: &Path) {
        for root in self
            .product_roots
            .iter_mut()
            .chain(self.source_roots.iter_mut())
        {
            if root.is_relative() {
                *root = base.join(&*root);
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
