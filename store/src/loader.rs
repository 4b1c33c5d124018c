//! Specification document discovery and product resolution.
//!
//! Provides [`SpecStore`] for looking up product and source documents by
//! name, and [`StoreBuilder`] for configuring where they live.
//!
//! # Loading patterns
//!
//! ```no_run
//! use product_spec_store::{SpecStore, StoreConfig};
//!
//! // One product root and one source root
//! let store = SpecStore::from_dirs("yaml_configs/product_params", "yaml_configs/product_inputs").unwrap();
//! let product = store.get_product("IR-BD", "ahi").unwrap();
//! assert_eq!(product.fields["source_input"], "ahi");
//!
//! // From a configuration file
//! let config = StoreConfig::load("yaml_configs/store.yaml").unwrap();
//! let store = SpecStore::from_config(&config).unwrap();
//!
//! // Use the builder for several roots
//! let store = SpecStore::builder()
//!     .product_root("yaml_configs/product_params")
//!     .product_root("/opt/site/product_params")
//!     .source_root("yaml_configs/product_inputs")
//!     .build()
//!     .unwrap();
//! ```
//!
//! Roots are scanned once, when the store is built. Each document is parsed
//! on first access and the result, including a parse failure, is cached for
//! the store's lifetime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use product_spec_core::{
    FieldMap, MergeStrategy, ProductCatalog, ResolvedProduct, merge_fields, overridden_keys,
    resolve_fields, validate_product_fields,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::{DocumentKind, Result, StoreError};

/// One discovered document file.
#[derive(Debug)]
struct DocumentEntry {
    path: PathBuf,
    parsed: OnceLock<std::result::Result<FieldMap, String>>,
}

impl DocumentEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            parsed: OnceLock::new(),
        }
    }

    fn contents(&self) -> Result<&FieldMap> {
        self.parsed
            .get_or_init(|| parse_document(&self.path))
            .as_ref()
            .map_err(|reason| StoreError::InvalidDocument {
                path: self.path.clone(),
                reason: reason.clone(),
            })
    }
}

fn parse_document(path: &Path) -> std::result::Result<FieldMap, String> {
    debug!(path = %path.display(), "parsing specification document");
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| e.to_string())?;
    // Through serde_json so numeric YAML keys become string keys.
    match serde_json::to_value(yaml).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(FieldMap::new()),
        other => Err(format!(
            "top level must be a mapping, found {}",
            value_kind(&other)
        )),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Reads `value` as a mapping, treating null as empty.
fn as_mapping(value: &Value, path: &Path, what: &str) -> Result<FieldMap> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(FieldMap::new()),
        other => Err(StoreError::InvalidDocument {
            path: path.to_path_buf(),
            reason: format!("{what} must be a mapping, found {}", value_kind(other)),
        }),
    }
}

/// Reads one product's fields, failing with [`StoreError::NotAMapping`].
fn product_mapping(value: &Value, path: &Path, product: &str) -> Result<FieldMap> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(FieldMap::new()),
        other => Err(StoreError::NotAMapping {
            product: product.to_string(),
            path: path.to_path_buf(),
            found: value_kind(other),
        }),
    }
}

/// A product document: base fields keyed by product name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDocument {
    pub product_name: String,
    pub path: PathBuf,
    /// The document's whole top-level mapping.
    pub contents: FieldMap,
}

impl ProductDocument {
    /// Returns the base fields declared under the product's own key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductKeyMissing`] if the document lacks the
    /// key, or [`StoreError::NotAMapping`] if the value is not a mapping.
    pub fn base_fields(&self) -> Result<FieldMap> {
        let value = self
            .contents
            .get(&self.product_name)
            .ok_or_else(|| StoreError::ProductKeyMissing {
                product: self.product_name.clone(),
                path: self.path.clone(),
            })?;
        product_mapping(value, &self.path, &self.product_name)
    }
}

/// A source's product fragments, merged across every document for that
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source_name: String,
    /// Documents merged, in merge order.
    pub paths: Vec<PathBuf>,
    /// Product name to override fragment.
    pub products: FieldMap,
}

impl SourceDocument {
    /// Returns the override fragment for `product_name`, if the source
    /// offers it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAMapping`] if the fragment is not a mapping.
    pub fn fragment(&self, product_name: &str) -> Result<Option<FieldMap>> {
        let Some(value) = self.products.get(product_name) else {
            return Ok(None);
        };
        let path = self.paths.last().map(PathBuf::as_path).unwrap_or(Path::new(""));
        product_mapping(value, path, product_name).map(Some)
    }

    /// Names of the products this source offers, sorted.
    pub fn product_names(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }
}

/// Read-only index of product and source documents.
///
/// Documents are indexed by file stem, so `product_params/visir/IR-BD.yaml`
/// is the product document for `IR-BD`. Several source documents may share
/// a stem. They are merged in path order.
///
/// # Examples
///
/// ```no_run
/// use product_spec_store::SpecStore;
///
/// let store = SpecStore::from_dirs("product_params", "product_inputs").unwrap();
/// for product in store.product_names() {
///     println!("{product}");
/// }
/// let catalog = store.list_products();
/// println!("{} valid pairs", catalog.pair_count());
/// ```
#[derive(Debug)]
pub struct SpecStore {
    products: BTreeMap<String, Vec<DocumentEntry>>,
    sources: BTreeMap<String, Vec<DocumentEntry>>,
    config: StoreConfig,
}

impl SpecStore {
    /// Returns a new [`StoreBuilder`].
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Builds a store from one product root and one source root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if either directory does not exist or
    /// cannot be read.
    pub fn from_dirs(products: impl Into<PathBuf>, sources: impl Into<PathBuf>) -> Result<Self> {
        Self::builder()
            .product_root(products)
            .source_root(sources)
            .build()
    }

    /// Builds a store from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRootsConfigured`] if the configuration names
    /// no roots, or [`StoreError::Io`] if a root cannot be read.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        if config.product_roots.is_empty() && config.source_roots.is_empty() {
            return Err(StoreError::NoRootsConfigured);
        }

        let products = scan_roots(&config.product_roots, config)?;
        let sources = scan_roots(&config.source_roots, config)?;
        info!(
            products = products.len(),
            sources = sources.len(),
            "indexed specification documents"
        );

        Ok(Self {
            products,
            sources,
            config: config.clone(),
        })
    }

    /// Returns the configuration this store was built from.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Product names with at least one document, sorted.
    pub fn product_names(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    /// Source names with at least one document, sorted.
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Returns the product document named `product_name`.
    ///
    /// If several documents share the name, the last in path order wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no document has that name, or
    /// [`StoreError::InvalidDocument`] if it cannot be parsed.
    pub fn get_product_specs(&self, product_name: &str) -> Result<ProductDocument> {
        let entries = self
            .products
            .get(product_name)
            .ok_or_else(|| StoreError::NotFound {
                kind: DocumentKind::Product,
                name: product_name.to_string(),
            })?;

        let Some(entry) = entries.last() else {
            return Err(StoreError::NotFound {
                kind: DocumentKind::Product,
                name: product_name.to_string(),
            });
        };
        if entries.len() > 1 {
            warn!(
                product = product_name,
                used = %entry.path.display(),
                count = entries.len(),
                "multiple product documents share a name, using the last"
            );
        }

        Ok(ProductDocument {
            product_name: product_name.to_string(),
            path: entry.path.clone(),
            contents: entry.contents()?.clone(),
        })
    }

    /// Returns every source document named `source_name`, merged.
    ///
    /// Each document must declare `source_name` as a top-level key. The
    /// fragments under it are merged in path order with
    /// [`MergeStrategy::Deep`], so later documents win on conflicting leaves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no document has that name,
    /// [`StoreError::SourceKeyMissing`] if one lacks the source key, or
    /// [`StoreError::InvalidDocument`] if one cannot be parsed.
    pub fn get_source_inputs(&self, source_name: &str) -> Result<SourceDocument> {
        let entries = self
            .sources
            .get(source_name)
            .ok_or_else(|| StoreError::NotFound {
                kind: DocumentKind::Source,
                name: source_name.to_string(),
            })?;

        let mut products = FieldMap::new();
        let mut paths = Vec::with_capacity(entries.len());
        for entry in entries {
            let contents = entry.contents()?;
            let value = contents
                .get(source_name)
                .ok_or_else(|| StoreError::SourceKeyMissing {
                    source_name: source_name.to_string(),
                    path: entry.path.clone(),
                })?;
            let fragment = as_mapping(value, &entry.path, &format!("source '{source_name}'"))?;
            products = merge_fields(&products, &fragment, MergeStrategy::Deep);
            paths.push(entry.path.clone());
        }

        Ok(SourceDocument {
            source_name: source_name.to_string(),
            paths,
            products,
        })
    }

    /// Resolves one (product, source) pair.
    ///
    /// The source's fragment for the product overrides the product's base
    /// fields, then `source_input` and `product_name` are stamped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if either document is missing,
    /// [`StoreError::ProductKeyMissing`] if the product document lacks the
    /// product key, [`StoreError::ProductNotOffered`] if the source does not
    /// list the product, or [`StoreError::InvalidDocument`] on parse failure.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use product_spec_store::{SpecStore, StoreError};
    ///
    /// let store = SpecStore::from_dirs("product_params", "product_inputs").unwrap();
    /// match store.get_product("IR-BD", "NoSuchSource") {
    ///     Err(StoreError::NotFound { .. }) => {}
    ///     other => panic!("unexpected: {other:?}"),
    /// }
    /// ```
    pub fn get_product(&self, product_name: &str, source_name: &str) -> Result<ResolvedProduct> {
        let product_doc = self.get_product_specs(product_name)?;
        let source_doc = self.get_source_inputs(source_name)?;

        let base = product_doc.base_fields()?;
        let fragment =
            source_doc
                .fragment(product_name)?
                .ok_or_else(|| StoreError::ProductNotOffered {
                    product: product_name.to_string(),
                    source_name: source_name.to_string(),
                    files: source_doc.paths.clone(),
                })?;

        let (replaced, added) = overridden_keys(&base, &fragment);
        for key in replaced {
            debug!(product = product_name, source = source_name, key, "replacing key from source");
        }
        for key in added {
            debug!(product = product_name, source = source_name, key, "adding key from source");
        }

        let fields = resolve_fields(product_name, source_name, &base, &fragment);
        let mut yaml_files = vec![product_doc.path];
        yaml_files.extend(source_doc.paths);

        Ok(ResolvedProduct::new(product_name, source_name, fields).with_yaml_files(yaml_files))
    }

    /// Enumerates every valid (product, source) pair.
    ///
    /// Tries every product name against every source name. A pair that does
    /// not resolve is skipped. A pair that resolves but fails validation is
    /// logged at error level and skipped. Never fails.
    pub fn list_products(&self) -> ProductCatalog {
        let mut catalog = ProductCatalog::new();

        for product_name in self.product_names() {
            for source_name in self.source_names() {
                let resolved = match self.get_product(product_name, source_name) {
                    Ok(resolved) => resolved,
                    Err(err) if err.is_not_found() => {
                        debug!(product = product_name, source = source_name, %err, "pair not defined");
                        continue;
                    }
                    Err(err) => {
                        warn!(product = product_name, source = source_name, %err, "pair could not be resolved, skipping");
                        continue;
                    }
                };

                match validate_product_fields(&resolved.fields) {
                    Ok(product_type) => catalog.insert(product_name, source_name, product_type),
                    Err(err) => {
                        error!(
                            product = product_name,
                            source = source_name,
                            %err,
                            "poorly formatted product specification, skipping"
                        );
                    }
                }
            }
        }

        catalog
    }
}

fn scan_roots(
    roots: &[PathBuf],
    config: &StoreConfig,
) -> Result<BTreeMap<String, Vec<DocumentEntry>>> {
    let mut paths = Vec::new();

    for root in roots {
        if !root.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("specification root is not a directory: {}", root.display()),
            )));
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            let accepted = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| config.accepts_extension(e));
            if entry.file_type().is_file() && accepted {
                paths.push(entry.into_path());
            }
        }
    }

    paths.sort();
    paths.dedup();

    let mut index: BTreeMap<String, Vec<DocumentEntry>> = BTreeMap::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping document with non UTF-8 name");
            continue;
        };
        index
            .entry(stem.to_string())
            .or_default()
            .push(DocumentEntry::new(path));
    }

    Ok(index)
}

/// Builder for constructing a [`SpecStore`].
///
/// # Example
///
/// ```no_run
/// use product_spec_store::SpecStore;
///
/// let store = SpecStore::builder()
///     .product_root("/opt/product_params")
///     .source_root("/opt/product_inputs")
///     .extensions(["yaml"])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    config: StoreConfig,
}

impl StoreBuilder {
    /// Creates a builder with no roots and the default extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory scanned for product documents.
    pub fn product_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.product_roots.push(path.into());
        self
    }

    /// Adds a directory scanned for source documents.
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_roots.push(path.into());
        self
    }

    /// Replaces the document extensions.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Scans the configured roots and builds the store.
    pub fn build(self) -> Result<SpecStore> {
        SpecStore::from_config(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, SpecStore) {
        let dir = tempfile::tempdir().unwrap();
        let products = dir.path().join("product_params");
        let sources = dir.path().join("product_inputs");
        write(
            &products,
            "visir/IR-BD.yaml",
            "IR-BD:\n  product_type: cmap\n  cmap_func: visir.Infrared\n  cmap_args: null\n",
        );
        write(
            &sources,
            "ahi.yaml",
            "ahi:\n  IR-BD:\n    variables: [B14BT]\n",
        );
        let store = SpecStore::from_dirs(&products, &sources).unwrap();
        (dir, store)
    }

    #[test]
    fn test_names_are_file_stems() {
        let (_dir, store) = fixture();
        assert_eq!(store.product_names().collect::<Vec<_>>(), vec!["IR-BD"]);
        assert_eq!(store.source_names().collect::<Vec<_>>(), vec!["ahi"]);
    }

    #[test]
    fn test_get_product_stamps_names() {
        let (_dir, store) = fixture();
        let product = store.get_product("IR-BD", "ahi").unwrap();
        assert_eq!(product.fields["source_input"], "ahi");
        assert_eq!(product.fields["product_name"], "IR-BD");
        assert_eq!(product.fields["variables"], json!(["B14BT"]));
        assert_eq!(product.yaml_files.len(), 2);
    }

    #[test]
    fn test_missing_documents_are_not_found() {
        let (_dir, store) = fixture();
        assert!(matches!(
            store.get_product("NoSuchProduct", "ahi"),
            Err(StoreError::NotFound { kind: DocumentKind::Product, .. })
        ));
        assert!(matches!(
            store.get_product("IR-BD", "NoSuchSource"),
            Err(StoreError::NotFound { kind: DocumentKind::Source, .. })
        ));
    }

    #[test]
    fn test_empty_builder_is_rejected() {
        assert!(matches!(
            SpecStore::builder().build(),
            Err(StoreError::NoRootsConfigured)
        ));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let result = SpecStore::from_dirs("/nonexistent/params", "/nonexistent/inputs");
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_non_mapping_document_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p/broken.yaml", "- just\n- a list\n");
        write(dir.path(), "s/ahi.yaml", "ahi: {}\n");
        let store = SpecStore::from_dirs(dir.path().join("p"), dir.path().join("s")).unwrap();
        let err = store.get_product_specs("broken").unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { .. }));
        assert!(err.to_string().contains("found list"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_non_mapping_product_is_named() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p/Listy.yaml", "Listy: [product_type, cmap]\n");
        write(dir.path(), "s/ahi.yaml", "ahi:\n  Listy:\n    variables: [B13BT]\n  Frag: [x]\n");
        write(dir.path(), "p/Frag.yaml", "Frag:\n  product_type: cmap\n");
        let store = SpecStore::from_dirs(dir.path().join("p"), dir.path().join("s")).unwrap();

        match store.get_product("Listy", "ahi") {
            Err(StoreError::NotAMapping { product, found, .. }) => {
                assert_eq!(product, "Listy");
                assert_eq!(found, "list");
            }
            other => panic!("unexpected: {other:?}"),
        }
        let err = store.get_product("Frag", "ahi").unwrap_err();
        assert!(matches!(err, StoreError::NotAMapping { ref product, .. } if product == "Frag"));
        assert!(!err.is_not_found());
        assert!(store.list_products().by_source.is_empty());
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p/IR-BD.yaml", "IR-BD: {}\n");
        write(dir.path(), "p/notes.txt", "not a document\n");
        write(dir.path(), "s/ahi.yml", "ahi: {}\n");
        let store = SpecStore::builder()
            .product_root(dir.path().join("p"))
            .source_root(dir.path().join("s"))
            .extensions(["yaml"])
            .build()
            .unwrap();
        assert_eq!(store.product_names().count(), 1);
        assert_eq!(store.source_names().count(), 0);
    }
}
