//! Product resolution: the store's merged fields read through the plugin
//! registry.
//!
//! Failures follow one policy. A missing document or key is raised. Malformed
//! content makes [`ProductResolver::is_valid_product`] return `false` with a
//! log line. An optional field that is absent reads as `None`. A missing
//! required value is raised as [`ResolveError::RequiredValueMissing`], and any
//! colormap failure is wrapped once as [`ResolveError::ColormapResolution`].

use product_spec_core::{
    ColorsInfo, DataRange, FieldMap, ProductCatalog, ProductSpec, ProductType, ResolvedProduct,
    ValidationError, ValidationResult,
};
use product_spec_store::{SpecStore, StoreError};
use thiserror::Error;
use tracing::{debug, error};

use crate::plugins::coverage::DEFAULT_COVERAGE_CHECK;
use crate::registry::{FunctionRecord, Namespace, NamespaceProvider, RegistryError, builtin_registry};

/// Errors raised while resolving a product.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The product or source could not be looked up.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A named plugin could not be found.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A field is present with the wrong shape.
    #[error("invalid product field: {0}")]
    InvalidField(#[from] ValidationError),

    /// The algorithm's arguments lack a value every consumer needs.
    #[error(
        "{field} must be defined in alg_args for product '{product}' from source '{source_name}' \
         (algorithm '{alg_name}', type {alg_type})"
    )]
    RequiredValueMissing {
        product: String,
        source_name: String,
        alg_name: String,
        alg_type: String,
        field: &'static str,
    },

    /// The product's colormap could not be built.
    #[error(
        "colormap '{cmap}' for product '{product}' from source '{source_name}' failed \
         ({original_kind}): {detail}"
    )]
    ColormapResolution {
        cmap: String,
        product: String,
        source_name: String,
        original_kind: String,
        detail: String,
    },
}

/// Reads products from a [`SpecStore`] and resolves the plugins they name.
///
/// # Examples
///
/// ```no_run
/// use product_spec_interfaces::ProductResolver;
/// use product_spec_store::SpecStore;
///
/// let store = SpecStore::from_dirs("yaml_configs/product_params", "yaml_configs/product_inputs").unwrap();
/// let resolver = ProductResolver::with_builtins(&store);
///
/// if resolver.is_valid_product("IR-BD", "ahi").unwrap() {
///     let colors = resolver.get_cmap_from_product("IR-BD", "ahi").unwrap();
///     println!("{:?}", colors.cbar_label);
/// }
/// ```
#[derive(Clone, Copy)]
pub struct ProductResolver<'a> {
    store: &'a SpecStore,
    plugins: &'a dyn NamespaceProvider,
}

impl<'a> ProductResolver<'a> {
    pub fn new(store: &'a SpecStore, plugins: &'a dyn NamespaceProvider) -> Self {
        Self { store, plugins }
    }

    /// A resolver backed by the built-in plugins.
    pub fn with_builtins(store: &'a SpecStore) -> Self {
        Self::new(store, builtin_registry())
    }

    pub fn store(&self) -> &'a SpecStore {
        self.store
    }

    pub fn plugins(&self) -> &'a dyn NamespaceProvider {
        self.plugins
    }

    /// Resolves the pair's merged fields.
    pub fn get_product(&self, product: &str, source: &str) -> Result<ResolvedProduct, ResolveError> {
        Ok(self.store.get_product(product, source)?)
    }

    /// Validates the pair's field set, then the shape of each value.
    ///
    /// The outer `Result` fails only when the pair cannot be looked up. The
    /// inner one carries the validation outcome, including a product or
    /// fragment that is present but not a mapping.
    pub fn check_product(&self, product: &str, source: &str) -> Result<ValidationResult, ResolveError> {
        let resolved = match self.store.get_product(product, source) {
            Ok(resolved) => resolved,
            Err(StoreError::NotAMapping { product: key, .. }) => {
                return Ok(Err(ValidationError::InvalidFieldType {
                    field: key,
                    expected: "mapping",
                }));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(ProductSpec::from_resolved(&resolved).map(|spec| spec.kind.product_type()))
    }

    /// Returns `true` if the pair's fields match its declared type. The
    /// reason for a `false` is logged.
    pub fn is_valid_product(&self, product: &str, source: &str) -> Result<bool, ResolveError> {
        match self.check_product(product, source)? {
            Ok(_) => Ok(true),
            Err(err) => {
                error!(product, source, %err, "poorly formatted product specification");
                Ok(false)
            }
        }
    }

    /// The declared `product_type` string, valid or not.
    pub fn get_product_type(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        let resolved = self.get_product(product, source)?;
        Ok(resolved.product_type().map(str::to_string))
    }

    /// The typed view of the pair.
    pub fn get_product_spec(&self, product: &str, source: &str) -> Result<ProductSpec, ResolveError> {
        let resolved = self.get_product(product, source)?;
        Ok(ProductSpec::from_resolved(&resolved)?)
    }

    fn string_field(&self, product: &str, source: &str, key: &str) -> Result<Option<String>, ResolveError> {
        Ok(self.get_product(product, source)?.string_field(key)?)
    }

    fn map_field(&self, product: &str, source: &str, key: &str) -> Result<Option<FieldMap>, ResolveError> {
        Ok(self.get_product(product, source)?.map_field(key)?)
    }

    pub fn get_alg_name(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        self.string_field(product, source, "alg_func")
    }

    pub fn get_alg_args(&self, product: &str, source: &str) -> Result<Option<FieldMap>, ResolveError> {
        self.map_field(product, source, "alg_args")
    }

    pub fn get_interp_name(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        self.string_field(product, source, "interp_func")
    }

    pub fn get_interp_args(&self, product: &str, source: &str) -> Result<Option<FieldMap>, ResolveError> {
        self.map_field(product, source, "interp_args")
    }

    pub fn get_cmap_name(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        self.string_field(product, source, "cmap_func")
    }

    pub fn get_cmap_args(&self, product: &str, source: &str) -> Result<Option<FieldMap>, ResolveError> {
        self.map_field(product, source, "cmap_args")
    }

    pub fn get_covg_name(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        self.string_field(product, source, "covg_func")
    }

    pub fn get_covg_args_from_product(
        &self,
        product: &str,
        source: &str,
    ) -> Result<Option<FieldMap>, ResolveError> {
        self.map_field(product, source, "covg_args")
    }

    pub fn get_product_display_name(&self, product: &str, source: &str) -> Result<Option<String>, ResolveError> {
        self.string_field(product, source, "display_name")
    }

    /// Variables the product reads, in declared order.
    pub fn get_required_variables(
        &self,
        product: &str,
        source: &str,
    ) -> Result<Option<Vec<String>>, ResolveError> {
        Ok(self.get_product(product, source)?.string_list_field("variables")?)
    }

    /// The algorithm's `output_data_range`.
    ///
    /// Returns `Ok(None)` for products without an algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::RequiredValueMissing`] if the product has an
    /// algorithm but its arguments define no output range.
    pub fn get_data_range(&self, product: &str, source: &str) -> Result<Option<DataRange>, ResolveError> {
        let resolved = self.get_product(product, source)?;
        let Some(alg_name) = resolved.string_field("alg_func")? else {
            return Ok(None);
        };
        let args = resolved.map_field("alg_args")?.unwrap_or_default();

        match args.get("output_data_range").filter(|v| !v.is_null()) {
            Some(value) => DataRange::from_value(value).map(Some).ok_or_else(|| {
                ResolveError::InvalidField(ValidationError::InvalidFieldType {
                    field: "alg_args.output_data_range".to_string(),
                    expected: "two-element numeric list",
                })
            }),
            None => {
                let alg_type = self
                    .plugins
                    .resolve(Namespace::Algorithms, &alg_name)
                    .map_or("unregistered", |record| record.plugin.type_tag());
                Err(ResolveError::RequiredValueMissing {
                    product: product.to_string(),
                    source_name: source.to_string(),
                    alg_name,
                    alg_type: alg_type.to_string(),
                    field: "output_data_range",
                })
            }
        }
    }

    /// Builds the product's colormap.
    ///
    /// # Errors
    ///
    /// Lookup failures of the pair itself propagate as
    /// [`ResolveError::Store`]. Every other failure, including a missing or
    /// unregistered colormap name and bad `cmap_args`, is reported as
    /// [`ResolveError::ColormapResolution`].
    pub fn get_cmap_from_product(&self, product: &str, source: &str) -> Result<ColorsInfo, ResolveError> {
        let resolved = self.get_product(product, source)?;
        let failure = |cmap: &str, kind: &str, detail: String| ResolveError::ColormapResolution {
            cmap: cmap.to_string(),
            product: product.to_string(),
            source_name: source.to_string(),
            original_kind: kind.to_string(),
            detail,
        };

        let cmap_name = match resolved.string_field("cmap_func") {
            Ok(Some(name)) => name,
            Ok(None) => {
                return Err(failure("none", "MissingField", "product defines no cmap_func".to_string()));
            }
            Err(err) => return Err(failure("none", "InvalidFieldType", err.to_string())),
        };
        let args = resolved
            .map_field("cmap_args")
            .map_err(|err| failure(&cmap_name, "InvalidFieldType", err.to_string()))?
            .unwrap_or_default();

        let record = self
            .plugins
            .find_entry_point(Namespace::UserColormaps, &cmap_name)
            .map_err(|err| failure(&cmap_name, err.kind(), err.to_string()))?;
        let plugin = record
            .as_colormap()
            .map_err(|err| failure(&cmap_name, err.kind(), err.to_string()))?;

        debug!(product, source, cmap = cmap_name.as_str(), "building colormap");
        plugin
            .invoke(&args)
            .map_err(|err| failure(&cmap_name, err.kind(), err.to_string()))
    }

    fn named_record(
        &self,
        product: &str,
        source: &str,
        key: &str,
        namespace: Namespace,
    ) -> Result<Option<&'a FunctionRecord>, ResolveError> {
        let Some(name) = self.string_field(product, source, key)? else {
            return Ok(None);
        };
        let plugins = self.plugins;
        let record = plugins.find_entry_point(namespace, &name)?;
        record.check_namespace()?;
        Ok(Some(record))
    }

    /// The algorithm plugin the product names, if any.
    pub fn get_alg_from_product(
        &self,
        product: &str,
        source: &str,
    ) -> Result<Option<&'a FunctionRecord>, ResolveError> {
        self.named_record(product, source, "alg_func", Namespace::Algorithms)
    }

    /// The interpolation plugin the product names, if any.
    pub fn get_interp_from_product(
        &self,
        product: &str,
        source: &str,
    ) -> Result<Option<&'a FunctionRecord>, ResolveError> {
        self.named_record(product, source, "interp_func", Namespace::Interpolation)
    }

    /// The coverage check the product names, if any.
    pub fn get_covg_from_product(
        &self,
        product: &str,
        source: &str,
    ) -> Result<Option<&'a FunctionRecord>, ResolveError> {
        self.named_record(product, source, "covg_func", Namespace::CoverageChecks)
    }

    /// The coverage check to run for the product: its own, or
    /// `masked_arrays` when it names none.
    pub fn coverage_check_for(&self, product: &str, source: &str) -> Result<&'a FunctionRecord, ResolveError> {
        if let Some(record) = self.get_covg_from_product(product, source)? {
            return Ok(record);
        }
        let plugins = self.plugins;
        Ok(plugins.find_entry_point(Namespace::CoverageChecks, DEFAULT_COVERAGE_CHECK)?)
    }

    /// Every valid pair, by type and by source.
    pub fn list_products(&self) -> ProductCatalog {
        self.store.list_products()
    }

    /// Products of one type, across all sources.
    pub fn list_products_by_type(&self, product_type: ProductType) -> Vec<String> {
        self.list_products().products_of_type(product_type).to_vec()
    }

    /// Valid products one source offers.
    pub fn list_products_by_source(&self, source: &str) -> Vec<String> {
        self.list_products().products_for_source(source).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::plugins::coverage::{CoveragePlugin, masked_arrays};
    use crate::registry::FunctionRegistry;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, SpecStore) {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "p/IR-BD.yaml",
            "IR-BD:\n  product_type: cmap\n  cmap_func: visir.Infrared\n  cmap_args: null\n",
        );
        write(
            dir.path(),
            "p/Night-Vis.yaml",
            "Night-Vis:\n  product_type: alg\n  alg_func: single_channel\n  alg_args: {}\n  covg_func: masked_arrays\n",
        );
        write(
            dir.path(),
            "s/ahi.yaml",
            "ahi:\n  IR-BD:\n    variables: [B14BT]\n  Night-Vis:\n    variables: [B03Ref]\n",
        );
        let store = SpecStore::from_dirs(dir.path().join("p"), dir.path().join("s")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_absent_names_read_as_none() {
        let (_dir, store) = fixture();
        let resolver = ProductResolver::with_builtins(&store);
        assert_eq!(resolver.get_alg_name("IR-BD", "ahi").unwrap(), None);
        assert_eq!(resolver.get_cmap_args("IR-BD", "ahi").unwrap(), None);
        assert_eq!(resolver.get_data_range("IR-BD", "ahi").unwrap(), None);
        assert!(resolver.get_alg_from_product("IR-BD", "ahi").unwrap().is_none());
    }

    #[test]
    fn test_missing_output_range_names_algorithm_type() {
        let (_dir, store) = fixture();
        let resolver = ProductResolver::with_builtins(&store);
        match resolver.get_data_range("Night-Vis", "ahi") {
            Err(ResolveError::RequiredValueMissing { alg_name, alg_type, .. }) => {
                assert_eq!(alg_name, "single_channel");
                assert_eq!(alg_type, "single_channel");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let empty = FunctionRegistry::default();
        let resolver = ProductResolver::new(&store, &empty);
        match resolver.get_data_range("Night-Vis", "ahi") {
            Err(ResolveError::RequiredValueMissing { alg_type, .. }) => {
                assert_eq!(alg_type, "unregistered");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_coverage_default() {
        let (_dir, store) = fixture();
        let registry = FunctionRegistry::builder()
            .register("masked_arrays", CoveragePlugin::Standard(masked_arrays))
            .build()
            .unwrap();
        let resolver = ProductResolver::new(&store, &registry);
        assert!(resolver.get_covg_from_product("IR-BD", "ahi").unwrap().is_none());
        assert_eq!(resolver.coverage_check_for("IR-BD", "ahi").unwrap().name, "masked_arrays");
        assert_eq!(
            resolver.get_covg_from_product("Night-Vis", "ahi").unwrap().unwrap().name,
            "masked_arrays"
        );
    }

    #[test]
    fn test_injected_registry_controls_colormaps() {
        let (_dir, store) = fixture();
        let empty = FunctionRegistry::default();
        let resolver = ProductResolver::new(&store, &empty);
        match resolver.get_cmap_from_product("IR-BD", "ahi") {
            Err(ResolveError::ColormapResolution { cmap, original_kind, .. }) => {
                assert_eq!(cmap, "visir.Infrared");
                assert_eq!(original_kind, "NotFound");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(ProductResolver::with_builtins(&store).get_cmap_from_product("IR-BD", "ahi").is_ok());
    }
}
