//! Interface self-tests.
//!
//! Walks every registered plugin and every valid product, exercising the
//! same lookups production code makes, and collects the results into
//! serializable reports. [`test_interfaces`] turns a report into a pass or
//! fail.

use std::collections::BTreeMap;
use std::fmt;

use product_spec_core::{ColorsInfo, DataRange, FieldMap, ProductCatalog};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::registry::{FunctionRecord, Namespace, NamespaceProvider, Plugin};
use crate::resolver::{ProductResolver, ResolveError};

/// Results of checking every plugin in one namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInterfaceReport {
    pub namespace: Namespace,
    /// Plugin names per function type.
    pub by_type: BTreeMap<String, Vec<String>>,
    pub validity_check: BTreeMap<String, bool>,
    /// Function type per plugin name.
    pub func_type: BTreeMap<String, String>,
    /// Why a plugin failed its check.
    pub errors: BTreeMap<String, String>,
}

impl PluginInterfaceReport {
    fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            by_type: BTreeMap::new(),
            validity_check: BTreeMap::new(),
            func_type: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Name of the first plugin that failed, in sorted order.
    pub fn first_invalid(&self) -> Option<&str> {
        self.validity_check
            .iter()
            .find(|(_, valid)| !**valid)
            .map(|(name, _)| name.as_str())
    }
}

fn check_record(record: &FunctionRecord) -> Result<(), String> {
    record.check_namespace().map_err(|e| e.to_string())?;
    let called = match &record.plugin {
        Plugin::Colormap(cmap) => cmap.check_defaults(),
        Plugin::Filename(fname) => fname.check_defaults(),
        Plugin::Coverage(covg) => covg.check_defaults(),
        Plugin::Algorithm(_) | Plugin::Interpolation(_) => Ok(()),
    };
    called.map_err(|e| e.to_string())
}

/// Checks every plugin listed in `namespace`. Never fails: problems are
/// recorded in the report.
pub fn test_plugin_interface(provider: &dyn NamespaceProvider, namespace: Namespace) -> PluginInterfaceReport {
    let mut report = PluginInterfaceReport::new(namespace);

    for name in provider.list_entry_points(namespace) {
        let record = match provider.find_entry_point(namespace, name) {
            Ok(record) => record,
            Err(err) => {
                error!(%namespace, name, %err, "listed plugin could not be resolved");
                report.validity_check.insert(name.to_string(), false);
                report.errors.insert(name.to_string(), err.to_string());
                continue;
            }
        };

        let type_tag = record.plugin.type_tag().to_string();
        report.func_type.insert(name.to_string(), type_tag.clone());
        match check_record(record) {
            Ok(()) => {
                report.validity_check.insert(name.to_string(), true);
                report.by_type.entry(type_tag).or_default().push(name.to_string());
            }
            Err(reason) => {
                error!(%namespace, name, %reason, "plugin failed validity check");
                report.validity_check.insert(name.to_string(), false);
                report.errors.insert(name.to_string(), reason);
            }
        }
    }

    report
}

pub fn test_cmap_interface(provider: &dyn NamespaceProvider) -> PluginInterfaceReport {
    test_plugin_interface(provider, Namespace::UserColormaps)
}

pub fn test_alg_interface(provider: &dyn NamespaceProvider) -> PluginInterfaceReport {
    test_plugin_interface(provider, Namespace::Algorithms)
}

pub fn test_interp_interface(provider: &dyn NamespaceProvider) -> PluginInterfaceReport {
    test_plugin_interface(provider, Namespace::Interpolation)
}

pub fn test_filename_interface(provider: &dyn NamespaceProvider) -> PluginInterfaceReport {
    test_plugin_interface(provider, Namespace::FilenameFormats)
}

pub fn test_coverage_interface(provider: &dyn NamespaceProvider) -> PluginInterfaceReport {
    test_plugin_interface(provider, Namespace::CoverageChecks)
}

/// Plugin names per function type, without running any checks.
pub fn list_by_type(provider: &dyn NamespaceProvider, namespace: Namespace) -> BTreeMap<String, Vec<String>> {
    let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in provider.list_entry_points(namespace) {
        if let Some(record) = provider.resolve(namespace, name) {
            by_type
                .entry(record.plugin.type_tag().to_string())
                .or_default()
                .push(name.to_string());
        }
    }
    by_type
}

pub fn list_cmaps_by_type(provider: &dyn NamespaceProvider) -> BTreeMap<String, Vec<String>> {
    list_by_type(provider, Namespace::UserColormaps)
}

pub fn list_algs_by_type(provider: &dyn NamespaceProvider) -> BTreeMap<String, Vec<String>> {
    list_by_type(provider, Namespace::Algorithms)
}

pub fn list_interps_by_type(provider: &dyn NamespaceProvider) -> BTreeMap<String, Vec<String>> {
    list_by_type(provider, Namespace::Interpolation)
}

pub fn list_filenames_by_type(provider: &dyn NamespaceProvider) -> BTreeMap<String, Vec<String>> {
    list_by_type(provider, Namespace::FilenameFormats)
}

pub fn list_covgs_by_type(provider: &dyn NamespaceProvider) -> BTreeMap<String, Vec<String>> {
    list_by_type(provider, Namespace::CoverageChecks)
}

/// Source name to product name to value.
pub type BySource<T> = BTreeMap<String, BTreeMap<String, T>>;

/// Results of exercising every valid product's accessors.
///
/// Each field is one category keyed by source then product. A product
/// missing from a category was skipped for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductInterfaceReport {
    pub list_products: ProductCatalog,
    pub validity_check: BySource<bool>,
    pub product_type: BySource<Option<String>>,
    pub alg_name: BySource<Option<String>>,
    pub alg_args: BySource<Option<FieldMap>>,
    pub data_range: BySource<Option<DataRange>>,
    pub cmap_name: BySource<Option<String>>,
    pub cmap_args: BySource<Option<FieldMap>>,
    pub cmap_from_product: BySource<ColorsInfo>,
    pub interp_name: BySource<Option<String>>,
    pub interp_args: BySource<Option<FieldMap>>,
    pub required_variables: BySource<Option<Vec<String>>>,
    pub covg_name: BySource<Option<String>>,
    pub display_name: BySource<Option<String>>,
    /// Failures recorded while a product was exercised.
    pub errors: BySource<Vec<String>>,
}

impl ProductInterfaceReport {
    /// `source/product` of the first invalid pair, in sorted order.
    pub fn first_invalid(&self) -> Option<String> {
        self.validity_check.iter().find_map(|(source, products)| {
            products
                .iter()
                .find(|(_, valid)| !**valid)
                .map(|(product, _)| format!("{source}/{product}"))
        })
    }
}

fn put<T>(category: &mut BySource<T>, source: &str, product: &str, value: T) {
    category
        .entry(source.to_string())
        .or_default()
        .insert(product.to_string(), value);
}

struct PairRecorder<'r> {
    report: &'r mut ProductInterfaceReport,
    source: &'r str,
    product: &'r str,
}

impl PairRecorder<'_> {
    /// Stores `result` in `category`, or records the failure and returns
    /// `None`.
    fn record<T: Clone>(
        &mut self,
        select: fn(&mut ProductInterfaceReport) -> &mut BySource<T>,
        what: &str,
        result: Result<T, ResolveError>,
    ) -> Option<T> {
        match result {
            Ok(value) => {
                put(select(self.report), self.source, self.product, value.clone());
                Some(value)
            }
            Err(err) => {
                error!(product = self.product, source = self.source, %err, "SKIPPING {what}");
                put_error(self.report, self.source, self.product, format!("{what}: {err}"));
                None
            }
        }
    }

    fn skip(&self, what: &str, missing: &str) {
        info!(
            product = self.product,
            source = self.source,
            "SKIPPING {what}: {missing} was None"
        );
    }
}

fn put_error(report: &mut ProductInterfaceReport, source: &str, product: &str, message: String) {
    report
        .errors
        .entry(source.to_string())
        .or_default()
        .entry(product.to_string())
        .or_default()
        .push(message);
}

/// Exercises every valid product's accessors.
///
/// # Errors
///
/// Fails only if a listed pair can no longer be looked up. Every other
/// failure is logged and recorded in [`ProductInterfaceReport::errors`].
pub fn test_product_interface(resolver: &ProductResolver<'_>) -> Result<ProductInterfaceReport, ResolveError> {
    let catalog = resolver.list_products();
    let mut report = ProductInterfaceReport {
        list_products: catalog.clone(),
        ..ProductInterfaceReport::default()
    };

    for (source, products) in &catalog.by_source {
        for product in products {
            let valid = resolver.is_valid_product(product, source)?;
            put(&mut report.validity_check, source, product, valid);

            let mut pair = PairRecorder {
                report: &mut report,
                source,
                product,
            };
            pair.record(|r| &mut r.product_type, "get_product_type", resolver.get_product_type(product, source));

            let alg_name = pair.record(|r| &mut r.alg_name, "get_alg_name", resolver.get_alg_name(product, source));
            if alg_name.flatten().is_some() {
                pair.record(|r| &mut r.alg_args, "get_alg_args", resolver.get_alg_args(product, source));
                pair.record(|r| &mut r.data_range, "get_data_range", resolver.get_data_range(product, source));
            } else {
                pair.skip("get_alg funcs", "get_alg_name");
            }

            let cmap_name = pair.record(|r| &mut r.cmap_name, "get_cmap_name", resolver.get_cmap_name(product, source));
            if cmap_name.flatten().is_some() {
                pair.record(|r| &mut r.cmap_args, "get_cmap_args", resolver.get_cmap_args(product, source));
                pair.record(
                    |r| &mut r.cmap_from_product,
                    "get_cmap_from_product",
                    resolver.get_cmap_from_product(product, source),
                );
            } else {
                pair.skip("get_cmap funcs", "get_cmap_name");
            }

            let interp_name =
                pair.record(|r| &mut r.interp_name, "get_interp_name", resolver.get_interp_name(product, source));
            if interp_name.flatten().is_some() {
                pair.record(|r| &mut r.interp_args, "get_interp_args", resolver.get_interp_args(product, source));
            } else {
                pair.skip("get_interp_args", "get_interp_name");
            }

            pair.record(
                |r| &mut r.required_variables,
                "get_required_variables",
                resolver.get_required_variables(product, source),
            );
            pair.record(|r| &mut r.covg_name, "get_covg_name", resolver.get_covg_name(product, source));
            pair.record(
                |r| &mut r.display_name,
                "get_product_display_name",
                resolver.get_product_display_name(product, source),
            );
        }
    }

    Ok(report)
}

/// Interfaces the driver can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    Algorithms,
    Colormaps,
    Interpolation,
    Filenames,
    Coverage,
    Products,
}

impl Interface {
    pub const ALL: [Interface; 6] = [
        Self::Algorithms,
        Self::Colormaps,
        Self::Interpolation,
        Self::Filenames,
        Self::Coverage,
        Self::Products,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Algorithms => "algorithms",
            Self::Colormaps => "colormaps",
            Self::Interpolation => "interpolation",
            Self::Filenames => "filenames",
            Self::Coverage => "coverage",
            Self::Products => "products",
        }
    }

    /// The plugin namespace tested, or `None` for products.
    pub fn namespace(self) -> Option<Namespace> {
        match self {
            Self::Algorithms => Some(Namespace::Algorithms),
            Self::Colormaps => Some(Namespace::UserColormaps),
            Self::Interpolation => Some(Namespace::Interpolation),
            Self::Filenames => Some(Namespace::FilenameFormats),
            Self::Coverage => Some(Namespace::CoverageChecks),
            Self::Products => None,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report from either kind of interface test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InterfaceReport {
    Plugins(PluginInterfaceReport),
    Products(Box<ProductInterfaceReport>),
}

impl InterfaceReport {
    /// The first item whose validity check is `false`.
    pub fn first_invalid(&self) -> Option<String> {
        match self {
            Self::Plugins(report) => report.first_invalid().map(str::to_string),
            Self::Products(report) => report.first_invalid(),
        }
    }
}

/// Errors from [`test_interfaces`].
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A listed product could not be looked up.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An item failed its validity check.
    #[error("{interface} interface failed validity check for '{item}'")]
    FailedValidity { interface: Interface, item: String },
}

/// Runs each interface test in turn.
///
/// Every report is handed to `on_report` before it is judged, so the caller
/// sees the report that failed.
///
/// # Errors
///
/// Returns [`HarnessError::FailedValidity`] for the first interface with an
/// invalid item, naming the plugin or `source/product`.
pub fn test_interfaces<F>(
    resolver: &ProductResolver<'_>,
    interfaces: &[Interface],
    mut on_report: F,
) -> Result<(), HarnessError>
where
    F: FnMut(Interface, &InterfaceReport),
{
    for &interface in interfaces {
        info!(%interface, "testing interface");
        let report = match interface.namespace() {
            Some(namespace) => InterfaceReport::Plugins(test_plugin_interface(resolver.plugins(), namespace)),
            None => InterfaceReport::Products(Box::new(test_product_interface(resolver)?)),
        };
        on_report(interface, &report);

        if let Some(item) = report.first_invalid() {
            return Err(HarnessError::FailedValidity { interface, item });
        }
    }
    Ok(())
}
