//! Output formatting for catalogs, products and interface reports.

use std::collections::BTreeMap;

use product_spec_core::{ProductCatalog, ResolvedProduct};
use serde::Serialize;

use crate::harness::{InterfaceReport, PluginInterfaceReport, ProductInterfaceReport};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Option<Result<String, String>> {
    match format {
        OutputFormat::Json => Some(
            serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}")),
        ),
        OutputFormat::Yaml => {
            Some(serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}")))
        }
        OutputFormat::Table => None,
    }
}

/// Formats a product catalog in the requested output format.
pub fn format_catalog(catalog: &ProductCatalog, format: OutputFormat) -> Result<String, String> {
    serialize(catalog, format).unwrap_or_else(|| Ok(catalog_to_table(catalog)))
}

/// Formats a resolved product in the requested output format.
pub fn format_product(product: &ResolvedProduct, format: OutputFormat) -> Result<String, String> {
    serialize(product, format).unwrap_or_else(|| Ok(product_to_table(product)))
}

/// Formats a flat list of names, one per line for tables.
pub fn format_names(names: &[String], format: OutputFormat) -> Result<String, String> {
    serialize(&names, format).unwrap_or_else(|| {
        Ok(names.iter().map(|name| format!("{name}\n")).collect())
    })
}

/// Formats plugin names grouped by namespace then function type.
pub fn format_entry_points(
    modules: &BTreeMap<String, BTreeMap<String, Vec<String>>>,
    format: OutputFormat,
) -> Result<String, String> {
    serialize(modules, format).unwrap_or_else(|| Ok(entry_points_to_table(modules)))
}

/// Formats an interface report in the requested output format.
pub fn format_report(report: &InterfaceReport, format: OutputFormat) -> Result<String, String> {
    serialize(report, format).unwrap_or_else(|| {
        Ok(match report {
            InterfaceReport::Plugins(report) => plugin_report_to_table(report),
            InterfaceReport::Products(report) => product_report_to_table(report),
        })
    })
}

fn catalog_to_table(catalog: &ProductCatalog) -> String {
    let mut out = String::new();

    let width = catalog.by_source.keys().map(String::len).max().unwrap_or(6).max(6);
    out.push_str(&format!("{:<width$}  PRODUCTS\n", "SOURCE"));
    for (source, products) in &catalog.by_source {
        out.push_str(&format!("{source:<width$}  {}\n", products.join(", ")));
    }

    out.push_str(&format!("\n{} valid pairs\n", catalog.pair_count()));
    out
}

fn product_to_table(product: &ResolvedProduct) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Product: {}  Source: {}\n",
        product.product_name, product.source_name
    ));

    let width = product.fields.keys().map(String::len).max().unwrap_or(5);
    for (key, value) in &product.fields {
        out.push_str(&format!("  {key:<width$}  {value}\n"));
    }

    if !product.yaml_files.is_empty() {
        out.push_str("\nDocuments:\n");
        for path in &product.yaml_files {
            out.push_str(&format!("  {}\n", path.display()));
        }
    }
    out
}

fn entry_points_to_table(modules: &BTreeMap<String, BTreeMap<String, Vec<String>>>) -> String {
    let mut out = String::new();
    for (namespace, by_type) in modules {
        out.push_str(&format!("{namespace}:\n"));
        for (type_tag, names) in by_type {
            out.push_str(&format!("  {type_tag}: {}\n", names.join(", ")));
        }
    }
    out
}

fn plugin_report_to_table(report: &PluginInterfaceReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("Namespace: {}\n", report.namespace));
    let width = report.validity_check.keys().map(String::len).max().unwrap_or(4);
    for (name, valid) in &report.validity_check {
        let status = if *valid { "ok" } else { "FAIL" };
        let type_tag = report.func_type.get(name).map_or("?", String::as_str);
        out.push_str(&format!("  {name:<width$}  {status:<4}  {type_tag}\n"));
        if let Some(reason) = report.errors.get(name) {
            out.push_str(&format!("      {reason}\n"));
        }
    }
    out
}

fn product_report_to_table(report: &ProductInterfaceReport) -> String {
    let mut out = String::new();

    out.push_str("Products:\n");
    for (source, products) in &report.validity_check {
        for (product, valid) in products {
            let status = if *valid { "ok" } else { "FAIL" };
            let product_type = report
                .product_type
                .get(source)
                .and_then(|p| p.get(product))
                .and_then(Option::as_deref)
                .unwrap_or("?");
            out.push_str(&format!("  {source}/{product}  {status}  {product_type}\n"));

            let errors = report.errors.get(source).and_then(|p| p.get(product));
            for message in errors.into_iter().flatten() {
                out.push_str(&format!("      {message}\n"));
            }
        }
    }
    out
}
