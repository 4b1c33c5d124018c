//! The catalog of valid (product, source) pairs.
//!
//! Filled by the store's `list_products` and read back by type or by source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProductType;

/// Enumeration of every valid (product, source) pair.
///
/// Groups product names two ways: by declared product type and by source.
/// Names within a group are de-duplicated and kept in insertion order, which
/// is sorted order when filled by the store.
///
/// # Examples
///
/// ```
/// use product_spec_core::*;
///
/// let mut catalog = ProductCatalog::new();
/// catalog.insert("IR-BD", "ahi", ProductType::Cmap);
/// catalog.insert("IR-BD", "abi", ProductType::Cmap);
/// catalog.insert("89pct", "gmi", ProductType::Alg);
///
/// assert_eq!(catalog.by_type["cmap"], vec!["IR-BD"]);
/// assert_eq!(catalog.by_source["ahi"], vec!["IR-BD"]);
/// assert_eq!(catalog.pair_count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCatalog {
    /// Catalog contract version (populated from
    /// [`SPEC_CONTRACT_VERSION`](crate::SPEC_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    /// Product names per product type tag.
    pub by_type: BTreeMap<String, Vec<String>>,
    /// Product names per source name.
    pub by_source: BTreeMap<String, Vec<String>>,
}

impl ProductCatalog {
    /// Creates an empty catalog stamped with the contract version.
    pub fn new() -> Self {
        Self {
            spec_version: Some(crate::SPEC_CONTRACT_VERSION.to_string()),
            by_type: BTreeMap::new(),
            by_source: BTreeMap::new(),
        }
    }

    /// Records one valid pair.
    pub fn insert(&mut self, product_name: &str, source_name: &str, product_type: ProductType) {
        push_unique(
            self.by_type.entry(product_type.as_str().to_string()).or_default(),
            product_name,
        );
        push_unique(
            self.by_source.entry(source_name.to_string()).or_default(),
            product_name,
        );
    }

    /// Returns the product names of one type.
    pub fn products_of_type(&self, product_type: ProductType) -> &[String] {
        self.by_type
            .get(product_type.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the product names one source offers.
    pub fn products_for_source(&self, source_name: &str) -> &[String] {
        self.by_source
            .get(source_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates `(source, product)` pairs in source order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_source.iter().flat_map(|(source, products)| {
            products
                .iter()
                .map(move |product| (source.as_str(), product.as_str()))
        })
    }

    /// Number of valid (product, source) pairs.
    pub fn pair_count(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    /// Returns `true` if no pair was recorded.
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates() {
        let mut catalog = ProductCatalog::new();
        catalog.insert("89H", "gmi", ProductType::InterpAlgCmap);
        catalog.insert("89H", "gmi", ProductType::InterpAlgCmap);
        catalog.insert("89H", "amsr2", ProductType::InterpAlgCmap);
        assert_eq!(catalog.products_of_type(ProductType::InterpAlgCmap), ["89H"]);
        assert_eq!(catalog.pair_count(), 2);
    }

    #[test]
    fn test_pairs_follow_source_order() {
        let mut catalog = ProductCatalog::new();
        catalog.insert("IR-BD", "ahi", ProductType::Cmap);
        catalog.insert("89pct", "amsr2", ProductType::Alg);
        let pairs: Vec<_> = catalog.pairs().collect();
        assert_eq!(pairs, vec![("ahi", "IR-BD"), ("amsr2", "89pct")]);
    }

    #[test]
    fn test_missing_groups_are_empty() {
        let catalog = ProductCatalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.products_for_source("ahi").is_empty());
        assert!(catalog.products_of_type(ProductType::Alg).is_empty());
    }

    #[test]
    fn test_serializes_without_empty_version() {
        let mut catalog = ProductCatalog::default();
        catalog.insert("IR-BD", "ahi", ProductType::Cmap);
        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.get("spec_version").is_none());
        assert_eq!(json["by_type"]["cmap"][0], "IR-BD");
    }
}
