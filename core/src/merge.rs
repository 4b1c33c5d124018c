//! Field merging with configurable conflict resolution.
//!
//! Two merges happen while resolving a product. Fragments from several
//! documents for the same source are combined with [`MergeStrategy::Deep`],
//! in discovery order. The merged fragment is then laid over the product's
//! base fields with [`MergeStrategy::PreferOverlay`]. See [`resolve_fields`].
//!
//! # Example
//!
//! ```
//! use product_spec_core::*;
//! use serde_json::json;
//!
//! let base = json!({"product_type": "alg", "variables": ["B14BT"]});
//! let overlay = json!({"variables": ["B13BT"], "display_name": "IR"});
//!
//! let merged = merge_fields(
//!     base.as_object().unwrap(),
//!     overlay.as_object().unwrap(),
//!     MergeStrategy::PreferOverlay,
//! );
//! assert_eq!(merged["variables"], json!(["B13BT"]));
//! assert_eq!(merged["display_name"], "IR");
//! ```

use serde_json::Value;

use crate::FieldMap;

/// Field merge behavior.
///
/// Controls how conflicts between a base and overlay mapping are resolved.
///
/// # Examples
///
/// ```
/// use product_spec_core::*;
/// use serde_json::json;
///
/// let base = json!({"alg_args": {"output_data_range": [0, 1], "norm": true}});
/// let overlay = json!({"alg_args": {"output_data_range": [105, 280]}});
/// let (base, overlay) = (base.as_object().unwrap(), overlay.as_object().unwrap());
///
/// let m1 = merge_fields(base, overlay, MergeStrategy::PreferBase);
/// assert_eq!(m1["alg_args"]["output_data_range"], json!([0, 1]));
///
/// let m2 = merge_fields(base, overlay, MergeStrategy::PreferOverlay);
/// assert!(m2["alg_args"].get("norm").is_none());
///
/// let m3 = merge_fields(base, overlay, MergeStrategy::Deep);
/// assert_eq!(m3["alg_args"]["output_data_range"], json!([105, 280]));
/// assert_eq!(m3["alg_args"]["norm"], true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Keep base values when both sides define a key.
    PreferBase,
    /// Replace base values with overlay values, one top-level key at a time.
    PreferOverlay,
    /// Recurse into mappings on both sides; overlay wins on leaves.
    /// Lists count as leaves.
    Deep,
}

/// Merges two field mappings into one.
pub fn merge_fields(base: &FieldMap, overlay: &FieldMap, strategy: MergeStrategy) -> FieldMap {
    let mut merged = base.clone();

    for (key, value) in overlay {
        match strategy {
            MergeStrategy::PreferBase => {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
            MergeStrategy::PreferOverlay => {
                merged.insert(key.clone(), value.clone());
            }
            MergeStrategy::Deep => {
                let combined = match (merged.get(key), value) {
                    (Some(Value::Object(left)), Value::Object(right)) => {
                        Value::Object(merge_fields(left, right, MergeStrategy::Deep))
                    }
                    _ => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
        }
    }

    merged
}

/// Builds the resolved field map for one (product, source) pair.
///
/// The source fragment overrides the product's base fields key by key. The
/// result is then stamped with `source_input` and `product_name`, which win
/// over anything either document declared.
///
/// # Examples
///
/// ```
/// use product_spec_core::*;
/// use serde_json::json;
///
/// let base = json!({"product_type": "cmap", "cmap_func": "visir.IR_BD", "cmap_args": null});
/// let fragment = json!({"variables": ["B14BT"]});
///
/// let fields = resolve_fields(
///     "IR-BD",
///     "ahi",
///     base.as_object().unwrap(),
///     fragment.as_object().unwrap(),
/// );
/// assert_eq!(fields["source_input"], "ahi");
/// assert_eq!(fields["product_name"], "IR-BD");
/// assert_eq!(validate_product_fields(&fields), Ok(ProductType::Cmap));
/// ```
pub fn resolve_fields(
    product_name: &str,
    source_name: &str,
    base: &FieldMap,
    fragment: &FieldMap,
) -> FieldMap {
    let mut fields = merge_fields(base, fragment, MergeStrategy::PreferOverlay);
    fields.insert("source_input".into(), Value::String(source_name.to_string()));
    fields.insert("product_name".into(), Value::String(product_name.to_string()));
    fields
}

/// Splits the overlay's keys into those replacing a base value and those
/// adding a new one.
pub fn overridden_keys<'a>(base: &FieldMap, overlay: &'a FieldMap) -> (Vec<&'a str>, Vec<&'a str>) {
    overlay
        .keys()
        .map(String::as_str)
        .partition(|key| base.contains_key(*key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_deep_merge_replaces_lists() {
        let base = map(json!({"89H": {"variables": ["H89", "V89"]}}));
        let overlay = map(json!({"89H": {"variables": ["H89"]}}));
        let merged = merge_fields(&base, &overlay, MergeStrategy::Deep);
        assert_eq!(merged["89H"]["variables"], json!(["H89"]));
    }

    #[test]
    fn test_deep_merge_keeps_disjoint_products() {
        let base = map(json!({"89H": {"variables": ["H89"]}}));
        let overlay = map(json!({"89V": {"variables": ["V89"]}}));
        let merged = merge_fields(&base, &overlay, MergeStrategy::Deep);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_deep_merge_mapping_over_scalar() {
        let base = map(json!({"alg_args": null}));
        let overlay = map(json!({"alg_args": {"norm": true}}));
        let merged = merge_fields(&base, &overlay, MergeStrategy::Deep);
        assert_eq!(merged["alg_args"], json!({"norm": true}));
    }

    #[test]
    fn test_prefer_base_adds_missing_keys() {
        let base = map(json!({"a": 1}));
        let overlay = map(json!({"a": 2, "b": 3}));
        let merged = merge_fields(&base, &overlay, MergeStrategy::PreferBase);
        assert_eq!(merged, map(json!({"a": 1, "b": 3})));
    }

    #[test]
    fn test_resolve_fields_source_wins() {
        let base = map(json!({"product_type": "alg", "alg_args": {"norm": false}}));
        let fragment = map(json!({"alg_args": {"norm": true}, "product_name": "other"}));
        let fields = resolve_fields("89pct", "gmi", &base, &fragment);
        assert_eq!(fields["alg_args"], json!({"norm": true}));
        assert_eq!(fields["product_name"], "89pct");
    }

    #[test]
    fn test_overridden_keys() {
        let base = map(json!({"product_type": "alg", "variables": []}));
        let overlay = map(json!({"variables": ["B14BT"], "display_name": "IR"}));
        let (replaced, added) = overridden_keys(&base, &overlay);
        assert_eq!(replaced, vec!["variables"]);
        assert_eq!(added, vec!["display_name"]);
    }
}
