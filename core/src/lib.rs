//! Core product specification types and validation.
//!
//! This crate defines the data model for satellite product specifications:
//!
//! - [`ProductType`]: the closed set of product kinds, each with its
//!   required and optional field tables.
//! - [`ResolvedProduct`]: a product's base fields with one source's
//!   overrides applied, in wire form.
//! - [`ProductSpec`]: the typed view of a validated product, with a
//!   [`ProductKind`] variant per product type.
//! - [`ProductCatalog`]: every valid (product, source) pair grouped by type
//!   and by source.
//! - [`ColorsInfo`]: the colormap description colormap plugins return.
//!
//! Validation ([`validate_product_fields`]) distinguishes a missing
//! `product_type`, an unknown one, missing fields and unknown fields.
//!
//! Merging ([`merge_fields`], [`resolve_fields`]) combines source fragments
//! and product fields using a [`MergeStrategy`].
//!
//! # Example
//!
//! ```
//! use product_spec_core::*;
//! use serde_json::json;
//!
//! let base = json!({
//!     "product_type": "interp_alg_cmap",
//!     "alg_func": "pmw_tb.pmw_89pct",
//!     "alg_args": {"output_data_range": [105, 280]},
//!     "interp_func": "pyresample_wrappers.interp_nearest",
//!     "interp_args": null,
//!     "cmap_func": "pmw_tb.cmap_89H",
//!     "cmap_args": {"data_range": [105, 280]},
//! });
//! let fragment = json!({"variables": ["H89", "V89"]});
//!
//! let fields = resolve_fields(
//!     "89pct",
//!     "gmi",
//!     base.as_object().unwrap(),
//!     fragment.as_object().unwrap(),
//! );
//! assert_eq!(validate_product_fields(&fields), Ok(ProductType::InterpAlgCmap));
//!
//! let spec = ProductSpec::from_resolved(&ResolvedProduct::new("89pct", "gmi", fields)).unwrap();
//! assert!(spec.kind.interpolation().is_some());
//! ```

mod catalog;
mod colors;
mod merge;
mod types;
mod validate;

pub use catalog::ProductCatalog;
pub use colors::{CbarSpacing, Color, Colormap, ColorsInfo, Normalize, Transition};
pub use merge::{MergeStrategy, merge_fields, overridden_keys, resolve_fields};
pub use types::*;
pub use validate::{ValidationError, ValidationResult, validate_product_fields};
