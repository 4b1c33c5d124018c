//! Product field validation.
//!
//! Checks a resolved product's keys against the required and optional field
//! tables of its declared [`ProductType`]. Only keys are inspected here.
//! Value shapes are checked when lifting into [`ProductSpec`](crate::ProductSpec).
//!
//! # Examples
//!
//! ```
//! use product_spec_core::*;
//! use serde_json::json;
//!
//! let fields = json!({
//!     "product_type": "cmap",
//!     "product_name": "IR-BD",
//!     "source_input": "ahi",
//!     "variables": ["B14BT"],
//!     "cmap_func": "visir.IR_BD",
//!     "cmap_args": null,
//! });
//! assert_eq!(
//!     validate_product_fields(fields.as_object().unwrap()),
//!     Ok(ProductType::Cmap)
//! );
//!
//! // An extra key is rejected
//! let mut bad = fields.as_object().unwrap().clone();
//! bad.insert("foo".into(), json!(1));
//! assert!(matches!(
//!     validate_product_fields(&bad),
//!     Err(ValidationError::UnknownFields { .. })
//! ));
//! ```

use thiserror::Error;

use crate::{FieldMap, ProductType};

/// Product validation errors.
///
/// The three key-level failure modes are distinct variants so callers can
/// report which one applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The product declares no `product_type`.
    #[error("product_type missing from product fields")]
    MissingProductType,
    /// `product_type` is not one of the known tags.
    #[error("unknown product_type '{found}', must be one of: {}", allowed.join(", "))]
    UnknownProductType { found: String, allowed: Vec<String> },
    /// Required fields for the declared type are absent.
    #[error("missing required fields for product_type '{product_type}': {}", missing.join(", "))]
    MissingFields {
        product_type: ProductType,
        missing: Vec<String>,
    },
    /// Fields outside the required and optional sets are present.
    #[error("unknown fields for product_type '{product_type}': {}", unknown.join(", "))]
    UnknownFields {
        product_type: ProductType,
        unknown: Vec<String>,
    },
    /// A field holds a value of the wrong shape.
    #[error("field '{field}' must be a {expected}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
    },
}

/// Outcome of validating one product. Never partial.
pub type ValidationResult = Result<ProductType, ValidationError>;

/// Validates the keys of a resolved product.
///
/// Checks, in order: `product_type` is present, it names a known type, every
/// required field for that type is present, and no field falls outside the
/// required and optional sets. The first failing check is returned. Missing
/// and unknown field lists are sorted.
pub fn validate_product_fields(fields: &FieldMap) -> ValidationResult {
    let Some(tag) = fields.get("product_type") else {
        return Err(ValidationError::MissingProductType);
    };

    let product_type = match tag.as_str() {
        Some(tag) => tag.parse::<ProductType>()?,
        None => {
            return Err(ValidationError::UnknownProductType {
                found: tag.to_string(),
                allowed: ProductType::allowed_tags(),
            });
        }
    };

    let required = product_type.required_fields();
    let optional = product_type.optional_fields();

    let mut missing: Vec<String> = required
        .iter()
        .filter(|field| !fields.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ValidationError::MissingFields {
            product_type,
            missing,
        });
    }

    let unknown: Vec<String> = fields
        .keys()
        .filter(|key| !required.contains(&key.as_str()) && !optional.contains(&key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownFields {
            product_type,
            unknown,
        });
    }

    Ok(product_type)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn fields(value: Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    fn base(product_type: &str) -> FieldMap {
        fields(json!({
            "product_type": product_type,
            "product_name": "89pct",
            "source_input": "gmi",
            "variables": ["H89", "V89"],
        }))
    }

    #[test]
    fn test_missing_product_type() {
        let mut product = base("alg");
        product.remove("product_type");
        assert_eq!(
            validate_product_fields(&product),
            Err(ValidationError::MissingProductType)
        );
    }

    #[test]
    fn test_unknown_product_type() {
        let err = validate_product_fields(&base("alg_interp")).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownProductType { ref found, .. } if found == "alg_interp"));
        assert!(err.to_string().contains("interp_alg_cmap"));
    }

    #[test]
    fn test_non_string_product_type_is_unknown() {
        let mut product = base("alg");
        product.insert("product_type".into(), json!(5));
        assert!(matches!(
            validate_product_fields(&product),
            Err(ValidationError::UnknownProductType { .. })
        ));
    }

    #[test]
    fn test_missing_fields_are_sorted() {
        let err = validate_product_fields(&base("interp_alg")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                product_type: ProductType::InterpAlg,
                missing: vec![
                    "alg_args".to_string(),
                    "alg_func".to_string(),
                    "interp_args".to_string(),
                    "interp_func".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_unknown_fields() {
        let mut product = base("sectored_xarray_dict_to_output_format");
        product.insert("foo".into(), json!("bar"));
        product.insert("alg_func".into(), json!("single_channel"));
        assert_eq!(
            validate_product_fields(&product),
            Err(ValidationError::UnknownFields {
                product_type: ProductType::SectoredXarrayDictToOutputFormat,
                unknown: vec!["alg_func".to_string(), "foo".to_string()],
            })
        );
    }

    #[test]
    fn test_mtif_type_only_allowed_with_colormap_and_algorithm() {
        let mut alg_cmap = base("alg_cmap");
        for key in ["alg_func", "alg_args", "cmap_func", "cmap_args"] {
            alg_cmap.insert(key.into(), Value::Null);
        }
        alg_cmap.insert("mtif_type".into(), json!("89H"));
        assert_eq!(validate_product_fields(&alg_cmap), Ok(ProductType::AlgCmap));

        let mut alg = base("alg");
        alg.insert("alg_func".into(), Value::Null);
        alg.insert("alg_args".into(), Value::Null);
        alg.insert("mtif_type".into(), json!("89H"));
        assert!(matches!(
            validate_product_fields(&alg),
            Err(ValidationError::UnknownFields { .. })
        ));
    }

    #[test]
    fn test_every_type_accepts_exactly_its_required_set() {
        for product_type in ProductType::ALL {
            let mut product = FieldMap::new();
            for field in product_type.required_fields() {
                product.insert(field.to_string(), Value::Null);
            }
            product.insert("product_type".into(), json!(product_type.as_str()));
            assert_eq!(validate_product_fields(&product), Ok(product_type));

            for field in product_type.optional_fields() {
                product.insert(field.to_string(), Value::Null);
            }
            assert_eq!(validate_product_fields(&product), Ok(product_type));
        }
    }
}
