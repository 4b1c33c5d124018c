//! Product specification type definitions.
//!
//! This module defines the data model shared by the store, the resolver and
//! the self-test harness. Documents stay in their wire form ([`FieldMap`])
//! until they have been validated. After that they can be lifted into the
//! typed [`ProductSpec`] view.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationError;

/// Version of the specification document contract.
///
/// Written into store configuration files and catalog exports to track
/// compatibility.
pub const SPEC_CONTRACT_VERSION: &str = "1.0";

/// Field mapping as read from a YAML document.
///
/// Keys are sorted, so serializing a map is deterministic.
pub type FieldMap = serde_json::Map<String, Value>;

/// Fields every product type requires after resolution.
pub const BASE_REQUIRED_FIELDS: &[&str] =
    &["product_type", "product_name", "source_input", "variables"];

/// Fields every product type may carry.
pub const BASE_OPTIONAL_FIELDS: &[&str] = &["display_name", "covg_func", "covg_args"];

/// Closed set of product kinds.
///
/// The tag decides which fields a product must and may declare.
///
/// # Examples
///
/// ```
/// use product_spec_core::ProductType;
///
/// let kind: ProductType = "alg_cmap".parse().unwrap();
/// assert_eq!(kind, ProductType::AlgCmap);
/// assert!(kind.required_fields().contains(&"cmap_func"));
/// assert!(kind.optional_fields().contains(&"mtif_type"));
/// assert!("not_a_type".parse::<ProductType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Interpolate, run an algorithm, then apply a colormap.
    InterpAlgCmap,
    /// Interpolate, then run an algorithm.
    InterpAlg,
    /// Run an algorithm only.
    Alg,
    /// Run an algorithm, then apply a colormap.
    AlgCmap,
    /// Apply a colormap to a single variable.
    Cmap,
    /// Hand sectored datasets straight to an output format.
    SectoredXarrayDictToOutputFormat,
    /// Hand unsectored datasets straight to an output format.
    UnsectoredXarrayDictToOutputFormat,
}

impl ProductType {
    /// Every product type, in declaration order.
    pub const ALL: [ProductType; 7] = [
        ProductType::InterpAlgCmap,
        ProductType::InterpAlg,
        ProductType::Alg,
        ProductType::AlgCmap,
        ProductType::Cmap,
        ProductType::SectoredXarrayDictToOutputFormat,
        ProductType::UnsectoredXarrayDictToOutputFormat,
    ];

    /// Returns the tag as written in product documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InterpAlgCmap => "interp_alg_cmap",
            Self::InterpAlg => "interp_alg",
            Self::Alg => "alg",
            Self::AlgCmap => "alg_cmap",
            Self::Cmap => "cmap",
            Self::SectoredXarrayDictToOutputFormat => "sectored_xarray_dict_to_output_format",
            Self::UnsectoredXarrayDictToOutputFormat => "unsectored_xarray_dict_to_output_format",
        }
    }

    /// Returns every allowed tag, in declaration order.
    pub fn allowed_tags() -> Vec<String> {
        Self::ALL.iter().map(|t| t.as_str().to_string()).collect()
    }

    /// Function fields this type requires on top of [`BASE_REQUIRED_FIELDS`].
    pub fn function_fields(self) -> &'static [&'static str] {
        match self {
            Self::InterpAlgCmap => &[
                "alg_func",
                "alg_args",
                "interp_func",
                "interp_args",
                "cmap_func",
                "cmap_args",
            ],
            Self::InterpAlg => &["alg_func", "alg_args", "interp_func", "interp_args"],
            Self::Alg => &["alg_func", "alg_args"],
            Self::AlgCmap => &["alg_func", "alg_args", "cmap_func", "cmap_args"],
            Self::Cmap => &["cmap_func", "cmap_args"],
            Self::SectoredXarrayDictToOutputFormat | Self::UnsectoredXarrayDictToOutputFormat => {
                &[]
            }
        }
    }

    /// All fields a product of this type must declare.
    pub fn required_fields(self) -> Vec<&'static str> {
        let mut fields = BASE_REQUIRED_FIELDS.to_vec();
        fields.extend_from_slice(self.function_fields());
        fields
    }

    /// Fields a product of this type may declare.
    pub fn optional_fields(self) -> Vec<&'static str> {
        let mut fields = BASE_OPTIONAL_FIELDS.to_vec();
        if matches!(self, Self::InterpAlgCmap | Self::AlgCmap) {
            fields.push("mtif_type");
        }
        fields
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownProductType {
                found: s.to_string(),
                allowed: Self::allowed_tags(),
            })
    }
}

/// Two-element numeric output range, `[min, max]`.
///
/// # Examples
///
/// ```
/// use product_spec_core::DataRange;
/// use serde_json::json;
///
/// let range = DataRange::from_value(&json!([-90, 30])).unwrap();
/// assert_eq!(range, DataRange::new(-90.0, 30.0));
/// assert!(range.contains(-80.0));
/// assert!(DataRange::from_value(&json!([1, 2, 3])).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", from = "[f64; 2]")]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
}

impl DataRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Reads a range from a two-element numeric array.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_array().map(Vec::as_slice) {
            Some([min, max]) => Some(Self::new(min.as_f64()?, max.as_f64()?)),
            _ => None,
        }
    }

    /// Returns `true` if `value` lies within the closed range.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Distance between the bounds.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl From<DataRange> for [f64; 2] {
    fn from(range: DataRange) -> Self {
        [range.min, range.max]
    }
}

impl From<[f64; 2]> for DataRange {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// A named function reference plus its keyword arguments.
///
/// Both halves may be null in documents that declare the field but leave it
/// unset, so both are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: Option<String>,
    pub args: Option<FieldMap>,
}

impl FunctionCall {
    /// Returns the declared arguments, or an empty map.
    pub fn args_or_empty(&self) -> FieldMap {
        self.args.clone().unwrap_or_default()
    }
}

/// Processing chain of a product, one variant per [`ProductType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product_type", rename_all = "snake_case")]
pub enum ProductKind {
    InterpAlgCmap {
        interpolation: FunctionCall,
        algorithm: FunctionCall,
        colormap: FunctionCall,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtif_type: Option<String>,
    },
    InterpAlg {
        interpolation: FunctionCall,
        algorithm: FunctionCall,
    },
    Alg {
        algorithm: FunctionCall,
    },
    AlgCmap {
        algorithm: FunctionCall,
        colormap: FunctionCall,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mtif_type: Option<String>,
    },
    Cmap {
        colormap: FunctionCall,
    },
    SectoredXarrayDictToOutputFormat,
    UnsectoredXarrayDictToOutputFormat,
}

impl ProductKind {
    /// Returns the matching [`ProductType`] tag.
    pub fn product_type(&self) -> ProductType {
        match self {
            Self::InterpAlgCmap { .. } => ProductType::InterpAlgCmap,
            Self::InterpAlg { .. } => ProductType::InterpAlg,
            Self::Alg { .. } => ProductType::Alg,
            Self::AlgCmap { .. } => ProductType::AlgCmap,
            Self::Cmap { .. } => ProductType::Cmap,
            Self::SectoredXarrayDictToOutputFormat => ProductType::SectoredXarrayDictToOutputFormat,
            Self::UnsectoredXarrayDictToOutputFormat => {
                ProductType::UnsectoredXarrayDictToOutputFormat
            }
        }
    }

    /// Algorithm call, if this kind runs one.
    pub fn algorithm(&self) -> Option<&FunctionCall> {
        match self {
            Self::InterpAlgCmap { algorithm, .. }
            | Self::InterpAlg { algorithm, .. }
            | Self::Alg { algorithm }
            | Self::AlgCmap { algorithm, .. } => Some(algorithm),
            _ => None,
        }
    }

    /// Colormap call, if this kind applies one.
    pub fn colormap(&self) -> Option<&FunctionCall> {
        match self {
            Self::InterpAlgCmap { colormap, .. }
            | Self::AlgCmap { colormap, .. }
            | Self::Cmap { colormap } => Some(colormap),
            _ => None,
        }
    }

    /// Interpolation call, if this kind interpolates.
    pub fn interpolation(&self) -> Option<&FunctionCall> {
        match self {
            Self::InterpAlgCmap { interpolation, .. } | Self::InterpAlg { interpolation, .. } => {
                Some(interpolation)
            }
            _ => None,
        }
    }
}

/// Typed view of a validated product.
///
/// Built with [`ProductSpec::from_resolved`], which only succeeds for a
/// product whose keys pass [`validate_product_fields`](crate::validate_product_fields)
/// and whose values have the expected shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub product_name: String,
    pub source_input: String,
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<FunctionCall>,
    #[serde(flatten)]
    pub kind: ProductKind,
}

impl ProductSpec {
    /// Lifts a resolved product into the typed view.
    ///
    /// # Errors
    ///
    /// Returns the key-level [`ValidationError`] if the fields do not match
    /// the declared type, or [`ValidationError::InvalidFieldType`] if a value
    /// has the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use product_spec_core::*;
    /// use serde_json::json;
    ///
    /// let fields = json!({
    ///     "product_type": "alg",
    ///     "product_name": "89pct",
    ///     "source_input": "gmi",
    ///     "variables": ["V89", "H89"],
    ///     "alg_func": "pmw_tb.pmw_89pct",
    ///     "alg_args": {"output_data_range": [105, 280]},
    /// });
    /// let product = ResolvedProduct::new("89pct", "gmi", fields.as_object().unwrap().clone());
    /// let spec = ProductSpec::from_resolved(&product).unwrap();
    /// assert_eq!(spec.kind.product_type(), ProductType::Alg);
    /// assert_eq!(spec.variables, vec!["V89", "H89"]);
    /// assert_eq!(
    ///     spec.kind.algorithm().unwrap().name.as_deref(),
    ///     Some("pmw_tb.pmw_89pct")
    /// );
    /// ```
    pub fn from_resolved(product: &ResolvedProduct) -> Result<Self, ValidationError> {
        let product_type = crate::validate_product_fields(&product.fields)?;

        let call = |prefix: &str| -> Result<FunctionCall, ValidationError> {
            Ok(FunctionCall {
                name: product.string_field(&format!("{prefix}_func"))?,
                args: product.map_field(&format!("{prefix}_args"))?,
            })
        };

        let kind = match product_type {
            ProductType::InterpAlgCmap => ProductKind::InterpAlgCmap {
                interpolation: call("interp")?,
                algorithm: call("alg")?,
                colormap: call("cmap")?,
                mtif_type: product.string_field("mtif_type")?,
            },
            ProductType::InterpAlg => ProductKind::InterpAlg {
                interpolation: call("interp")?,
                algorithm: call("alg")?,
            },
            ProductType::Alg => ProductKind::Alg {
                algorithm: call("alg")?,
            },
            ProductType::AlgCmap => ProductKind::AlgCmap {
                algorithm: call("alg")?,
                colormap: call("cmap")?,
                mtif_type: product.string_field("mtif_type")?,
            },
            ProductType::Cmap => ProductKind::Cmap {
                colormap: call("cmap")?,
            },
            ProductType::SectoredXarrayDictToOutputFormat => {
                ProductKind::SectoredXarrayDictToOutputFormat
            }
            ProductType::UnsectoredXarrayDictToOutputFormat => {
                ProductKind::UnsectoredXarrayDictToOutputFormat
            }
        };

        let coverage = match (
            product.string_field("covg_func")?,
            product.map_field("covg_args")?,
        ) {
            (None, None) => None,
            (name, args) => Some(FunctionCall { name, args }),
        };

        Ok(Self {
            product_name: product.product_name.clone(),
            source_input: product.source_name.clone(),
            variables: product.string_list_field("variables")?.unwrap_or_default(),
            display_name: product.string_field("display_name")?,
            coverage,
            kind,
        })
    }
}

/// A product's base fields with one source's overrides applied.
///
/// Built on demand per lookup and never mutated afterwards. `yaml_files`
/// lists the documents that contributed, for diagnostics only. It is never
/// part of `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProduct {
    pub product_name: String,
    pub source_name: String,
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub yaml_files: Vec<PathBuf>,
}

impl ResolvedProduct {
    /// Creates a resolved product with no document provenance.
    pub fn new(
        product_name: impl Into<String>,
        source_name: impl Into<String>,
        fields: FieldMap,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            source_name: source_name.into(),
            fields,
            yaml_files: Vec::new(),
        }
    }

    /// Attaches the document paths this product was resolved from.
    pub fn with_yaml_files(mut self, files: Vec<PathBuf>) -> Self {
        self.yaml_files = files;
        self
    }

    /// Returns the raw value for `key`, treating explicit null as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Returns the declared `product_type` tag, if it is a string.
    pub fn product_type(&self) -> Option<&str> {
        self.get("product_type").and_then(Value::as_str)
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFieldType`] if the value is present
    /// but not a string.
    pub fn string_field(&self, key: &str) -> Result<Option<String>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::InvalidFieldType {
                field: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Reads a mapping field.
    pub fn map_field(&self, key: &str) -> Result<Option<FieldMap>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(ValidationError::InvalidFieldType {
                field: key.to_string(),
                expected: "mapping",
            }),
        }
    }

    /// Reads a list-of-strings field.
    pub fn string_list_field(&self, key: &str) -> Result<Option<Vec<String>>, ValidationError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let invalid = || ValidationError::InvalidFieldType {
            field: key.to_string(),
            expected: "list of strings",
        };
        value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}
