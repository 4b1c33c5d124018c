//! Built-in plugins and the typed call signatures each plugin family uses.
//!
//! Every family is an enum whose variants hold plain `fn` pointers, one
//! variant per function type. The variant is the plugin's type tag, so a
//! plugin cannot be registered under a type whose signature it does not
//! have.
//!
//! Numeric plugins work on [`Plane`]s: flat row-major `f64` buffers where
//! NaN marks a masked value.

pub mod algorithms;
pub mod colormaps;
pub mod coverage;
pub mod filenames;
pub mod interpolation;

use product_spec_core::{DataRange, FieldMap};
use serde_json::Value;
use thiserror::Error;

use crate::registry::RegistryBuilder;

/// One 2D field, flattened row-major. NaN marks masked values.
pub type Plane = Vec<f64>;

/// Errors raised by plugins when called.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PluginError {
    /// A required argument was not supplied.
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    /// An argument the plugin does not accept was supplied.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    /// An argument was supplied with the wrong shape or value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A data range does not satisfy the plugin's constraints.
    #[error("invalid data range [{min}, {max}]: {reason}")]
    InvalidRange { min: f64, max: f64, reason: String },

    /// The wrong number of input arrays was supplied.
    #[error("expected {expected} input arrays, found {found}")]
    ArrayCount { expected: usize, found: usize },

    /// Input arrays differ in length.
    #[error("input arrays differ in length")]
    ShapeMismatch,

    /// A requested variable is not present in the input.
    #[error("variable '{0}' not present in input")]
    MissingVariable(String),

    /// Metadata the plugin needs was not supplied.
    #[error("metadata '{0}' not supplied")]
    MissingMetadata(String),
}

impl PluginError {
    /// Short name of the variant, used when the error is wrapped.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) => "MissingArgument",
            Self::UnexpectedArgument(_) => "UnexpectedArgument",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::InvalidRange { .. } => "InvalidRange",
            Self::ArrayCount { .. } => "ArrayCount",
            Self::ShapeMismatch => "ShapeMismatch",
            Self::MissingVariable(_) => "MissingVariable",
            Self::MissingMetadata(_) => "MissingMetadata",
        }
    }

    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Keyword arguments checked against the parameters a plugin accepts.
///
/// Null values read as absent, so `cmap_args: {data_range: null}` behaves
/// like an empty mapping.
pub(crate) struct KwArgs<'a> {
    args: &'a FieldMap,
}

impl<'a> KwArgs<'a> {
    /// Fails with [`PluginError::UnexpectedArgument`] on the first key not
    /// in `accepted`.
    pub(crate) fn parse(args: &'a FieldMap, accepted: &[&str]) -> Result<Self, PluginError> {
        if let Some(key) = args.keys().find(|k| !accepted.contains(&k.as_str())) {
            return Err(PluginError::UnexpectedArgument(key.clone()));
        }
        Ok(Self { args })
    }

    fn value(&self, name: &str) -> Option<&'a Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub(crate) fn range(&self, name: &str) -> Result<Option<DataRange>, PluginError> {
        self.value(name)
            .map(|v| {
                DataRange::from_value(v)
                    .ok_or_else(|| PluginError::invalid(name, "expected a two-element numeric list"))
            })
            .transpose()
    }

    pub(crate) fn require_range(&self, name: &str) -> Result<DataRange, PluginError> {
        self.range(name)?
            .ok_or_else(|| PluginError::MissingArgument(name.to_string()))
    }

    pub(crate) fn number(&self, name: &str) -> Result<Option<f64>, PluginError> {
        self.value(name)
            .map(|v| v.as_f64().ok_or_else(|| PluginError::invalid(name, "expected a number")))
            .transpose()
    }

    pub(crate) fn numbers(&self, name: &str) -> Result<Option<Vec<f64>>, PluginError> {
        self.value(name)
            .map(|v| {
                v.as_array()
                    .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                    .ok_or_else(|| PluginError::invalid(name, "expected a list of numbers"))
            })
            .transpose()
    }

    pub(crate) fn string(&self, name: &str) -> Result<Option<String>, PluginError> {
        self.value(name)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| PluginError::invalid(name, "expected a string"))
            })
            .transpose()
    }

    pub(crate) fn bool(&self, name: &str) -> Result<Option<bool>, PluginError> {
        self.value(name)
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| PluginError::invalid(name, "expected a boolean"))
            })
            .transpose()
    }

    /// Parses a string argument with `FromStr`, reporting the parse error.
    pub(crate) fn parsed<T>(&self, name: &str) -> Result<Option<T>, PluginError>
    where
        T: std::str::FromStr<Err = String>,
    {
        self.string(name)?
            .map(|s| s.parse().map_err(|reason| PluginError::invalid(name, reason)))
            .transpose()
    }
}

/// Fails unless exactly `expected` arrays of equal length were supplied.
pub(crate) fn check_arrays(arrays: &[Plane], expected: usize) -> Result<(), PluginError> {
    if arrays.len() != expected {
        return Err(PluginError::ArrayCount {
            expected,
            found: arrays.len(),
        });
    }
    check_same_length(arrays)
}

pub(crate) fn check_same_length(arrays: &[Plane]) -> Result<(), PluginError> {
    match arrays.split_first() {
        Some((first, rest)) if rest.iter().any(|a| a.len() != first.len()) => {
            Err(PluginError::ShapeMismatch)
        }
        _ => Ok(()),
    }
}

/// Registers every built-in plugin.
pub fn register_builtins(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = colormaps::register(builder);
    let builder = algorithms::register(builder);
    let builder = interpolation::register(builder);
    let builder = coverage::register(builder);
    filenames::register(builder)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_unexpected_argument_is_named() {
        let map = args(json!({"data_range": [0, 1], "colour": "red"}));
        let err = KwArgs::parse(&map, &["data_range"]).err().unwrap();
        assert_eq!(err, PluginError::UnexpectedArgument("colour".to_string()));
    }

    #[test]
    fn test_null_reads_as_absent() {
        let map = args(json!({"data_range": null}));
        let kwargs = KwArgs::parse(&map, &["data_range"]).unwrap();
        assert_eq!(kwargs.range("data_range").unwrap(), None);
        assert_eq!(
            kwargs.require_range("data_range"),
            Err(PluginError::MissingArgument("data_range".to_string()))
        );
    }

    #[test]
    fn test_wrong_shapes_are_invalid() {
        let map = args(json!({
            "data_range": [1, 2, 3],
            "norm": "yes",
            "label": 4,
            "scale": "big",
            "gammas": [1.0, "two"],
        }));
        let kwargs = KwArgs::parse(&map, &["data_range", "norm", "label", "scale", "gammas"]).unwrap();
        assert_eq!(kwargs.number("scale").unwrap_err().kind(), "InvalidArgument");
        assert_eq!(kwargs.numbers("gammas").unwrap_err().kind(), "InvalidArgument");
        assert_eq!(kwargs.range("data_range").unwrap_err().kind(), "InvalidArgument");
        assert_eq!(kwargs.bool("norm").unwrap_err().kind(), "InvalidArgument");
        assert_eq!(kwargs.string("label").unwrap_err().kind(), "InvalidArgument");
    }

    #[test]
    fn test_check_arrays() {
        assert!(check_arrays(&[vec![1.0], vec![2.0]], 2).is_ok());
        assert_eq!(
            check_arrays(&[vec![1.0]], 2),
            Err(PluginError::ArrayCount { expected: 2, found: 1 })
        );
        assert_eq!(
            check_arrays(&[vec![1.0], vec![2.0, 3.0]], 2),
            Err(PluginError::ShapeMismatch)
        );
    }
}
