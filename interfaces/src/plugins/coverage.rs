//! Coverage check plugins: the percent of a product with valid data.

use std::fmt;

use product_spec_core::FieldMap;
use serde::{Deserialize, Serialize};

use super::{KwArgs, Plane, PluginError};
use crate::registry::RegistryBuilder;

/// Coverage check function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Standard,
}

impl CoverageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type CoverageFn = fn(&[Plane], &FieldMap) -> Result<f64, PluginError>;

/// A coverage check plugin.
#[derive(Debug, Clone, Copy)]
pub enum CoveragePlugin {
    Standard(CoverageFn),
}

impl CoveragePlugin {
    pub fn covg_type(&self) -> CoverageType {
        match self {
            Self::Standard(_) => CoverageType::Standard,
        }
    }

    /// Percent coverage, `0.0..=100.0`.
    pub fn check(&self, planes: &[Plane], args: &FieldMap) -> Result<f64, PluginError> {
        match self {
            Self::Standard(f) => f(planes, args),
        }
    }

    /// Runs the check on a half-masked RGBA stack and fails unless the
    /// result is a percentage.
    pub fn check_defaults(&self) -> Result<(), PluginError> {
        let half = vec![1.0, f64::NAN];
        let alpha = vec![1.0, 0.0];
        let planes = [half.clone(), half.clone(), half, alpha];
        let percent = self.check(&planes, &FieldMap::new())?;
        if (0.0..=100.0).contains(&percent) {
            Ok(())
        } else {
            Err(PluginError::InvalidArgument {
                name: "coverage".to_string(),
                reason: format!("{percent} is not a percentage"),
            })
        }
    }
}

/// The check applied to products that name none.
pub const DEFAULT_COVERAGE_CHECK: &str = "masked_arrays";

pub(crate) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register(DEFAULT_COVERAGE_CHECK, CoveragePlugin::Standard(masked_arrays))
        .register("rgba", CoveragePlugin::Standard(rgba))
}

fn percent(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * hits as f64 / total as f64
    }
}

/// Percent of unmasked values in the first plane.
pub fn masked_arrays(planes: &[Plane], args: &FieldMap) -> Result<f64, PluginError> {
    KwArgs::parse(args, &[])?;
    let Some(data) = planes.first() else {
        return Err(PluginError::ArrayCount {
            expected: 1,
            found: 0,
        });
    };
    Ok(percent(data.iter().filter(|v| !v.is_nan()).count(), data.len()))
}

/// Percent of non-transparent pixels in an RGBA stack's alpha plane.
pub fn rgba(planes: &[Plane], args: &FieldMap) -> Result<f64, PluginError> {
    KwArgs::parse(args, &[])?;
    let [_, _, _, alpha] = planes else {
        return Err(PluginError::ArrayCount {
            expected: 4,
            found: planes.len(),
        });
    };
    Ok(percent(
        alpha.iter().filter(|&&a| a != 0.0 && !a.is_nan()).count(),
        alpha.len(),
    ))
}
