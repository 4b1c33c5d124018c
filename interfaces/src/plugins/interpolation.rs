//! Interpolation plugins: swath data onto a regular lat/lon grid.

use std::collections::BTreeMap;
use std::fmt;

use product_spec_core::FieldMap;
use serde::{Deserialize, Serialize};

use super::{KwArgs, Plane, PluginError};
use crate::registry::RegistryBuilder;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 110_574.0;
const METERS_PER_DEGREE_LON: f64 = 111_320.0;

/// Interpolation function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterpolationType {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "grid")]
    Grid,
}

impl InterpolationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoD => "2d",
            Self::Grid => "grid",
        }
    }
}

impl fmt::Display for InterpolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regular lat/lon target grid. Row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub area_id: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridDefinition {
    fn lat_step(&self) -> f64 {
        (self.lat_max - self.lat_min) / self.rows.max(1) as f64
    }

    fn lon_step(&self) -> f64 {
        (self.lon_max - self.lon_min) / self.cols.max(1) as f64
    }

    /// Latitude and longitude of a cell center.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.lat_max - (row as f64 + 0.5) * self.lat_step(),
            self.lon_min + (col as f64 + 0.5) * self.lon_step(),
        )
    }

    /// East-west cell size in metres at the grid's central latitude.
    pub fn pixel_size_x(&self) -> f64 {
        let center_lat = (self.lat_min + self.lat_max) / 2.0;
        self.lon_step() * METERS_PER_DEGREE_LON * center_lat.to_radians().cos()
    }

    /// North-south cell size in metres.
    pub fn pixel_size_y(&self) -> f64 {
        self.lat_step() * METERS_PER_DEGREE_LAT
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Swath data: one lat/lon per sample and any number of variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Swath {
    pub latitudes: Plane,
    pub longitudes: Plane,
    pub variables: BTreeMap<String, Plane>,
    /// Sensor-declared search radius in metres.
    pub radius_of_influence: Option<f64>,
}

pub type GridInterpFn = fn(
    &GridDefinition,
    &Swath,
    &[String],
    &FieldMap,
) -> Result<BTreeMap<String, Plane>, PluginError>;

/// An interpolation plugin, one variant per function type.
#[derive(Debug, Clone, Copy)]
pub enum InterpolationPlugin {
    TwoD(GridInterpFn),
}

impl InterpolationPlugin {
    pub fn interp_type(&self) -> InterpolationType {
        match self {
            Self::TwoD(_) => InterpolationType::TwoD,
        }
    }

    /// Interpolates `varlist` from `swath` onto `area`.
    pub fn interpolate(
        &self,
        area: &GridDefinition,
        swath: &Swath,
        varlist: &[String],
        args: &FieldMap,
    ) -> Result<BTreeMap<String, Plane>, PluginError> {
        match self {
            Self::TwoD(f) => f(area, swath, varlist, args),
        }
    }
}

pub(crate) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder.register(
        "pyresample_wrappers.interp_nearest",
        InterpolationPlugin::TwoD(interp_nearest),
    )
}

fn great_circle_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Nearest-neighbour interpolation within a radius of influence.
///
/// The radius is the larger of the swath's declared radius and the grid's
/// pixel size. Cells with no swath sample inside it are NaN. Samples with
/// NaN coordinates are ignored.
pub fn interp_nearest(
    area: &GridDefinition,
    swath: &Swath,
    varlist: &[String],
    args: &FieldMap,
) -> Result<BTreeMap<String, Plane>, PluginError> {
    KwArgs::parse(args, &[])?;
    if swath.latitudes.len() != swath.longitudes.len() {
        return Err(PluginError::ShapeMismatch);
    }
    let mut inputs = Vec::with_capacity(varlist.len());
    for name in varlist {
        let data = swath
            .variables
            .get(name)
            .ok_or_else(|| PluginError::MissingVariable(name.clone()))?;
        if data.len() != swath.latitudes.len() {
            return Err(PluginError::ShapeMismatch);
        }
        inputs.push((name, data));
    }

    let radius = swath
        .radius_of_influence
        .unwrap_or(0.0)
        .max(area.pixel_size_x())
        .max(area.pixel_size_y());

    let samples: Vec<(usize, f64, f64)> = swath
        .latitudes
        .iter()
        .zip(&swath.longitudes)
        .enumerate()
        .filter(|(_, (lat, lon))| !lat.is_nan() && !lon.is_nan())
        .map(|(i, (&lat, &lon))| (i, lat, lon))
        .collect();

    let nearest: Vec<Option<usize>> = (0..area.rows)
        .flat_map(|row| (0..area.cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let (lat, lon) = area.cell_center(row, col);
            samples
                .iter()
                .map(|&(i, s_lat, s_lon)| (i, great_circle_m(lat, lon, s_lat, s_lon)))
                .filter(|&(_, d)| d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
        })
        .collect();

    Ok(inputs
        .into_iter()
        .map(|(name, data)| {
            let plane = nearest
                .iter()
                .map(|hit| hit.map_or(f64::NAN, |i| data[i]))
                .collect();
            (name.clone(), plane)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn area() -> GridDefinition {
        GridDefinition {
            area_id: "test".to_string(),
            lat_min: 0.0,
            lat_max: 2.0,
            lon_min: 0.0,
            lon_max: 2.0,
            rows: 2,
            cols: 2,
        }
    }

    fn swath() -> Swath {
        Swath {
            latitudes: vec![1.75, 0.25, f64::NAN],
            longitudes: vec![0.25, 1.75, 0.5],
            variables: BTreeMap::from([("B14BT".to_string(), vec![200.0, 210.0, 220.0])]),
            radius_of_influence: None,
        }
    }

    #[test]
    fn test_grid_geometry() {
        let area = area();
        assert_eq!(area.cell_center(0, 0), (1.5, 0.5));
        assert_eq!(area.cell_center(1, 1), (0.5, 1.5));
        assert!((area.pixel_size_y() - 110_574.0).abs() < 1e-6);
        assert!(area.pixel_size_x() < 111_320.0);
        assert_eq!(area.len(), 4);
    }

    #[test]
    fn test_nearest_fills_matched_cells_only() {
        let out = interp_nearest(&area(), &swath(), &["B14BT".to_string()], &FieldMap::new()).unwrap();
        let plane = &out["B14BT"];
        assert_eq!(plane[0], 200.0);
        assert!(plane[1].is_nan());
        assert!(plane[2].is_nan());
        assert_eq!(plane[3], 210.0);
    }

    #[test]
    fn test_declared_radius_widens_search() {
        let swath = Swath {
            radius_of_influence: Some(500_000.0),
            ..swath()
        };
        let out = interp_nearest(&area(), &swath, &["B14BT".to_string()], &FieldMap::new()).unwrap();
        assert!(out["B14BT"].iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_rejects_arguments_and_missing_variables() {
        let args = json!({"roi": 1000}).as_object().unwrap().clone();
        assert_eq!(
            interp_nearest(&area(), &swath(), &[], &args).unwrap_err(),
            PluginError::UnexpectedArgument("roi".to_string())
        );
        assert_eq!(
            interp_nearest(&area(), &swath(), &["V89".to_string()], &FieldMap::new()).unwrap_err(),
            PluginError::MissingVariable("V89".to_string())
        );
    }
}
