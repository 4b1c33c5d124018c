//! Filename format plugins: where a finished product is written.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use product_spec_core::FieldMap;
use serde::{Deserialize, Serialize};

use super::{KwArgs, PluginError};
use crate::registry::RegistryBuilder;

const FILL: &str = "x";

/// Filename function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameType {
    Standard,
    Data,
    XarrayMetadataToFilename,
}

impl FilenameType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Data => "data",
            Self::XarrayMetadataToFilename => "xarray_metadata_to_filename",
        }
    }
}

impl fmt::Display for FilenameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic labels of a sector. Missing parts are written as `x`.
///
/// Tropical cyclone sectors also carry the storm's year, basin and number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorInfo {
    pub continent: Option<String>,
    pub country: Option<String>,
    pub area: Option<String>,
    pub subarea: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub storm_year: Option<i32>,
    /// Two-letter basin, e.g. `WP` or `SH`.
    pub storm_basin: Option<String>,
    pub storm_num: Option<u32>,
}

/// What a filename plugin knows about the product being written.
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameInputs {
    pub product_name: String,
    pub source_name: String,
    pub platform_name: String,
    pub sector_name: String,
    pub sector_info: SectorInfo,
    /// Percent coverage, `0.0..=100.0`.
    pub coverage: f64,
    pub start_time: DateTime<Utc>,
    pub data_provider: Option<String>,
    pub resolution_km: f64,
}

impl FilenameInputs {
    /// A fully populated tropical cyclone product, used to check that every
    /// plugin can build a name from its defaults.
    fn check_sample() -> Self {
        Self {
            product_name: "89pct".to_string(),
            source_name: "gmi".to_string(),
            platform_name: "gpm".to_string(),
            sector_name: "tc2021wp02surigae".to_string(),
            sector_info: SectorInfo {
                storm_year: Some(2021),
                storm_basin: Some("WP".to_string()),
                storm_num: Some(2),
                ..SectorInfo::default()
            },
            coverage: 100.0,
            start_time: DateTime::<Utc>::UNIX_EPOCH,
            data_provider: None,
            resolution_km: 1.0,
        }
    }
}

pub type StandardFilenameFn = fn(&FilenameInputs, &FieldMap) -> Result<PathBuf, PluginError>;
pub type DataFilenameFn = fn(&FilenameInputs, &[String], &FieldMap) -> Result<PathBuf, PluginError>;

/// A filename format plugin.
#[derive(Debug, Clone, Copy)]
pub enum FilenamePlugin {
    /// One product image per file.
    Standard(StandardFilenameFn),
    /// One data file holding several products.
    Data(DataFilenameFn),
    /// Named from dataset metadata alone, ignoring product and coverage.
    XarrayMetadataToFilename(StandardFilenameFn),
}

impl FilenamePlugin {
    pub fn fname_type(&self) -> FilenameType {
        match self {
            Self::Standard(_) => FilenameType::Standard,
            Self::Data(_) => FilenameType::Data,
            Self::XarrayMetadataToFilename(_) => FilenameType::XarrayMetadataToFilename,
        }
    }

    /// Builds the output path. Data plugins write the single product named
    /// in `inputs`.
    pub fn build(&self, inputs: &FilenameInputs, args: &FieldMap) -> Result<PathBuf, PluginError> {
        match self {
            Self::Standard(f) | Self::XarrayMetadataToFilename(f) => f(inputs, args),
            Self::Data(f) => f(inputs, std::slice::from_ref(&inputs.product_name), args),
        }
    }

    /// Builds a name for a sample product with no arguments.
    pub fn check_defaults(&self) -> Result<(), PluginError> {
        self.build(&FilenameInputs::check_sample(), &FieldMap::new())
            .map(|_| ())
    }
}

pub(crate) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register("geoips_fname", FilenamePlugin::Standard(geoips_fname))
        .register("geotiff_fname", FilenamePlugin::Standard(geotiff_fname))
        .register("tc_clean_fname", FilenamePlugin::Standard(tc_clean_fname))
        .register(
            "text_winds_tc_fname",
            FilenamePlugin::XarrayMetadataToFilename(text_winds_tc_fname),
        )
        .register("geoips_netcdf_fname", FilenamePlugin::Data(geoips_netcdf_fname))
}

/// `output_type_dir` and `product_subdir` are accepted for every standard
/// plugin; only the TC layouts use them.
const FNAME_ARGS: &[&str] = &[
    "basedir",
    "output_type",
    "output_type_dir",
    "product_dir",
    "product_subdir",
    "source_dir",
    "extra",
];

/// `<basedir>/<continent>-<country>-<area>/<subarea>-<state>-<city>/<product>/<source>/<name>.<ext>`
pub fn geoips_fname(inputs: &FilenameInputs, args: &FieldMap) -> Result<PathBuf, PluginError> {
    standard_path(inputs, args, "png")
}

/// As [`geoips_fname`], written as GeoTIFF by default.
pub fn geotiff_fname(inputs: &FilenameInputs, args: &FieldMap) -> Result<PathBuf, PluginError> {
    standard_path(inputs, args, "tif")
}

fn dotted(value: f64, precision: usize) -> String {
    format!("{value:.precision$}").replace('.', "p")
}

fn standard_path(
    inputs: &FilenameInputs,
    args: &FieldMap,
    default_type: &str,
) -> Result<PathBuf, PluginError> {
    let kwargs = KwArgs::parse(args, FNAME_ARGS)?;
    let basedir = kwargs.string("basedir")?.unwrap_or_else(|| ".".to_string());
    let output_type = kwargs
        .string("output_type")?
        .unwrap_or_else(|| default_type.to_string());
    let product_dir = kwargs
        .string("product_dir")?
        .unwrap_or_else(|| inputs.product_name.clone());
    let source_dir = kwargs
        .string("source_dir")?
        .unwrap_or_else(|| inputs.source_name.clone());
    let extra = kwargs
        .string("extra")?
        .unwrap_or_else(|| dotted(inputs.resolution_km, 1));

    let info = &inputs.sector_info;
    let part = |p: &Option<String>| p.clone().unwrap_or_else(|| FILL.to_string());

    let fname = [
        inputs.start_time.format("%Y%m%d").to_string(),
        inputs.start_time.format("%H%M%S").to_string(),
        inputs.platform_name.clone(),
        inputs.source_name.clone(),
        inputs.product_name.clone(),
        inputs.sector_name.clone(),
        dotted(inputs.coverage, 2),
        part(&inputs.data_provider),
        extra,
    ]
    .join(".");

    Ok(PathBuf::from(basedir)
        .join(format!("{}-{}-{}", part(&info.continent), part(&info.country), part(&info.area)))
        .join(format!("{}-{}-{}", part(&info.subarea), part(&info.state), part(&info.city)))
        .join(product_dir)
        .join(source_dir)
        .join(format!("{fname}.{output_type}")))
}

/// The storm a TC sector follows.
struct Storm<'a> {
    year: i32,
    basin: &'a str,
    num: u32,
}

impl<'a> Storm<'a> {
    fn from_sector(info: &'a SectorInfo) -> Result<Self, PluginError> {
        let missing = |name: &str| PluginError::MissingMetadata(format!("sector_info.{name}"));
        Ok(Self {
            year: info.storm_year.ok_or_else(|| missing("storm_year"))?,
            basin: info.storm_basin.as_deref().ok_or_else(|| missing("storm_basin"))?,
            num: info.storm_num.ok_or_else(|| missing("storm_num"))?,
        })
    }

    /// e.g. `WP022021`.
    fn id(&self) -> String {
        format!("{}{:02}{}", self.basin, self.num, self.year)
    }

    /// `<basedir>/tc<year>/<basin>/<storm id>`
    fn dir(&self, basedir: &str) -> PathBuf {
        PathBuf::from(basedir)
            .join(format!("tc{}", self.year))
            .join(self.basin)
            .join(self.id())
    }
}

/// Unannotated TC imagery, kept apart from annotated output in an
/// `<output_type>_clean` directory with `-clean` on the extra field.
///
/// `<storm dir>/<output_type>_clean/<product>[/<product_subdir>]/<date>_<time>_<storm id>_<source>_<platform>_<product>_<coverage>_<extra>-clean.<ext>`
pub fn tc_clean_fname(inputs: &FilenameInputs, args: &FieldMap) -> Result<PathBuf, PluginError> {
    let kwargs = KwArgs::parse(args, FNAME_ARGS)?;
    let basedir = kwargs.string("basedir")?.unwrap_or_else(|| ".".to_string());
    let output_type = kwargs.string("output_type")?.unwrap_or_else(|| "png".to_string());
    let output_type_dir = kwargs
        .string("output_type_dir")?
        .unwrap_or_else(|| format!("{output_type}_clean"));
    let product_dir = kwargs
        .string("product_dir")?
        .unwrap_or_else(|| inputs.product_name.clone());
    let extra = kwargs
        .string("extra")?
        .unwrap_or_else(|| dotted(inputs.resolution_km, 1));

    let storm = Storm::from_sector(&inputs.sector_info)?;
    let mut path = storm.dir(&basedir).join(output_type_dir).join(product_dir);
    if let Some(subdir) = kwargs.string("product_subdir")? {
        path.push(subdir);
    }

    let fname = [
        inputs.start_time.format("%Y%m%d").to_string(),
        inputs.start_time.format("%H%M").to_string(),
        storm.id(),
        inputs.source_name.clone(),
        inputs.platform_name.clone(),
        inputs.product_name.clone(),
        dotted(inputs.coverage, 2),
        format!("{extra}-clean"),
    ]
    .join("_");

    Ok(path.join(format!("{fname}.{output_type}")))
}

/// Surface wind text output for a TC sector.
///
/// `<storm dir>/txt/<source>_surface_winds_<provider>_<platform>_<sector>_<YYYYmmddHHMM><extension>`
pub fn text_winds_tc_fname(inputs: &FilenameInputs, args: &FieldMap) -> Result<PathBuf, PluginError> {
    let kwargs = KwArgs::parse(args, &["basedir", "extension"])?;
    let basedir = kwargs.string("basedir")?.unwrap_or_else(|| ".".to_string());
    let extension = kwargs.string("extension")?.unwrap_or_else(|| ".txt".to_string());

    let path = Storm::from_sector(&inputs.sector_info)?.dir(&basedir).join("txt");
    let fname = [
        inputs.source_name.as_str(),
        "surface_winds",
        inputs.data_provider.as_deref().unwrap_or(FILL),
        inputs.platform_name.as_str(),
        inputs.sector_name.as_str(),
        &inputs.start_time.format("%Y%m%d%H%M").to_string(),
    ]
    .join("_");

    Ok(path.join(format!("{fname}{extension}")))
}

/// NetCDF output holding several products, joined with `_` in the name.
///
/// `<basedir>/<products>/<source>/<platform>/<sector>/<YYYYmmdd>/<YYYYmmdd>.<HHMMSS>.<platform>.<products>.<sector>.nc`
pub fn geoips_netcdf_fname(
    inputs: &FilenameInputs,
    product_names: &[String],
    args: &FieldMap,
) -> Result<PathBuf, PluginError> {
    let kwargs = KwArgs::parse(args, FNAME_ARGS)?;
    let basedir = kwargs.string("basedir")?.unwrap_or_else(|| ".".to_string());
    if product_names.is_empty() {
        return Err(PluginError::MissingArgument("product_names".to_string()));
    }
    let products = product_names.join("_");
    let date = inputs.start_time.format("%Y%m%d").to_string();

    let fname = [
        date.clone(),
        inputs.start_time.format("%H%M%S").to_string(),
        inputs.platform_name.clone(),
        products.clone(),
        inputs.sector_name.clone(),
        "nc".to_string(),
    ]
    .join(".");

    Ok(PathBuf::from(basedir)
        .join(products)
        .join(&inputs.source_name)
        .join(&inputs.platform_name)
        .join(&inputs.sector_name)
        .join(date)
        .join(fname))
}
