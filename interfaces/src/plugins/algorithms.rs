//! Algorithm plugins.
//!
//! Algorithms take the product's variables as planes, in the order the
//! product lists them, plus the product's `alg_args`.

use std::fmt;
use std::str::FromStr;

use product_spec_core::{DataRange, FieldMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{KwArgs, Plane, PluginError, check_arrays, check_same_length};
use crate::registry::RegistryBuilder;

/// Algorithm function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    ListNumpyToNumpy,
    SingleChannel,
}

impl AlgorithmType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListNumpyToNumpy => "list_numpy_to_numpy",
            Self::SingleChannel => "single_channel",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type PlanesToPlane = fn(&[Plane], &FieldMap) -> Result<Plane, PluginError>;
pub type PlanesToPlanes = fn(&[Plane], &FieldMap) -> Result<Vec<Plane>, PluginError>;

/// An algorithm plugin, one variant per function type.
#[derive(Debug, Clone, Copy)]
pub enum AlgorithmPlugin {
    /// Planes in, in the product's variable order. One plane out for a
    /// single field, or red, green, blue and alpha for a composite.
    ListNumpyToNumpy(PlanesToPlanes),
    /// One plane in, one plane out.
    SingleChannel(PlanesToPlane),
}

impl AlgorithmPlugin {
    pub fn alg_type(&self) -> AlgorithmType {
        match self {
            Self::ListNumpyToNumpy(_) => AlgorithmType::ListNumpyToNumpy,
            Self::SingleChannel(_) => AlgorithmType::SingleChannel,
        }
    }

    /// Runs the algorithm. Single-plane results come back as a one-element
    /// stack.
    pub fn apply(&self, arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
        match self {
            Self::ListNumpyToNumpy(f) => f(arrays, args),
            Self::SingleChannel(f) => f(arrays, args).map(|p| vec![p]),
        }
    }
}

pub(crate) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register("single_channel", AlgorithmPlugin::SingleChannel(single_channel))
        .register("pmw_tb.pmw_89pct", AlgorithmPlugin::ListNumpyToNumpy(pmw_89pct))
        .register("pmw_tb.pmw_color37", AlgorithmPlugin::ListNumpyToNumpy(pmw_color37))
        .register("pmw_tb.pmw_color89", AlgorithmPlugin::ListNumpyToNumpy(pmw_color89))
        .register("sfc_winds.windbarbs", AlgorithmPlugin::ListNumpyToNumpy(windbarbs))
        .register("visir.Night_Vis", AlgorithmPlugin::ListNumpyToNumpy(night_vis))
        .register("visir.Night_Vis_IR", AlgorithmPlugin::ListNumpyToNumpy(night_vis_ir))
}

/// What to do with values outside a data range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutBounds {
    /// Clip to the bound.
    #[default]
    Crop,
    /// Replace with NaN.
    Mask,
    /// Leave unchanged.
    Retain,
}

impl FromStr for OutBounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crop" => Ok(Self::Crop),
            "mask" => Ok(Self::Mask),
            "retain" => Ok(Self::Retain),
            other => Err(format!("expected crop, mask or retain, found '{other}'")),
        }
    }
}

/// How [`apply_data_range`] treats values and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeOptions {
    pub min_outbounds: OutBounds,
    pub max_outbounds: OutBounds,
    /// Scale the range to `0..=1`.
    pub norm: bool,
    /// Flip values within the range.
    pub inverse: bool,
}

impl RangeOptions {
    fn from_kwargs(kwargs: &KwArgs<'_>, default_max: OutBounds) -> Result<Self, PluginError> {
        Ok(Self {
            min_outbounds: kwargs.parsed("min_outbounds")?.unwrap_or(OutBounds::Crop),
            max_outbounds: kwargs.parsed("max_outbounds")?.unwrap_or(default_max),
            norm: kwargs.bool("norm")?.unwrap_or(false),
            inverse: kwargs.bool("inverse")?.unwrap_or(false),
        })
    }
}

/// Applies bounds, normalization and inversion to `data`.
///
/// With `norm` the range maps to `0..=1` and `inverse` gives `1 - x`.
/// Without `norm`, `inverse` mirrors values about the range's midpoint.
/// NaN stays NaN.
pub fn apply_data_range(data: &[f64], range: DataRange, options: RangeOptions) -> Plane {
    let DataRange { min, max } = range;
    data.iter()
        .map(|&value| {
            let mut value = value;
            if value < min {
                value = match options.min_outbounds {
                    OutBounds::Crop => min,
                    OutBounds::Mask => f64::NAN,
                    OutBounds::Retain => value,
                };
            }
            if value > max {
                value = match options.max_outbounds {
                    OutBounds::Crop => max,
                    OutBounds::Mask => f64::NAN,
                    OutBounds::Retain => value,
                };
            }
            if options.norm {
                value = (value - min) / (max - min);
                if options.inverse {
                    value = 1.0 - value;
                }
            } else if options.inverse {
                value = max + min - value;
            }
            value
        })
        .collect()
}

fn is_kelvin(unit: &str) -> bool {
    matches!(unit, "Kelvin" | "kelvin" | "K")
}

fn is_celsius(unit: &str) -> bool {
    matches!(unit, "celsius" | "Celsius" | "C")
}

/// Converts `data` between temperature units.
///
/// Absent or equal units leave the data unchanged.
///
/// # Errors
///
/// Any pair other than Kelvin and celsius fails with
/// [`PluginError::InvalidArgument`].
pub fn unit_conversion(
    data: &[f64],
    input_units: Option<&str>,
    output_units: Option<&str>,
) -> Result<Plane, PluginError> {
    let (Some(input), Some(output)) = (input_units, output_units) else {
        return Ok(data.to_vec());
    };
    if input == output {
        return Ok(data.to_vec());
    }
    let offset = if is_kelvin(input) && is_celsius(output) {
        -273.15
    } else if is_celsius(input) && is_kelvin(output) {
        273.15
    } else {
        return Err(PluginError::InvalidArgument {
            name: "output_units".to_string(),
            reason: format!("cannot convert from {input} to {output}"),
        });
    };
    Ok(data.iter().map(|v| v + offset).collect())
}

const SINGLE_CHANNEL_ARGS: &[&str] = &[
    "output_data_range",
    "input_units",
    "output_units",
    "min_outbounds",
    "max_outbounds",
    "norm",
    "inverse",
];

/// One variable, converted then bounded.
pub fn single_channel(arrays: &[Plane], args: &FieldMap) -> Result<Plane, PluginError> {
    let kwargs = KwArgs::parse(args, SINGLE_CHANNEL_ARGS)?;
    check_arrays(arrays, 1)?;
    let range = kwargs.require_range("output_data_range")?;
    let options = RangeOptions::from_kwargs(&kwargs, OutBounds::Crop)?;

    let converted = unit_conversion(
        &arrays[0],
        kwargs.string("input_units")?.as_deref(),
        kwargs.string("output_units")?.as_deref(),
    )?;
    Ok(apply_data_range(&converted, range, options))
}

const PCT_ARGS: &[&str] = &[
    "output_data_range",
    "min_outbounds",
    "max_outbounds",
    "norm",
    "inverse",
];

/// 89 GHz polarization-corrected temperature from `[H89, V89]`.
pub fn pmw_89pct(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    let kwargs = KwArgs::parse(args, PCT_ARGS)?;
    check_arrays(arrays, 2)?;
    let range = kwargs.require_range("output_data_range")?;
    let options = RangeOptions::from_kwargs(&kwargs, OutBounds::Mask)?;

    let pct: Plane = arrays[0]
        .iter()
        .zip(&arrays[1])
        .map(|(h, v)| 1.7 * v - 0.7 * h)
        .collect();
    Ok(vec![apply_data_range(&pct, range, options)])
}

/// 89 GHz color composite from `[H89, V89]`, as red, green, blue and alpha.
pub fn pmw_color89(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    KwArgs::parse(args, &[])?;
    check_arrays(arrays, 2)?;
    let (h89, v89) = (&arrays[0], &arrays[1]);

    let red: Plane = h89
        .iter()
        .zip(v89)
        .map(|(h, v)| 1.818 * v - 0.818 * h)
        .collect();
    let red = apply_data_range(
        &red,
        DataRange::new(220.0, 310.0),
        RangeOptions {
            norm: true,
            inverse: true,
            ..RangeOptions::default()
        },
    );
    let unit = RangeOptions {
        norm: true,
        ..RangeOptions::default()
    };
    let green: Plane = h89.iter().map(|h| (h - 240.0) / 60.0).collect();
    let green = apply_data_range(&green, DataRange::new(0.0, 1.0), unit);
    let blue: Plane = v89.iter().map(|v| (v - 270.0) / 20.0).collect();
    let blue = apply_data_range(&blue, DataRange::new(0.0, 1.0), unit);

    let alpha = alpha_from_masked(&[&red, &green, &blue]);
    Ok(vec![red, green, blue, alpha])
}

/// 37 GHz color composite from `[H37, V37]` in Kelvin.
pub fn pmw_color37(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    KwArgs::parse(args, &[])?;
    check_arrays(arrays, 2)?;
    let (h37, v37) = (&arrays[0], &arrays[1]);

    let red: Plane = h37
        .iter()
        .zip(v37)
        .map(|(h, v)| 2.181 * v - 1.181 * h)
        .collect();
    let red = apply_data_range(
        &red,
        DataRange::new(260.0, 280.0),
        RangeOptions {
            norm: true,
            inverse: true,
            ..RangeOptions::default()
        },
    );
    let unit = RangeOptions {
        norm: true,
        ..RangeOptions::default()
    };
    let green: Plane = v37.iter().map(|v| (v - 180.0) / 120.0).collect();
    let green = apply_data_range(&green, DataRange::new(0.0, 1.0), unit);
    let blue: Plane = h37.iter().map(|h| (h - 160.0) / 140.0).collect();
    let blue = apply_data_range(&blue, DataRange::new(0.0, 1.0), unit);

    let alpha = alpha_from_masked(&[&red, &green, &blue]);
    Ok(vec![red, green, blue, alpha])
}

/// 0 where any plane is masked, 1 elsewhere.
fn alpha_from_masked(planes: &[&Plane]) -> Plane {
    let len = planes.first().map_or(0, |p| p.len());
    (0..len)
        .map(|i| {
            if planes.iter().any(|p| p[i].is_nan()) {
                0.0
            } else {
                1.0
            }
        })
        .collect()
}

/// Largest unmasked value, or `None` if every value is masked.
fn unmasked_max(data: &[f64]) -> Option<f64> {
    data.iter().copied().filter(|v| !v.is_nan()).reduce(f64::max)
}

fn positive_range(max: Option<f64>) -> Result<DataRange, PluginError> {
    match max {
        Some(max) if max > 0.0 => Ok(DataRange::new(0.0, max)),
        other => Err(PluginError::InvalidRange {
            min: 0.0,
            max: other.unwrap_or(f64::NAN),
            reason: "day/night band has no positive radiance".to_string(),
        }),
    }
}

/// Raises each value to `1 / gamma`.
pub fn apply_gamma(data: &[f64], gamma: f64) -> Plane {
    if gamma == 1.0 {
        return data.to_vec();
    }
    data.iter().map(|v| v.powf(1.0 / gamma)).collect()
}

/// Masks `data` wherever the sun is higher than `max_night_zen` degrees
/// from zenith allows.
pub fn mask_day(data: &[f64], sun_zenith: &[f64], max_night_zen: f64) -> Plane {
    data.iter()
        .zip(sun_zenith)
        .map(|(&v, &zen)| if zen < max_night_zen { f64::NAN } else { v })
        .collect()
}

const NIGHT_VIS_ARGS: &[&str] = &[
    "output_data_range",
    "scale_factor",
    "gamma_list",
    "input_units",
    "output_units",
    "min_outbounds",
    "max_outbounds",
    "max_night_zen",
    "norm",
    "inverse",
];

/// Night-time visible imagery from `[DNBRad, SunZenith]`.
///
/// The radiance is normalized against a fraction of its own maximum: 5% with
/// moonlight (maximum at least 1e-8) and 50% without. Daytime pixels are
/// masked, then each gamma in `gamma_list` and the `scale_factor` are
/// applied.
pub fn night_vis(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    let kwargs = KwArgs::parse(args, NIGHT_VIS_ARGS)?;
    check_arrays(arrays, 2)?;
    let (dnb, sun_zenith) = (&arrays[0], &arrays[1]);

    let peak = unmasked_max(dnb);
    let tuned = peak.map(|max| if max >= 1.0e-8 { 0.05 * max } else { 0.5 * max });
    let range = positive_range(tuned)?;
    let options = RangeOptions {
        norm: true,
        inverse: false,
        ..RangeOptions::from_kwargs(&kwargs, OutBounds::Crop)?
    };

    let max_night_zen = kwargs.number("max_night_zen")?.unwrap_or(90.0);
    let night = mask_day(dnb, sun_zenith, max_night_zen);
    debug!(
        unmasked = night.iter().filter(|v| !v.is_nan()).count(),
        total = night.len(),
        "night only"
    );

    let mut data = apply_data_range(&night, range, options);
    for gamma in kwargs.numbers("gamma_list")?.unwrap_or_default() {
        data = apply_gamma(&data, gamma);
    }
    if let Some(scale) = kwargs.number("scale_factor")? {
        data.iter_mut().for_each(|v| *v *= scale);
    }
    Ok(vec![data])
}

/// Night-time RGB from `[DNBRad, M16BT]`: radiance on red and green, cold
/// cloud tops on blue, as red, green, blue and alpha.
pub fn night_vis_ir(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    KwArgs::parse(args, &[])?;
    check_arrays(arrays, 2)?;
    let (dnb, m16) = (&arrays[0], &arrays[1]);

    let tuned = unmasked_max(dnb).map(|mut max| {
        if (1.0e-8..1.0e-3).contains(&max) {
            max *= 0.05;
        }
        if max < 1.0e-8 {
            max *= 0.5;
        }
        max
    });
    let range = positive_range(tuned)?;
    let norm = RangeOptions {
        norm: true,
        ..RangeOptions::default()
    };

    let red = apply_data_range(dnb, range, norm);
    let green = red.clone();
    let blue = apply_data_range(
        m16,
        DataRange::new(200.0, 300.0),
        RangeOptions {
            inverse: true,
            ..norm
        },
    );

    let alpha = alpha_from_masked(&[&red, &green, &blue]);
    Ok(vec![red, green, blue, alpha])
}

const WINDBARB_ARGS: &[&str] = &[
    "output_data_range",
    "input_units",
    "output_units",
    "min_outbounds",
    "max_outbounds",
    "norm",
    "inverse",
];

/// Wind barbs from `[speed, direction]` or `[speed, direction, rain_flag]`.
///
/// Returns `[speed, direction, rain_flag]` with the range applied to speed
/// only. A missing rain flag is all zeros.
pub fn windbarbs(arrays: &[Plane], args: &FieldMap) -> Result<Vec<Plane>, PluginError> {
    let kwargs = KwArgs::parse(args, WINDBARB_ARGS)?;
    if !(2..=3).contains(&arrays.len()) {
        return Err(PluginError::ArrayCount {
            expected: 3,
            found: arrays.len(),
        });
    }
    check_same_length(arrays)?;
    let range = kwargs.require_range("output_data_range")?;
    let options = RangeOptions::from_kwargs(&kwargs, OutBounds::Crop)?;

    let speed = unit_conversion(
        &arrays[0],
        kwargs.string("input_units")?.as_deref(),
        kwargs.string("output_units")?.as_deref(),
    )?;
    let speed = apply_data_range(&speed, range, options);
    let direction = arrays[1].clone();
    let rain_flag = arrays
        .get(2)
        .cloned()
        .unwrap_or_else(|| vec![0.0; direction.len()]);
    Ok(vec![speed, direction, rain_flag])
}
