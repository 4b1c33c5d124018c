//! Colormap plugins.
//!
//! A colormap plugin turns a product's `cmap_args` into a [`ColorsInfo`].

use std::fmt;

use product_spec_core::{
    CbarSpacing, Color, Colormap, ColorsInfo, DataRange, FieldMap, Normalize, Transition,
};
use serde::{Deserialize, Serialize};

use super::{KwArgs, PluginError};
use crate::registry::RegistryBuilder;

/// Colormap function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColormapType {
    Rgb,
    Ascii,
    Explicit,
    LinearSegmented,
    LinearNorm,
    ProductBased,
    BuiltinMatplotlibCmap,
}

impl ColormapType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Ascii => "ascii",
            Self::Explicit => "explicit",
            Self::LinearSegmented => "linear_segmented",
            Self::LinearNorm => "linear_norm",
            Self::ProductBased => "product_based",
            Self::BuiltinMatplotlibCmap => "builtin_matplotlib_cmap",
        }
    }

    /// Parameters that must be supplied.
    pub fn positional_args(self) -> &'static [&'static str] {
        match self {
            Self::BuiltinMatplotlibCmap => &["data_range"],
            _ => &[],
        }
    }

    /// Parameters that may be supplied.
    pub fn keyword_args(self) -> &'static [&'static str] {
        match self {
            Self::Rgb | Self::Ascii | Self::Explicit => &[],
            Self::LinearSegmented | Self::LinearNorm => &["data_range"],
            Self::ProductBased => &["product_name", "data_range"],
            Self::BuiltinMatplotlibCmap => &["cmap_name", "cbar_label", "create_colorbar"],
        }
    }

    fn accepts(self) -> Vec<&'static str> {
        let mut names = self.positional_args().to_vec();
        names.extend_from_slice(self.keyword_args());
        names
    }
}

impl fmt::Display for ColormapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword options of a builtin colormap.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinCmapOptions {
    pub cmap_name: String,
    pub cbar_label: Option<String>,
    pub create_colorbar: bool,
}

impl Default for BuiltinCmapOptions {
    fn default() -> Self {
        Self {
            cmap_name: "Greys".to_string(),
            cbar_label: None,
            create_colorbar: true,
        }
    }
}

type CmapResult = Result<ColorsInfo, PluginError>;

/// A colormap plugin, one variant per function type.
#[derive(Debug, Clone, Copy)]
pub enum ColormapPlugin {
    Rgb(fn() -> CmapResult),
    Ascii(fn() -> CmapResult),
    Explicit(fn() -> CmapResult),
    LinearSegmented(fn(Option<DataRange>) -> CmapResult),
    LinearNorm(fn(Option<DataRange>) -> CmapResult),
    ProductBased(fn(Option<&str>, Option<DataRange>) -> CmapResult),
    BuiltinMatplotlibCmap(fn(DataRange, &BuiltinCmapOptions) -> CmapResult),
}

impl ColormapPlugin {
    pub fn cmap_type(&self) -> ColormapType {
        match self {
            Self::Rgb(_) => ColormapType::Rgb,
            Self::Ascii(_) => ColormapType::Ascii,
            Self::Explicit(_) => ColormapType::Explicit,
            Self::LinearSegmented(_) => ColormapType::LinearSegmented,
            Self::LinearNorm(_) => ColormapType::LinearNorm,
            Self::ProductBased(_) => ColormapType::ProductBased,
            Self::BuiltinMatplotlibCmap(_) => ColormapType::BuiltinMatplotlibCmap,
        }
    }

    /// Calls the plugin with a product's `cmap_args`.
    ///
    /// # Errors
    ///
    /// Fails on arguments the type does not accept, on arguments of the
    /// wrong shape, and on any error the plugin itself raises.
    pub fn invoke(&self, args: &FieldMap) -> CmapResult {
        let kwargs = KwArgs::parse(args, &self.cmap_type().accepts())?;
        match self {
            Self::Rgb(f) | Self::Ascii(f) | Self::Explicit(f) => f(),
            Self::LinearSegmented(f) | Self::LinearNorm(f) => f(kwargs.range("data_range")?),
            Self::ProductBased(f) => {
                let product_name = kwargs.string("product_name")?;
                f(product_name.as_deref(), kwargs.range("data_range")?)
            }
            Self::BuiltinMatplotlibCmap(f) => {
                let range = kwargs.require_range("data_range")?;
                let defaults = BuiltinCmapOptions::default();
                let options = BuiltinCmapOptions {
                    cmap_name: kwargs.string("cmap_name")?.unwrap_or(defaults.cmap_name),
                    cbar_label: kwargs.string("cbar_label")?,
                    create_colorbar: kwargs
                        .bool("create_colorbar")?
                        .unwrap_or(defaults.create_colorbar),
                };
                f(range, &options)
            }
        }
    }

    /// Builds the colormap from its defaults, for types that need no
    /// positional argument. Types that do are not called.
    pub fn check_defaults(&self) -> Result<(), PluginError> {
        if self.cmap_type().positional_args().is_empty() {
            self.invoke(&FieldMap::new()).map(|_| ())
        } else {
            Ok(())
        }
    }
}

pub(crate) fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register("cmap_rgb", ColormapPlugin::Rgb(cmap_rgb))
        .register("visir.Infrared", ColormapPlugin::LinearSegmented(infrared))
        .register("pmw_tb.cmap_37H", ColormapPlugin::LinearSegmented(cmap_37h))
        .register(
            "pmw_tb.cmap_37H_Physical",
            ColormapPlugin::LinearSegmented(cmap_37h_physical),
        )
        .register("pmw_tb.cmap_89H", ColormapPlugin::LinearSegmented(cmap_89h))
        .register("pmw_tb.cmap_89HW", ColormapPlugin::LinearSegmented(cmap_89hw))
        .register("pmw_tb.cmap_150H", ColormapPlugin::LinearSegmented(cmap_150h))
        .register("pmw_tb.cmap_Rain", ColormapPlugin::LinearSegmented(cmap_rain))
        .register("tpw.tpw_pwat", ColormapPlugin::Ascii(tpw_pwat))
        .register("tpw.tpw_purple", ColormapPlugin::Ascii(tpw_purple))
        .register(
            "winds.wind_radii_transitions",
            ColormapPlugin::LinearSegmented(wind_radii_transitions),
        )
        .register(
            "matplotlib_linear_norm",
            ColormapPlugin::BuiltinMatplotlibCmap(matplotlib_linear_norm),
        )
}

/// Checks that `range` spans `[must_min, must_max]`.
fn require_span(range: DataRange, must_min: f64, must_max: f64) -> Result<(), PluginError> {
    if range.min > must_min {
        return Err(PluginError::InvalidRange {
            min: range.min,
            max: range.max,
            reason: format!("minimum must be {must_min} or lower"),
        });
    }
    if range.max < must_max {
        return Err(PluginError::InvalidRange {
            min: range.min,
            max: range.max,
            reason: format!("maximum must be {must_max} or higher"),
        });
    }
    Ok(())
}

fn cmap_rgb() -> CmapResult {
    Ok(ColorsInfo::rgb())
}

/// Infrared brightness temperature in Celsius.
pub fn infrared(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(-90.0, 30.0));
    let range = DataRange::new(range.min.trunc(), range.max.trunc());
    require_span(range, -90.0, 30.0)?;
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, -80.0, "darkorange", "yellow"),
        Transition::new(-80.0, -70.0, "darkred", "red"),
        Transition::new(-70.0, -50.0, "green", "palegreen"),
        Transition::new(-50.0, -40.0, "navy", "royalblue"),
        Transition::new(-40.0, -30.0, "royalblue", "deepskyblue"),
        Transition::new(-30.0, -15.0, "whitesmoke", "silver"),
        Transition::new(-15.0, 0.0, "silver", "grey"),
        Transition::new(0.0, 15.0, "grey", "dimgrey"),
        Transition::new(15.0, max, "dimgrey", "black"),
    ];
    let mut ticks = vec![min];
    ticks.extend((-8..=2).map(|t| f64::from(t) * 10.0));
    // The colorbar has always repeated its top tick.
    ticks.extend([max, max]);

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "IR_cmap".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("11µm BT (°C)")
    .full_width())
}

/// 37 GHz horizontal brightness temperature in Kelvin.
pub fn cmap_37h(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(125.0, 310.0));
    require_span(range, 125.0, 300.0)?;
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 180.0, "lightyellow", "darkmagenta"),
        Transition::new(180.0, 195.0, "#80007F", "#0080FF"),
        Transition::new(195.0, 210.0, "#0080FF", "#3AB9FF"),
        Transition::new(210.0, 220.0, "#3AB9FF", "#7DFDFF"),
        Transition::new(220.0, 230.0, "#7DFDFF", "#80FF82"),
        Transition::new(230.0, 240.0, "#80FF82", "#FFFF80"),
        Transition::new(240.0, 260.0, "#FFFF80", "#FF8000"),
        Transition::new(260.0, 280.0, "#FF8000", "#800000"),
        Transition::new(280.0, max, "silver", "black"),
    ];
    let mut ticks = vec![125.0, 150.0, 180.0, 200.0, 220.0, 240.0, 260.0, 280.0, 300.0];
    ticks.push(max.trunc());

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "cmap_37ghz".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("TB (K)")
    .full_width())
}

/// 37 GHz brightness temperature in Kelvin, colored by physical regime.
pub fn cmap_37h_physical(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(125.0, 310.0));
    require_span(range, 125.0, 300.0)?;
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 125.0, "orange", "chocolate"),
        Transition::new(125.0, 150.0, "chocolate", "indianred"),
        Transition::new(150.0, 175.0, "indianred", "firebrick"),
        Transition::new(175.0, 212.0, "firebrick", "red"),
        Transition::new(212.0, 230.0, "gold", "yellow"),
        Transition::new(230.0, 250.0, "lime", "limegreen"),
        Transition::new(250.0, 265.0, "deepskyblue", "blue"),
        Transition::new(265.0, 280.0, "navy", "slateblue"),
        Transition::new(280.0, max, "magenta", "white"),
    ];
    let mut ticks: Vec<f64> = transitions.iter().map(|t| t.start).collect();
    ticks.push(max.trunc());

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "cmap_37H_Physical".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("TB (K)")
    .full_width())
}

/// 89 GHz horizontal brightness temperature in Kelvin.
pub fn cmap_89h(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(105.0, 305.0));
    if range.min >= 180.0 || range.max <= 280.0 {
        return Err(PluginError::InvalidRange {
            min: range.min,
            max: range.max,
            reason: "range must extend below 180 and above 280".to_string(),
        });
    }
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 180.0, "white", "black"),
        Transition::new(180.0, 212.0, "#A4641A", "#FC0603"),
        Transition::new(212.0, 228.0, "#F4CD03", "#F2F403"),
        Transition::new(228.1, 254.0, "#8CF303", "#0FB503"),
        Transition::new(254.1, 280.0, "#06DCFD", "#0708B5"),
        Transition::new(280.0, max, "navy", "white"),
    ];
    let ticks = vec![min, 150.0, 180.0, 212.0, 228.0, 254.0, 280.0, max];

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "cmap_89H".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("TB (K)")
    .full_width())
}

/// 89 GHz brightness temperature for weak convection.
pub fn cmap_89hw(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(220.0, 280.0));
    require_span(range, 220.0, 265.0)?;
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 220.1, "black", "black"),
        Transition::new(220.1, 240.0, "#A4641A", "#FC0603"),
        Transition::new(240.0, 249.0, "#F4CD03", "#F2F403"),
        Transition::new(249.0, 264.0, "#8CF303", "#0FB503"),
        Transition::new(264.0, max, "#06DCFD", "#0708B5"),
    ];
    let ticks = (22..=28).map(|t| f64::from(t) * 10.0).collect();

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "cmap_89hw".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("TB (K)")
    .full_width())
}

/// 150 GHz horizontal brightness temperature in Kelvin.
pub fn cmap_150h(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(110.0, 310.0));
    require_span(range, 129.0, 291.0)?;
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 130.0, "black", "blue"),
        Transition::new(130.0, 160.0, "blue", "cyan"),
        Transition::new(160.0, 180.0, "cyan", "green"),
        Transition::new(180.0, 210.0, "green", "yellow"),
        Transition::new(210.0, 230.0, "yellow", "orange"),
        Transition::new(230.0, 250.0, "orange", "red"),
        Transition::new(250.0, 270.0, "red", "maroon"),
        Transition::new(270.0, 290.0, "maroon", "darkmagenta"),
        Transition::new(290.0, max, "darkmagenta", "white"),
    ];
    let ticks = (0..=10).map(|i| 110.0 + f64::from(i) * 20.0).collect();

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "cmap_150h".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("TB (K)"))
}

/// Surface wind speed in knots, with fixed transitions at the wind radii
/// thresholds.
pub fn wind_radii_transitions(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(0.0, 200.0));
    let (min, max) = (range.min, range.max);

    let transitions = vec![
        Transition::new(min, 34.0, "lightblue", "blue"),
        Transition::new(34.0, 50.0, "yellow", "orange"),
        Transition::new(50.0, 64.0, "red", "red"),
        Transition::new(64.0, 80.0, "rebeccapurple", "rebeccapurple"),
        Transition::new(80.0, 100.0, "palevioletred", "palevioletred"),
        Transition::new(100.0, 120.0, "silver", "silver"),
        Transition::new(120.0, 150.0, "gray", "gray"),
        Transition::new(150.0, max, "dimgray", "dimgray"),
    ];
    let ticks = transitions.iter().map(|t| t.start).collect();

    Ok(ColorsInfo::new(
        Colormap::LinearSegmented {
            name: "windspeed_cmap".to_string(),
            range,
            transitions,
        },
        Normalize::Linear { vmin: min, vmax: max },
    )
    .with_ticks(ticks)
    .with_label("Surface Wind (knots)"))
}

const RAIN_COLORS: [&str; 15] = [
    "silver",
    "slategray",
    "navy",
    "blue",
    "royalblue",
    "cyan",
    "limegreen",
    "green",
    "yellow",
    "gold",
    "lightsalmon",
    "coral",
    "red",
    "maroon",
    "black",
];

/// Rain rate in mm/hr, one discrete color per bin.
pub fn cmap_rain(data_range: Option<DataRange>) -> CmapResult {
    let range = data_range.unwrap_or(DataRange::new(0.05, 50.0));
    if range.min >= 0.1 || range.max <= 40.0 {
        return Err(PluginError::InvalidRange {
            min: range.min,
            max: range.max,
            reason: "range must extend below 0.1 and above 40".to_string(),
        });
    }

    let mut ticks = vec![range.min];
    ticks.extend([
        0.1, 0.2, 0.3, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0,
    ]);
    ticks.push(range.max);
    let mut boundaries = ticks.clone();
    boundaries.push(range.max + 1.0);

    let colors: Vec<Color> = RAIN_COLORS.iter().copied().map(Color::from).collect();
    let ncolors = colors.len();
    let mut info = ColorsInfo::new(
        Colormap::Listed {
            name: "cmap_Rain".to_string(),
            colors,
        },
        Normalize::Boundary {
            boundaries: boundaries.clone(),
            ncolors,
        },
    )
    .with_ticks(ticks)
    .with_label("Rainrate (mm hr-1)")
    .with_spacing(CbarSpacing::Uniform)
    .full_width();
    info.boundaries = Some(boundaries);
    Ok(info)
}

const TPW_PALETTE: &str = include_str!("palettes/tpw_pwat.txt");

/// Total precipitable water in mm, colors read from a bundled palette.
pub fn tpw_pwat() -> CmapResult {
    let colors = parse_ascii_palette(TPW_PALETTE)?;

    let mut values: Vec<f64> = (1..=6).map(f64::from).collect();
    values.extend((8..=90).step_by(2).map(f64::from));
    let mut boundaries = values.clone();
    boundaries.push(91.0);

    let ncolors = colors.len();
    let mut info = ColorsInfo::new(
        Colormap::Listed {
            name: "tpw_pwat".to_string(),
            colors,
        },
        Normalize::Boundary {
            boundaries: boundaries.clone(),
            ncolors,
        },
    )
    .with_ticks(values)
    .with_label("TPW (mm)")
    .with_spacing(CbarSpacing::Uniform)
    .full_width();
    info.boundaries = Some(boundaries);
    Ok(info)
}

const TPW_PURPLE_PALETTE: &str = include_str!("palettes/tpw_purple.txt");

/// Total precipitable water from 5 to 65 mm on a purple palette.
pub fn tpw_purple() -> CmapResult {
    let colors = parse_ascii_palette(TPW_PURPLE_PALETTE)?;

    Ok(ColorsInfo::new(
        Colormap::Listed {
            name: "tpw_purple".to_string(),
            colors,
        },
        Normalize::Linear { vmin: 5.0, vmax: 65.0 },
    )
    .with_ticks(vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0])
    .with_label("TPW (mm)")
    .full_width())
}

/// Parses a palette of whitespace-separated RGB rows.
///
/// Blank lines and lines starting with `#` are skipped. If any component
/// exceeds 1 the whole palette is read as 0-255 and scaled down.
pub fn parse_ascii_palette(text: &str) -> Result<Vec<Color>, PluginError> {
    let invalid = |reason: String| PluginError::InvalidArgument {
        name: "palette".to_string(),
        reason,
    };

    let mut rows = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| invalid(format!("line {}: {e}", number + 1)))?;
        let [r, g, b] = parts[..] else {
            return Err(invalid(format!(
                "line {}: expected 3 components, found {}",
                number + 1,
                parts.len()
            )));
        };
        rows.push([r, g, b]);
    }

    let scale = if rows.iter().flatten().any(|&c| c > 1.0) {
        255.0
    } else {
        1.0
    };
    rows.into_iter()
        .map(|row| {
            let rgb = row.map(|c| c / scale);
            if rgb.iter().all(|c| (0.0..=1.0).contains(c)) {
                Ok(Color::Rgb(rgb))
            } else {
                Err(invalid(format!("color {row:?} outside 0-255")))
            }
        })
        .collect()
}

/// A named builtin colormap scaled linearly over `data_range`.
pub fn matplotlib_linear_norm(data_range: DataRange, options: &BuiltinCmapOptions) -> CmapResult {
    Ok(ColorsInfo::standard(
        data_range,
        &options.cmap_name,
        options.cbar_label.clone(),
        options.create_colorbar,
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: serde_json::Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_infrared_defaults() {
        let info = infrared(None).unwrap();
        let ticks = info.cbar_ticks.unwrap();
        assert_eq!(ticks.first(), Some(&-90.0));
        assert_eq!(ticks.len(), 14);
        assert_eq!(&ticks[12..], &[30.0, 30.0]);
        assert_eq!(info.cbar_label.as_deref(), Some("11µm BT (°C)"));
        assert!(info.colorbar);
        assert!(info.cbar_full_width);
        assert_eq!(info.norm, Some(Normalize::Linear { vmin: -90.0, vmax: 30.0 }));
    }

    #[test]
    fn test_infrared_truncates_and_checks_range() {
        let info = infrared(Some(DataRange::new(-95.7, 40.2))).unwrap();
        assert_eq!(info.norm, Some(Normalize::Linear { vmin: -95.0, vmax: 40.0 }));

        let err = infrared(Some(DataRange::new(-80.0, 30.0))).unwrap_err();
        assert_eq!(err.kind(), "InvalidRange");
        assert!(infrared(Some(DataRange::new(-90.0, 20.0))).is_err());
    }

    #[test]
    fn test_cmap_89h_bounds() {
        assert!(cmap_89h(None).is_ok());
        assert!(cmap_89h(Some(DataRange::new(180.0, 305.0))).is_err());
        assert!(cmap_89h(Some(DataRange::new(105.0, 280.0))).is_err());
    }

    #[test]
    fn test_pmw_channel_colormaps() {
        let info = cmap_37h(None).unwrap();
        assert_eq!(info.cbar_ticks.as_ref().and_then(|t| t.last()), Some(&310.0));
        assert!(info.cbar_full_width);
        assert!(cmap_37h(Some(DataRange::new(130.0, 310.0))).is_err());

        let info = cmap_150h(None).unwrap();
        assert_eq!(info.cbar_ticks.unwrap().len(), 11);
        assert!(!info.cbar_full_width);
        assert!(cmap_150h(Some(DataRange::new(110.0, 290.0))).is_err());
    }

    #[test]
    fn test_weak_convection_and_physical_colormaps() {
        let info = cmap_89hw(None).unwrap();
        assert_eq!(info.norm, Some(Normalize::Linear { vmin: 220.0, vmax: 280.0 }));
        assert_eq!(
            info.cbar_ticks,
            Some(vec![220.0, 230.0, 240.0, 250.0, 260.0, 270.0, 280.0])
        );
        assert!(cmap_89hw(Some(DataRange::new(220.0, 260.0))).is_err());

        let info = cmap_37h_physical(Some(DataRange::new(120.0, 305.5))).unwrap();
        let ticks = info.cbar_ticks.unwrap();
        assert_eq!(ticks.first(), Some(&120.0));
        assert_eq!(ticks.last(), Some(&305.0));
        assert_eq!(ticks.len(), 10);
        assert_eq!(info.cmap.unwrap().name(), "cmap_37H_Physical");
    }

    #[test]
    fn test_wind_radii_transitions() {
        let info = wind_radii_transitions(None).unwrap();
        assert_eq!(
            info.cbar_ticks,
            Some(vec![0.0, 34.0, 50.0, 64.0, 80.0, 100.0, 120.0, 150.0])
        );
        assert_eq!(info.cbar_label.as_deref(), Some("Surface Wind (knots)"));
        assert!(!info.cbar_full_width);
        let Some(Colormap::LinearSegmented { range, .. }) = info.cmap else {
            panic!("expected linear segmented colormap");
        };
        assert_eq!(range, DataRange::new(0.0, 200.0));
    }

    #[test]
    fn test_tpw_purple_spans_fixed_range() {
        let info = tpw_purple().unwrap();
        assert_eq!(info.norm, Some(Normalize::Linear { vmin: 5.0, vmax: 65.0 }));
        assert!(matches!(info.cmap, Some(Colormap::Listed { ref colors, .. }) if !colors.is_empty()));
        assert!(info.cbar_full_width);
    }

    #[test]
    fn test_cmap_rain_is_listed_with_boundary_norm() {
        let info = cmap_rain(None).unwrap();
        match info.norm {
            Some(Normalize::Boundary { ref boundaries, ncolors }) => {
                assert_eq!(ncolors, 15);
                assert_eq!(boundaries.last(), Some(&51.0));
                assert_eq!(boundaries.len(), 16);
            }
            ref other => panic!("unexpected norm: {other:?}"),
        }
        assert_eq!(info.cbar_spacing, CbarSpacing::Uniform);
        assert!(matches!(info.cmap, Some(Colormap::Listed { .. })));
    }

    #[test]
    fn test_tpw_palette_matches_bins() {
        let info = tpw_pwat().unwrap();
        let Some(Colormap::Listed { colors, .. }) = info.cmap else {
            panic!("expected listed colormap");
        };
        let ticks = info.cbar_ticks.unwrap();
        assert_eq!(ticks.len(), 48);
        assert_eq!(colors.len(), ticks.len());
        assert_eq!(info.boundaries.unwrap().last(), Some(&91.0));
    }

    #[test]
    fn test_parse_ascii_palette_scales_and_validates() {
        let colors = parse_ascii_palette("# header\n255 0 0\n\n0 127.5 255\n").unwrap();
        assert_eq!(colors, vec![Color::Rgb([1.0, 0.0, 0.0]), Color::Rgb([0.0, 0.5, 1.0])]);

        let unit = parse_ascii_palette("0.5 0.5 0.5\n").unwrap();
        assert_eq!(unit, vec![Color::Rgb([0.5, 0.5, 0.5])]);

        assert!(parse_ascii_palette("1 2\n").is_err());
        assert!(parse_ascii_palette("300 0 0\n").is_err());
        assert!(parse_ascii_palette("red green blue\n").is_err());
    }

    #[test]
    fn test_invoke_rejects_unknown_arguments() {
        let plugin = ColormapPlugin::LinearSegmented(infrared);
        let err = plugin
            .invoke(&args(json!({"data_range": [-90, 30], "bogus": 1})))
            .unwrap_err();
        assert_eq!(err, PluginError::UnexpectedArgument("bogus".to_string()));

        let rgb = ColormapPlugin::Rgb(cmap_rgb);
        assert!(rgb.invoke(&args(json!({"data_range": [0, 1]}))).is_err());
    }

    #[test]
    fn test_invoke_builtin_requires_range() {
        let plugin = ColormapPlugin::BuiltinMatplotlibCmap(matplotlib_linear_norm);
        assert_eq!(
            plugin.invoke(&FieldMap::new()).unwrap_err(),
            PluginError::MissingArgument("data_range".to_string())
        );
        assert!(plugin.check_defaults().is_ok());

        let info = plugin
            .invoke(&args(json!({"data_range": [0, 100], "cmap_name": "jet", "create_colorbar": false})))
            .unwrap();
        assert_eq!(info.cmap.unwrap().name(), "jet");
        assert!(!info.colorbar);
        assert_eq!(info.cbar_ticks, Some(vec![0.0, 100.0]));
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(ColormapType::BuiltinMatplotlibCmap.as_str(), "builtin_matplotlib_cmap");
        assert_eq!(ColormapPlugin::Ascii(tpw_pwat).cmap_type(), ColormapType::Ascii);
        assert_eq!(ColormapType::ProductBased.keyword_args(), ["product_name", "data_range"]);
    }
}
