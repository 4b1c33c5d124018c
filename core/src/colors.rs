//! Colormap descriptions returned by colormap plugins.
//!
//! These are plain values: what a renderer would need to draw the image and
//! its colorbar. Nothing here draws.

use serde::{Deserialize, Serialize};

use crate::DataRange;

/// A color as written in palettes: a named/hex color or an RGB triple in
/// `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(String),
    Rgb([f64; 3]),
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// One linear color ramp between two data values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub start: f64,
    pub end: f64,
    pub start_color: Color,
    pub end_color: Color,
}

impl Transition {
    pub fn new(
        start: f64,
        end: f64,
        start_color: impl Into<Color>,
        end_color: impl Into<Color>,
    ) -> Self {
        Self {
            start,
            end,
            start_color: start_color.into(),
            end_color: end_color.into(),
        }
    }
}

/// Colormap description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Colormap {
    /// Piecewise linear ramps over `range`.
    LinearSegmented {
        name: String,
        range: DataRange,
        transitions: Vec<Transition>,
    },
    /// Discrete colors, one per norm bin.
    Listed { name: String, colors: Vec<Color> },
    /// A colormap the renderer ships, referenced by name.
    Builtin { name: String },
}

impl Colormap {
    /// Returns the colormap's name.
    pub fn name(&self) -> &str {
        match self {
            Self::LinearSegmented { name, .. } | Self::Listed { name, .. } | Self::Builtin { name } => {
                name
            }
        }
    }

    /// Transition start points scaled into `0.0..=1.0`, plus the final end
    /// point.
    ///
    /// Empty for colormaps that are not linear segmented.
    ///
    /// # Examples
    ///
    /// ```
    /// use product_spec_core::*;
    ///
    /// let cmap = Colormap::LinearSegmented {
    ///     name: "ramp".into(),
    ///     range: DataRange::new(0.0, 100.0),
    ///     transitions: vec![
    ///         Transition::new(0.0, 25.0, "white", "black"),
    ///         Transition::new(25.0, 100.0, "navy", "red"),
    ///     ],
    /// };
    /// assert_eq!(cmap.transition_points(), vec![0.0, 0.25, 1.0]);
    /// ```
    pub fn transition_points(&self) -> Vec<f64> {
        let Self::LinearSegmented {
            range, transitions, ..
        } = self
        else {
            return Vec::new();
        };
        let mut points: Vec<f64> = transitions
            .iter()
            .map(|t| (t.start - range.min) / range.span())
            .collect();
        if let Some(last) = transitions.last() {
            points.push((last.end - range.min) / range.span());
        }
        points
    }
}

/// Data normalization applied before color lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalize {
    /// Linear scaling of `vmin..vmax` onto the colormap.
    Linear { vmin: f64, vmax: f64 },
    /// Discrete bins bounded by `boundaries`, one color each.
    Boundary { boundaries: Vec<f64>, ncolors: usize },
}

/// Colorbar tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CbarSpacing {
    #[default]
    Proportional,
    Uniform,
}

/// Everything a renderer needs to color a product and draw its colorbar.
///
/// # Examples
///
/// ```
/// use product_spec_core::*;
///
/// let info = ColorsInfo::standard(DataRange::new(0.0, 1.0), "Greys", None, true);
/// assert_eq!(info.cbar_ticks, Some(vec![0.0, 1.0]));
/// assert!(info.colorbar);
///
/// let rgb = ColorsInfo::rgb();
/// assert!(rgb.cmap.is_none());
/// assert!(!rgb.colorbar);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorsInfo {
    pub cmap: Option<Colormap>,
    pub norm: Option<Normalize>,
    pub cbar_ticks: Option<Vec<f64>>,
    pub cbar_tick_labels: Option<Vec<String>>,
    pub cbar_label: Option<String>,
    pub boundaries: Option<Vec<f64>>,
    pub cbar_spacing: CbarSpacing,
    pub colorbar: bool,
    pub cbar_full_width: bool,
}

impl ColorsInfo {
    /// Creates colors info for a colormap with a colorbar and nothing else set.
    pub fn new(cmap: Colormap, norm: Normalize) -> Self {
        Self {
            cmap: Some(cmap),
            norm: Some(norm),
            cbar_ticks: None,
            cbar_tick_labels: None,
            cbar_label: None,
            boundaries: None,
            cbar_spacing: CbarSpacing::Proportional,
            colorbar: true,
            cbar_full_width: false,
        }
    }

    /// Colors info for products that already carry RGB(A) planes.
    pub fn rgb() -> Self {
        Self {
            cmap: None,
            norm: None,
            cbar_ticks: None,
            cbar_tick_labels: None,
            cbar_label: None,
            boundaries: None,
            cbar_spacing: CbarSpacing::Proportional,
            colorbar: false,
            cbar_full_width: false,
        }
    }

    /// Colors info for a builtin colormap scaled linearly over `range`.
    pub fn standard(
        range: DataRange,
        cmap_name: &str,
        cbar_label: Option<String>,
        create_colorbar: bool,
    ) -> Self {
        Self {
            cbar_ticks: Some(vec![range.min, range.max]),
            cbar_label,
            colorbar: create_colorbar,
            ..Self::new(
                Colormap::Builtin {
                    name: cmap_name.to_string(),
                },
                Normalize::Linear {
                    vmin: range.min,
                    vmax: range.max,
                },
            )
        }
    }

    pub fn with_ticks(mut self, ticks: Vec<f64>) -> Self {
        self.cbar_ticks = Some(ticks);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.cbar_label = Some(label.into());
        self
    }

    pub fn with_spacing(mut self, spacing: CbarSpacing) -> Self {
        self.cbar_spacing = spacing;
        self
    }

    pub fn full_width(mut self) -> Self {
        self.cbar_full_width = true;
        self
    }
}
