//! Function registry: plugins indexed by namespace and name.
//!
//! Provides [`FunctionRegistry`] for lookup, [`RegistryBuilder`] for
//! registration, and the [`NamespaceProvider`] trait the resolver and the
//! self-test harness are written against.
//!
//! # Loading patterns
//!
//! ```
//! use product_spec_interfaces::{FunctionRegistry, Namespace, NamespaceProvider, builtin_registry};
//!
//! // The shared built-in registry
//! let record = builtin_registry()
//!     .find_entry_point(Namespace::UserColormaps, "visir.Infrared")
//!     .unwrap();
//! assert_eq!(record.plugin.type_tag(), "linear_segmented");
//!
//! // A registry of your own, built-ins included
//! let registry = FunctionRegistry::builder().with_builtins().build().unwrap();
//! assert!(registry.list_entry_points(Namespace::Algorithms).contains("single_channel"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::plugins::algorithms::AlgorithmPlugin;
use crate::plugins::colormaps::ColormapPlugin;
use crate::plugins::coverage::CoveragePlugin;
use crate::plugins::filenames::FilenamePlugin;
use crate::plugins::interpolation::InterpolationPlugin;
use crate::plugins::register_builtins;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_\-]+)*$").expect("static regex must compile")
});

/// Plugin families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    UserColormaps,
    Algorithms,
    Interpolation,
    FilenameFormats,
    CoverageChecks,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Self::UserColormaps,
        Self::Algorithms,
        Self::Interpolation,
        Self::FilenameFormats,
        Self::CoverageChecks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserColormaps => "user_colormaps",
            Self::Algorithms => "algorithms",
            Self::Interpolation => "interpolation",
            Self::FilenameFormats => "filename_formats",
            Self::CoverageChecks => "coverage_checks",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| format!("unknown namespace '{s}'"))
    }
}

/// A plugin of any family.
#[derive(Debug, Clone, Copy)]
pub enum Plugin {
    Colormap(ColormapPlugin),
    Algorithm(AlgorithmPlugin),
    Interpolation(InterpolationPlugin),
    Filename(FilenamePlugin),
    Coverage(CoveragePlugin),
}

impl Plugin {
    /// The namespace this plugin's family belongs to.
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Colormap(_) => Namespace::UserColormaps,
            Self::Algorithm(_) => Namespace::Algorithms,
            Self::Interpolation(_) => Namespace::Interpolation,
            Self::Filename(_) => Namespace::FilenameFormats,
            Self::Coverage(_) => Namespace::CoverageChecks,
        }
    }

    /// The plugin's function type, e.g. `linear_segmented` or `2d`.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Colormap(p) => p.cmap_type().as_str(),
            Self::Algorithm(p) => p.alg_type().as_str(),
            Self::Interpolation(p) => p.interp_type().as_str(),
            Self::Filename(p) => p.fname_type().as_str(),
            Self::Coverage(p) => p.covg_type().as_str(),
        }
    }
}

impl From<ColormapPlugin> for Plugin {
    fn from(plugin: ColormapPlugin) -> Self {
        Self::Colormap(plugin)
    }
}

impl From<AlgorithmPlugin> for Plugin {
    fn from(plugin: AlgorithmPlugin) -> Self {
        Self::Algorithm(plugin)
    }
}

impl From<InterpolationPlugin> for Plugin {
    fn from(plugin: InterpolationPlugin) -> Self {
        Self::Interpolation(plugin)
    }
}

impl From<FilenamePlugin> for Plugin {
    fn from(plugin: FilenamePlugin) -> Self {
        Self::Filename(plugin)
    }
}

impl From<CoveragePlugin> for Plugin {
    fn from(plugin: CoveragePlugin) -> Self {
        Self::Coverage(plugin)
    }
}

/// Errors from registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No plugin of that name in the namespace.
    #[error("no plugin named '{name}' in namespace '{namespace}'")]
    NotFound { namespace: Namespace, name: String },

    /// A name was registered twice in one namespace.
    #[error("plugin '{name}' registered twice in namespace '{namespace}'")]
    Duplicate { namespace: Namespace, name: String },

    /// A name is not a dotted identifier.
    #[error("invalid plugin name '{0}'")]
    InvalidName(String),

    /// A record was found under a namespace its plugin does not belong to.
    #[error("plugin '{name}' found in namespace '{expected}' is a {found} plugin")]
    WrongNamespace {
        name: String,
        expected: Namespace,
        found: Namespace,
    },
}

impl RegistryError {
    /// Short name of the variant, used when the error is wrapped.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Duplicate { .. } => "Duplicate",
            Self::InvalidName(_) => "InvalidName",
            Self::WrongNamespace { .. } => "WrongNamespace",
        }
    }
}

/// One registered plugin.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    /// The namespace the record is listed under.
    pub namespace: Namespace,
    pub name: String,
    pub plugin: Plugin,
}

impl FunctionRecord {
    pub fn new(namespace: Namespace, name: impl Into<String>, plugin: impl Into<Plugin>) -> Self {
        Self {
            namespace,
            name: name.into(),
            plugin: plugin.into(),
        }
    }

    /// Fails with [`RegistryError::WrongNamespace`] unless the plugin
    /// belongs to the namespace the record is listed under.
    pub fn check_namespace(&self) -> Result<(), RegistryError> {
        let found = self.plugin.namespace();
        if found == self.namespace {
            Ok(())
        } else {
            Err(self.wrong_namespace(self.namespace, found))
        }
    }

    fn wrong_namespace(&self, expected: Namespace, found: Namespace) -> RegistryError {
        RegistryError::WrongNamespace {
            name: self.name.clone(),
            expected,
            found,
        }
    }

    pub fn as_colormap(&self) -> Result<&ColormapPlugin, RegistryError> {
        match &self.plugin {
            Plugin::Colormap(p) => Ok(p),
            other => Err(self.wrong_namespace(Namespace::UserColormaps, other.namespace())),
        }
    }

    pub fn as_coverage(&self) -> Result<&CoveragePlugin, RegistryError> {
        match &self.plugin {
            Plugin::Coverage(p) => Ok(p),
            other => Err(self.wrong_namespace(Namespace::CoverageChecks, other.namespace())),
        }
    }
}

/// Source of plugins by namespace and name.
pub trait NamespaceProvider {
    /// Returns the record listed under `name` in `namespace`.
    fn resolve(&self, namespace: Namespace, name: &str) -> Option<&FunctionRecord>;

    /// Names listed in `namespace`.
    fn entry_points(&self, namespace: Namespace) -> Vec<&str>;

    /// Like [`resolve`](Self::resolve), failing with
    /// [`RegistryError::NotFound`].
    fn find_entry_point(&self, namespace: Namespace, name: &str) -> Result<&FunctionRecord, RegistryError> {
        self.resolve(namespace, name)
            .ok_or_else(|| RegistryError::NotFound {
                namespace,
                name: name.to_string(),
            })
    }

    /// Names listed in `namespace`, sorted and unique.
    fn list_entry_points(&self, namespace: Namespace) -> BTreeSet<&str> {
        self.entry_points(namespace).into_iter().collect()
    }
}

/// In-memory plugin registry.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    records: BTreeMap<Namespace, BTreeMap<String, FunctionRecord>>,
}

impl FunctionRegistry {
    /// Returns a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Number of registered plugins across all namespaces.
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every record in `namespace`, sorted by name.
    pub fn records(&self, namespace: Namespace) -> impl Iterator<Item = &FunctionRecord> {
        self.records
            .get(&namespace)
            .into_iter()
            .flat_map(BTreeMap::values)
    }
}

impl NamespaceProvider for FunctionRegistry {
    fn resolve(&self, namespace: Namespace, name: &str) -> Option<&FunctionRecord> {
        self.records.get(&namespace)?.get(name)
    }

    fn entry_points(&self, namespace: Namespace) -> Vec<&str> {
        self.records(namespace).map(|r| r.name.as_str()).collect()
    }
}

/// Builder for constructing a [`FunctionRegistry`].
///
/// Registration never fails. Names are checked when [`build`](Self::build)
/// is called.
///
/// # Example
///
/// ```
/// use product_spec_interfaces::{FunctionRegistry, Namespace, NamespaceProvider};
/// use product_spec_interfaces::plugins::coverage::{CoveragePlugin, masked_arrays};
///
/// let registry = FunctionRegistry::builder()
///     .register("site.coverage", CoveragePlugin::Standard(masked_arrays))
///     .build()
///     .unwrap();
/// assert_eq!(registry.entry_points(Namespace::CoverageChecks), vec!["site.coverage"]);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    pending: Vec<(String, Plugin)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin under its family's namespace.
    pub fn register(mut self, name: impl Into<String>, plugin: impl Into<Plugin>) -> Self {
        self.pending.push((name.into(), plugin.into()));
        self
    }

    /// Adds every built-in plugin.
    pub fn with_builtins(self) -> Self {
        register_builtins(self)
    }

    /// Checks names and builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidName`] for a name that is not a
    /// dotted identifier, or [`RegistryError::Duplicate`] for a name
    /// registered twice in one namespace.
    pub fn build(self) -> Result<FunctionRegistry, RegistryError> {
        let mut records: BTreeMap<Namespace, BTreeMap<String, FunctionRecord>> = BTreeMap::new();

        for (name, plugin) in self.pending {
            if !NAME_RE.is_match(&name) {
                return Err(RegistryError::InvalidName(name));
            }
            let namespace = plugin.namespace();
            let slot = records.entry(namespace).or_default();
            if slot.contains_key(&name) {
                return Err(RegistryError::Duplicate { namespace, name });
            }
            debug!(%namespace, name = name.as_str(), type_tag = plugin.type_tag(), "registered plugin");
            slot.insert(name.clone(), FunctionRecord::new(namespace, name, plugin));
        }

        Ok(FunctionRegistry { records })
    }
}

static BUILTINS: LazyLock<FunctionRegistry> = LazyLock::new(|| {
    FunctionRegistry::builder()
        .with_builtins()
        .build()
        .expect("built-in plugins must register")
});

/// The registry of built-in plugins, built on first use.
pub fn builtin_registry() -> &'static FunctionRegistry {
    &BUILTINS
}
