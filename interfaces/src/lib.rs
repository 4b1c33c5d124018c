//! Plugin registry, product resolver and interface self-tests.
//!
//! Products name their algorithm, colormap, interpolation and coverage
//! functions by string. This crate resolves those names against a
//! [`FunctionRegistry`], reads product fields from a
//! [`SpecStore`](product_spec_store::SpecStore) through a
//! [`ProductResolver`], and checks that everything on both sides agrees.
//!
//! # Quick start
//!
//! ```no_run
//! use product_spec_interfaces::{Interface, ProductResolver, test_interfaces};
//! use product_spec_store::SpecStore;
//!
//! let store = SpecStore::from_dirs("yaml_configs/product_params", "yaml_configs/product_inputs").unwrap();
//! let resolver = ProductResolver::with_builtins(&store);
//!
//! let range = resolver.get_data_range("89pct", "gmi").unwrap();
//! println!("{range:?}");
//!
//! test_interfaces(&resolver, &Interface::ALL, |interface, report| {
//!     println!("{interface}: {:?}", report.first_invalid());
//! })
//! .unwrap();
//! ```

pub mod harness;
pub mod output;
pub mod plugins;
pub mod registry;
pub mod resolver;

pub use harness::{
    HarnessError, Interface, InterfaceReport, PluginInterfaceReport, ProductInterfaceReport,
    test_interfaces, test_plugin_interface, test_product_interface,
};
pub use output::OutputFormat;
pub use plugins::{Plane, PluginError};
pub use registry::{
    FunctionRecord, FunctionRegistry, Namespace, NamespaceProvider, Plugin, RegistryBuilder,
    RegistryError, builtin_registry,
};
pub use resolver::{ProductResolver, ResolveError};
