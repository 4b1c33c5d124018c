//! YAML specification store for satellite products.
//!
//! This crate discovers product and source documents under configured roots
//! and resolves (product, source) pairs into merged field maps.
//!
//! # Quick start
//!
//! ```no_run
//! use product_spec_store::{SpecStore, StoreConfig};
//!
//! let config = StoreConfig::load("yaml_configs/store.yaml").unwrap();
//! let store = SpecStore::from_config(&config).unwrap();
//!
//! let product = store.get_product("IR-BD", "ahi").unwrap();
//! println!("{}", product.fields["product_type"]);
//!
//! let catalog = store.list_products();
//! for (source, product) in catalog.pairs() {
//!     println!("{source}: {product}");
//! }
//! ```
//!
//! # Document layout
//!
//! A product document's stem is the product name and its top-level key maps
//! that name to the product's base fields:
//!
//! ```yaml
//! # product_params/visir/IR-BD.yaml
//! IR-BD:
//!   product_type: cmap
//!   cmap_func: visir.Infrared
//!   cmap_args: null
//! ```
//!
//! A source document's stem is the source name and its top-level key maps
//! that name to per-product override fragments:
//!
//! ```yaml
//! # product_inputs/ahi.yaml
//! ahi:
//!   IR-BD:
//!     variables: [B14BT]
//! ```

mod config;
mod error;
mod loader;

pub use config::StoreConfig;
pub use error::{DocumentKind, Result, StoreError};
pub use loader::{ProductDocument, SourceDocument, SpecStore, StoreBuilder};
