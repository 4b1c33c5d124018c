use std::fs;
use std::path::{Path, PathBuf};

use product_spec_core::{Normalize, ProductType, ValidationError};
use product_spec_interfaces::harness::{list_cmaps_by_type, test_cmap_interface};
use product_spec_interfaces::{
    FunctionRegistry, HarnessError, Interface, InterfaceReport, Namespace, NamespaceProvider,
    ProductResolver, ResolveError, builtin_registry, test_interfaces, test_product_interface,
};
use product_spec_store::{SpecStore, StoreConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn shipped_configs() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../yaml_configs/store.yaml")
}

fn populate(root: &Path) {
    write(
        root,
        "product_params/IR-BD.yaml",
        r#"
IR-BD:
  product_type: cmap
  cmap_func: visir.Infrared
  cmap_args:
    data_range: [-90, 30]
"#,
    );
    write(
        root,
        "product_params/89pct.yaml",
        r#"
89pct:
  product_type: interp_alg_cmap
  interp_func: pyresample_wrappers.interp_nearest
  interp_args: null
  alg_func: pmw_tb.pmw_89pct
  alg_args:
    output_data_range: [105, 290]
  cmap_func: pmw_tb.cmap_89H
  cmap_args:
    data_range: [105, 290]
"#,
    );
    write(
        root,
        "product_params/Typo.yaml",
        r#"
Typo:
  product_type: cmap
  cmap_func: visir.Infrard
  cmap_args: null
"#,
    );
    write(
        root,
        "product_params/Narrow.yaml",
        r#"
Narrow:
  product_type: cmap
  cmap_func: visir.Infrared
  cmap_args:
    data_range: [-50, 0]
"#,
    );
    write(
        root,
        "product_inputs/ahi.yaml",
        r#"
ahi:
  IR-BD:
    variables: [B13BT]
  Typo:
    variables: [B13BT]
  Narrow:
    variables: [B13BT]
"#,
    );
    write(
        root,
        "product_inputs/gmi.yaml",
        r#"
gmi:
  89pct:
    variables: [H89, V89]
"#,
    );
}

fn fixture() -> (tempfile::TempDir, SpecStore) {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let store = SpecStore::from_dirs(
        dir.path().join("product_params"),
        dir.path().join("product_inputs"),
    )
    .unwrap();
    (dir, store)
}

// ---------------------------------------------------------------------------
// Shipped configuration
// ---------------------------------------------------------------------------

#[test]
fn test_shipped_configs_pass_every_interface() {
    let config = StoreConfig::load(shipped_configs()).unwrap();
    let store = SpecStore::from_config(&config).unwrap();
    let resolver = ProductResolver::with_builtins(&store);

    let mut seen = Vec::new();
    test_interfaces(&resolver, &Interface::ALL, |interface, report| {
        assert_eq!(report.first_invalid(), None, "{interface}");
        seen.push(interface);
    })
    .unwrap();
    assert_eq!(seen, Interface::ALL.to_vec());
}

#[test]
fn test_shipped_configs_list_products() {
    let config = StoreConfig::load(shipped_configs()).unwrap();
    let store = SpecStore::from_config(&config).unwrap();
    let resolver = ProductResolver::with_builtins(&store);

    let by_gmi = resolver.list_products_by_source("gmi");
    assert!(by_gmi.contains(&"89pct".to_string()));
    assert!(by_gmi.contains(&"color89".to_string()));
    assert!(
        resolver
            .list_products_by_type(ProductType::Cmap)
            .contains(&"IR-BD".to_string())
    );

    // ssmis replaces 89pct's alg_args as a whole field.
    let range = resolver.get_data_range("89pct", "ssmis").unwrap().unwrap();
    assert_eq!((range.min, range.max), (125.0, 290.0));
    let args = resolver.get_alg_args("89pct", "ssmis").unwrap().unwrap();
    assert_eq!(args["max_outbounds"], "mask");
    assert_eq!(args["min_outbounds"], "crop");

    assert_eq!(
        resolver.list_products_by_source("viirs"),
        vec!["IR-BD", "Night-Vis", "Night-Vis-IR"]
    );
    let alg = resolver.get_alg_from_product("Night-Vis-IR", "viirs").unwrap().unwrap();
    assert_eq!(alg.plugin.type_tag(), "list_numpy_to_numpy");
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[test]
fn test_cmap_from_product_builds_colors() {
    let (_dir, store) = fixture();
    let resolver = ProductResolver::with_builtins(&store);

    let info = resolver.get_cmap_from_product("89pct", "gmi").unwrap();
    assert_eq!(info.norm, Some(Normalize::Linear { vmin: 105.0, vmax: 290.0 }));
    assert_eq!(info.cbar_label.as_deref(), Some("TB (K)"));
}

#[test]
fn test_cmap_failures_share_one_variant() {
    let (_dir, store) = fixture();
    let resolver = ProductResolver::with_builtins(&store);

    match resolver.get_cmap_from_product("Typo", "ahi") {
        Err(ResolveError::ColormapResolution { cmap, original_kind, .. }) => {
            assert_eq!(cmap, "visir.Infrard");
            assert_eq!(original_kind, "NotFound");
        }
        other => panic!("expected ColormapResolution, got {other:?}"),
    }

    match resolver.get_cmap_from_product("Narrow", "ahi") {
        Err(ResolveError::ColormapResolution { cmap, original_kind, product, .. }) => {
            assert_eq!(cmap, "visir.Infrared");
            assert_eq!(original_kind, "InvalidRange");
            assert_eq!(product, "Narrow");
        }
        other => panic!("expected ColormapResolution, got {other:?}"),
    }
}

#[test]
fn test_missing_pair_propagates_store_error() {
    let (_dir, store) = fixture();
    let resolver = ProductResolver::with_builtins(&store);

    let err = resolver.get_cmap_from_product("IR-BD", "gmi").unwrap_err();
    assert!(matches!(err, ResolveError::Store(ref e) if e.is_not_found()));
    assert!(resolver.is_valid_product("IR-BD", "nope").is_err());
}

#[test]
fn test_malformed_products_are_invalid_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    write(
        dir.path(),
        "product_params/Extra.yaml",
        "Extra:\n  product_type: cmap\n  cmap_func: visir.Infrared\n  cmap_args: null\n  foo: 1\n",
    );
    write(
        dir.path(),
        "product_params/Untyped.yaml",
        "Untyped:\n  cmap_func: visir.Infrared\n  cmap_args: null\n",
    );
    write(
        dir.path(),
        "product_params/Sectored.yaml",
        "Sectored:\n  product_type: sectored\n  cmap_func: visir.Infrared\n",
    );
    write(dir.path(), "product_params/Listy.yaml", "Listy: [product_type, cmap]\n");
    write(
        dir.path(),
        "product_params/Frag.yaml",
        "Frag:\n  product_type: cmap\n  cmap_func: visir.Infrared\n  cmap_args: null\n",
    );
    write(
        dir.path(),
        "product_inputs/amsr2.yaml",
        r#"
amsr2:
  Extra:
    variables: [tb89h]
  Untyped:
    variables: [tb89h]
  Sectored:
    variables: [tb89h]
  Listy:
    variables: [tb89h]
  Frag: [x]
"#,
    );
    let store = SpecStore::from_dirs(
        dir.path().join("product_params"),
        dir.path().join("product_inputs"),
    )
    .unwrap();
    let resolver = ProductResolver::with_builtins(&store);

    for product in ["Extra", "Untyped", "Sectored", "Listy", "Frag"] {
        assert!(!resolver.is_valid_product(product, "amsr2").unwrap(), "{product}");
    }
    assert!(resolver.is_valid_product("IR-BD", "ahi").unwrap());

    match resolver.check_product("Listy", "amsr2").unwrap() {
        Err(ValidationError::InvalidFieldType { field, expected }) => {
            assert_eq!(field, "Listy");
            assert_eq!(expected, "mapping");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(
        resolver.check_product("Extra", "amsr2").unwrap(),
        Err(ValidationError::UnknownFields { ref unknown, .. }) if unknown == &["foo"]
    ));
    assert_eq!(
        resolver.check_product("Untyped", "amsr2").unwrap(),
        Err(ValidationError::MissingProductType)
    );
    assert!(matches!(
        resolver.check_product("Sectored", "amsr2").unwrap(),
        Err(ValidationError::UnknownProductType { ref found, .. }) if found == "sectored"
    ));

    // An absent key still raises.
    let err = resolver.is_valid_product("Extra", "gmi").unwrap_err();
    assert!(matches!(err, ResolveError::Store(ref e) if e.is_not_found()));
}

#[test]
fn test_plugin_records_resolve_from_product() {
    let (_dir, store) = fixture();
    let resolver = ProductResolver::with_builtins(&store);

    let alg = resolver.get_alg_from_product("89pct", "gmi").unwrap().unwrap();
    assert_eq!(alg.plugin.type_tag(), "list_numpy_to_numpy");
    let interp = resolver.get_interp_from_product("89pct", "gmi").unwrap().unwrap();
    assert_eq!(interp.plugin.type_tag(), "2d");
    assert!(resolver.get_covg_from_product("89pct", "gmi").unwrap().is_none());
    assert_eq!(resolver.coverage_check_for("89pct", "gmi").unwrap().name, "masked_arrays");
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[test]
fn test_product_report_records_failures_without_failing() {
    let (_dir, store) = fixture();
    let resolver = ProductResolver::with_builtins(&store);
    let report = test_product_interface(&resolver).unwrap();

    assert_eq!(report.first_invalid(), None);
    assert_eq!(report.list_products.pair_count(), 4);
    assert!(report.cmap_from_product["gmi"].contains_key("89pct"));
    assert!(!report.cmap_from_product["ahi"].contains_key("Typo"));
    assert_eq!(report.errors["ahi"]["Typo"].len(), 1);
    assert_eq!(
        report.required_variables["gmi"]["89pct"],
        Some(vec!["H89".to_string(), "V89".to_string()])
    );
}

#[test]
fn test_driver_names_the_invalid_pair() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    // Keys match the cmap field table, so the catalog lists it; the value
    // shape does not.
    write(
        dir.path(),
        "product_inputs/amsr2.yaml",
        r#"
amsr2:
  IR-BD:
    variables: tb89h
"#,
    );
    let store = SpecStore::from_dirs(
        dir.path().join("product_params"),
        dir.path().join("product_inputs"),
    )
    .unwrap();
    let resolver = ProductResolver::with_builtins(&store);

    let mut reports = Vec::new();
    let err = test_interfaces(&resolver, &[Interface::Colormaps, Interface::Products], |interface, report| {
        reports.push((interface, matches!(report, InterfaceReport::Products(_))));
    })
    .unwrap_err();

    match err {
        HarnessError::FailedValidity { interface, item } => {
            assert_eq!(interface, Interface::Products);
            assert_eq!(item, "amsr2/IR-BD");
        }
        other => panic!("expected FailedValidity, got {other:?}"),
    }
    assert_eq!(reports, vec![(Interface::Colormaps, false), (Interface::Products, true)]);
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn test_every_listed_entry_point_round_trips() {
    let registry = builtin_registry();
    for namespace in Namespace::ALL {
        for name in registry.list_entry_points(namespace) {
            let record = registry.find_entry_point(namespace, name).unwrap();
            assert_eq!(record.name, name);
            assert_eq!(record.namespace, namespace);
        }
    }
}

#[test]
fn test_injected_registry_limits_resolution() {
    let (_dir, store) = fixture();
    let registry = FunctionRegistry::builder().build().unwrap();
    let resolver = ProductResolver::new(&store, &registry);

    let err = resolver.get_cmap_from_product("IR-BD", "ahi").unwrap_err();
    assert!(matches!(err, ResolveError::ColormapResolution { .. }));
    assert!(test_cmap_interface(&registry).validity_check.is_empty());
    assert!(list_cmaps_by_type(&registry).is_empty());
}
