use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spec-interfaces"));
    cmd.env_remove("PRODUCT_SPEC_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn shipped_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../yaml_configs/store.yaml")
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// One valid cmap product offered by `ahi`.
fn write_store(root: &Path) {
    write(
        root,
        "params/IR-BD.yaml",
        r#"
IR-BD:
  product_type: cmap
  cmap_func: visir.Infrared
  cmap_args: null
"#,
    );
    write(
        root,
        "inputs/ahi.yaml",
        r#"
ahi:
  IR-BD:
    variables: [B13BT]
"#,
    );
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run spec-interfaces")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// test-interfaces
// ---------------------------------------------------------------------------

#[test]
fn test_interfaces_passes_on_shipped_configs() {
    let output = run(bin()
        .arg("--config")
        .arg(shipped_config())
        .args(["test-interfaces", "--format", "table"]));

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    for interface in ["algorithms", "colormaps", "interpolation", "filenames", "coverage", "products"] {
        assert!(out.contains(&format!("=== {interface}\n")), "missing {interface}");
    }
    assert!(out.contains("gmi/89pct  ok  interp_alg_cmap"));
}

#[test]
fn test_interfaces_fails_naming_the_pair() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());
    write(
        dir.path(),
        "inputs/amsr2.yaml",
        "amsr2:\n  IR-BD:\n    variables: tb89h\n",
    );

    let output = run(bin()
        .arg("--products")
        .arg(dir.path().join("params"))
        .arg("--sources")
        .arg(dir.path().join("inputs"))
        .args(["test-interfaces", "--interface", "products"]));

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("error: products interface failed validity check for 'amsr2/IR-BD'"), "{err}");
    // The failing report is still printed.
    assert!(stdout(&output).contains("=== products"));
}

// ---------------------------------------------------------------------------
// list-products
// ---------------------------------------------------------------------------

#[test]
fn list_products_prints_catalog_json() {
    let output = run(bin().arg("--config").arg(shipped_config()).arg("list-products"));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let cmaps = value["by_type"]["cmap"].as_array().unwrap();
    assert!(cmaps.iter().any(|p| p == "IR-BD"));
    assert!(value["by_source"]["ascat"].as_array().unwrap().iter().any(|p| p == "windbarbs"));
}

#[test]
fn list_products_filters_by_source() {
    let output = run(bin()
        .arg("--config")
        .arg(shipped_config())
        .args(["list-products", "--source", "ahi", "--format", "table"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "IR-BD\nInfrared-Gray\n");
}

#[test]
fn list_products_rejects_unknown_type() {
    let output = run(bin()
        .arg("--config")
        .arg(shipped_config())
        .args(["list-products", "--product-type", "sectored"]));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("sectored"));
}

#[test]
fn missing_store_is_an_error() {
    let output = run(bin().arg("list-products"));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: no specification store"));

    let output = run(bin().args(["--products", "params", "list-products"]));
    assert!(stderr(&output).contains("must be given together"));
}

#[test]
fn config_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());
    write(
        dir.path(),
        "store.yaml",
        "product_roots: [params]\nsource_roots: [inputs]\n",
    );

    let output = run(bin()
        .env("PRODUCT_SPEC_CONFIG", dir.path().join("store.yaml"))
        .args(["list-products", "--format", "table"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ahi     IR-BD\n"));
}

// ---------------------------------------------------------------------------
// list-modules / show-product
// ---------------------------------------------------------------------------

#[test]
fn list_modules_groups_by_type() {
    let output = run(bin().args(["list-modules", "--interface", "coverage"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "coverage_checks:\n  standard: masked_arrays, rgba\n");
}

#[test]
fn list_modules_skips_products() {
    let output = run(bin().args(["list-modules", "--format", "json"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let namespaces: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(
        namespaces,
        ["algorithms", "coverage_checks", "filename_formats", "interpolation", "user_colormaps"]
    );
    assert!(
        value["user_colormaps"]["linear_segmented"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n == "visir.Infrared")
    );
}

#[test]
fn show_product_merges_source_fragment() {
    let output = run(bin()
        .arg("--config")
        .arg(shipped_config())
        .args(["show-product", "89pct", "ssmis", "--check", "--format", "json"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["product_name"], "89pct");
    assert_eq!(value["source_name"], "ssmis");
    assert_eq!(value["fields"]["alg_args"]["output_data_range"], serde_json::json!([125, 290]));
    assert_eq!(value["fields"]["alg_args"]["max_outbounds"], "mask");
}

#[test]
fn show_product_not_offered() {
    let output = run(bin()
        .arg("--config")
        .arg(shipped_config())
        .args(["show-product", "windbarbs", "ahi"]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("windbarbs"));
}
