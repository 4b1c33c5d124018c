use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use product_spec_core::ProductType;
use product_spec_interfaces::harness::list_by_type;
use product_spec_interfaces::output::{
    format_catalog, format_entry_points, format_names, format_product, format_report,
};
use product_spec_interfaces::{Interface, OutputFormat, ProductResolver, test_interfaces};
use product_spec_store::{SpecStore, StoreConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "spec-interfaces")]
#[command(about = "Self-tests and listings for satellite product specifications")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Log filter used when RUST_LOG is unset (e.g. info, debug).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Store configuration YAML listing product and source roots.
    #[arg(long, global = true, env = "PRODUCT_SPEC_CONFIG")]
    config: Option<PathBuf>,
    /// Directory of product documents. Takes precedence over --config.
    #[arg(long, global = true)]
    products: Option<PathBuf>,
    /// Directory of source documents. Takes precedence over --config.
    #[arg(long, global = true)]
    sources: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every plugin and product, failing on the first invalid entry.
    TestInterfaces(TestInterfacesArgs),
    /// List valid (product, source) pairs.
    ListProducts(ListProductsArgs),
    /// List registered plugins by function type.
    ListModules(ListModulesArgs),
    /// Print one product's merged fields.
    ShowProduct(ShowProductArgs),
}

#[derive(Debug, Args)]
struct TestInterfacesArgs {
    /// Interfaces to test, in order (default: all).
    #[arg(long = "interface", value_enum)]
    interfaces: Vec<Interface>,
    /// Output format for each report.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ListProductsArgs {
    /// Only products of this type (e.g. interp_alg_cmap).
    #[arg(long, conflicts_with = "source")]
    product_type: Option<ProductType>,
    /// Only products offered by this source.
    #[arg(long)]
    source: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ListModulesArgs {
    /// Interfaces to list (default: every plugin interface).
    #[arg(long = "interface", value_enum)]
    interfaces: Vec<Interface>,
    /// Output format.
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ShowProductArgs {
    /// Product name.
    product: String,
    /// Source name.
    source: String,
    /// Fail if the product does not validate.
    #[arg(long)]
    check: bool,
    /// Output format.
    #[arg(long, value_enum, default_value = "yaml")]
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::TestInterfaces(args) => run_test_interfaces(&cli.store, args),
        Command::ListProducts(args) => run_list_products(&cli.store, args),
        Command::ListModules(args) => run_list_modules(args),
        Command::ShowProduct(args) => run_show_product(&cli.store, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(args: &StoreArgs) -> Result<SpecStore, String> {
    let store = match (&args.config, &args.products, &args.sources) {
        (_, Some(products), Some(sources)) => SpecStore::from_dirs(products, sources),
        (_, Some(_), None) | (_, None, Some(_)) => {
            return Err("--products and --sources must be given together".to_string());
        }
        (Some(config), None, None) => {
            debug!(config = %config.display(), "loading store configuration");
            let config = StoreConfig::load(config)
                .map_err(|e| format!("failed to load {}: {e}", config.display()))?;
            SpecStore::from_config(&config)
        }
        (None, None, None) => {
            return Err(
                "no specification store: pass --config (or set PRODUCT_SPEC_CONFIG) or --products with --sources"
                    .to_string(),
            );
        }
    };
    store.map_err(|e| e.to_string())
}

fn run_test_interfaces(store: &StoreArgs, args: TestInterfacesArgs) -> Result<(), String> {
    let store = open_store(store)?;
    let resolver = ProductResolver::with_builtins(&store);
    let interfaces = if args.interfaces.is_empty() {
        Interface::ALL.to_vec()
    } else {
        args.interfaces
    };

    let mut printed = Ok(());
    test_interfaces(&resolver, &interfaces, |interface, report| {
        if printed.is_err() {
            return;
        }
        printed = format_report(report, args.format).map(|text| {
            println!("=== {interface}");
            print!("{}", ensure_newline(text));
        });
    })
    .map_err(|e| e.to_string())?;
    printed?;

    info!(count = interfaces.len(), "all interfaces passed");
    Ok(())
}

fn run_list_products(store: &StoreArgs, args: ListProductsArgs) -> Result<(), String> {
    let store = open_store(store)?;
    let resolver = ProductResolver::with_builtins(&store);

    let text = match (args.product_type, &args.source) {
        (Some(product_type), _) => {
            format_names(&resolver.list_products_by_type(product_type), args.format)?
        }
        (None, Some(source)) => format_names(&resolver.list_products_by_source(source), args.format)?,
        (None, None) => format_catalog(&resolver.list_products(), args.format)?,
    };
    print!("{}", ensure_newline(text));
    Ok(())
}

fn run_list_modules(args: ListModulesArgs) -> Result<(), String> {
    let registry = product_spec_interfaces::builtin_registry();
    let interfaces = if args.interfaces.is_empty() {
        Interface::ALL.to_vec()
    } else {
        args.interfaces
    };

    let modules: BTreeMap<String, BTreeMap<String, Vec<String>>> = interfaces
        .iter()
        .filter_map(|interface| interface.namespace())
        .map(|namespace| (namespace.to_string(), list_by_type(registry, namespace)))
        .collect();

    let text = format_entry_points(&modules, args.format)?;
    print!("{}", ensure_newline(text));
    Ok(())
}

fn run_show_product(store: &StoreArgs, args: ShowProductArgs) -> Result<(), String> {
    let store = open_store(store)?;
    let resolver = ProductResolver::with_builtins(&store);

    if args.check {
        resolver
            .check_product(&args.product, &args.source)
            .map_err(|e| e.to_string())?
            .map_err(|e| format!("{}/{}: {e}", args.source, args.product))?;
    }

    let product = resolver
        .get_product(&args.product, &args.source)
        .map_err(|e| e.to_string())?;
    let text = format_product(&product, args.format)?;
    print!("{}", ensure_newline(text));
    Ok(())
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
