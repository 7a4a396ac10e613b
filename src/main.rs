use clap::{Parser, Subcommand};
use geo_reference::config::{ConfigFile, ResolverConfig};
use geo_reference::reference::{GeoError, GeoResolver, ReferenceCache, ResolveLevel};
use geo_reference::server;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// georef: Geospatial Reference Resolver
///
/// Reconciles country boundary polygons with the GeoNames gazetteers and
/// turns a country / state / city selection into one geographic filter.
///
/// Examples:
///   georef countries
///   georef subdivisions "United States of America"
///   georef cities "United States of America" Illinois
///   georef resolve --level city Japan --subdivision Tokyo --city Tokyo
///   georef --data-dir /srv/geo serve --port 8642
#[derive(Parser)]
#[command(name = "georef", version, about, long_about = None)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the reference files. Defaults to ~/.georef/data.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Give up loading reference data after this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List boundary countries with their ISO code.
    Countries,

    /// List a country's subdivisions.
    Subdivisions {
        /// Boundary display name, e.g. "United States of America".
        country: String,
    },

    /// List a subdivision's cities, most populous first.
    Cities { country: String, subdivision: String },

    /// Bounding box of a country or one of its subdivisions.
    Bounds {
        country: String,
        #[arg(long)]
        subdivision: Option<String>,
    },

    /// Resolve a selection to a geographic filter.
    Resolve {
        country: String,
        #[arg(long)]
        subdivision: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// global, country, state or city. Defaults to the deepest given.
        #[arg(long, value_parser = parse_level)]
        level: Option<ResolveLevel>,
    },

    /// Show what was loaded and every load warning.
    Status,

    /// Serve the read-only HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8642)]
        port: u16,
    },
}

fn parse_level(s: &str) -> Result<ResolveLevel, String> {
    s.parse()
}

#[derive(Serialize)]
struct CountryLine<'a> {
    name: &'a str,
    iso_code: Option<&'a str>,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "geo_reference=debug"
    } else {
        "geo_reference=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), GeoError> {
    let file = cli.config.as_deref().map(ConfigFile::load).transpose()?;
    let config = ResolverConfig::resolve(file.as_ref(), cli.data_dir.as_deref(), cli.timeout)?;

    tracing::debug!(?config, "resolved configuration");
    let cache = ReferenceCache::new(config);
    let resolver = cache.load_all()?;
    banner(&resolver);

    match cli.command {
        Command::Countries => {
            let lines: Vec<CountryLine> = resolver
                .countries()
                .into_iter()
                .map(|name| CountryLine { name, iso_code: resolver.iso_code_for(name) })
                .collect();
            for line in &lines {
                eprintln!("  {:<40} {}", line.name, line.iso_code.unwrap_or("unmapped"));
            }
            print_json(&lines)
        }
        Command::Subdivisions { country } => {
            let iso = resolver.require_iso(&country)?;
            print_json(&resolver.subdivisions_of(iso))
        }
        Command::Cities { country, subdivision } => {
            let iso = resolver.require_iso(&country)?;
            let code = resolver.require_subdivision_code(iso, &subdivision)?;
            print_json(&resolver.cities_in(iso, code))
        }
        Command::Bounds { country, subdivision } => {
            let bbox = match subdivision.as_deref() {
                Some(name) => resolver.bounds_for_subdivision(resolver.require_iso(&country)?, name)?,
                None => resolver.bounds_for_country(&country)?,
            };
            eprintln!("  \u{1F4D0} {}", bbox);
            print_json(&bbox)
        }
        Command::Resolve { country, subdivision, city, level } => {
            let level = level.unwrap_or(if city.is_some() {
                ResolveLevel::City
            } else if subdivision.is_some() {
                ResolveLevel::Subdivision
            } else {
                ResolveLevel::Country
            });
            let res = resolver.resolve_detailed(level, &country, subdivision.as_deref(), city.as_deref());
            eprintln!("  \u{1F4CD} reached {} (requested {:?})", res.reached, level);
            print_json(&res)
        }
        Command::Status => print_json(resolver.report()),
        Command::Serve { host, port } => serve(&host, port, resolver),
    }
}

fn banner(resolver: &GeoResolver) {
    let report = resolver.report();
    eprintln!(
        "  {} countries ({} mapped), {} cities, {} warnings, loaded in {:.1}ms",
        report.countries,
        report.mapped_countries,
        report.cities,
        report.warnings.len(),
        report.elapsed_ms
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), GeoError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn serve(host: &str, port: u16, resolver: Arc<GeoResolver>) -> Result<(), GeoError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::start(host, port, resolver))?;
    Ok(())
}
