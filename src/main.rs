use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use rate_desk::config::{ConfigError, DeskConfig};
use rate_desk::domain::{
    billable_wait_blocks, compute_quote, format_money, rank_fleet, AccessorialSelection,
    CargoDimensions, OverrideTable, QuoteRequest, ServiceType, TariffError, TariffResolver,
    TariffRow, VehicleType,
};
use rate_desk::infra::{
    cache::cache_path, load_tariff_cache, save_tariff_cache, HttpTariffStore, TariffCache,
    TariffStoreError,
};
use rate_desk::util::{
    assets,
    format::{format_fit_table, format_quote},
    persistence::{HistoryStore, PersistSaveError},
    version::{version_label, APP_NAME},
};

#[derive(Parser)]
#[command(name = "rate-desk")]
#[command(about = "Price courier and freight quotes and check cargo fit")]
struct Cli {
    /// Config file; defaults to the per-user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Price one shipment.
    Quote(QuoteArgs),
    /// Rank a hub's fleet for one cargo item.
    Fit {
        #[arg(long)]
        hub: String,
        #[command(flatten)]
        cargo: CargoArgs,
    },
    /// List the tariff cards in effect; refreshes the rate table cache when one is configured.
    Tariffs {
        #[arg(long)]
        hub: Option<String>,
    },
    /// List accessorial definitions.
    Accessorials,
    /// Show saved quotes, newest last.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the version.
    Version,
}

#[derive(Args)]
struct QuoteArgs {
    /// Read the whole request from a JSON file instead of flags.
    #[arg(long, conflicts_with_all = ["hub", "distance"])]
    request: Option<PathBuf>,
    #[arg(long, required_unless_present = "request")]
    hub: Option<String>,
    #[arg(long, value_enum, default_value_t = VehicleArg::CargoVan)]
    vehicle: VehicleArg,
    #[arg(long, value_enum, default_value_t = ServiceArg::Standard)]
    service: ServiceArg,
    #[arg(long, required_unless_present = "request")]
    distance: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    deadhead: f64,
    #[arg(long, default_value_t = 0.0)]
    weight: f64,
    /// Accessorial key, optionally with a count: `liftgate`, `extra_stop=2`.
    #[arg(long = "accessorial", value_name = "KEY[=COUNT]")]
    accessorials: Vec<String>,
    /// Billable 15-minute wait blocks (after the free first block).
    #[arg(long, default_value_t = 0, conflicts_with = "waited_blocks")]
    wait_blocks: u32,
    /// Elapsed 15-minute blocks on site; the first block is not billed.
    #[arg(long)]
    waited_blocks: Option<u32>,
    /// Win-client discount in percent, clamped to the configured range.
    #[arg(long)]
    discount: Option<f64>,
    #[command(flatten)]
    cargo: CargoArgs,
    /// Store the finished quote in the local history.
    #[arg(long, default_value_t = false)]
    save: bool,
}

#[derive(Args, Clone, Default)]
struct CargoArgs {
    #[arg(long)]
    length: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
    #[arg(long = "cargo-weight")]
    cargo_weight: Option<f64>,
}

impl CargoArgs {
    fn dimensions(&self) -> Option<CargoDimensions> {
        if self.length.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.cargo_weight.is_none()
        {
            return None;
        }
        Some(CargoDimensions {
            length_in: self.length,
            width_in: self.width,
            height_in: self.height,
            weight_lb: self.cargo_weight,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VehicleArg {
    Car,
    CargoVan,
    BoxTruck,
}

impl From<VehicleArg> for VehicleType {
    fn from(value: VehicleArg) -> Self {
        match value {
            VehicleArg::Car => Self::Car,
            VehicleArg::CargoVan => Self::CargoVan,
            VehicleArg::BoxTruck => Self::BoxTruck,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ServiceArg {
    Standard,
    Rush,
    Scheduled,
}

impl From<ServiceArg> for ServiceType {
    fn from(value: ServiceArg) -> Self {
        match value {
            ServiceArg::Standard => Self::Standard,
            ServiceArg::Rush => Self::Rush,
            ServiceArg::Scheduled => Self::Scheduled,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tariff(#[from] TariffError),
    #[error(transparent)]
    Store(#[from] TariffStoreError),
    #[error(transparent)]
    Persist(#[from] PersistSaveError),
    #[error("failed to read {}: {source}", path.display())]
    ReadRequest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid accessorial {0:?}: expected KEY or KEY=COUNT")]
    Accessorial(String),
    #[error("accessorial {0:?} given more than once")]
    DuplicateAccessorial(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = DeskConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Quote(args) => quote(&config, args, cli.json).await,
        Command::Fit { hub, cargo } => {
            fit(&hub, &cargo.dimensions().unwrap_or_default(), cli.json)
        }
        Command::Tariffs { hub } => tariffs(&config, hub.as_deref(), cli.json).await,
        Command::Accessorials => accessorials(cli.json),
        Command::History { limit } => history(limit, cli.json),
        Command::Version => {
            println!("{APP_NAME} {}", version_label());
            Ok(())
        }
    }
}

fn override_table(config: &DeskConfig) -> OverrideTable {
    let mut table = assets::fallback_override_table();
    table.extend(config.tariff_overrides.iter().cloned());
    table
}

/// Rate table client warmed from the disk snapshot, if a rate table is configured.
fn tariff_store(config: &DeskConfig) -> Result<Option<HttpTariffStore>, CliError> {
    let Some(url) = config.tariff_url.as_deref() else {
        return Ok(None);
    };
    let mut store = HttpTariffStore::new(url)?.with_ttl(config.cache_ttl());
    if let Some(key) = &config.tariff_api_key {
        store = store.with_api_key(key.clone());
    }
    Ok(Some(store))
}

async fn warm_from_disk(store: &HttpTariffStore, path: &Path) {
    if let Some(cache) = load_tariff_cache(path, store.base_url().as_str()) {
        let fetched_at = cache.fetched_at();
        store.warm(cache.rows, fetched_at).await;
    }
}

fn parse_accessorial(raw: &str) -> Result<AccessorialSelection, CliError> {
    match raw.split_once('=') {
        None if !raw.trim().is_empty() => Ok(AccessorialSelection::on(raw.trim())),
        Some((key, count)) if !key.trim().is_empty() => count
            .trim()
            .parse()
            .map(|count| AccessorialSelection::with_count(key.trim(), count))
            .map_err(|_| CliError::Accessorial(raw.to_string())),
        _ => Err(CliError::Accessorial(raw.to_string())),
    }
}

fn duplicate_accessorial(selections: &[AccessorialSelection]) -> Option<&str> {
    let mut seen = HashSet::new();
    selections
        .iter()
        .map(|selection| selection.key.as_str())
        .find(|key| !seen.insert(*key))
}

fn request_from_args(args: &QuoteArgs) -> Result<QuoteRequest, CliError> {
    if let Some(path) = &args.request {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadRequest {
            path: path.clone(),
            source,
        })?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let hub = args.hub.as_deref().unwrap_or_default();
    let mut request = QuoteRequest::new(
        hub,
        args.vehicle.into(),
        args.distance.unwrap_or_default(),
        args.weight,
    )
    .with_service(args.service.into())
    .with_deadhead(args.deadhead);

    for raw in &args.accessorials {
        request = request.with_accessorial(parse_accessorial(raw)?);
    }
    let wait_blocks = args
        .waited_blocks
        .map(billable_wait_blocks)
        .unwrap_or(args.wait_blocks);
    if wait_blocks > 0 {
        request = request.with_accessorial(AccessorialSelection::with_count("wait_time", wait_blocks));
    }
    if let Some(key) = duplicate_accessorial(&request.accessorials) {
        return Err(CliError::DuplicateAccessorial(key.to_string()));
    }
    if let Some(pct) = args.discount {
        request = request.with_discount(pct);
    }
    if let Some(cargo) = args.cargo.dimensions() {
        request = request.with_cargo(cargo);
    }
    Ok(request)
}

async fn quote(config: &DeskConfig, args: QuoteArgs, json: bool) -> Result<(), CliError> {
    let request = request_from_args(&args)?.sanitized(&config.discount);

    let store = tariff_store(config)?;
    if let Some(store) = &store {
        warm_from_disk(store, &cache_path()).await;
    }
    let resolver = TariffResolver::new(override_table(config), store);
    let (tariff, source) = resolver.resolve_with_source(&request.tariff_key()).await?;
    tracing::info!(lane = %request.tariff_key(), ?source, "pricing quote");

    let result = compute_quote(&tariff, &request, assets::accessorial_catalog());
    let fit = request
        .cargo
        .as_ref()
        .map(|cargo| rank_fleet(cargo, assets::fleet_catalog().for_hub(&request.hub)));

    if args.save {
        let record = HistoryStore::default_location()?.append(&request, &result)?;
        if !json {
            println!("Saved quote {}", record.id);
        }
    }

    if json {
        let payload = serde_json::json!({
            "request": request,
            "tariff": tariff,
            "result": result,
            "fit": fit,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print!("{}", format_quote(&request, &result));
    if result.amount_due() < result.minimum_charge {
        println!(
            "\nNote: below the lane minimum of {}",
            format_money(result.minimum_charge)
        );
    }
    if let Some(fit) = fit {
        println!();
        print!("{}", format_fit_table(&request.tariff_key().hub, &fit));
    }
    Ok(())
}

fn fit(hub: &str, cargo: &CargoDimensions, json: bool) -> Result<(), CliError> {
    let results = rank_fleet(cargo, assets::fleet_catalog().for_hub(hub));
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_fit_table(&hub.trim().to_ascii_uppercase(), &results));
    }
    Ok(())
}

async fn tariffs(config: &DeskConfig, hub: Option<&str>, json: bool) -> Result<(), CliError> {
    let mut table = OverrideTable::default();

    if let Some(store) = tariff_store(config)? {
        let rows = store.fetch_all().await?;
        let cache = TariffCache::new(store.base_url().to_string(), rows.clone());
        if let Err(err) = save_tariff_cache(&cache_path(), &cache) {
            tracing::warn!("failed to save tariff cache: {err}");
        }
        table.extend(rows);
    }
    // Overrides go in last so they replace rate table rows for the same lane.
    let overrides = override_table(config);
    table.extend(overrides.rows().map(|(key, card)| TariffRow {
        key: key.clone(),
        card: card.clone(),
    }));

    let wanted = hub.map(|hub| hub.trim().to_ascii_uppercase());
    let rows: Vec<_> = table
        .rows()
        .filter(|(key, _)| wanted.as_ref().map_or(true, |hub| &key.hub == hub))
        .collect();

    if json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(key, card)| serde_json::json!({ "lane": key, "card": card }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for (key, card) in rows {
        println!(
            "{:<28} base {:>9}  {} mi incl.  {}/mi  {}/lb over {} lb  fuel {}%",
            key.to_string(),
            format_money(card.base_rate),
            card.included_distance,
            format_money(card.per_mile_rate),
            format_money(card.per_weight_unit_rate),
            card.weight_threshold,
            card.fuel_surcharge_pct
        );
    }
    Ok(())
}

fn accessorials(json: bool) -> Result<(), CliError> {
    let catalog = assets::accessorial_catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }
    for definition in catalog.iter() {
        println!(
            "{:<16} {:<22} {:>9}  {}",
            definition.key,
            definition.label,
            format_money(definition.flat_amount),
            definition.description
        );
    }
    Ok(())
}

fn history(limit: usize, json: bool) -> Result<(), CliError> {
    let store = HistoryStore::default_location()?;
    let records = store.load();
    let start = records.len().saturating_sub(limit);
    let recent = &records[start..];

    if json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }
    if recent.is_empty() {
        println!("No saved quotes in {}.", store.path().display());
    }
    for record in recent {
        println!(
            "{}  {}  {:<24} {:>12}",
            record.created_at,
            record.id,
            record.request.tariff_key().to_string(),
            format_money(record.result.amount_due())
        );
    }
    Ok(())
}
