use std::{borrow::Cow, sync::OnceLock};

use rust_embed::RustEmbed;

use crate::domain::{AccessorialCatalog, FleetCatalog, OverrideTable, TariffRow};

/// Embed the reference data under `assets/` into the binary.
#[derive(RustEmbed)]
#[folder = "assets"]
struct EmbeddedAssets;

static ACCESSORIALS: OnceLock<AccessorialCatalog> = OnceLock::new();
static FLEET: OnceLock<FleetCatalog> = OnceLock::new();
static FALLBACK_TARIFFS: OnceLock<Vec<TariffRow>> = OnceLock::new();

/// Accessorial definitions shipped with the desk, in declaration order.
pub fn accessorial_catalog() -> &'static AccessorialCatalog {
    ACCESSORIALS.get_or_init(|| {
        AccessorialCatalog::from_json(&load_text("/assets/accessorials.json"))
            .unwrap_or_else(|err| panic!("Embedded accessorial catalog is malformed: {err}"))
    })
}

/// Fleet specs for every hub the desk dispatches from.
pub fn fleet_catalog() -> &'static FleetCatalog {
    FLEET.get_or_init(|| {
        FleetCatalog::from_json(&load_text("/assets/fleet.json"))
            .unwrap_or_else(|err| panic!("Embedded fleet catalog is malformed: {err}"))
    })
}

/// Hardcoded rate schedule for hubs priced without the hosted table.
pub fn fallback_tariffs() -> &'static [TariffRow] {
    FALLBACK_TARIFFS.get_or_init(|| {
        serde_json::from_str(&load_text("/assets/tariffs.json"))
            .unwrap_or_else(|err| panic!("Embedded tariff schedule is malformed: {err}"))
    })
}

/// Override table seeded with the fallback schedule.
pub fn fallback_override_table() -> OverrideTable {
    OverrideTable::from_rows(fallback_tariffs().iter().cloned())
}

fn load_text(path: &str) -> String {
    let asset = load_asset(path);
    String::from_utf8(asset.into_owned())
        .unwrap_or_else(|_| panic!("Embedded asset {path} is not valid UTF-8"))
}

fn load_asset(path: &str) -> Cow<'static, [u8]> {
    let canonical = canonical_asset_path(path);
    EmbeddedAssets::get(&canonical)
        .map(|file| file.data)
        .unwrap_or_else(|| panic!("Failed to locate embedded asset: {path}"))
}

fn canonical_asset_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if let Some(rest) = trimmed.strip_prefix("assets/") {
        rest.to_string()
    } else {
        trimmed.to_string()
    }
}
