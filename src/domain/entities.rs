use std::fmt;

use serde::{Deserialize, Serialize};

/// Vehicle class a tariff is written for. Also the category of a fleet vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    CargoVan,
    BoxTruck,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::CargoVan => "cargo_van",
            Self::BoxTruck => "box_truck",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Car => "Passenger Car",
            Self::CargoVan => "Cargo Van",
            Self::BoxTruck => "Box Truck",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    Standard,
    Rush,
    Scheduled,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Rush => "rush",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lane identity a tariff card is resolved for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TariffKey {
    pub hub: String,
    #[serde(default)]
    pub service_type: ServiceType,
    pub vehicle_type: VehicleType,
}

impl TariffKey {
    /// Hub codes are matched case-insensitively; keys always carry the upper-case form.
    pub fn new(hub: &str, service_type: ServiceType, vehicle_type: VehicleType) -> Self {
        Self {
            hub: normalize_hub(hub),
            service_type,
            vehicle_type,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.hub = normalize_hub(&self.hub);
        self
    }
}

impl fmt::Display for TariffKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hub, self.service_type, self.vehicle_type)
    }
}

pub fn normalize_hub(hub: &str) -> String {
    hub.trim().to_ascii_uppercase()
}

/// One pricing rule for a lane. Read-only for the duration of a quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TariffCard {
    pub base_rate: f64,
    pub per_mile_rate: f64,
    pub per_weight_unit_rate: f64,
    pub minimum_charge: f64,
    /// Percentage, 0-100.
    pub fuel_surcharge_pct: f64,
    /// Miles bundled into the base rate.
    pub included_distance: f64,
    /// Pounds above which the weight surcharge applies.
    pub weight_threshold: f64,
}

impl TariffCard {
    /// Clamps every field to a non-negative finite value and fuel into 0-100.
    /// Cards from any source pass through here before they reach the engine.
    pub fn normalized(self) -> Self {
        Self {
            base_rate: non_negative(self.base_rate),
            per_mile_rate: non_negative(self.per_mile_rate),
            per_weight_unit_rate: non_negative(self.per_weight_unit_rate),
            minimum_charge: non_negative(self.minimum_charge),
            fuel_surcharge_pct: non_negative(self.fuel_surcharge_pct).min(100.0),
            included_distance: non_negative(self.included_distance),
            weight_threshold: non_negative(self.weight_threshold),
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// A tariff card together with the lane it prices, as stored in rate tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TariffRow {
    #[serde(flatten)]
    pub key: TariffKey,
    #[serde(flatten)]
    pub card: TariffCard,
}

/// How an accessorial's amount is derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessorialPricing {
    /// The definition's flat amount.
    Flat,
    /// The tariff's base rate.
    Attempt,
    /// Flat amount per unit, times a caller-supplied count.
    PerUnit { unit: String },
    /// Flat amount per billable 15-minute block; the first block is free.
    WaitTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessorialDefinition {
    pub key: String,
    pub label: String,
    pub flat_amount: f64,
    #[serde(default)]
    pub description: String,
    pub pricing: AccessorialPricing,
}

/// Caller's choice for one accessorial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorialSelection {
    pub key: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Units for per-unit accessorials, billable blocks for wait time.
    #[serde(default)]
    pub count: Option<u32>,
}

fn enabled_by_default() -> bool {
    true
}

impl AccessorialSelection {
    pub fn on(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            count: None,
        }
    }

    pub fn with_count(key: impl Into<String>, count: u32) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            count: Some(count),
        }
    }
}

/// Cargo measurements; inches and pounds. Absent or non-positive values are unchecked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CargoDimensions {
    #[serde(default)]
    pub length_in: Option<f64>,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub height_in: Option<f64>,
    #[serde(default)]
    pub weight_lb: Option<f64>,
}

/// Physical cargo capacity of one vehicle, inches and pounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetVehicleSpec {
    pub name: String,
    pub category: VehicleType,
    pub cargo_length: f64,
    pub cargo_width: f64,
    pub cargo_height: f64,
    pub door_width: f64,
    pub door_height: f64,
    pub max_payload: f64,
}
