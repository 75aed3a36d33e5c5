//! Cargo fit classification against fleet vehicle specs.

use serde::{Deserialize, Serialize};

use super::{
    entities::{CargoDimensions, FleetVehicleSpec, VehicleType},
    money::format_quantity,
};

/// Share of a capacity above which a fit is reported as tight.
pub const TIGHT_FIT_RATIO: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Fits,
    Tight,
    NoFit,
}

impl FitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fits => "Fits",
            Self::Tight => "Tight",
            Self::NoFit => "No fit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub vehicle_name: String,
    pub category: VehicleType,
    pub status: FitStatus,
    /// Every triggered constraint, blocking ones first.
    pub reasons: Vec<String>,
}

#[derive(Default)]
struct FitCheck {
    failures: Vec<String>,
    warnings: Vec<String>,
}

impl FitCheck {
    /// Capacity check shared by every dimension: over is fatal, above 90% is tight.
    fn capacity(
        &mut self,
        name: &str,
        limit_name: &str,
        unit: &str,
        value: f64,
        limit: f64,
        clear_of_door: bool,
    ) {
        let value_text = format_quantity(value);
        let limit_text = format_quantity(limit);
        if value > limit {
            self.failures.push(format!(
                "{name} {value_text}{unit} exceeds {limit_name} {limit_text}{unit}"
            ));
        } else if value > TIGHT_FIT_RATIO * limit && clear_of_door {
            self.warnings.push(format!(
                "{name} {value_text}{unit} is within 10% of {limit_name} {limit_text}{unit}"
            ));
        }
    }

    fn door(&mut self, name: &str, value: f64, opening: f64) {
        if value > opening {
            self.failures.push(format!(
                "{name} {}in exceeds door opening {} {}in",
                format_quantity(value),
                name.to_lowercase(),
                format_quantity(opening)
            ));
        }
    }

    fn status(&self) -> FitStatus {
        if !self.failures.is_empty() {
            FitStatus::NoFit
        } else if !self.warnings.is_empty() {
            FitStatus::Tight
        } else {
            FitStatus::Fits
        }
    }
}

fn supplied(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Classifies one cargo item against one vehicle. Every constraint is
/// evaluated so the caller sees all blocking reasons at once.
pub fn check_fit(cargo: &CargoDimensions, vehicle: &FleetVehicleSpec) -> FitResult {
    let mut check = FitCheck::default();

    if let Some(length) = supplied(cargo.length_in) {
        check.capacity("Length", "cargo length", "in", length, vehicle.cargo_length, true);
    }

    if let Some(width) = supplied(cargo.width_in) {
        let clears_door = width <= vehicle.door_width;
        check.capacity("Width", "cargo width", "in", width, vehicle.cargo_width, clears_door);
        check.door("Width", width, vehicle.door_width);
    }

    if let Some(height) = supplied(cargo.height_in) {
        let clears_door = height <= vehicle.door_height;
        check.capacity("Height", "cargo height", "in", height, vehicle.cargo_height, clears_door);
        check.door("Height", height, vehicle.door_height);
    }

    if let Some(weight) = supplied(cargo.weight_lb) {
        check.capacity("Weight", "max payload", " lb", weight, vehicle.max_payload, true);
    }

    let status = check.status();
    let FitCheck { mut failures, warnings } = check;
    failures.extend(warnings);

    FitResult {
        vehicle_name: vehicle.name.clone(),
        category: vehicle.category,
        status,
        reasons: failures,
    }
}

/// Checks the cargo against every vehicle of a fleet and orders the
/// shortlist fits, tight, no fit. Fleet order is kept within a class.
pub fn rank_fleet(cargo: &CargoDimensions, fleet: &[FleetVehicleSpec]) -> Vec<FitResult> {
    let mut results: Vec<FitResult> = fleet
        .iter()
        .map(|vehicle| check_fit(cargo, vehicle))
        .collect();
    results.sort_by_key(|result| result.status);
    results
}

/// First vehicle that carries the cargo without blocking constraints.
pub fn best_fit(cargo: &CargoDimensions, fleet: &[FleetVehicleSpec]) -> Option<FitResult> {
    rank_fleet(cargo, fleet)
        .into_iter()
        .find(|result| result.status != FitStatus::NoFit)
}
