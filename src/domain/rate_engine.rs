//! Tariff pricing: transportation charges, fuel surcharge, accessorials, discount.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    catalog::AccessorialCatalog,
    entities::{AccessorialDefinition, AccessorialPricing, AccessorialSelection, TariffCard},
    money::{format_money, format_quantity, round2},
    quote::QuoteRequest,
};

/// Minutes per billable wait-time block.
pub const WAIT_BLOCK_MINUTES: u32 = 15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargeLine {
    pub label: String,
    pub detail: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessorialLine {
    pub key: String,
    pub label: String,
    pub detail: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub pct: f64,
    pub amount: f64,
    pub discounted_total: f64,
}

/// Itemized quote. Every amount is already rounded to cents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub base_charge: f64,
    pub per_mile_rate: f64,
    pub per_weight_unit_rate: f64,
    pub billable_distance: f64,
    pub excess_distance_charge: f64,
    pub deadhead_distance: f64,
    pub deadhead_charge: f64,
    pub billable_weight: f64,
    pub weight_surcharge: f64,
    pub transportation_subtotal: f64,
    pub fuel_surcharge_pct: f64,
    pub fuel_surcharge: f64,
    pub accessorials: Vec<AccessorialLine>,
    pub accessorial_subtotal: f64,
    pub total: f64,
    /// Carried from the tariff for display; not applied to the total.
    pub minimum_charge: f64,
    pub discount: Option<Discount>,
}

impl QuoteResult {
    /// Transportation lines that are actually billed. Excess mileage,
    /// deadhead or weight lines that round to $0.00 are left out.
    pub fn charge_lines(&self) -> Vec<ChargeLine> {
        let mut lines = vec![ChargeLine {
            label: "Base Rate".to_string(),
            detail: "includes bundled miles".to_string(),
            amount: self.base_charge,
        }];

        if self.excess_distance_charge > 0.0 {
            lines.push(ChargeLine {
                label: "Excess Mileage".to_string(),
                detail: format!(
                    "{} mi × {}/mi",
                    format_quantity(self.billable_distance),
                    format_money(self.per_mile_rate)
                ),
                amount: self.excess_distance_charge,
            });
        }
        if self.deadhead_charge > 0.0 {
            lines.push(ChargeLine {
                label: "Deadhead".to_string(),
                detail: format!(
                    "{} mi × {}/mi",
                    format_quantity(self.deadhead_distance),
                    format_money(self.per_mile_rate)
                ),
                amount: self.deadhead_charge,
            });
        }
        if self.weight_surcharge > 0.0 {
            lines.push(ChargeLine {
                label: "Weight Surcharge".to_string(),
                detail: format!(
                    "{} lb × {}/lb",
                    format_quantity(self.billable_weight),
                    format_money(self.per_weight_unit_rate)
                ),
                amount: self.weight_surcharge,
            });
        }

        lines
    }

    /// Amount due: the discounted total in win-client mode, the total otherwise.
    pub fn amount_due(&self) -> f64 {
        self.discount
            .as_ref()
            .map(|discount| discount.discounted_total)
            .unwrap_or(self.total)
    }
}

/// Prices one request against a resolved tariff card.
///
/// The request is expected to be sanitized (see [`QuoteRequest::sanitized`]);
/// the engine performs no validation of its own. Subtotals and totals are
/// summed from the rounded components so the printed lines add up to the cent.
pub fn compute_quote(
    tariff: &TariffCard,
    request: &QuoteRequest,
    catalog: &AccessorialCatalog,
) -> QuoteResult {
    let billable_distance = (request.distance_miles - tariff.included_distance).max(0.0);
    let excess_distance_charge = round2(billable_distance * tariff.per_mile_rate);

    // Deadhead has no bundled miles.
    let deadhead_distance = request.deadhead_miles;
    let deadhead_charge = round2(deadhead_distance * tariff.per_mile_rate);

    let billable_weight = (request.weight_lb - tariff.weight_threshold).max(0.0);
    let weight_surcharge = round2(billable_weight * tariff.per_weight_unit_rate);

    let base_charge = round2(tariff.base_rate);
    let transportation_subtotal =
        round2(base_charge + excess_distance_charge + deadhead_charge + weight_surcharge);
    let fuel_surcharge = round2(transportation_subtotal * tariff.fuel_surcharge_pct / 100.0);

    let accessorials = price_accessorials(tariff, &request.accessorials, catalog);
    let accessorial_subtotal = round2(accessorials.iter().map(|line| line.amount).sum());

    let total = round2(transportation_subtotal + fuel_surcharge + accessorial_subtotal);
    let discount = request.discount_pct.map(|pct| apply_discount(total, pct));

    QuoteResult {
        base_charge,
        per_mile_rate: tariff.per_mile_rate,
        per_weight_unit_rate: tariff.per_weight_unit_rate,
        billable_distance,
        excess_distance_charge,
        deadhead_distance,
        deadhead_charge,
        billable_weight,
        weight_surcharge,
        transportation_subtotal,
        fuel_surcharge_pct: tariff.fuel_surcharge_pct,
        fuel_surcharge,
        accessorials,
        accessorial_subtotal,
        total,
        minimum_charge: round2(tariff.minimum_charge),
        discount,
    }
}

/// Win-client discount. Amount and discounted total always sum back to `total`.
pub fn apply_discount(total: f64, pct: f64) -> Discount {
    let amount = round2(total * pct / 100.0);
    Discount {
        pct,
        amount,
        discounted_total: round2(total - amount),
    }
}

/// Billable wait blocks for a number of elapsed 15-minute blocks; the first is free.
pub fn billable_wait_blocks(elapsed_blocks: u32) -> u32 {
    elapsed_blocks.saturating_sub(1)
}

fn price_accessorials(
    tariff: &TariffCard,
    selections: &[AccessorialSelection],
    catalog: &AccessorialCatalog,
) -> Vec<AccessorialLine> {
    let mut enabled: HashMap<&str, &AccessorialSelection> = HashMap::new();
    for selection in selections.iter().filter(|selection| selection.enabled) {
        if enabled.insert(selection.key.as_str(), selection).is_some() {
            tracing::debug!(key = %selection.key, "repeated accessorial selection; the last one is billed");
        }
    }

    for key in enabled.keys() {
        if catalog.get(key).is_none() {
            tracing::debug!(key = %key, "ignoring selection for unknown accessorial");
        }
    }

    let mut lines = Vec::new();
    let mut wait_lines = Vec::new();

    for definition in catalog.iter() {
        let Some(selection) = enabled.get(definition.key.as_str()) else {
            continue;
        };
        let Some(line) = price_accessorial(tariff, definition, selection) else {
            continue;
        };
        if definition.pricing == AccessorialPricing::WaitTime {
            wait_lines.push(line);
        } else {
            lines.push(line);
        }
    }

    lines.extend(wait_lines);
    lines
}

fn price_accessorial(
    tariff: &TariffCard,
    definition: &AccessorialDefinition,
    selection: &AccessorialSelection,
) -> Option<AccessorialLine> {
    let (detail, amount) = match &definition.pricing {
        AccessorialPricing::Flat => ("flat".to_string(), definition.flat_amount),
        AccessorialPricing::Attempt => ("billed at base rate".to_string(), tariff.base_rate),
        AccessorialPricing::PerUnit { unit } => {
            let count = selection.count.unwrap_or(1).max(1);
            let unit = if count == 1 {
                unit.clone()
            } else {
                format!("{unit}s")
            };
            (
                format!("{count} {unit} × {}", format_money(definition.flat_amount)),
                definition.flat_amount * count as f64,
            )
        }
        AccessorialPricing::WaitTime => {
            let blocks = selection.count.unwrap_or(0);
            if blocks == 0 {
                return None;
            }
            (
                format!(
                    "{blocks} × {WAIT_BLOCK_MINUTES} min × {} (first {WAIT_BLOCK_MINUTES} min free)",
                    format_money(definition.flat_amount)
                ),
                definition.flat_amount * blocks as f64,
            )
        }
    };

    Some(AccessorialLine {
        key: definition.key.clone(),
        label: definition.label.clone(),
        detail,
        amount: round2(amount),
    })
}
