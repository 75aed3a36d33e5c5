//! The complete, immutable argument set for one quote calculation.

use serde::{Deserialize, Serialize};

use super::entities::{
    AccessorialSelection, CargoDimensions, ServiceType, TariffKey, VehicleType,
};

/// Allowed range for the win-client discount, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountPolicy {
    pub min_pct: f64,
    pub max_pct: f64,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            min_pct: 20.0,
            max_pct: 40.0,
        }
    }
}

impl DiscountPolicy {
    /// Clamps a requested percentage into the policy range. Non-finite input drops the discount.
    pub fn clamp(&self, pct: f64) -> Option<f64> {
        if !pct.is_finite() {
            return None;
        }
        let bound = |value: f64| {
            if value.is_finite() {
                value.clamp(0.0, 100.0)
            } else {
                0.0
            }
        };
        let (a, b) = (bound(self.min_pct), bound(self.max_pct));
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Some(pct.clamp(low, high))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub hub: String,
    #[serde(default)]
    pub service_type: ServiceType,
    pub vehicle_type: VehicleType,
    pub distance_miles: f64,
    #[serde(default)]
    pub deadhead_miles: f64,
    #[serde(default)]
    pub weight_lb: f64,
    #[serde(default)]
    pub cargo: Option<CargoDimensions>,
    #[serde(default)]
    pub accessorials: Vec<AccessorialSelection>,
    #[serde(default)]
    pub discount_pct: Option<f64>,
}

impl QuoteRequest {
    pub fn new(hub: &str, vehicle_type: VehicleType, distance_miles: f64, weight_lb: f64) -> Self {
        Self {
            hub: hub.to_string(),
            service_type: ServiceType::default(),
            vehicle_type,
            distance_miles,
            deadhead_miles: 0.0,
            weight_lb,
            cargo: None,
            accessorials: Vec::new(),
            discount_pct: None,
        }
    }

    pub fn with_service(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    pub fn with_deadhead(mut self, deadhead_miles: f64) -> Self {
        self.deadhead_miles = deadhead_miles;
        self
    }

    pub fn with_cargo(mut self, cargo: CargoDimensions) -> Self {
        self.cargo = Some(cargo);
        self
    }

    pub fn with_accessorial(mut self, selection: AccessorialSelection) -> Self {
        self.accessorials.push(selection);
        self
    }

    pub fn with_discount(mut self, pct: f64) -> Self {
        self.discount_pct = Some(pct);
        self
    }

    pub fn tariff_key(&self) -> TariffKey {
        TariffKey::new(&self.hub, self.service_type, self.vehicle_type)
    }

    /// Clamps raw input at the boundary: distances and weight to >= 0, the
    /// discount into `policy`. The rate engine expects requests in this form.
    pub fn sanitized(mut self, policy: &DiscountPolicy) -> Self {
        self.distance_miles = non_negative(self.distance_miles);
        self.deadhead_miles = non_negative(self.deadhead_miles);
        self.weight_lb = non_negative(self.weight_lb);
        self.discount_pct = self.discount_pct.and_then(|pct| policy.clamp(pct));
        if let Some(cargo) = self.cargo.as_mut() {
            for value in [
                &mut cargo.length_in,
                &mut cargo.width_in,
                &mut cargo.height_in,
                &mut cargo.weight_lb,
            ] {
                *value = value.filter(|v| v.is_finite() && *v > 0.0);
            }
        }
        self
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_negative_input() {
        let request = QuoteRequest::new("atl", VehicleType::CargoVan, -5.0, f64::NAN)
            .with_deadhead(-1.0)
            .sanitized(&DiscountPolicy::default());

        assert_eq!(request.distance_miles, 0.0);
        assert_eq!(request.deadhead_miles, 0.0);
        assert_eq!(request.weight_lb, 0.0);
    }

    #[test]
    fn discount_is_clamped_into_policy_range() {
        let policy = DiscountPolicy::default();
        assert_eq!(policy.clamp(5.0), Some(20.0));
        assert_eq!(policy.clamp(25.0), Some(25.0));
        assert_eq!(policy.clamp(75.0), Some(40.0));
        assert_eq!(policy.clamp(f64::INFINITY), None);

        let request = QuoteRequest::new("ATL", VehicleType::Car, 10.0, 10.0)
            .with_discount(50.0)
            .sanitized(&policy);
        assert_eq!(request.discount_pct, Some(40.0));
    }

    #[test]
    fn unset_cargo_dimensions_are_dropped() {
        let request = QuoteRequest::new("ATL", VehicleType::Car, 10.0, 10.0)
            .with_cargo(CargoDimensions {
                length_in: Some(-3.0),
                width_in: Some(0.0),
                height_in: Some(12.0),
                weight_lb: None,
            })
            .sanitized(&DiscountPolicy::default());

        let cargo = request.cargo.unwrap();
        assert_eq!(cargo.length_in, None);
        assert_eq!(cargo.width_in, None);
        assert_eq!(cargo.height_in, Some(12.0));
    }

    #[test]
    fn tariff_key_normalizes_hub() {
        let request = QuoteRequest::new(" dfw ", VehicleType::BoxTruck, 1.0, 1.0);
        assert_eq!(request.tariff_key().hub, "DFW");
    }
}
