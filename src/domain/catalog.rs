//! Reference data injected into the rate engine and the fit checker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{normalize_hub, AccessorialDefinition, FleetVehicleSpec};

/// Accessorial definitions in declaration order. Line items follow this order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessorialCatalog {
    definitions: Vec<AccessorialDefinition>,
}

impl AccessorialCatalog {
    pub fn new(definitions: Vec<AccessorialDefinition>) -> Self {
        Self { definitions }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn get(&self, key: &str) -> Option<&AccessorialDefinition> {
        self.definitions.iter().find(|def| def.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessorialDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Fleet specs per hub, each list in the hub's preferred dispatch order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FleetCatalog {
    hubs: BTreeMap<String, Vec<FleetVehicleSpec>>,
}

impl FleetCatalog {
    pub fn new(hubs: BTreeMap<String, Vec<FleetVehicleSpec>>) -> Self {
        let hubs = hubs
            .into_iter()
            .map(|(hub, fleet)| (normalize_hub(&hub), fleet))
            .collect();
        Self { hubs }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let hubs: BTreeMap<String, Vec<FleetVehicleSpec>> = serde_json::from_str(raw)?;
        Ok(Self::new(hubs))
    }

    /// Unknown hubs have an empty fleet.
    pub fn for_hub(&self, hub: &str) -> &[FleetVehicleSpec] {
        self.hubs
            .get(&normalize_hub(hub))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn hubs(&self) -> impl Iterator<Item = &str> {
        self.hubs.keys().map(String::as_str)
    }
}
