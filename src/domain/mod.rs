//! Quote pricing and cargo fit live here. Everything in this module is pure
//! apart from tariff resolution, which talks to a [`TariffStore`].

pub mod cargo_fit;
pub mod catalog;
pub mod entities;
pub mod money;
pub mod quote;
pub mod rate_engine;
pub mod tariff;

pub use cargo_fit::{best_fit, check_fit, rank_fleet, FitResult, FitStatus, TIGHT_FIT_RATIO};
pub use catalog::{AccessorialCatalog, FleetCatalog};
pub use entities::{
    AccessorialDefinition, AccessorialPricing, AccessorialSelection, CargoDimensions,
    FleetVehicleSpec, ServiceType, TariffCard, TariffKey, TariffRow, VehicleType,
};
pub use money::{format_money, round2};
pub use quote::{DiscountPolicy, QuoteRequest};
pub use rate_engine::{
    apply_discount, billable_wait_blocks, compute_quote, AccessorialLine, ChargeLine, Discount,
    QuoteResult, WAIT_BLOCK_MINUTES,
};
pub use tariff::{
    MemoryTariffStore, NoStore, OverrideTable, TariffError, TariffResolver, TariffSource,
    TariffStore,
};
