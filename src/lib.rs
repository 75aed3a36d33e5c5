//! Quote desk for courier and freight dispatch.
//!
//! The pricing core ([`domain::compute_quote`]) and the cargo fit checker
//! ([`domain::check_fit`]) are pure functions over injected reference data.
//! Tariff resolution, the hosted rate table client, formatting and quote
//! history sit around them.

pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
