//! Monthly office-location rota: assigns each person a location for every
//! business day of a month, from preference shares, site capacities and
//! month-specific overrides.

pub mod demo_data;
pub mod display;
pub mod error;
pub mod logging;
pub mod roster;
pub mod schedule;
pub mod store;
pub mod textfile;
pub mod web;
