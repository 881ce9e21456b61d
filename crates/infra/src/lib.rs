//! Infrastructure layer: persistence, workflow services, cache, config and
//! notification wiring.

pub mod cache;
pub mod config;
pub mod notify;
pub mod services;
pub mod store;
pub mod views;

#[cfg(test)]
mod integration_tests;

#[cfg(test)]
mod test_support;
