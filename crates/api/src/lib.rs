//! HTTP API: routing, authentication and request/response mapping.

pub mod app;
pub mod middleware;
