//! Inventory guard.
//!
//! Enforces the stock invariants (`stock_count >= 0`,
//! `in_stock == (stock_count > 0)`) when items move between cart and order,
//! and keeps a reservation record per order line so a credit-back can happen
//! at most once. Pure domain logic: the caller persists the product and the
//! reservation.

pub mod guard;
pub mod reservation;

pub use guard::{release, reserve};
pub use reservation::Reservation;
