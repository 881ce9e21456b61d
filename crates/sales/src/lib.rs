//! Sales domain module: cart, wishlist, orders and mock payments.
//!
//! This crate contains business rules for the purchase flow, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;
pub mod events;
pub mod order;
pub mod payment;
pub mod wishlist;

pub use cart::Cart;
pub use events::OrderEvent;
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus, line_total, max_order_total, sum_amounts};
pub use payment::{Payment, PaymentIntent, PaymentMethod};
pub use wishlist::Wishlist;
