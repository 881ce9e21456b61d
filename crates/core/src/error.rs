//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts, access). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Attempted to place an order from a cart without items.
    #[error("cart is empty")]
    EmptyCart,

    /// Not enough stock left to satisfy the requested quantity.
    #[error("insufficient stock for {product}")]
    InsufficientStock { product: String },

    /// Product is flagged as not orderable.
    #[error("product {product} is not available")]
    Unavailable { product: String },

    /// The acting user may not touch this resource.
    #[error("access denied")]
    AccessDenied,

    /// Illegal state change on an order.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Payment was already completed for the order.
    #[error("order already paid")]
    AlreadyPaid,

    /// A stock reservation was already credited back.
    #[error("reservation already released")]
    AlreadyReleased,

    /// Uniqueness conflict (duplicate name, duplicate entry, in-use reference).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn insufficient_stock(product: impl Into<String>) -> Self {
        Self::InsufficientStock {
            product: product.into(),
        }
    }

    pub fn unavailable(product: impl Into<String>) -> Self {
        Self::Unavailable {
            product: product.into(),
        }
    }

    pub fn invalid_transition(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
