//! Ownership and role checks.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use thiserror::Error;

use shopfront_core::{DomainError, UserId};

use crate::Actor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("admin role required")]
    AdminRequired,

    #[error("resource belongs to another user")]
    NotOwner,
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::AccessDenied
    }
}

pub fn ensure_admin(actor: &Actor) -> Result<(), AuthzError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Strict ownership: admins are not exempt.
pub fn ensure_owner(actor: &Actor, owner: UserId) -> Result<(), AuthzError> {
    if actor.owns(owner) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

pub fn ensure_owner_or_admin(actor: &Actor, owner: UserId) -> Result<(), AuthzError> {
    if actor.is_admin() || actor.owns(owner) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
