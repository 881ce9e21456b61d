//! `shopfront-auth`: who is acting, and whether they may.
//!
//! Token issuance lives elsewhere; this crate only validates tokens and
//! answers ownership/role questions. It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, ensure_admin, ensure_owner, ensure_owner_or_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Actor;
pub use roles::Role;
pub use user::{ProfileUpdate, User};
