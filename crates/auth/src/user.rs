use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// A provisioned user. Credentials live with the token issuer, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
    /// Disabled users keep their data but are refused at the API boundary.
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile edit; `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: Option<String>,
    #[serde(alias = "name")]
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
}

fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation("a valid email is required")),
    }
}

impl User {
    pub fn new(
        id: UserId,
        email: &str,
        display_name: Option<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            email: normalize_email(email)?,
            display_name,
            phone: None,
            address: None,
            avatar: None,
            role,
            enabled: true,
            created_at: now,
        })
    }

    /// Apply a profile edit. The email is checked before anything changes.
    pub fn apply_update(&mut self, update: ProfileUpdate) -> DomainResult<()> {
        let email = update.email.as_deref().map(normalize_email).transpose()?;

        if let Some(email) = email {
            self.email = email;
        }
        if let Some(name) = update.display_name {
            self.display_name = Some(name);
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(address) = update.address {
            self.address = Some(address);
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
