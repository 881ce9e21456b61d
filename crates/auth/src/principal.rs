use serde::{Deserialize, Serialize};

use shopfront_core::UserId;

use crate::Role;

/// The acting user of an operation.
///
/// Every workflow operation takes this explicitly; nothing reads an ambient
/// "current user".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}
