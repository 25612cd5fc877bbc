use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Guide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Guide => "GUIDE",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "CUSTOMER" => Ok(Role::Customer),
            "GUIDE" => Ok(Role::Guide),
            "ADMIN" => Ok(Role::Admin),
            other => Err(CoreError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// The verified caller, supplied by the identity provider on every call.
/// Services authorize purely on role plus ownership; there is no ambient
/// session state anywhere below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> CoreResult<()> {
        if self.role == role || self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Permission(format!(
                "requires {} role",
                role.as_str()
            )))
        }
    }

    pub fn require_admin(&self) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Permission("requires ADMIN role".into()))
        }
    }
}
