//! Identidad del llamador
//!
//! El llamador se resuelve una sola vez en el borde HTTP. El núcleo solo
//! consume `Identity` y nunca ramifica sobre strings de rol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Rol del llamador autenticado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Partner,
    Admin,
    Vendor,
    Agent,
    Corporate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Partner => "PARTNER",
            Role::Admin => "ADMIN",
            Role::Vendor => "VENDOR",
            Role::Agent => "AGENT",
            Role::Corporate => "CORPORATE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            // "RIDER" es el nombre legacy del rol partner
            "PARTNER" | "RIDER" => Ok(Role::Partner),
            "ADMIN" => Ok(Role::Admin),
            "VENDOR" => Ok(Role::Vendor),
            "AGENT" => Ok(Role::Agent),
            "CORPORATE" => Ok(Role::Corporate),
            other => Err(AppError::Unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

/// Llamador autenticado, ya autorizado para el endpoint invocado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    User(Uuid),
    Partner(Uuid),
    Admin(Uuid),
    Vendor(Uuid),
    Agent(Uuid),
    Corporate(Uuid),
}

impl Identity {
    pub fn new(role: Role, id: Uuid) -> Self {
        match role {
            Role::User => Identity::User(id),
            Role::Partner => Identity::Partner(id),
            Role::Admin => Identity::Admin(id),
            Role::Vendor => Identity::Vendor(id),
            Role::Agent => Identity::Agent(id),
            Role::Corporate => Identity::Corporate(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match *self {
            Identity::User(id)
            | Identity::Partner(id)
            | Identity::Admin(id)
            | Identity::Vendor(id)
            | Identity::Agent(id)
            | Identity::Corporate(id) => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::User(_) => Role::User,
            Identity::Partner(_) => Role::Partner,
            Identity::Admin(_) => Role::Admin,
            Identity::Vendor(_) => Role::Vendor,
            Identity::Agent(_) => Role::Agent,
            Identity::Corporate(_) => Role::Corporate,
        }
    }

    pub fn partner_id(&self) -> Option<Uuid> {
        match *self {
            Identity::Partner(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role(), self.id())
    }
}
