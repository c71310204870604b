//! Request-scoped security context.
//!
//! A `SecurityContext` is created per request by the access middleware and carried in
//! that request's extensions. It is dropped together with the request, so nothing
//! bound here can be observed by another request.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::repos::identity::Identity;

/// Identity resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl From<Identity> for Principal {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username,
            roles: identity.roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("security context is already bound")]
pub struct AlreadyBound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing role {0}")]
    MissingRole(&'static str),
}

/// Holds at most one principal. `None` means anonymous.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Bind the request's principal. A context is bound at most once.
    pub fn bind(&mut self, principal: Principal) -> Result<(), AlreadyBound> {
        if self.principal.is_some() {
            return Err(AlreadyBound);
        }
        self.principal = Some(principal);
        Ok(())
    }

    pub fn current(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn require_role(&self, role: &'static str) -> Result<&Principal, AccessDenied> {
        let principal = self.current().ok_or(AccessDenied::Unauthenticated)?;
        if principal.has_role(role) {
            Ok(principal)
        } else {
            Err(AccessDenied::MissingRole(role))
        }
    }
}
