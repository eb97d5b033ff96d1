//! Authorization for privileged market operations.

use std::collections::{HashMap, HashSet};
use std::fmt;

use openmarket_types::{OpenmarketError, Result, UserId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A privileged operation a caller may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    CreateMarket,
    ValidateMarket,
    ResolveMarket,
    InvalidateMarket,
    WithdrawFees,
}

impl Capability {
    pub const ALL: [Self; 5] = [
        Self::CreateMarket,
        Self::ValidateMarket,
        Self::ResolveMarket,
        Self::InvalidateMarket,
        Self::WithdrawFees,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateMarket => write!(f, "CREATE_MARKET"),
            Self::ValidateMarket => write!(f, "VALIDATE_MARKET"),
            Self::ResolveMarket => write!(f, "RESOLVE_MARKET"),
            Self::InvalidateMarket => write!(f, "INVALIDATE_MARKET"),
            Self::WithdrawFees => write!(f, "WITHDRAW_FEES"),
        }
    }
}

/// Answers whether a caller holds a capability.
pub trait Authorizer {
    fn has_capability(&self, caller: UserId, capability: Capability) -> bool;

    /// `Ok(())` if the caller holds `capability`, else `Unauthorized`.
    fn require(&self, caller: UserId, capability: Capability) -> Result<()> {
        if self.has_capability(caller, capability) {
            Ok(())
        } else {
            warn!(%caller, %capability, "unauthorized call rejected");
            Err(OpenmarketError::Unauthorized {
                caller,
                capability: capability.to_string(),
            })
        }
    }
}

/// Explicit per-user capability grants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRegistry {
    grants: HashMap<UserId, HashSet<Capability>>,
}

impl RoleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, user: UserId, capability: Capability) {
        self.grants.entry(user).or_default().insert(capability);
    }

    /// Grant every capability, e.g. to a deployment admin.
    pub fn grant_all(&mut self, user: UserId) {
        for capability in Capability::ALL {
            self.grant(user, capability);
        }
    }

    /// Returns `true` if the grant existed.
    pub fn revoke(&mut self, user: UserId, capability: Capability) -> bool {
        self.grants
            .get_mut(&user)
            .is_some_and(|caps| caps.remove(&capability))
    }
}

impl Authorizer for RoleRegistry {
    fn has_capability(&self, caller: UserId, capability: Capability) -> bool {
        self.grants
            .get(&caller)
            .is_some_and(|caps| caps.contains(&capability))
    }
}
