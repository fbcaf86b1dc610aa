use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Authorization - caller identity and the access oracle
// ============================================================================
//
// The decision itself is external. The service only asks
// "may user U perform action A at level L for business B" and treats an
// oracle failure as an internal error, never as a grant or a denial.
//
// ============================================================================

/// Verified caller identity, passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    /// Businesses the caller is a member of, when the token carries them.
    /// `None` leaves the decision entirely to the oracle.
    pub business_memberships: Option<Vec<Uuid>>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            business_memberships: None,
        }
    }

    pub fn with_memberships(mut self, businesses: Vec<Uuid>) -> Self {
        self.business_memberships = Some(businesses);
        self
    }

    /// False only when memberships are known and exclude `business_id`.
    pub fn may_act_for(&self, business_id: Uuid) -> bool {
        self.business_memberships
            .as_ref()
            .map_or(true, |memberships| memberships.contains(&business_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Orders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Read,
    Write,
}

#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    async fn has_access(
        &self,
        action: Action,
        level: AccessLevel,
        business_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool>;
}

/// Fixed grant table. A Write grant implies Read.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessPolicy {
    grants: HashMap<(Uuid, Uuid, Action), AccessLevel>,
}

impl StaticAccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, user_id: Uuid, business_id: Uuid, action: Action, level: AccessLevel) -> Self {
        self.grants.insert((user_id, business_id, action), level);
        self
    }
}

#[async_trait]
impl AuthorizationOracle for StaticAccessPolicy {
    async fn has_access(
        &self,
        action: Action,
        level: AccessLevel,
        business_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        Ok(self
            .grants
            .get(&(user_id, business_id, action))
            .is_some_and(|granted| *granted >= level))
    }
}
