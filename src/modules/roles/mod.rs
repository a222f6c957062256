//! Role resolution
//!
//! Classifies an address by probing the registry predicates in a fixed
//! priority order: producer, quality inspector, distributor, retailer.
//! The first positive answer wins.

use alloy::primitives::Address;

use crate::domain::{ParticipantRole, RegistryRole};
use crate::infrastructure::ethereum::ContractGateway;

/// Predicate priority order
pub const RESOLUTION_ORDER: [RegistryRole; 4] = RegistryRole::ALL;

#[derive(Debug, Clone)]
pub struct RoleResolver {
    gateway: ContractGateway,
}

impl RoleResolver {
    pub fn new(gateway: ContractGateway) -> Self {
        Self { gateway }
    }

    /// Classify `address`. A failing predicate counts as "not registered"
    /// for that role and resolution continues with the next one.
    pub async fn resolve(&self, address: Address, current: Option<Address>) -> ParticipantRole {
        for role in RESOLUTION_ORDER {
            match self.gateway.is_registered(role, address).await {
                Ok(true) => return role.into(),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        %address,
                        role = %role,
                        error = %format!("{err:#}"),
                        "role predicate failed"
                    );
                }
            }
        }

        if current == Some(address) {
            ParticipantRole::SelfAccount
        } else {
            ParticipantRole::Participant
        }
    }
}
