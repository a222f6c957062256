//! Participant roles

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Roles that can be registered on the ledger. Each one owns an
/// `is*Registered` predicate and a `total*` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegistryRole {
    Producer,
    QualityInspector,
    Distributor,
    Retailer,
}

impl RegistryRole {
    pub const ALL: [RegistryRole; 4] = [
        RegistryRole::Producer,
        RegistryRole::QualityInspector,
        RegistryRole::Distributor,
        RegistryRole::Retailer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RegistryRole::Producer => "Producer",
            RegistryRole::QualityInspector => "Quality Inspector",
            RegistryRole::Distributor => "Distributor",
            RegistryRole::Retailer => "Retailer",
        }
    }

    /// Short noun used in form field names and status text
    pub fn noun(self) -> &'static str {
        match self {
            RegistryRole::Producer => "producer",
            RegistryRole::QualityInspector => "inspector",
            RegistryRole::Distributor => "distributor",
            RegistryRole::Retailer => "retailer",
        }
    }
}

impl fmt::Display for RegistryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RegistryRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "producer" | "farmer" => Ok(RegistryRole::Producer),
            "quality_inspector" | "inspector" | "qi" => Ok(RegistryRole::QualityInspector),
            "distributor" => Ok(RegistryRole::Distributor),
            "retailer" => Ok(RegistryRole::Retailer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The single classification assigned to an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticipantRole {
    Producer,
    QualityInspector,
    Distributor,
    Retailer,
    /// Not registered, not the connected account
    Participant,
    /// Not registered, but the connected account itself
    SelfAccount,
}

impl From<RegistryRole> for ParticipantRole {
    fn from(role: RegistryRole) -> Self {
        match role {
            RegistryRole::Producer => ParticipantRole::Producer,
            RegistryRole::QualityInspector => ParticipantRole::QualityInspector,
            RegistryRole::Distributor => ParticipantRole::Distributor,
            RegistryRole::Retailer => ParticipantRole::Retailer,
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParticipantRole::Producer => "Producer",
            ParticipantRole::QualityInspector => "Quality Inspector",
            ParticipantRole::Distributor => "Distributor",
            ParticipantRole::Retailer => "Retailer",
            ParticipantRole::Participant => "Participant",
            ParticipantRole::SelfAccount => "You",
        };
        f.write_str(label)
    }
}
