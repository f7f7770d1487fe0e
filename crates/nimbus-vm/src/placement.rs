//! Placement resolution: availability zone vs. availability set
//!
//! The control plane rejects VMs carrying both a zone and an availability
//! set, so an explicit zone always suppresses availability-set membership.

use crate::pool::ResourcePoolSpec;
use nimbus_cloud::AvailabilitySetRef;
use serde::{Deserialize, Serialize};

/// Availability zone identifier, declared as either a string or an integer.
/// Integers are normalized to their decimal string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneId {
    Number(u64),
    Name(String),
}

impl ZoneId {
    pub fn normalize(&self) -> String {
        match self {
            ZoneId::Number(n) => n.to_string(),
            ZoneId::Name(s) => s.clone(),
        }
    }
}

/// Resolved placement decision for one VM.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placement {
    pub zone: Option<String>,
    pub availability_set: Option<AvailabilitySetRef>,
}

/// Resolve the mutually exclusive placement for a resource pool.
pub fn resolve(pool: &ResourcePoolSpec) -> Placement {
    if let Some(zone) = &pool.availability_zone {
        Placement {
            zone: Some(zone.normalize()),
            availability_set: None,
        }
    } else {
        Placement {
            zone: None,
            availability_set: pool
                .availability_set
                .as_deref()
                .map(AvailabilitySetRef::from_name),
        }
    }
}
