//! Per-VM resource pool overrides

use crate::placement::ZoneId;
use serde::{Deserialize, Serialize};

/// Per-VM override bag supplied by the external orchestrator.
///
/// Optional fields override the corresponding per-attachment values when
/// present; see the network resolver for the exact precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoolSpec {
    /// Instance size, e.g. "Standard_D1".
    pub instance_type: String,

    /// Explicit availability zone. Mutually exclusive with
    /// `availability_set`; when set, availability-set assignment is
    /// suppressed.
    #[serde(default)]
    pub availability_zone: Option<ZoneId>,

    /// Availability-set name, used only when no zone is given.
    #[serde(default)]
    pub availability_set: Option<String>,

    #[serde(default)]
    pub ip_forwarding: Option<bool>,

    #[serde(default)]
    pub accelerated_networking: Option<bool>,

    /// Network security group name; wins over the attachment's.
    #[serde(default)]
    pub security_group: Option<String>,

    /// Application security group names; replaces the attachment's list
    /// wholesale when present, never merged.
    #[serde(default)]
    pub application_security_groups: Option<Vec<String>>,

    /// Allocate a public IP named after the VM and attach it to the primary
    /// interface. Ignored when a VIP attachment supplies one.
    #[serde(default)]
    pub assign_dynamic_public_ip: Option<bool>,

    #[serde(default)]
    pub boot_diagnostics: Option<bool>,

    /// Load-balancer backend pool the primary interface joins.
    #[serde(default)]
    pub load_balancer: Option<String>,

    /// Application-gateway backend pool the primary interface joins.
    #[serde(default)]
    pub application_gateway: Option<String>,
}

impl ResourcePoolSpec {
    pub fn new(instance_type: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            ..Default::default()
        }
    }
}
