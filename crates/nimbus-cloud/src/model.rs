//! Resource model shared between the orchestrator and cloud clients
//!
//! These are the typed references and parameter blocks exchanged with the
//! control plane. All durable state lives remotely; every value here is owned
//! by a single orchestration call.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Discriminates a standalone VM from a scale-set-backed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    Vm,
    Vmss,
}

/// Opaque key identifying a provisioned VM.
///
/// Serialized form: `<resource-group>/<vm|vmss>/<name>`. The resource group
/// may differ from the client's default one. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceId {
    resource_group: String,
    kind: InstanceKind,
    name: String,
}

impl InstanceId {
    pub fn new(resource_group: impl Into<String>, kind: InstanceKind, name: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            kind,
            name: name.into(),
        }
    }

    /// Parse the serialized form. A two-segment form `<vm|vmss>/<name>`
    /// falls back to the given default resource group.
    pub fn parse(raw: &str, default_resource_group: &str) -> Result<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        let (resource_group, kind, name) = match segments.as_slice() {
            [rg, kind, name] => (rg.to_string(), *kind, *name),
            [kind, name] => (default_resource_group.to_string(), *kind, *name),
            _ => return Err(CloudError::InvalidInstanceId(raw.to_string())),
        };

        if resource_group.is_empty() || name.is_empty() {
            return Err(CloudError::InvalidInstanceId(raw.to_string()));
        }

        let kind = match kind {
            "vm" => InstanceKind::Vm,
            "vmss" => InstanceKind::Vmss,
            _ => return Err(CloudError::InvalidInstanceId(raw.to_string())),
        };

        Ok(Self {
            resource_group,
            kind,
            name: name.to_string(),
        })
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    pub fn kind(&self) -> InstanceKind {
        self.kind
    }

    /// The VM (or scale-set instance) name within its resource group.
    pub fn vm_name(&self) -> &str {
        &self.name
    }

    pub fn is_vmss(&self) -> bool {
        self.kind == InstanceKind::Vmss
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            InstanceKind::Vm => "vm",
            InstanceKind::Vmss => "vmss",
        };
        write!(f, "{}/{}/{}", self.resource_group, kind, self.name)
    }
}

/// Administrative container for a set of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    pub location: String,
}

macro_rules! resource_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub id: String,
            pub name: String,
        }

        impl $name {
            pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
                Self { id: id.into(), name: name.into() }
            }

            /// Reference by name only; the control plane resolves the id.
            pub fn from_name(name: impl Into<String>) -> Self {
                let name = name.into();
                Self { id: name.clone(), name }
            }
        }
    };
}

resource_ref!(
    /// Reference to a subnet within a virtual network.
    SubnetRef
);
resource_ref!(
    /// Reference to a network security group.
    SecurityGroupRef
);
resource_ref!(
    /// Reference to an application security group.
    ApplicationSecurityGroupRef
);
resource_ref!(
    /// Reference to a created network interface.
    NetworkInterfaceRef
);
resource_ref!(
    /// Back-reference to a load balancer pool.
    LoadBalancerRef
);
resource_ref!(
    /// Back-reference to an application gateway pool.
    ApplicationGatewayRef
);
resource_ref!(
    /// Reference to an availability set, passed through by name.
    AvailabilitySetRef
);

/// Reference to an allocated public IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpRef {
    pub id: String,
    pub name: String,
    pub ip_address: Option<String>,
}

impl PublicIpRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip_address: None,
        }
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Parameters for allocating a public IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicIpSpec {
    pub name: String,
    pub location: String,
    pub is_static: bool,
    pub idle_timeout_in_minutes: u32,
    pub zone: Option<String>,
    pub tags: HashMap<String, String>,
}

/// A fully resolved network interface, ready to be created.
///
/// Produced by the network resolver; one per declared attachment, in
/// declaration order. Only the primary interface carries the public IP and
/// the load-balancer/application-gateway back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicSpec {
    pub name: String,
    pub location: String,
    pub subnet: SubnetRef,
    pub private_ip: Option<String>,
    pub dns_servers: Vec<String>,
    pub security_group: Option<SecurityGroupRef>,
    pub application_security_groups: Vec<ApplicationSecurityGroupRef>,
    pub enable_ip_forwarding: bool,
    pub enable_accelerated_networking: bool,
    pub public_ip: Option<PublicIpRef>,
    pub load_balancer: Option<LoadBalancerRef>,
    pub application_gateway: Option<ApplicationGatewayRef>,
    pub tags: HashMap<String, String>,
}

/// Source image for the OS disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageReference {
    /// A managed image, addressed by its resource id.
    ManagedImage { id: String },
    /// A platform image, addressed by its marketplace tuple.
    PlatformImage {
        publisher: String,
        offer: String,
        sku: String,
        version: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Linux,
    Windows,
}

/// Image plus the OS flavor it boots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmImage {
    pub reference: ImageReference,
    pub os_type: OsType,
}

/// OS-specific credential block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsProfile {
    Linux {
        admin_username: String,
        ssh_public_key: String,
    },
    Windows {
        admin_username: String,
        admin_password: String,
        computer_name: String,
    },
}

/// Disk descriptor, consumed as an opaque value. Sizing is the disk
/// collaborator's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSpec {
    pub name: String,
    pub size_gb: Option<u32>,
}

impl DiskSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_gb: None,
        }
    }
}

/// Realized VM creation parameters.
///
/// `zone` and `availability_set` are mutually exclusive; the control plane
/// rejects VMs with both set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmCreateParams {
    pub name: String,
    pub location: String,
    pub vm_size: String,
    pub image: VmImage,
    pub os_profile: OsProfile,
    /// Base64-encoded JSON payload handed to the instance at boot.
    pub custom_data: String,
    pub os_disk: DiskSpec,
    pub ephemeral_disk: Option<DiskSpec>,
    pub zone: Option<String>,
    pub availability_set: Option<AvailabilitySetRef>,
    pub boot_diagnostics_storage_uri: Option<String>,
    pub tags: HashMap<String, String>,
}

/// Terminal and in-flight provisioning states reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Creating,
    Updating,
    Succeeded,
    Failed,
    Deleting,
    Other(String),
}

impl ProvisioningState {
    /// A VM mid-deletion must not be treated as a live instance.
    pub fn is_deleting(&self) -> bool {
        matches!(self, ProvisioningState::Deleting)
    }
}

impl From<&str> for ProvisioningState {
    fn from(raw: &str) -> Self {
        match raw {
            "Creating" => ProvisioningState::Creating,
            "Updating" => ProvisioningState::Updating,
            "Succeeded" => ProvisioningState::Succeeded,
            "Failed" => ProvisioningState::Failed,
            "Deleting" => ProvisioningState::Deleting,
            other => ProvisioningState::Other(other.to_string()),
        }
    }
}

/// A VM as seen by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub provisioning_state: ProvisioningState,
    pub network_interfaces: Vec<NetworkInterfaceRef>,
}

/// An instance inside a scale set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmssInstance {
    pub instance_id: String,
    pub name: String,
}
