//! Nimbus VM provisioning orchestrator
//!
//! Provisions and tears down VM compute resources — network interfaces,
//! public IPs, security-group attachments, and the VM itself — on a cloud
//! control plane, on behalf of an external fleet orchestrator. Creating a VM
//! requires several dependent resources in a specific order, any of which
//! can fail asynchronously; a failure partway through must leave no orphaned
//! resources behind.
//!
//! The cloud itself is reached through the [`nimbus_cloud::CloudClient`] and
//! [`nimbus_cloud::DiskManager`] collaborator traits, so the pipeline's
//! ordering and compensation logic are testable without a control plane.

pub mod identity;
pub mod network;
pub mod placement;
pub mod pool;
pub mod provision;
pub mod scale_set;

// Re-exports
pub use identity::{IdentityProvider, RandomIdentity};
pub use network::{
    AttachmentCommon, AttachmentConfig, AttachmentKind, DynamicAttachment, ManualAttachment,
    NetworkAttachment, NetworkResolver, VipAttachment,
};
pub use placement::{Placement, ZoneId};
pub use pool::ResourcePoolSpec;
pub use provision::VmProvisioner;
pub use scale_set::ScaleSetManager;
