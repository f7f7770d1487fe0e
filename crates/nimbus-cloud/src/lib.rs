//! Nimbus cloud control-plane abstraction
//!
//! This crate defines the collaborator surface the Nimbus VM orchestrator
//! drives: the [`CloudClient`] resource CRUD trait, the [`DiskManager`] disk
//! collaborator, the typed resource model exchanged with them, and the error
//! taxonomy shared across the workspace.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            external orchestrator            │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │                 nimbus-vm                   │
//! │   resolvers · provisioning · compensation   │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │                nimbus-cloud                 │
//! │  trait CloudClient   ·   trait DiskManager  │
//! └───────────────────┬─────────────────────────┘
//!                     │
//!              cloud control plane
//! ```

pub mod client;
pub mod error;
pub mod model;

// Re-exports
pub use client::{CloudClient, DiskManager};
pub use error::{CloudError, Result};
pub use model::{
    ApplicationSecurityGroupRef, ApplicationGatewayRef, AvailabilitySetRef, DiskSpec, ImageReference,
    InstanceId, InstanceKind, LoadBalancerRef, NetworkInterfaceRef, NicSpec, OsProfile, OsType,
    ProvisioningState, PublicIpRef, PublicIpSpec, ResourceGroup, SecurityGroupRef, SubnetRef,
    VirtualMachine, VmCreateParams, VmImage, VmssInstance,
};
