//! Cloud client trait definitions

use crate::error::Result;
use crate::model::{
    ApplicationSecurityGroupRef, AvailabilitySetRef, InstanceId, NetworkInterfaceRef, NicSpec,
    PublicIpRef, PublicIpSpec, ResourceGroup, SecurityGroupRef, SubnetRef, VirtualMachine,
    VmCreateParams, VmssInstance,
};
use async_trait::async_trait;

/// Control-plane resource operations consumed by the orchestrator.
///
/// Implementations own transport, auth, retry-at-transport-level, and
/// poll-to-completion of asynchronous operations: every mutating call here
/// either completes, or fails with a typed error carrying the polled terminal
/// status ([`crate::CloudError::AsyncOperationFailed`]).
///
/// Expected "not found" lookups return `Ok(None)`; deletes are idempotent and
/// treat an already-absent resource as success.
#[async_trait]
pub trait CloudClient: Send + Sync {
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>>;

    /// Idempotent: a concurrent creator racing on the same name is tolerated.
    async fn create_resource_group(&self, name: &str, location: &str) -> Result<()>;

    async fn get_network_subnet_by_name(
        &self,
        resource_group: &str,
        virtual_network: &str,
        subnet: &str,
    ) -> Result<SubnetRef>;

    async fn get_network_security_group_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupRef>>;

    async fn get_application_security_group_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ApplicationSecurityGroupRef>>;

    async fn create_public_ip(&self, resource_group: &str, spec: &PublicIpSpec) -> Result<()>;

    async fn get_public_ip_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<PublicIpRef>>;

    async fn create_network_interface(
        &self,
        resource_group: &str,
        spec: &NicSpec,
    ) -> Result<NetworkInterfaceRef>;

    async fn delete_network_interface(&self, resource_group: &str, name: &str) -> Result<()>;

    /// Interfaces whose names begin with `<vm_name>-`, the naming scheme used
    /// for interfaces created on a VM's behalf.
    async fn list_network_interfaces_by_prefix(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<NetworkInterfaceRef>>;

    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        params: &VmCreateParams,
        interfaces: &[NetworkInterfaceRef],
        availability_set: Option<&AvailabilitySetRef>,
    ) -> Result<()>;

    async fn delete_virtual_machine(&self, resource_group: &str, name: &str) -> Result<()>;

    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>>;

    async fn get_vmss_instance(&self, id: &InstanceId) -> Result<Option<VmssInstance>>;

    async fn delete_vmss_instance(&self, id: &InstanceId) -> Result<()>;
}

/// Disk collaborator: derives disk resource names from the VM name and owns
/// best-effort disk/status-file deletion.
#[async_trait]
pub trait DiskManager: Send + Sync {
    fn generate_os_disk_name(&self, vm_name: &str) -> String;

    fn generate_ephemeral_disk_name(&self, vm_name: &str) -> String;

    /// Idempotent: deleting an absent disk is success.
    async fn delete_disk(&self, resource_group: &str, disk_name: &str) -> Result<()>;

    /// Removes boot-diagnostics and status side files left behind by a VM.
    async fn delete_vm_status_files(&self, resource_group: &str, vm_name: &str) -> Result<()>;
}
