//! VM provisioning orchestrator
//!
//! Drives the ordered creation sequence — resource group, public IP, network
//! interfaces, VM — and the compensating teardown when a step fails partway.
//! Each call owns its own working set; no state survives between calls.

use crate::identity::IdentityProvider;
use crate::network::{self, NetworkAttachment, NetworkResolver};
use crate::placement::{self, Placement};
use crate::pool::ResourcePoolSpec;
use base64::Engine;
use chrono::Utc;
use nimbus_cloud::{
    CloudClient, CloudError, DiskManager, DiskSpec, InstanceId, NetworkInterfaceRef, OsProfile,
    OsType, PublicIpSpec, Result, VmCreateParams, VmImage,
};
use nimbus_config::Settings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates VM create/delete/exists against a cloud control plane.
///
/// Calls are synchronous from the caller's perspective and intentionally
/// serial: later steps depend on earlier steps' outputs. Concurrent calls
/// for the same instance id must be serialized by the caller.
pub struct VmProvisioner {
    client: Arc<dyn CloudClient>,
    disk_manager: Arc<dyn DiskManager>,
    identity: Arc<dyn IdentityProvider>,
    settings: Settings,
}

impl VmProvisioner {
    pub fn new(
        client: Arc<dyn CloudClient>,
        disk_manager: Arc<dyn DiskManager>,
        identity: Arc<dyn IdentityProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            client,
            disk_manager,
            identity,
            settings,
        }
    }

    /// Provision a VM and its dependent resources.
    ///
    /// Returns the realized creation parameters on success. Resolution
    /// failures are returned immediately — nothing has been created yet.
    /// A transient asynchronous failure at the VM-create step is retried
    /// exactly once; a terminal failure triggers compensation and surfaces
    /// as [`CloudError::ProvisioningFailed`] with the original error as its
    /// source.
    pub async fn create(
        &self,
        id: &InstanceId,
        location: &str,
        image: &VmImage,
        pool: &ResourcePoolSpec,
        attachments: &[NetworkAttachment],
        env: &serde_json::Value,
    ) -> Result<VmCreateParams> {
        let resource_group = id.resource_group();
        let vm_name = id.vm_name();

        if pool.instance_type.is_empty() {
            return Err(CloudError::Configuration(
                "instance_type required in resource pool".to_string(),
            ));
        }

        info!("Creating VM '{vm_name}' in resource group '{resource_group}'");

        if self.client.get_resource_group(resource_group).await?.is_none() {
            info!("Resource group '{resource_group}' not found, creating it in '{location}'");
            self.client
                .create_resource_group(resource_group, location)
                .await?;
        }

        let placement = placement::resolve(pool);
        let tags = self.resource_tags();
        let resolver = NetworkResolver::new(self.client.as_ref(), &self.settings);
        let mut nics = resolver
            .resolve(vm_name, location, attachments, pool, &tags)
            .await?;

        if let Some(public_ip) = self
            .obtain_public_ip(id, location, pool, attachments, &placement, &tags)
            .await?
        {
            // Only the primary interface carries the public IP.
            nics[0].public_ip = Some(public_ip);
        }

        let mut created: Vec<NetworkInterfaceRef> = Vec::with_capacity(nics.len());
        for spec in &nics {
            match self.client.create_network_interface(resource_group, spec).await {
                Ok(nic) => {
                    debug!("Created network interface '{}'", nic.name);
                    created.push(nic);
                }
                Err(err) => {
                    warn!(
                        "Creating network interface '{}' failed, removing the {} interface(s) created before it",
                        spec.name,
                        created.len()
                    );
                    self.delete_interfaces(resource_group, &created).await;
                    return Err(err);
                }
            }
        }

        let params =
            self.build_vm_params(id, location, image, pool, attachments, &placement, &tags, env)?;
        let availability_set = placement.availability_set.as_ref();
        match self
            .client
            .create_virtual_machine(resource_group, &params, &created, availability_set)
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_transient_async_failure() => {
                warn!("VM '{vm_name}' create reported a failed asynchronous operation, retrying once: {err}");
                if let Err(retry_err) = self
                    .client
                    .create_virtual_machine(resource_group, &params, &created, availability_set)
                    .await
                {
                    self.compensate_failed_create(resource_group, vm_name).await;
                    return Err(CloudError::ProvisioningFailed {
                        vm_name: vm_name.to_string(),
                        source: Box::new(retry_err),
                    });
                }
            }
            Err(err) => {
                self.compensate_failed_create(resource_group, vm_name).await;
                return Err(CloudError::ProvisioningFailed {
                    vm_name: vm_name.to_string(),
                    source: Box::new(err),
                });
            }
        }

        info!("VM '{vm_name}' created");
        Ok(params)
    }

    /// Tear down a VM and its dependent resources. Every step treats an
    /// already-absent resource as success.
    pub async fn delete(&self, id: &InstanceId) -> Result<()> {
        let resource_group = id.resource_group();
        let vm_name = id.vm_name();

        info!("Deleting VM '{vm_name}' in resource group '{resource_group}'");

        if let Some(vm) = self.client.get_virtual_machine(resource_group, vm_name).await? {
            self.client.delete_virtual_machine(resource_group, vm_name).await?;
            for nic in &vm.network_interfaces {
                self.client
                    .delete_network_interface(resource_group, &nic.name)
                    .await?;
            }
        } else {
            // Interfaces can outlive the VM: a failed create keeps them for
            // reuse, so teardown must find them by name, not through the VM.
            debug!("VM '{vm_name}' not found, removing any interfaces left behind by a failed create");
            for nic in self
                .client
                .list_network_interfaces_by_prefix(resource_group, vm_name)
                .await?
            {
                self.client
                    .delete_network_interface(resource_group, &nic.name)
                    .await?;
            }
        }

        let os_disk = self.disk_manager.generate_os_disk_name(vm_name);
        self.disk_manager.delete_disk(resource_group, &os_disk).await?;
        let ephemeral_disk = self.disk_manager.generate_ephemeral_disk_name(vm_name);
        self.disk_manager
            .delete_disk(resource_group, &ephemeral_disk)
            .await?;
        self.disk_manager
            .delete_vm_status_files(resource_group, vm_name)
            .await?;

        Ok(())
    }

    /// Whether the instance exists as a live, attachable VM. A VM whose
    /// provisioning state is `Deleting` is reported as absent.
    pub async fn exists(&self, id: &InstanceId) -> Result<bool> {
        match self
            .client
            .get_virtual_machine(id.resource_group(), id.vm_name())
            .await?
        {
            Some(vm) => Ok(!vm.provisioning_state.is_deleting()),
            None => Ok(false),
        }
    }

    /// Public IP for the primary interface: a pre-allocated VIP when one is
    /// declared, else a freshly allocated IP when the pool asks for one.
    async fn obtain_public_ip(
        &self,
        id: &InstanceId,
        location: &str,
        pool: &ResourcePoolSpec,
        attachments: &[NetworkAttachment],
        placement: &Placement,
        tags: &HashMap<String, String>,
    ) -> Result<Option<nimbus_cloud::PublicIpRef>> {
        if let Some(vip) = network::find_vip(attachments) {
            let group = vip
                .common
                .resource_group
                .as_deref()
                .unwrap_or(&self.settings.default_resource_group);
            let found = self
                .client
                .get_public_ip_by_name(group, &vip.public_ip)
                .await?
                .ok_or_else(|| {
                    CloudError::Configuration(format!(
                        "cannot find public IP '{}' in resource group '{group}'",
                        vip.public_ip
                    ))
                })?;
            return Ok(Some(found));
        }

        if !pool.assign_dynamic_public_ip.unwrap_or(false) {
            return Ok(None);
        }

        let resource_group = id.resource_group();
        let vm_name = id.vm_name();
        let spec = PublicIpSpec {
            name: vm_name.to_string(),
            location: location.to_string(),
            is_static: false,
            idle_timeout_in_minutes: self.settings.pip_idle_timeout(),
            zone: placement.zone.clone(),
            tags: tags.clone(),
        };
        info!("Allocating dynamic public IP '{vm_name}'");
        self.client.create_public_ip(resource_group, &spec).await?;
        let created = self
            .client
            .get_public_ip_by_name(resource_group, vm_name)
            .await?
            .ok_or_else(|| {
                CloudError::Api(format!("public IP '{vm_name}' not found after creation"))
            })?;
        Ok(Some(created))
    }

    fn build_vm_params(
        &self,
        id: &InstanceId,
        location: &str,
        image: &VmImage,
        pool: &ResourcePoolSpec,
        attachments: &[NetworkAttachment],
        placement: &Placement,
        tags: &HashMap<String, String>,
        env: &serde_json::Value,
    ) -> Result<VmCreateParams> {
        let vm_name = id.vm_name();

        let os_profile = match image.os_type {
            OsType::Linux => OsProfile::Linux {
                admin_username: self.settings.admin_username.clone(),
                ssh_public_key: self.settings.ssh_public_key.clone().ok_or_else(|| {
                    CloudError::Configuration("ssh_public_key required for Linux VMs".to_string())
                })?,
            },
            OsType::Windows => OsProfile::Windows {
                admin_username: self.identity.windows_admin_username(),
                admin_password: self.identity.windows_admin_password(),
                computer_name: self.identity.windows_computer_name(),
            },
        };

        let computer_name = match &os_profile {
            OsProfile::Windows { computer_name, .. } => computer_name.clone(),
            OsProfile::Linux { .. } => vm_name.to_string(),
        };

        let dns: Vec<String> = attachments
            .iter()
            .flat_map(|a| a.dns_servers().iter().cloned())
            .collect();
        let custom_data = encode_custom_data(id, &computer_name, &dns, env)?;

        let boot_diagnostics = pool
            .boot_diagnostics
            .unwrap_or(self.settings.enable_boot_diagnostics);
        let boot_diagnostics_storage_uri = if boot_diagnostics {
            self.settings.boot_diagnostics_storage_uri.clone()
        } else {
            None
        };

        Ok(VmCreateParams {
            name: vm_name.to_string(),
            location: location.to_string(),
            vm_size: pool.instance_type.clone(),
            image: image.clone(),
            os_profile,
            custom_data,
            os_disk: DiskSpec::named(self.disk_manager.generate_os_disk_name(vm_name)),
            ephemeral_disk: Some(DiskSpec::named(
                self.disk_manager.generate_ephemeral_disk_name(vm_name),
            )),
            zone: placement.zone.clone(),
            availability_set: placement.availability_set.clone(),
            boot_diagnostics_storage_uri,
            tags: tags.clone(),
        })
    }

    /// Best-effort cleanup after a terminal VM-create failure. Created
    /// interfaces are deliberately left in place so a retried create can
    /// reuse them; only resources that cannot be reattached are removed.
    /// Cleanup failures are logged, never escalated — the original
    /// provisioning error must not be masked.
    async fn compensate_failed_create(&self, resource_group: &str, vm_name: &str) {
        info!("Cleaning up after failed creation of VM '{vm_name}'");

        if let Err(err) = self.client.delete_virtual_machine(resource_group, vm_name).await {
            warn!("Cleanup of VM '{vm_name}' failed: {err}");
        }

        let os_disk = self.disk_manager.generate_os_disk_name(vm_name);
        if let Err(err) = self.disk_manager.delete_disk(resource_group, &os_disk).await {
            warn!("Cleanup of disk '{os_disk}' failed: {err}");
        }

        let ephemeral_disk = self.disk_manager.generate_ephemeral_disk_name(vm_name);
        if let Err(err) = self
            .disk_manager
            .delete_disk(resource_group, &ephemeral_disk)
            .await
        {
            warn!("Cleanup of disk '{ephemeral_disk}' failed: {err}");
        }

        if let Err(err) = self
            .disk_manager
            .delete_vm_status_files(resource_group, vm_name)
            .await
        {
            warn!("Cleanup of status files for VM '{vm_name}' failed: {err}");
        }
    }

    /// Best-effort deletion of interfaces created before a failing one.
    async fn delete_interfaces(&self, resource_group: &str, created: &[NetworkInterfaceRef]) {
        for nic in created {
            if let Err(err) = self
                .client
                .delete_network_interface(resource_group, &nic.name)
                .await
            {
                warn!("Cleanup of network interface '{}' failed: {err}", nic.name);
            }
        }
    }

    fn resource_tags(&self) -> HashMap<String, String> {
        let mut tags = self.settings.tags.clone();
        tags.insert("user-agent".to_string(), "nimbus".to_string());
        tags.insert("created-at".to_string(), Utc::now().to_rfc3339());
        tags
    }
}

/// Boot payload handed to the instance: base64-encoded JSON carrying the
/// instance identity, computer name, DNS servers, and the caller's
/// environment block.
fn encode_custom_data(
    id: &InstanceId,
    computer_name: &str,
    dns: &[String],
    env: &serde_json::Value,
) -> Result<String> {
    let payload = serde_json::json!({
        "instance_id": id.to_string(),
        "server": { "name": computer_name },
        "dns": { "nameservers": dns },
        "env": env,
    });
    let encoded = base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(&payload)?);
    Ok(encoded)
}
