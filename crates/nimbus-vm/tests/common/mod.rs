//! Shared test harness: recording in-memory collaborators
#![allow(dead_code)]

use async_trait::async_trait;
use nimbus_cloud::{
    ApplicationSecurityGroupRef, AvailabilitySetRef, CloudClient, CloudError, DiskManager,
    InstanceId, InstanceKind, NetworkInterfaceRef, NicSpec, ProvisioningState, PublicIpRef,
    PublicIpSpec, ResourceGroup, Result, SecurityGroupRef, SubnetRef, VirtualMachine,
    VmCreateParams, VmImage, VmssInstance,
};
use nimbus_config::Settings;
use nimbus_vm::identity::IdentityProvider;
use nimbus_vm::network::{
    AttachmentCommon, DynamicAttachment, ManualAttachment, NetworkAttachment, VipAttachment,
};
use nimbus_vm::{ResourcePoolSpec, VmProvisioner};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const DEFAULT_RG: &str = "rg-default";
pub const VM_RG: &str = "rg-vms";
pub const LOCATION: &str = "eastus";

/// Scripted result for one `create_virtual_machine` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmCreateOutcome {
    Succeed,
    TransientFailure,
    Failure,
}

/// In-memory control plane recording every call it receives.
///
/// Calls are recorded as `"<operation> <args…>"`; assertions use
/// [`MockCloud::count`] and [`MockCloud::index_of`].
#[derive(Default)]
pub struct MockCloud {
    pub calls: Mutex<Vec<String>>,
    pub resource_groups: Mutex<HashSet<String>>,
    pub subnets: Mutex<HashMap<(String, String, String), SubnetRef>>,
    pub security_groups: Mutex<HashMap<(String, String), SecurityGroupRef>>,
    pub application_security_groups: Mutex<HashMap<(String, String), ApplicationSecurityGroupRef>>,
    pub public_ips: Mutex<HashMap<(String, String), PublicIpRef>>,
    pub nics: Mutex<HashSet<(String, String)>>,
    pub vms: Mutex<HashMap<(String, String), VirtualMachine>>,
    pub vmss_instances: Mutex<HashMap<String, VmssInstance>>,
    pub vm_create_outcomes: Mutex<VecDeque<VmCreateOutcome>>,
    pub failing_nics: Mutex<HashSet<String>>,
    pub created_nics: Mutex<Vec<NicSpec>>,
    pub created_public_ips: Mutex<Vec<(String, PublicIpSpec)>>,
    pub created_vms: Mutex<Vec<(VmCreateParams, Vec<NetworkInterfaceRef>, Option<AvailabilitySetRef>)>>,
}

impl MockCloud {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.resource_groups.lock().unwrap().insert(VM_RG.to_string());
        mock
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Number of recorded calls for an operation, regardless of arguments.
    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{op} ");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&prefix))
            .count()
    }

    /// Position of the first call for an operation, for ordering assertions.
    pub fn index_of(&self, op: &str) -> Option<usize> {
        let prefix = format!("{op} ");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .position(|c| c.as_str() == op || c.starts_with(&prefix))
    }

    pub fn count_exact(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    /// No mutating call was issued at all.
    pub fn no_mutations(&self) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .all(|c| !c.starts_with("create_") && !c.starts_with("delete_"))
    }

    pub fn without_vm_resource_group(self) -> Self {
        self.resource_groups.lock().unwrap().remove(VM_RG);
        self
    }

    pub fn with_subnet(self, rg: &str, vnet: &str, subnet: &str) -> Self {
        self.subnets.lock().unwrap().insert(
            (rg.to_string(), vnet.to_string(), subnet.to_string()),
            SubnetRef::new(format!("/subnets/{rg}/{vnet}/{subnet}"), subnet),
        );
        self
    }

    pub fn with_security_group(self, rg: &str, name: &str) -> Self {
        self.security_groups.lock().unwrap().insert(
            (rg.to_string(), name.to_string()),
            SecurityGroupRef::new(format!("/nsgs/{rg}/{name}"), name),
        );
        self
    }

    pub fn with_application_security_group(self, rg: &str, name: &str) -> Self {
        self.application_security_groups.lock().unwrap().insert(
            (rg.to_string(), name.to_string()),
            ApplicationSecurityGroupRef::new(format!("/asgs/{rg}/{name}"), name),
        );
        self
    }

    pub fn with_public_ip(self, rg: &str, name: &str, address: &str) -> Self {
        self.public_ips.lock().unwrap().insert(
            (rg.to_string(), name.to_string()),
            PublicIpRef::new(format!("/public-ips/{rg}/{name}"), name).with_ip_address(address),
        );
        self
    }

    pub fn with_vm(self, rg: &str, name: &str, state: &str, nic_names: &[&str]) -> Self {
        {
            let mut nics = self.nics.lock().unwrap();
            for n in nic_names {
                nics.insert((rg.to_string(), n.to_string()));
            }
        }
        self.vms.lock().unwrap().insert(
            (rg.to_string(), name.to_string()),
            VirtualMachine {
                name: name.to_string(),
                provisioning_state: ProvisioningState::from(state),
                network_interfaces: nic_names
                    .iter()
                    .map(|n| NetworkInterfaceRef::new(format!("/nics/{rg}/{n}"), *n))
                    .collect(),
            },
        );
        self
    }

    pub fn with_vmss_instance(self, id: &InstanceId) -> Self {
        self.vmss_instances.lock().unwrap().insert(
            id.to_string(),
            VmssInstance {
                instance_id: id.vm_name().to_string(),
                name: id.vm_name().to_string(),
            },
        );
        self
    }

    pub fn with_vm_create_outcomes(self, outcomes: &[VmCreateOutcome]) -> Self {
        self.vm_create_outcomes
            .lock()
            .unwrap()
            .extend(outcomes.iter().copied());
        self
    }

    pub fn with_failing_nic(self, name: &str) -> Self {
        self.failing_nics.lock().unwrap().insert(name.to_string());
        self
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>> {
        self.record(format!("get_resource_group {name}"));
        Ok(self
            .resource_groups
            .lock()
            .unwrap()
            .contains(name)
            .then(|| ResourceGroup {
                name: name.to_string(),
                location: LOCATION.to_string(),
            }))
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
        self.record(format!("create_resource_group {name} {location}"));
        self.resource_groups.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    async fn get_network_subnet_by_name(
        &self,
        resource_group: &str,
        virtual_network: &str,
        subnet: &str,
    ) -> Result<SubnetRef> {
        self.record(format!(
            "get_network_subnet_by_name {resource_group} {virtual_network} {subnet}"
        ));
        self.subnets
            .lock()
            .unwrap()
            .get(&(
                resource_group.to_string(),
                virtual_network.to_string(),
                subnet.to_string(),
            ))
            .cloned()
            .ok_or_else(|| {
                CloudError::Api(format!(
                    "subnet '{subnet}' not found in '{resource_group}/{virtual_network}'"
                ))
            })
    }

    async fn get_network_security_group_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupRef>> {
        self.record(format!(
            "get_network_security_group_by_name {resource_group} {name}"
        ));
        Ok(self
            .security_groups
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_application_security_group_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ApplicationSecurityGroupRef>> {
        self.record(format!(
            "get_application_security_group_by_name {resource_group} {name}"
        ));
        Ok(self
            .application_security_groups
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_public_ip(&self, resource_group: &str, spec: &PublicIpSpec) -> Result<()> {
        self.record(format!("create_public_ip {resource_group} {}", spec.name));
        self.public_ips.lock().unwrap().insert(
            (resource_group.to_string(), spec.name.clone()),
            PublicIpRef::new(format!("/public-ips/{resource_group}/{}", spec.name), &spec.name),
        );
        self.created_public_ips
            .lock()
            .unwrap()
            .push((resource_group.to_string(), spec.clone()));
        Ok(())
    }

    async fn get_public_ip_by_name(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<PublicIpRef>> {
        self.record(format!("get_public_ip_by_name {resource_group} {name}"));
        Ok(self
            .public_ips
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_network_interface(
        &self,
        resource_group: &str,
        spec: &NicSpec,
    ) -> Result<NetworkInterfaceRef> {
        self.record(format!("create_network_interface {resource_group} {}", spec.name));
        if self.failing_nics.lock().unwrap().contains(&spec.name) {
            return Err(CloudError::Api(format!(
                "network interface '{}' creation rejected",
                spec.name
            )));
        }
        self.created_nics.lock().unwrap().push(spec.clone());
        self.nics
            .lock()
            .unwrap()
            .insert((resource_group.to_string(), spec.name.clone()));
        Ok(NetworkInterfaceRef::new(
            format!("/nics/{resource_group}/{}", spec.name),
            &spec.name,
        ))
    }

    async fn delete_network_interface(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(format!("delete_network_interface {resource_group} {name}"));
        self.nics
            .lock()
            .unwrap()
            .remove(&(resource_group.to_string(), name.to_string()));
        Ok(())
    }

    async fn list_network_interfaces_by_prefix(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Vec<NetworkInterfaceRef>> {
        self.record(format!(
            "list_network_interfaces_by_prefix {resource_group} {vm_name}"
        ));
        let prefix = format!("{vm_name}-");
        let mut found: Vec<NetworkInterfaceRef> = self
            .nics
            .lock()
            .unwrap()
            .iter()
            .filter(|(rg, name)| rg == resource_group && name.starts_with(&prefix))
            .map(|(rg, name)| NetworkInterfaceRef::new(format!("/nics/{rg}/{name}"), name))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        params: &VmCreateParams,
        interfaces: &[NetworkInterfaceRef],
        availability_set: Option<&AvailabilitySetRef>,
    ) -> Result<()> {
        self.record(format!("create_virtual_machine {resource_group} {}", params.name));
        let outcome = self
            .vm_create_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VmCreateOutcome::Succeed);
        match outcome {
            VmCreateOutcome::Succeed => {
                self.vms.lock().unwrap().insert(
                    (resource_group.to_string(), params.name.clone()),
                    VirtualMachine {
                        name: params.name.clone(),
                        provisioning_state: ProvisioningState::Succeeded,
                        network_interfaces: interfaces.to_vec(),
                    },
                );
                self.created_vms.lock().unwrap().push((
                    params.clone(),
                    interfaces.to_vec(),
                    availability_set.cloned(),
                ));
                Ok(())
            }
            VmCreateOutcome::TransientFailure => Err(CloudError::async_failed(
                "create_virtual_machine",
                "Failed",
            )),
            VmCreateOutcome::Failure => {
                Err(CloudError::Api("virtual machine creation rejected".to_string()))
            }
        }
    }

    async fn delete_virtual_machine(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(format!("delete_virtual_machine {resource_group} {name}"));
        self.vms
            .lock()
            .unwrap()
            .remove(&(resource_group.to_string(), name.to_string()));
        Ok(())
    }

    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<VirtualMachine>> {
        self.record(format!("get_virtual_machine {resource_group} {name}"));
        Ok(self
            .vms
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_vmss_instance(&self, id: &InstanceId) -> Result<Option<VmssInstance>> {
        self.record(format!("get_vmss_instance {id}"));
        Ok(self.vmss_instances.lock().unwrap().get(&id.to_string()).cloned())
    }

    async fn delete_vmss_instance(&self, id: &InstanceId) -> Result<()> {
        self.record(format!("delete_vmss_instance {id}"));
        self.vmss_instances.lock().unwrap().remove(&id.to_string());
        Ok(())
    }
}

/// Recording disk collaborator with deterministic disk names.
#[derive(Default)]
pub struct MockDisks {
    pub calls: Mutex<Vec<String>>,
}

impl MockDisks {
    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{op} ");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&prefix))
            .count()
    }
}

#[async_trait]
impl DiskManager for MockDisks {
    fn generate_os_disk_name(&self, vm_name: &str) -> String {
        format!("{vm_name}-os-disk")
    }

    fn generate_ephemeral_disk_name(&self, vm_name: &str) -> String {
        format!("{vm_name}-ephemeral-disk")
    }

    async fn delete_disk(&self, resource_group: &str, disk_name: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete_disk {resource_group} {disk_name}"));
        Ok(())
    }

    async fn delete_vm_status_files(&self, resource_group: &str, vm_name: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete_vm_status_files {resource_group} {vm_name}"));
        Ok(())
    }
}

/// Deterministic identity provider.
pub struct FixedIdentity;

impl IdentityProvider for FixedIdentity {
    fn windows_computer_name(&self) -> String {
        "nim-fixed".to_string()
    }

    fn windows_admin_username(&self) -> String {
        "nimbusadmin".to_string()
    }

    fn windows_admin_password(&self) -> String {
        "Np0!fixed".to_string()
    }
}

pub fn test_settings() -> Settings {
    Settings {
        default_resource_group: DEFAULT_RG.to_string(),
        location: LOCATION.to_string(),
        default_security_group: None,
        pip_idle_timeout_in_minutes: None,
        enable_boot_diagnostics: false,
        boot_diagnostics_storage_uri: None,
        admin_username: "nimbus".to_string(),
        ssh_public_key: Some("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 nimbus".to_string()),
        tags: HashMap::new(),
    }
}

pub fn provisioner(cloud: &Arc<MockCloud>, disks: &Arc<MockDisks>) -> VmProvisioner {
    provisioner_with_settings(cloud, disks, test_settings())
}

pub fn provisioner_with_settings(
    cloud: &Arc<MockCloud>,
    disks: &Arc<MockDisks>,
    settings: Settings,
) -> VmProvisioner {
    VmProvisioner::new(cloud.clone(), disks.clone(), Arc::new(FixedIdentity), settings)
}

pub fn vm_id(name: &str) -> InstanceId {
    InstanceId::new(VM_RG, InstanceKind::Vm, name)
}

pub fn vmss_id(name: &str) -> InstanceId {
    InstanceId::new(VM_RG, InstanceKind::Vmss, name)
}

pub fn linux_image() -> VmImage {
    VmImage {
        reference: nimbus_cloud::ImageReference::PlatformImage {
            publisher: "canonical".to_string(),
            offer: "ubuntu-24_04-lts".to_string(),
            sku: "server".to_string(),
            version: "latest".to_string(),
        },
        os_type: nimbus_cloud::OsType::Linux,
    }
}

pub fn manual_attachment() -> NetworkAttachment {
    NetworkAttachment::Manual(ManualAttachment {
        common: AttachmentCommon::default(),
        virtual_network_name: "vnet-prod".to_string(),
        subnet_name: "subnet-a".to_string(),
        private_ip: "10.0.0.4".to_string(),
        dns: vec!["168.63.129.16".to_string()],
        default_dns: true,
        default_gateway: false,
    })
}

pub fn dynamic_attachment() -> NetworkAttachment {
    NetworkAttachment::Dynamic(DynamicAttachment {
        common: AttachmentCommon::default(),
        virtual_network_name: "vnet-prod".to_string(),
        subnet_name: "subnet-b".to_string(),
        dns: Vec::new(),
    })
}

pub fn vip_attachment(public_ip: &str) -> NetworkAttachment {
    NetworkAttachment::Vip(VipAttachment {
        common: AttachmentCommon::default(),
        public_ip: public_ip.to_string(),
    })
}

/// Mock with the subnets both standard attachments resolve against.
pub fn cloud_with_networks() -> MockCloud {
    MockCloud::new()
        .with_subnet(DEFAULT_RG, "vnet-prod", "subnet-a")
        .with_subnet(DEFAULT_RG, "vnet-prod", "subnet-b")
}

pub fn standard_pool() -> ResourcePoolSpec {
    ResourcePoolSpec::new("Standard_D1")
}

pub fn env() -> serde_json::Value {
    serde_json::json!({ "group": "fleet-a" })
}
