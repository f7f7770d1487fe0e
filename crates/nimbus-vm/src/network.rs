//! Network attachments and the network interface resolver
//!
//! An instance declares a list of network attachments. Each manual or
//! dynamic attachment resolves to exactly one network interface, in
//! declaration order; a VIP attachment contributes an existing public IP to
//! the primary interface instead of producing one of its own.

use crate::pool::ResourcePoolSpec;
use nimbus_cloud::{
    ApplicationGatewayRef, ApplicationSecurityGroupRef, CloudClient, CloudError, LoadBalancerRef,
    NicSpec, Result, SecurityGroupRef,
};
use nimbus_config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields shared by every attachment variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentCommon {
    /// Resource group holding the attachment's network resources. Defaults
    /// to the client's default resource group.
    pub resource_group: Option<String>,
    /// Network security group name.
    pub security_group: Option<String>,
    /// Application security group names.
    pub application_security_groups: Vec<String>,
    pub ip_forwarding: bool,
    pub accelerated_networking: bool,
}

/// Attachment with an operator-assigned private IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAttachment {
    pub common: AttachmentCommon,
    pub virtual_network_name: String,
    pub subnet_name: String,
    pub private_ip: String,
    pub dns: Vec<String>,
    pub default_dns: bool,
    pub default_gateway: bool,
}

/// Attachment whose private IP is assigned by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAttachment {
    pub common: AttachmentCommon,
    pub virtual_network_name: String,
    pub subnet_name: String,
    pub dns: Vec<String>,
}

/// Attachment naming a pre-allocated public IP for the primary interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VipAttachment {
    pub common: AttachmentCommon,
    pub public_ip: String,
}

/// A declared network attachment, one of three closed variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NetworkAttachment {
    Manual(ManualAttachment),
    Dynamic(DynamicAttachment),
    Vip(VipAttachment),
}

impl NetworkAttachment {
    pub fn common(&self) -> &AttachmentCommon {
        match self {
            NetworkAttachment::Manual(a) => &a.common,
            NetworkAttachment::Dynamic(a) => &a.common,
            NetworkAttachment::Vip(a) => &a.common,
        }
    }

    pub fn is_vip(&self) -> bool {
        matches!(self, NetworkAttachment::Vip(_))
    }

    /// Virtual network and subnet names, for the interface-bearing variants.
    pub fn subnet_identity(&self) -> Option<(&str, &str)> {
        match self {
            NetworkAttachment::Manual(a) => Some((&a.virtual_network_name, &a.subnet_name)),
            NetworkAttachment::Dynamic(a) => Some((&a.virtual_network_name, &a.subnet_name)),
            NetworkAttachment::Vip(_) => None,
        }
    }

    pub fn private_ip(&self) -> Option<&str> {
        match self {
            NetworkAttachment::Manual(a) => Some(&a.private_ip),
            _ => None,
        }
    }

    pub fn dns_servers(&self) -> &[String] {
        match self {
            NetworkAttachment::Manual(a) => &a.dns,
            NetworkAttachment::Dynamic(a) => &a.dns,
            NetworkAttachment::Vip(_) => &[],
        }
    }
}

/// The first VIP attachment, if any.
pub fn find_vip(attachments: &[NetworkAttachment]) -> Option<&VipAttachment> {
    attachments.iter().find_map(|a| match a {
        NetworkAttachment::Vip(vip) => Some(vip),
        _ => None,
    })
}

/// Raw attachment as declared by the caller, prior to validation.
///
/// Validated once, here, into a [`NetworkAttachment`]; downstream code never
/// re-checks field presence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentConfig {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub ip: Option<String>,
    pub virtual_network_name: Option<String>,
    pub subnet_name: Option<String>,
    pub public_ip: Option<String>,
    pub dns: Option<Vec<String>>,
    /// Default-route memberships, any of "dns" and "gateway".
    pub default: Option<Vec<String>>,
    pub resource_group: Option<String>,
    pub security_group: Option<String>,
    pub application_security_groups: Option<Vec<String>>,
    pub ip_forwarding: Option<bool>,
    pub accelerated_networking: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Manual,
    #[default]
    Dynamic,
    Vip,
}

impl AttachmentConfig {
    fn common(&self) -> AttachmentCommon {
        AttachmentCommon {
            resource_group: self.resource_group.clone(),
            security_group: self.security_group.clone(),
            application_security_groups: self.application_security_groups.clone().unwrap_or_default(),
            ip_forwarding: self.ip_forwarding.unwrap_or(false),
            accelerated_networking: self.accelerated_networking.unwrap_or(false),
        }
    }

    fn require(value: &Option<String>, field: &str, kind: &str) -> Result<String> {
        value
            .clone()
            .ok_or_else(|| CloudError::Configuration(format!("{field} required for {kind} network")))
    }
}

impl TryFrom<AttachmentConfig> for NetworkAttachment {
    type Error = CloudError;

    fn try_from(config: AttachmentConfig) -> Result<Self> {
        let common = config.common();
        match config.kind {
            AttachmentKind::Manual => {
                let defaults = config.default.clone().unwrap_or_default();
                Ok(NetworkAttachment::Manual(ManualAttachment {
                    common,
                    virtual_network_name: AttachmentConfig::require(
                        &config.virtual_network_name,
                        "virtual_network_name",
                        "manual",
                    )?,
                    subnet_name: AttachmentConfig::require(&config.subnet_name, "subnet_name", "manual")?,
                    private_ip: AttachmentConfig::require(&config.ip, "ip address", "manual")?,
                    dns: config.dns.unwrap_or_default(),
                    default_dns: defaults.iter().any(|d| d == "dns"),
                    default_gateway: defaults.iter().any(|d| d == "gateway"),
                }))
            }
            AttachmentKind::Dynamic => Ok(NetworkAttachment::Dynamic(DynamicAttachment {
                common,
                virtual_network_name: AttachmentConfig::require(
                    &config.virtual_network_name,
                    "virtual_network_name",
                    "dynamic",
                )?,
                subnet_name: AttachmentConfig::require(&config.subnet_name, "subnet_name", "dynamic")?,
                dns: config.dns.unwrap_or_default(),
            })),
            AttachmentKind::Vip => Ok(NetworkAttachment::Vip(VipAttachment {
                common,
                public_ip: AttachmentConfig::require(&config.public_ip, "public_ip", "vip")?,
            })),
        }
    }
}

/// Resolves declared attachments into concrete interface specs.
///
/// Security-group lookups use a two-tier search: first the attachment's own
/// resource group (or the default one when unspecified), then the default
/// resource group. Operators may centralize shared security groups in the
/// default group while deploying VM networks into per-environment groups.
pub struct NetworkResolver<'a> {
    client: &'a dyn CloudClient,
    default_resource_group: &'a str,
    default_security_group: Option<&'a str>,
}

impl<'a> NetworkResolver<'a> {
    pub fn new(client: &'a dyn CloudClient, settings: &'a Settings) -> Self {
        Self {
            client,
            default_resource_group: &settings.default_resource_group,
            default_security_group: settings.default_security_group.as_deref(),
        }
    }

    /// Resolve one interface spec per interface-bearing attachment, in
    /// declaration order. Interface names are suffixed `-0`, `-1`, … after
    /// the VM name; the primary interface (index 0) carries the
    /// load-balancer and application-gateway back-references.
    pub async fn resolve(
        &self,
        vm_name: &str,
        location: &str,
        attachments: &[NetworkAttachment],
        pool: &ResourcePoolSpec,
        tags: &HashMap<String, String>,
    ) -> Result<Vec<NicSpec>> {
        let nic_bearing: Vec<&NetworkAttachment> =
            attachments.iter().filter(|a| !a.is_vip()).collect();

        if nic_bearing.is_empty() {
            return Err(CloudError::Configuration(
                "at least one manual or dynamic network attachment is required".to_string(),
            ));
        }

        let mut specs = Vec::with_capacity(nic_bearing.len());
        for (index, attachment) in nic_bearing.iter().enumerate() {
            let common = attachment.common();
            let lookup_group = common
                .resource_group
                .as_deref()
                .unwrap_or(self.default_resource_group);

            let (virtual_network, subnet_name) = attachment
                .subnet_identity()
                .expect("VIP attachments are filtered out above");
            let subnet = self
                .client
                .get_network_subnet_by_name(lookup_group, virtual_network, subnet_name)
                .await?;

            let security_group_name = pool
                .security_group
                .as_deref()
                .or(common.security_group.as_deref())
                .or(self.default_security_group);
            let security_group = match security_group_name {
                Some(name) => Some(self.find_security_group(lookup_group, name).await?),
                None => None,
            };

            let asg_names: &[String] = pool
                .application_security_groups
                .as_deref()
                .unwrap_or(&common.application_security_groups);
            let mut application_security_groups = Vec::with_capacity(asg_names.len());
            for name in asg_names {
                application_security_groups
                    .push(self.find_application_security_group(lookup_group, name).await?);
            }

            let mut spec = NicSpec {
                name: format!("{vm_name}-{index}"),
                location: location.to_string(),
                subnet,
                private_ip: attachment.private_ip().map(str::to_string),
                dns_servers: attachment.dns_servers().to_vec(),
                security_group,
                application_security_groups,
                enable_ip_forwarding: pool.ip_forwarding.unwrap_or(common.ip_forwarding),
                enable_accelerated_networking: pool
                    .accelerated_networking
                    .unwrap_or(common.accelerated_networking),
                public_ip: None,
                load_balancer: None,
                application_gateway: None,
                tags: tags.clone(),
            };

            if index == 0 {
                spec.load_balancer = pool.load_balancer.as_deref().map(LoadBalancerRef::from_name);
                spec.application_gateway = pool
                    .application_gateway
                    .as_deref()
                    .map(ApplicationGatewayRef::from_name);
            }

            specs.push(spec);
        }

        Ok(specs)
    }

    async fn find_security_group(&self, lookup_group: &str, name: &str) -> Result<SecurityGroupRef> {
        if let Some(found) = self
            .client
            .get_network_security_group_by_name(lookup_group, name)
            .await?
        {
            return Ok(found);
        }

        if lookup_group != self.default_resource_group {
            if let Some(found) = self
                .client
                .get_network_security_group_by_name(self.default_resource_group, name)
                .await?
            {
                return Ok(found);
            }
        }

        Err(CloudError::SecurityGroupNotFound {
            name: name.to_string(),
            searched: self.searched_groups(lookup_group),
        })
    }

    async fn find_application_security_group(
        &self,
        lookup_group: &str,
        name: &str,
    ) -> Result<ApplicationSecurityGroupRef> {
        if let Some(found) = self
            .client
            .get_application_security_group_by_name(lookup_group, name)
            .await?
        {
            return Ok(found);
        }

        if lookup_group != self.default_resource_group {
            if let Some(found) = self
                .client
                .get_application_security_group_by_name(self.default_resource_group, name)
                .await?
            {
                return Ok(found);
            }
        }

        Err(CloudError::SecurityGroupNotFound {
            name: name.to_string(),
            searched: self.searched_groups(lookup_group),
        })
    }

    fn searched_groups(&self, lookup_group: &str) -> Vec<String> {
        if lookup_group == self.default_resource_group {
            vec![lookup_group.to_string()]
        } else {
            vec![
                lookup_group.to_string(),
                self.default_resource_group.to_string(),
            ]
        }
    }
}
