//! oci_core_security_list

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use netform_core::crud::{RemovalOutcome, ResourceCrud};
use netform_core::provider::ProviderResult;
use netform_core::resource::{LifecycleState, ResourceData, ResourceId};
use serde::{Deserialize, Serialize};

use super::{format_time, require_field, require_id, resource_id};
use crate::client::VirtualNetworkClient;
use crate::client::models as sdk;
use crate::schemas::network::SECURITY_LIST;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcmpOptions {
    #[serde(rename = "type")]
    pub icmp_type: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
}

/// Destination port range of a TCP or UDP rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressSecurityRule {
    pub destination: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_options: Option<IcmpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_options: Option<PortRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_options: Option<PortRange>,
    #[serde(default)]
    pub stateless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSecurityRule {
    pub source: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_options: Option<IcmpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_options: Option<PortRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_options: Option<PortRange>,
    #[serde(default)]
    pub stateless: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityListData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub egress_security_rules: Vec<EgressSecurityRule>,
    pub ingress_security_rules: Vec<IngressSecurityRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_egress_security_rules: Option<Vec<EgressSecurityRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ingress_security_rules: Option<Vec<IngressSecurityRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
}

impl ResourceData for SecurityListData {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn merge_computed(&mut self, prior: &Self) {
        self.id = prior.id.clone();
        self.state = prior.state;
        self.time_created = prior.time_created.clone();
        self.default_egress_security_rules = prior.default_egress_security_rules.clone();
        self.default_ingress_security_rules = prior.default_ingress_security_rules.clone();
        if self.compartment_id.is_none() {
            self.compartment_id = prior.compartment_id.clone();
        }
        if self.vcn_id.is_none() {
            self.vcn_id = prior.vcn_id.clone();
        }
    }
}

// =============================================================================
// Mapping
// =============================================================================

fn build_icmp_options(options: Option<IcmpOptions>) -> Option<sdk::IcmpOptions> {
    options.map(|o| sdk::IcmpOptions {
        icmp_type: o.icmp_type,
        code: o.code,
    })
}

fn build_port_range(range: PortRange) -> sdk::PortRange {
    sdk::PortRange {
        min: range.min,
        max: range.max,
    }
}

fn icmp_options_to_config(options: Option<sdk::IcmpOptions>) -> Option<IcmpOptions> {
    options.map(|o| IcmpOptions {
        icmp_type: o.icmp_type,
        code: o.code,
    })
}

fn port_range_to_config(range: sdk::PortRange) -> PortRange {
    PortRange {
        min: range.min,
        max: range.max,
    }
}

pub fn build_egress_rules(rules: &[EgressSecurityRule]) -> Vec<sdk::EgressSecurityRule> {
    rules
        .iter()
        .map(|rule| sdk::EgressSecurityRule {
            destination: rule.destination.clone(),
            protocol: rule.protocol.clone(),
            icmp_options: build_icmp_options(rule.icmp_options),
            tcp_options: rule.tcp_options.map(|r| sdk::TcpOptions {
                destination_port_range: build_port_range(r),
            }),
            udp_options: rule.udp_options.map(|r| sdk::UdpOptions {
                destination_port_range: build_port_range(r),
            }),
            is_stateless: rule.stateless,
        })
        .collect()
}

pub fn build_ingress_rules(rules: &[IngressSecurityRule]) -> Vec<sdk::IngressSecurityRule> {
    rules
        .iter()
        .map(|rule| sdk::IngressSecurityRule {
            source: rule.source.clone(),
            protocol: rule.protocol.clone(),
            icmp_options: build_icmp_options(rule.icmp_options),
            tcp_options: rule.tcp_options.map(|r| sdk::TcpOptions {
                destination_port_range: build_port_range(r),
            }),
            udp_options: rule.udp_options.map(|r| sdk::UdpOptions {
                destination_port_range: build_port_range(r),
            }),
            is_stateless: rule.stateless,
        })
        .collect()
}

pub fn egress_rules_to_config(rules: &[sdk::EgressSecurityRule]) -> Vec<EgressSecurityRule> {
    rules
        .iter()
        .map(|rule| EgressSecurityRule {
            destination: rule.destination.clone(),
            protocol: rule.protocol.clone(),
            icmp_options: icmp_options_to_config(rule.icmp_options),
            tcp_options: rule
                .tcp_options
                .map(|o| port_range_to_config(o.destination_port_range)),
            udp_options: rule
                .udp_options
                .map(|o| port_range_to_config(o.destination_port_range)),
            stateless: rule.is_stateless,
        })
        .collect()
}

pub fn ingress_rules_to_config(rules: &[sdk::IngressSecurityRule]) -> Vec<IngressSecurityRule> {
    rules
        .iter()
        .map(|rule| IngressSecurityRule {
            source: rule.source.clone(),
            protocol: rule.protocol.clone(),
            icmp_options: icmp_options_to_config(rule.icmp_options),
            tcp_options: rule
                .tcp_options
                .map(|o| port_range_to_config(o.destination_port_range)),
            udp_options: rule
                .udp_options
                .map(|o| port_range_to_config(o.destination_port_range)),
            stateless: rule.is_stateless,
        })
        .collect()
}

pub fn create_details(data: &SecurityListData) -> ProviderResult<sdk::CreateSecurityListDetails> {
    Ok(sdk::CreateSecurityListDetails {
        compartment_id: require_field(&data.compartment_id, "compartment_id", SECURITY_LIST)?
            .to_string(),
        vcn_id: require_field(&data.vcn_id, "vcn_id", SECURITY_LIST)?.to_string(),
        display_name: data.display_name.clone(),
        egress_security_rules: build_egress_rules(&data.egress_security_rules),
        ingress_security_rules: build_ingress_rules(&data.ingress_security_rules),
    })
}

pub fn update_details(data: &SecurityListData) -> sdk::UpdateSecurityListDetails {
    sdk::UpdateSecurityListDetails {
        display_name: data.display_name.clone(),
        egress_security_rules: build_egress_rules(&data.egress_security_rules),
        ingress_security_rules: build_ingress_rules(&data.ingress_security_rules),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

pub struct SecurityListCrud {
    client: Arc<dyn VirtualNetworkClient>,
}

impl SecurityListCrud {
    pub fn new(client: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCrud for SecurityListCrud {
    type Data = SecurityListData;
    type Remote = sdk::SecurityList;

    fn resource_type(&self) -> &'static str {
        SECURITY_LIST
    }

    fn id<'a>(&self, remote: &'a sdk::SecurityList) -> &'a str {
        &remote.id
    }

    fn state(&self, remote: &sdk::SecurityList) -> LifecycleState {
        remote.lifecycle_state
    }

    async fn create(&self, data: &mut SecurityListData) -> ProviderResult<sdk::SecurityList> {
        if let Some(default_id) = data.default_id.clone() {
            let current = self
                .client
                .get_security_list(&default_id)
                .await
                .map_err(|e| e.for_resource(resource_id(SECURITY_LIST, &default_id)))?;

            info!("Adopting default security list {}", default_id);
            data.default_egress_security_rules =
                Some(egress_rules_to_config(&current.egress_security_rules));
            data.default_ingress_security_rules =
                Some(ingress_rules_to_config(&current.ingress_security_rules));
            data.id = Some(default_id);
            return self.update(data).await;
        }

        let details = create_details(data)?;
        let security_list = self
            .client
            .create_security_list(details)
            .await
            .map_err(|e| e.for_resource(ResourceId::new(SECURITY_LIST)))?;
        data.default_egress_security_rules = None;
        data.default_ingress_security_rules = None;
        Ok(security_list)
    }

    async fn get(&self, data: &SecurityListData) -> ProviderResult<sdk::SecurityList> {
        let id = require_id(data, SECURITY_LIST)?;
        let mut security_list = self
            .client
            .get_security_list(id)
            .await
            .map_err(|e| e.for_resource(resource_id(SECURITY_LIST, id)))?;

        if data.default_id.is_some() && data.state == Some(LifecycleState::Terminated) {
            security_list.lifecycle_state = LifecycleState::Terminated;
        }
        Ok(security_list)
    }

    async fn update(&self, data: &SecurityListData) -> ProviderResult<sdk::SecurityList> {
        let id = require_id(data, SECURITY_LIST)?;
        self.client
            .update_security_list(id, update_details(data))
            .await
            .map_err(|e| e.for_resource(resource_id(SECURITY_LIST, id)))
    }

    async fn delete(&self, data: &mut SecurityListData) -> ProviderResult<RemovalOutcome> {
        if data.default_id.is_some() {
            data.egress_security_rules = data
                .default_egress_security_rules
                .clone()
                .unwrap_or_default();
            data.ingress_security_rules = data
                .default_ingress_security_rules
                .clone()
                .unwrap_or_default();
            self.update(data).await?;
            data.state = Some(LifecycleState::Terminated);
            info!(
                "Reverted default security list {}",
                data.id.as_deref().unwrap_or_default()
            );
            return Ok(RemovalOutcome::Reverted);
        }

        let id = require_id(&*data, SECURITY_LIST)?;
        self.client
            .delete_security_list(id)
            .await
            .map_err(|e| e.for_resource(resource_id(SECURITY_LIST, id)))?;
        Ok(RemovalOutcome::Deleted)
    }

    fn set_data(&self, data: &mut SecurityListData, remote: &sdk::SecurityList) {
        data.compartment_id = Some(remote.compartment_id.clone());
        data.vcn_id = Some(remote.vcn_id.clone());
        data.display_name = Some(remote.display_name.clone());
        data.egress_security_rules = egress_rules_to_config(&remote.egress_security_rules);
        data.ingress_security_rules = ingress_rules_to_config(&remote.ingress_security_rules);
        data.state = Some(remote.lifecycle_state);
        data.time_created = Some(format_time(&remote.time_created));
    }
}
