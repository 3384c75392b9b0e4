//! oci_core_route_table
//!
//! Route tables can be created in a VCN or, through `default_id`, adopted from
//! the VCN's default route table. An adopted table is never deleted: removing
//! it restores the rules it had when it was adopted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use netform_core::crud::{RemovalOutcome, ResourceCrud};
use netform_core::provider::{ProviderError, ProviderResult};
use netform_core::resource::{LifecycleState, ResourceData, ResourceId};
use serde::{Deserialize, Serialize};

use super::{
    format_time, non_empty, null_elements_as_default, require_field, require_id, resource_id,
};
use crate::client::VirtualNetworkClient;
use crate::client::models as sdk;
use crate::schemas::network::ROUTE_TABLE;

pub const EMPTY_ROUTE_RULE: &str =
    "Empty route_rules are not permitted. Instead, the route_rules block may be omitted entirely.";

/// Settling time after the table becomes available or terminated
const EXTRA_WAIT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTableData {
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
    #[serde(deserialize_with = "null_elements_as_default")]
    pub route_rules: Vec<RouteRule>,
    /// Rules of the default table at adoption time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_route_rules: Option<Vec<RouteRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_modified: Option<String>,
}

impl ResourceData for RouteTableData {
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
        self.time_modified = prior.time_modified.clone();
        self.default_route_rules = prior.default_route_rules.clone();
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

pub fn build_route_rules(rules: &[RouteRule]) -> ProviderResult<Vec<sdk::RouteRule>> {
    rules
        .iter()
        .map(|rule| {
            if rule.cidr_block.is_none() && rule.network_entity_id.is_none() {
                return Err(ProviderError::invalid_config(EMPTY_ROUTE_RULE));
            }
            Ok(sdk::RouteRule {
                cidr_block: rule.cidr_block.clone().unwrap_or_default(),
                network_entity_id: rule.network_entity_id.clone().unwrap_or_default(),
            })
        })
        .collect()
}

pub fn route_rules_to_config(rules: &[sdk::RouteRule]) -> Vec<RouteRule> {
    rules
        .iter()
        .map(|rule| RouteRule {
            cidr_block: non_empty(&rule.cidr_block),
            network_entity_id: non_empty(&rule.network_entity_id),
        })
        .collect()
}

pub fn create_details(data: &RouteTableData) -> ProviderResult<sdk::CreateRouteTableDetails> {
    let route_rules = build_route_rules(&data.route_rules)?;
    Ok(sdk::CreateRouteTableDetails {
        compartment_id: require_field(&data.compartment_id, "compartment_id", ROUTE_TABLE)?
            .to_string(),
        vcn_id: require_field(&data.vcn_id, "vcn_id", ROUTE_TABLE)?.to_string(),
        display_name: data.display_name.clone(),
        route_rules,
    })
}

pub fn update_details(data: &RouteTableData) -> ProviderResult<sdk::UpdateRouteTableDetails> {
    Ok(sdk::UpdateRouteTableDetails {
        display_name: data.display_name.clone(),
        route_rules: build_route_rules(&data.route_rules)?,
    })
}

// =============================================================================
// Lifecycle
// =============================================================================

pub struct RouteTableCrud {
    client: Arc<dyn VirtualNetworkClient>,
}

impl RouteTableCrud {
    pub fn new(client: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCrud for RouteTableCrud {
    type Data = RouteTableData;
    type Remote = sdk::RouteTable;

    fn resource_type(&self) -> &'static str {
        ROUTE_TABLE
    }

    fn id<'a>(&self, remote: &'a sdk::RouteTable) -> &'a str {
        &remote.id
    }

    fn state(&self, remote: &sdk::RouteTable) -> LifecycleState {
        remote.lifecycle_state
    }

    fn extra_wait_post_create_delete(&self) -> Option<Duration> {
        Some(EXTRA_WAIT)
    }

    async fn create(&self, data: &mut RouteTableData) -> ProviderResult<sdk::RouteTable> {
        if let Some(default_id) = data.default_id.clone() {
            build_route_rules(&data.route_rules)?;
            let current = self
                .client
                .get_route_table(&default_id)
                .await
                .map_err(|e| e.for_resource(resource_id(ROUTE_TABLE, &default_id)))?;

            info!("Adopting default route table {}", default_id);
            data.default_route_rules = Some(route_rules_to_config(&current.route_rules));
            data.id = Some(default_id);
            return self.update(data).await;
        }

        let details = create_details(data)?;
        let route_table = self
            .client
            .create_route_table(details)
            .await
            .map_err(|e| e.for_resource(ResourceId::new(ROUTE_TABLE)))?;
        data.default_route_rules = None;
        Ok(route_table)
    }

    async fn get(&self, data: &RouteTableData) -> ProviderResult<sdk::RouteTable> {
        let id = require_id(data, ROUTE_TABLE)?;
        let mut route_table = self
            .client
            .get_route_table(id)
            .await
            .map_err(|e| e.for_resource(resource_id(ROUTE_TABLE, id)))?;

        // A reverted default table still exists; report it as gone
        if data.default_id.is_some() && data.state == Some(LifecycleState::Terminated) {
            route_table.lifecycle_state = LifecycleState::Terminated;
        }
        Ok(route_table)
    }

    async fn update(&self, data: &RouteTableData) -> ProviderResult<sdk::RouteTable> {
        let id = require_id(data, ROUTE_TABLE)?;
        let details = update_details(data)?;
        self.client
            .update_route_table(id, details)
            .await
            .map_err(|e| e.for_resource(resource_id(ROUTE_TABLE, id)))
    }

    async fn delete(&self, data: &mut RouteTableData) -> ProviderResult<RemovalOutcome> {
        if data.default_id.is_some() {
            data.route_rules = data.default_route_rules.clone().unwrap_or_default();
            self.update(data).await?;
            data.state = Some(LifecycleState::Terminated);
            info!(
                "Reverted default route table {}",
                data.id.as_deref().unwrap_or_default()
            );
            return Ok(RemovalOutcome::Reverted);
        }

        let id = require_id(&*data, ROUTE_TABLE)?;
        self.client
            .delete_route_table(id)
            .await
            .map_err(|e| e.for_resource(resource_id(ROUTE_TABLE, id)))?;
        Ok(RemovalOutcome::Deleted)
    }

    fn set_data(&self, data: &mut RouteTableData, remote: &sdk::RouteTable) {
        data.compartment_id = Some(remote.compartment_id.clone());
        data.vcn_id = Some(remote.vcn_id.clone());
        data.display_name = Some(remote.display_name.clone());
        data.route_rules = route_rules_to_config(&remote.route_rules);
        data.state = Some(remote.lifecycle_state);
        data.time_created = Some(format_time(&remote.time_created));
        data.time_modified = remote.time_modified.as_ref().map(format_time);
    }
}
