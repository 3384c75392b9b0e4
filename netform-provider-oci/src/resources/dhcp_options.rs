//! oci_core_dhcp_options

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
use crate::schemas::network::DHCP_OPTIONS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOption {
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_dns_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_domain_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpOptionsData {
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
    pub options: Vec<DhcpOption>,
    /// Options of the default resource at adoption time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_options: Option<Vec<DhcpOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
}

impl ResourceData for DhcpOptionsData {
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
        self.default_options = prior.default_options.clone();
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

fn absent_if_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

pub fn build_dhcp_options(options: &[DhcpOption]) -> Vec<sdk::DhcpDnsOption> {
    options
        .iter()
        .map(|option| sdk::DhcpDnsOption {
            option_type: option.option_type.clone(),
            custom_dns_servers: absent_if_empty(&option.custom_dns_servers),
            server_type: option.server_type.clone(),
            search_domain_names: absent_if_empty(&option.search_domain_names),
        })
        .collect()
}

pub fn dhcp_options_to_config(options: &[sdk::DhcpDnsOption]) -> Vec<DhcpOption> {
    options
        .iter()
        .map(|option| DhcpOption {
            option_type: option.option_type.clone(),
            custom_dns_servers: option.custom_dns_servers.clone().unwrap_or_default(),
            server_type: option.server_type.clone(),
            search_domain_names: option.search_domain_names.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn create_details(data: &DhcpOptionsData) -> ProviderResult<sdk::CreateDhcpOptionsDetails> {
    Ok(sdk::CreateDhcpOptionsDetails {
        compartment_id: require_field(&data.compartment_id, "compartment_id", DHCP_OPTIONS)?
            .to_string(),
        vcn_id: require_field(&data.vcn_id, "vcn_id", DHCP_OPTIONS)?.to_string(),
        display_name: data.display_name.clone(),
        options: build_dhcp_options(&data.options),
    })
}

pub fn update_details(data: &DhcpOptionsData) -> sdk::UpdateDhcpOptionsDetails {
    sdk::UpdateDhcpOptionsDetails {
        display_name: data.display_name.clone(),
        options: build_dhcp_options(&data.options),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

pub struct DhcpOptionsCrud {
    client: Arc<dyn VirtualNetworkClient>,
}

impl DhcpOptionsCrud {
    pub fn new(client: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCrud for DhcpOptionsCrud {
    type Data = DhcpOptionsData;
    type Remote = sdk::DhcpOptions;

    fn resource_type(&self) -> &'static str {
        DHCP_OPTIONS
    }

    fn id<'a>(&self, remote: &'a sdk::DhcpOptions) -> &'a str {
        &remote.id
    }

    fn state(&self, remote: &sdk::DhcpOptions) -> LifecycleState {
        remote.lifecycle_state
    }

    async fn create(&self, data: &mut DhcpOptionsData) -> ProviderResult<sdk::DhcpOptions> {
        if let Some(default_id) = data.default_id.clone() {
            let current = self
                .client
                .get_dhcp_options(&default_id)
                .await
                .map_err(|e| e.for_resource(resource_id(DHCP_OPTIONS, &default_id)))?;

            info!("Adopting default DHCP options {}", default_id);
            data.default_options = Some(dhcp_options_to_config(&current.options));
            data.id = Some(default_id);
            return self.update(data).await;
        }

        let details = create_details(data)?;
        let dhcp_options = self
            .client
            .create_dhcp_options(details)
            .await
            .map_err(|e| e.for_resource(ResourceId::new(DHCP_OPTIONS)))?;
        data.default_options = None;
        Ok(dhcp_options)
    }

    async fn get(&self, data: &DhcpOptionsData) -> ProviderResult<sdk::DhcpOptions> {
        let id = require_id(data, DHCP_OPTIONS)?;
        let mut dhcp_options = self
            .client
            .get_dhcp_options(id)
            .await
            .map_err(|e| e.for_resource(resource_id(DHCP_OPTIONS, id)))?;

        if data.default_id.is_some() && data.state == Some(LifecycleState::Terminated) {
            dhcp_options.lifecycle_state = LifecycleState::Terminated;
        }
        Ok(dhcp_options)
    }

    async fn update(&self, data: &DhcpOptionsData) -> ProviderResult<sdk::DhcpOptions> {
        let id = require_id(data, DHCP_OPTIONS)?;
        self.client
            .update_dhcp_options(id, update_details(data))
            .await
            .map_err(|e| e.for_resource(resource_id(DHCP_OPTIONS, id)))
    }

    async fn delete(&self, data: &mut DhcpOptionsData) -> ProviderResult<RemovalOutcome> {
        if data.default_id.is_some() {
            data.options = data.default_options.clone().unwrap_or_default();
            self.update(data).await?;
            data.state = Some(LifecycleState::Terminated);
            info!(
                "Reverted default DHCP options {}",
                data.id.as_deref().unwrap_or_default()
            );
            return Ok(RemovalOutcome::Reverted);
        }

        let id = require_id(&*data, DHCP_OPTIONS)?;
        self.client
            .delete_dhcp_options(id)
            .await
            .map_err(|e| e.for_resource(resource_id(DHCP_OPTIONS, id)))?;
        Ok(RemovalOutcome::Deleted)
    }

    fn set_data(&self, data: &mut DhcpOptionsData, remote: &sdk::DhcpOptions) {
        data.compartment_id = Some(remote.compartment_id.clone());
        data.vcn_id = Some(remote.vcn_id.clone());
        data.display_name = Some(remote.display_name.clone());
        data.options = dhcp_options_to_config(&remote.options);
        data.state = Some(remote.lifecycle_state);
        data.time_created = Some(format_time(&remote.time_created));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;
    use netform_core::crud::{CrudOptions, create_resource, delete_resource, read_resource};

    const COMPARTMENT: &str = "ocid1.compartment.oc1..aaaa";

    fn dns(servers: &[&str]) -> DhcpOption {
        DhcpOption {
            option_type: "DomainNameServer".to_string(),
            custom_dns_servers: servers.iter().map(|s| s.to_string()).collect(),
            server_type: Some("CustomDnsServer".to_string()),
            search_domain_names: Vec::new(),
        }
    }

    fn search(domains: &[&str]) -> DhcpOption {
        DhcpOption {
            option_type: "SearchDomain".to_string(),
            custom_dns_servers: Vec::new(),
            server_type: None,
            search_domain_names: domains.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_lists_are_absent_in_requests() {
        let built = build_dhcp_options(&[search(&["example.com"])]);
        assert_eq!(built[0].custom_dns_servers, None);
        assert_eq!(
            built[0].search_domain_names,
            Some(vec!["example.com".to_string()])
        );
    }

    #[test]
    fn round_trip_preserves_options() {
        let cases = vec![
            vec![],
            vec![dns(&["10.0.0.2"])],
            vec![dns(&["10.0.0.2", "10.0.0.3"]), search(&["example.com"])],
        ];

        for options in cases {
            let built = build_dhcp_options(&options);
            assert_eq!(dhcp_options_to_config(&built), options);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn adoption_and_revert() {
        let client = Arc::new(MemoryClient::new());
        let vcn = client.create_vcn(COMPARTMENT, "10.0.0.0/16").await;
        let original = client
            .get_dhcp_options(&vcn.default_dhcp_options_id)
            .await
            .unwrap();

        let crd = DhcpOptionsCrud::new(client.clone());
        let mut data = DhcpOptionsData {
            default_id: Some(vcn.default_dhcp_options_id.clone()),
            options: vec![dns(&["10.0.0.2"]), search(&["example.com"])],
            ..Default::default()
        };

        create_resource(&crd, &mut data, &CrudOptions::default())
            .await
            .unwrap();
        assert_eq!(data.id.as_deref(), Some(vcn.default_dhcp_options_id.as_str()));
        assert_eq!(
            data.default_options,
            Some(dhcp_options_to_config(&original.options))
        );
        assert_eq!(data.options.len(), 2);

        let outcome = delete_resource(&crd, &mut data, &CrudOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, RemovalOutcome::Reverted);
        assert_eq!(client.call_count("DeleteDhcpOptions").await, 0);
        assert_eq!(Some(data.options.clone()), data.default_options);
        assert_eq!(data.state, Some(LifecycleState::Terminated));

        let restored = client
            .get_dhcp_options(&vcn.default_dhcp_options_id)
            .await
            .unwrap();
        assert_eq!(restored.options, original.options);
    }

    #[tokio::test]
    async fn failed_adoption_leaves_data_untouched() {
        let client = Arc::new(MemoryClient::new());
        let crd = DhcpOptionsCrud::new(client.clone());
        let mut data = DhcpOptionsData {
            default_id: Some("ocid1.dhcpoptions.oc1..missing".to_string()),
            options: vec![dns(&["10.0.0.2"])],
            ..Default::default()
        };
        let original = data.clone();

        let err = crd.create(&mut data).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(data, original);
        assert_eq!(client.call_count("UpdateDhcpOptions").await, 0);
    }

    #[tokio::test]
    async fn reverted_default_options_read_as_terminated() {
        let client = Arc::new(MemoryClient::new());
        let vcn = client.create_vcn(COMPARTMENT, "10.0.0.0/16").await;
        let crd = DhcpOptionsCrud::new(client.clone());
        let mut data = DhcpOptionsData {
            id: Some(vcn.default_dhcp_options_id.clone()),
            default_id: Some(vcn.default_dhcp_options_id.clone()),
            default_options: Some(Vec::new()),
            state: Some(LifecycleState::Terminated),
            ..Default::default()
        };

        let remote = crd.get(&data).await.unwrap();
        assert_eq!(remote.lifecycle_state, LifecycleState::Terminated);

        assert!(!read_resource(&crd, &mut data).await.unwrap());
        assert!(data.id.is_none());

        // The resource itself is untouched
        let remote = client
            .get_dhcp_options(&vcn.default_dhcp_options_id)
            .await
            .unwrap();
        assert_eq!(remote.lifecycle_state, LifecycleState::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn new_options_are_created_and_deleted() {
        let client = Arc::new(MemoryClient::new());
        let vcn = client.create_vcn(COMPARTMENT, "10.0.0.0/16").await;
        let crd = DhcpOptionsCrud::new(client.clone());
        let mut data = DhcpOptionsData {
            compartment_id: Some(COMPARTMENT.to_string()),
            vcn_id: Some(vcn.id.clone()),
            options: vec![dns(&["10.0.0.2"])],
            ..Default::default()
        };

        create_resource(&crd, &mut data, &CrudOptions::default())
            .await
            .unwrap();
        assert_eq!(data.state, Some(LifecycleState::Available));
        assert!(data.display_name.is_some());
        assert_eq!(data.default_options, None);

        delete_resource(&crd, &mut data, &CrudOptions::default())
            .await
            .unwrap();
        assert_eq!(client.call_count("DeleteDhcpOptions").await, 1);
        assert_eq!(data.options, vec![dns(&["10.0.0.2"])]);
    }

    #[test]
    fn missing_type_is_a_deserialization_error() {
        let result: Result<DhcpOptionsData, _> =
            serde_json::from_value(serde_json::json!({"options": [{"server_type": "VcnLocal"}]}));
        assert!(result.is_err());
    }
}
