//! OCI Provider implementation
//!
//! Converts the JSON configuration and state the host exchanges into typed
//! resource data, and runs the matching lifecycle handler through the CRUD
//! driver.

use log::debug;
use netform_core::crud::{self, CrudOptions, DataSourceCrud, RemovalOutcome, ResourceCrud};
use netform_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use netform_core::resource::ResourceData;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::OciClients;
use crate::config::{ProviderConfig, TimeoutsConfig};
use crate::resources::dhcp_options::DhcpOptionsCrud;
use crate::resources::identity_policy_datasource::IdentityPoliciesCrud;
use crate::resources::policy::PolicyCrud;
use crate::resources::route_table::RouteTableCrud;
use crate::resources::security_list::SecurityListCrud;
use crate::resources::{
    data_source_types, parse_data, resource_types, to_json, unknown_type, validate_config,
};
use crate::schemas::{find_schema, identity, network};

/// OCI Provider
pub struct OciProvider {
    clients: OciClients,
    options: CrudOptions,
    /// Configured overrides of the timeouts each schema declares
    timeouts: Option<TimeoutsConfig>,
}

impl OciProvider {
    pub fn new(clients: OciClients) -> Self {
        Self {
            clients,
            options: CrudOptions::default(),
            timeouts: None,
        }
    }

    /// Provider using the timeouts of `config`
    pub fn with_config(clients: OciClients, config: &ProviderConfig) -> Self {
        Self {
            clients,
            options: CrudOptions::default(),
            timeouts: config.timeouts.clone(),
        }
    }

    /// Replace the base options (poll interval, settling wait and the
    /// timeouts of types that declare none)
    pub fn with_options(mut self, options: CrudOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CrudOptions {
        &self.options
    }

    /// Options for one resource type: its declared timeouts with the
    /// configured values on top
    pub fn options_for(&self, resource_type: &str) -> CrudOptions {
        let declared = find_schema(resource_type)
            .and_then(|s| s.timeouts)
            .unwrap_or(self.options.timeouts);
        let timeouts = self
            .timeouts
            .as_ref()
            .map_or(declared, |t| t.apply(declared));
        self.options.clone().with_timeouts(timeouts)
    }
}

/// Run `$body` with `$crd` bound to the handler of `$resource_type`
macro_rules! with_crud {
    ($self:ident, $resource_type:expr, |$crd:ident| $body:expr) => {
        match $resource_type {
            network::DHCP_OPTIONS => {
                let $crd = DhcpOptionsCrud::new($self.clients.virtual_network.clone());
                $body
            }
            network::ROUTE_TABLE => {
                let $crd = RouteTableCrud::new($self.clients.virtual_network.clone());
                $body
            }
            network::SECURITY_LIST => {
                let $crd = SecurityListCrud::new($self.clients.virtual_network.clone());
                $body
            }
            identity::POLICY => {
                let $crd = PolicyCrud::new($self.clients.identity.clone());
                $body
            }
            other => Err(unknown_type(other)),
        }
    };
}

async fn create_with<C>(crd: &C, config: &Value, options: &CrudOptions) -> ProviderResult<Value>
where
    C: ResourceCrud,
    C::Data: Serialize + DeserializeOwned,
{
    validate_config(crd.resource_type(), config)?;
    let mut data: C::Data = parse_data(crd.resource_type(), config)?;
    crud::create_resource(crd, &mut data, options).await?;
    to_json(crd.resource_type(), &data)
}

async fn read_with<C>(crd: &C, state: &Value) -> ProviderResult<Option<Value>>
where
    C: ResourceCrud,
    C::Data: Serialize + DeserializeOwned,
{
    let mut data: C::Data = parse_data(crd.resource_type(), state)?;
    if crud::read_resource(crd, &mut data).await? {
        to_json(crd.resource_type(), &data).map(Some)
    } else {
        Ok(None)
    }
}

async fn update_with<C>(
    crd: &C,
    prior: &Value,
    config: &Value,
    options: &CrudOptions,
) -> ProviderResult<Value>
where
    C: ResourceCrud,
    C::Data: Serialize + DeserializeOwned,
{
    validate_config(crd.resource_type(), config)?;
    let prior: C::Data = parse_data(crd.resource_type(), prior)?;
    let mut data: C::Data = parse_data(crd.resource_type(), config)?;
    data.merge_computed(&prior);
    crud::update_resource(crd, &mut data, options).await?;
    to_json(crd.resource_type(), &data)
}

async fn delete_with<C>(crd: &C, state: &Value, options: &CrudOptions) -> ProviderResult<()>
where
    C: ResourceCrud,
    C::Data: DeserializeOwned,
{
    let mut data: C::Data = parse_data(crd.resource_type(), state)?;
    let outcome = crud::delete_resource(crd, &mut data, options).await?;
    if outcome == RemovalOutcome::Reverted {
        debug!("{} was reverted instead of deleted", crd.resource_type());
    }
    Ok(())
}

async fn read_data_source_with<D>(
    crd: &D,
    type_name: &str,
    config: &Value,
) -> ProviderResult<Value>
where
    D: DataSourceCrud,
    D::Data: Serialize + DeserializeOwned,
{
    validate_config(type_name, config)?;
    let mut data: D::Data = parse_data(type_name, config)?;
    crud::read_data_source(crd, &mut data).await?;
    to_json(type_name, &data)
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for OciProvider {
    fn name(&self) -> &'static str {
        "oci"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        data_source_types()
    }

    fn create(&self, resource_type: &str, config: &Value) -> BoxFuture<'_, ProviderResult<Value>> {
        let resource_type = resource_type.to_string();
        let config = config.clone();
        Box::pin(async move {
            let options = self.options_for(&resource_type);
            with_crud!(self, resource_type.as_str(), |crd| {
                create_with(&crd, &config, &options).await
            })
        })
    }

    fn read(
        &self,
        resource_type: &str,
        state: &Value,
    ) -> BoxFuture<'_, ProviderResult<Option<Value>>> {
        let resource_type = resource_type.to_string();
        let state = state.clone();
        Box::pin(async move {
            with_crud!(self, resource_type.as_str(), |crd| {
                read_with(&crd, &state).await
            })
        })
    }

    fn update(
        &self,
        resource_type: &str,
        prior: &Value,
        config: &Value,
    ) -> BoxFuture<'_, ProviderResult<Value>> {
        let resource_type = resource_type.to_string();
        let prior = prior.clone();
        let config = config.clone();
        Box::pin(async move {
            let options = self.options_for(&resource_type);
            with_crud!(self, resource_type.as_str(), |crd| {
                update_with(&crd, &prior, &config, &options).await
            })
        })
    }

    fn delete(&self, resource_type: &str, state: &Value) -> BoxFuture<'_, ProviderResult<()>> {
        let resource_type = resource_type.to_string();
        let state = state.clone();
        Box::pin(async move {
            let options = self.options_for(&resource_type);
            with_crud!(self, resource_type.as_str(), |crd| {
                delete_with(&crd, &state, &options).await
            })
        })
    }

    fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> BoxFuture<'_, ProviderResult<Option<Value>>> {
        let resource_type = resource_type.to_string();
        let state = json!({ "id": id });
        Box::pin(async move {
            match find_schema(&resource_type) {
                Some(schema) if schema.importable => {}
                Some(_) => {
                    return Err(ProviderError::invalid_config(format!(
                        "{} cannot be imported",
                        resource_type
                    )));
                }
                None => return Err(unknown_type(&resource_type)),
            }
            debug!("Importing {} {}", resource_type, state["id"]);
            with_crud!(self, resource_type.as_str(), |crd| {
                read_with(&crd, &state).await
            })
        })
    }

    fn read_data_source(
        &self,
        data_source_type: &str,
        config: &Value,
    ) -> BoxFuture<'_, ProviderResult<Value>> {
        let data_source_type = data_source_type.to_string();
        let config = config.clone();
        Box::pin(async move {
            match data_source_type.as_str() {
                identity::POLICIES => {
                    let crd = IdentityPoliciesCrud::new(self.clients.identity.clone());
                    read_data_source_with(&crd, identity::POLICIES, &config).await
                }
                other => Err(unknown_type(other)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;
    use crate::client::models::Vcn;
    use crate::client::VirtualNetworkClient;
    use netform_core::crud::Timeouts;
    use netform_core::provider::ErrorKind;
    use netform_core::resource::LifecycleState;
    use std::sync::Arc;
    use std::time::Duration;

    const COMPARTMENT: &str = "ocid1.compartment.oc1..aaaa";

    async fn setup() -> (OciProvider, Arc<MemoryClient>, Vcn) {
        let client = Arc::new(MemoryClient::new());
        let vcn = client.create_vcn(COMPARTMENT, "10.0.0.0/16").await;
        (OciProvider::new(OciClients::memory(client.clone())), client, vcn)
    }

    #[tokio::test(start_paused = true)]
    async fn security_list_round_trip_through_json() {
        let (provider, _client, vcn) = setup().await;
        let config = json!({
            "compartment_id": COMPARTMENT,
            "vcn_id": vcn.id,
            "display_name": "web",
            "egress_security_rules": [{"destination": "0.0.0.0/0", "protocol": "all"}],
            "ingress_security_rules": [
                {"source": "0.0.0.0/0", "protocol": "6", "tcp_options": {"min": 443, "max": 443}}
            ]
        });

        let state = provider
            .create(network::SECURITY_LIST, &config)
            .await
            .unwrap();
        assert_eq!(state["state"], "AVAILABLE");
        assert_eq!(state["display_name"], "web");
        assert_eq!(
            state["ingress_security_rules"],
            json!([{
                "source": "0.0.0.0/0",
                "protocol": "6",
                "tcp_options": {"min": 443, "max": 443},
                "stateless": false
            }])
        );
        assert!(state.get("default_ingress_security_rules").is_none());

        let refreshed = provider
            .read(network::SECURITY_LIST, &state)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed["id"], state["id"]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_makes_no_api_call() {
        let (provider, client, vcn) = setup().await;
        let before = client.calls().await.len();

        let err = provider
            .create(
                network::ROUTE_TABLE,
                &json!({
                    "compartment_id": COMPARTMENT,
                    "vcn_id": vcn.id,
                    "route_rules": [{}]
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "Empty route_rules are not permitted. Instead, the route_rules block may be omitted entirely."
        );

        let err = provider
            .create(
                network::ROUTE_TABLE,
                &json!({"default_id": vcn.default_route_table_id, "vcn_id": vcn.id}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);

        assert_eq!(client.calls().await.len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn default_route_table_full_lifecycle() {
        let (provider, client, vcn) = setup().await;
        let config = json!({
            "default_id": vcn.default_route_table_id,
            "route_rules": [
                {"cidr_block": "0.0.0.0/0", "network_entity_id": "ocid1.internetgateway.oc1..aaaa"}
            ]
        });

        let state = provider.create(network::ROUTE_TABLE, &config).await.unwrap();
        assert_eq!(state["id"], json!(vcn.default_route_table_id));
        assert_eq!(state["default_route_rules"], json!([]));
        assert_eq!(state["compartment_id"], COMPARTMENT);

        let updated_config = json!({
            "default_id": vcn.default_route_table_id,
            "display_name": "main",
            "route_rules": []
        });
        let state = provider
            .update(network::ROUTE_TABLE, &state, &updated_config)
            .await
            .unwrap();
        assert_eq!(state["display_name"], "main");
        assert_eq!(state["default_route_rules"], json!([]));
        assert_eq!(state["id"], json!(vcn.default_route_table_id));

        provider.delete(network::ROUTE_TABLE, &state).await.unwrap();
        assert_eq!(client.call_count("DeleteRouteTable").await, 0);

        let remote = client
            .get_route_table(&vcn.default_route_table_id)
            .await
            .unwrap();
        assert_eq!(remote.lifecycle_state, LifecycleState::Available);

        // A host that re-reads the persisted terminated state sees it gone
        let mut terminated = state.clone();
        terminated["state"] = json!("TERMINATED");
        assert!(
            provider
                .read(network::ROUTE_TABLE, &terminated)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_of_deleted_resource_is_none() {
        let (provider, _client, vcn) = setup().await;
        let state = provider
            .create(
                network::DHCP_OPTIONS,
                &json!({
                    "compartment_id": COMPARTMENT,
                    "vcn_id": vcn.id,
                    "options": [{"type": "DomainNameServer", "server_type": "VcnLocalPlusInternet"}]
                }),
            )
            .await
            .unwrap();

        provider.delete(network::DHCP_OPTIONS, &state).await.unwrap();
        assert!(
            provider
                .read(network::DHCP_OPTIONS, &state)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn policies_data_source() {
        let (provider, _client, _vcn) = setup().await;
        provider
            .create(
                identity::POLICY,
                &json!({
                    "compartment_id": COMPARTMENT,
                    "name": "network-admins",
                    "description": "Network administrators",
                    "statements": ["Allow group NetworkAdmins to manage virtual-network-family in tenancy"]
                }),
            )
            .await
            .unwrap();

        let result = provider
            .read_data_source(identity::POLICIES, &json!({"compartment_id": COMPARTMENT}))
            .await
            .unwrap();
        assert_eq!(result["policies"][0]["name"], "network-admins");
        assert_eq!(result["policies"][0]["state"], "ACTIVE");

        let err = provider
            .read_data_source("oci_core_vcns", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
    }

    #[tokio::test(start_paused = true)]
    async fn import_default_route_table_by_id() {
        let (provider, client, vcn) = setup().await;

        let state = provider
            .import(network::ROUTE_TABLE, &vcn.default_route_table_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["id"], json!(vcn.default_route_table_id));
        assert_eq!(state["state"], "AVAILABLE");
        assert_eq!(state["compartment_id"], COMPARTMENT);
        assert_eq!(state["vcn_id"], json!(vcn.id));
        assert_eq!(client.call_count("UpdateRouteTable").await, 0);

        let missing = provider
            .import(network::ROUTE_TABLE, "ocid1.routetable.oc1..missing")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn import_policy_by_id() {
        let (provider, _client, _vcn) = setup().await;
        let created = provider
            .create(
                identity::POLICY,
                &json!({
                    "compartment_id": COMPARTMENT,
                    "name": "auditors",
                    "description": "Read-only audit access",
                    "statements": ["Allow group Auditors to read all-resources in tenancy"]
                }),
            )
            .await
            .unwrap();

        let id = created["id"].as_str().unwrap();
        let imported = provider
            .import(identity::POLICY, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(imported, created);
    }

    #[tokio::test]
    async fn import_rejects_data_sources_and_unknown_types() {
        let (provider, client, _vcn) = setup().await;
        let before = client.calls().await.len();

        let err = provider
            .import(identity::POLICIES, "ocid1.policy.oc1..aaaa")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfig);
        assert_eq!(err.message, "oci_identity_policies cannot be imported");

        let err = provider
            .import("oci_core_vcn", "ocid1.vcn.oc1..aaaa")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unknown resource type: oci_core_vcn");

        assert_eq!(client.calls().await.len(), before);
    }

    #[test]
    fn configured_timeouts_override_declared_ones() {
        let clients = OciClients::memory(Arc::new(MemoryClient::new()));
        let config = ProviderConfig {
            tenancy_ocid: "ocid1.tenancy.oc1..aaaa".to_string(),
            user_ocid: "ocid1.user.oc1..aaaa".to_string(),
            fingerprint: "aa:bb".to_string(),
            private_key_path: "/tmp/key.pem".into(),
            private_key_password: None,
            region: "us-ashburn-1".to_string(),
            timeouts: Some(TimeoutsConfig {
                create: Some(5),
                update: None,
                delete: None,
            }),
        };

        let declared = find_schema(network::ROUTE_TABLE)
            .and_then(|s| s.timeouts)
            .unwrap();
        let options = OciProvider::with_config(clients, &config).options_for(network::ROUTE_TABLE);
        assert_eq!(options.timeouts.create, Duration::from_secs(300));
        assert_eq!(options.timeouts.update, declared.update);
        assert_eq!(options.timeouts.delete, declared.delete);
    }

    #[test]
    fn undeclared_timeouts_fall_back_to_base_options() {
        let base = Timeouts {
            create: Duration::from_secs(7),
            update: Duration::from_secs(8),
            delete: Duration::from_secs(9),
        };
        let provider = OciProvider::new(OciClients::memory(Arc::new(MemoryClient::new())))
            .with_options(CrudOptions::default().with_timeouts(base));

        assert_eq!(provider.options_for("oci_core_vcn").timeouts, base);
        assert_eq!(
            provider.options_for(network::SECURITY_LIST).timeouts,
            Timeouts::default()
        );
    }

    #[test]
    fn lists_types() {
        let provider = OciProvider::new(OciClients::memory(Arc::new(MemoryClient::new())));
        let names: Vec<&str> = provider.resource_types().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "oci_core_dhcp_options",
                "oci_core_route_table",
                "oci_core_security_list",
                "oci_identity_policy"
            ]
        );
        assert_eq!(provider.data_source_types()[0].name(), "oci_identity_policies");
    }
}
