//! oci_identity_policies data source

use std::sync::Arc;

use async_trait::async_trait;
use netform_core::crud::DataSourceCrud;
use netform_core::provider::ProviderResult;
use serde::{Deserialize, Serialize};

use super::policy::{PolicyData, policy_to_data};
use super::resource_id;
use crate::client::IdentityClient;
use crate::client::models as sdk;
use crate::schemas::identity::POLICIES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityPoliciesData {
    pub compartment_id: String,
    #[serde(default)]
    pub policies: Vec<PolicyData>,
}

pub struct IdentityPoliciesCrud {
    client: Arc<dyn IdentityClient>,
}

impl IdentityPoliciesCrud {
    pub fn new(client: Arc<dyn IdentityClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceCrud for IdentityPoliciesCrud {
    type Data = IdentityPoliciesData;
    type Remote = Vec<sdk::Policy>;

    async fn get(&self, data: &IdentityPoliciesData) -> ProviderResult<Vec<sdk::Policy>> {
        self.client
            .list_policies(&data.compartment_id)
            .await
            .map_err(|e| e.for_resource(resource_id(POLICIES, &data.compartment_id)))
    }

    fn set_data(&self, data: &mut IdentityPoliciesData, remote: &Vec<sdk::Policy>) {
        data.policies = remote.iter().map(policy_to_data).collect();
    }
}
