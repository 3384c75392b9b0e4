//! oci_identity_policy

use std::sync::Arc;

use async_trait::async_trait;
use netform_core::crud::{RemovalOutcome, ResourceCrud};
use netform_core::provider::ProviderResult;
use netform_core::resource::{LifecycleState, ResourceData, ResourceId};
use serde::{Deserialize, Serialize};

use super::{format_time, require_id, resource_id};
use crate::client::IdentityClient;
use crate::client::models as sdk;
use crate::schemas::identity::POLICY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub compartment_id: String,
    pub name: String,
    pub description: String,
    pub statements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
}

impl ResourceData for PolicyData {
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
    }
}

pub fn create_details(data: &PolicyData) -> sdk::CreatePolicyDetails {
    sdk::CreatePolicyDetails {
        compartment_id: data.compartment_id.clone(),
        name: data.name.clone(),
        description: data.description.clone(),
        statements: data.statements.clone(),
    }
}

pub fn update_details(data: &PolicyData) -> sdk::UpdatePolicyDetails {
    sdk::UpdatePolicyDetails {
        description: Some(data.description.clone()),
        statements: Some(data.statements.clone()),
    }
}

pub fn policy_to_data(policy: &sdk::Policy) -> PolicyData {
    PolicyData {
        id: Some(policy.id.clone()),
        compartment_id: policy.compartment_id.clone(),
        name: policy.name.clone(),
        description: policy.description.clone(),
        statements: policy.statements.clone(),
        state: Some(policy.lifecycle_state),
        time_created: Some(format_time(&policy.time_created)),
    }
}

pub struct PolicyCrud {
    client: Arc<dyn IdentityClient>,
}

impl PolicyCrud {
    pub fn new(client: Arc<dyn IdentityClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceCrud for PolicyCrud {
    type Data = PolicyData;
    type Remote = sdk::Policy;

    fn resource_type(&self) -> &'static str {
        POLICY
    }

    fn id<'a>(&self, remote: &'a sdk::Policy) -> &'a str {
        &remote.id
    }

    fn state(&self, remote: &sdk::Policy) -> LifecycleState {
        remote.lifecycle_state
    }

    fn created_pending(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Creating]
    }

    fn created_target(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Active]
    }

    fn deleted_pending(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Deleting]
    }

    fn deleted_target(&self) -> &'static [LifecycleState] {
        &[LifecycleState::Deleted]
    }

    async fn create(&self, data: &mut PolicyData) -> ProviderResult<sdk::Policy> {
        self.client
            .create_policy(create_details(data))
            .await
            .map_err(|e| e.for_resource(ResourceId::new(POLICY)))
    }

    async fn get(&self, data: &PolicyData) -> ProviderResult<sdk::Policy> {
        let id = require_id(data, POLICY)?;
        self.client
            .get_policy(id)
            .await
            .map_err(|e| e.for_resource(resource_id(POLICY, id)))
    }

    async fn update(&self, data: &PolicyData) -> ProviderResult<sdk::Policy> {
        let id = require_id(data, POLICY)?;
        self.client
            .update_policy(id, update_details(data))
            .await
            .map_err(|e| e.for_resource(resource_id(POLICY, id)))
    }

    async fn delete(&self, data: &mut PolicyData) -> ProviderResult<RemovalOutcome> {
        let id = require_id(&*data, POLICY)?;
        self.client
            .delete_policy(id)
            .await
            .map_err(|e| e.for_resource(resource_id(POLICY, id)))?;
        Ok(RemovalOutcome::Deleted)
    }

    fn set_data(&self, data: &mut PolicyData, remote: &sdk::Policy) {
        *data = policy_to_data(remote);
    }
}
