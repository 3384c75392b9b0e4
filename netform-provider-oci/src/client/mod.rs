//! OCI API clients
//!
//! The provider talks to OCI through the [`VirtualNetworkClient`] and
//! [`IdentityClient`] traits. Transport and request signing live behind these
//! traits; [`MemoryClient`] is a self-contained implementation that keeps every
//! resource in process.

pub mod memory;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use netform_core::provider::{ErrorKind, ProviderError};
use netform_core::resource::ResourceId;
use thiserror::Error;

pub use memory::MemoryClient;
use models::*;

/// Error returned by an OCI API call
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service error {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// Convert into a provider error attributed to `id`
    pub fn for_resource(self, id: ResourceId) -> ProviderError {
        ProviderError::from(self).for_resource(id)
    }
}

impl From<ClientError> for ProviderError {
    fn from(e: ClientError) -> Self {
        let kind = if e.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Api
        };
        ProviderError::new(e.to_string())
            .with_kind(kind)
            .with_cause(e)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Core networking API (DHCP options, route tables, security lists)
#[async_trait]
pub trait VirtualNetworkClient: Send + Sync {
    async fn get_dhcp_options(&self, id: &str) -> ClientResult<DhcpOptions>;

    async fn create_dhcp_options(
        &self,
        details: CreateDhcpOptionsDetails,
    ) -> ClientResult<DhcpOptions>;

    async fn update_dhcp_options(
        &self,
        id: &str,
        details: UpdateDhcpOptionsDetails,
    ) -> ClientResult<DhcpOptions>;

    async fn delete_dhcp_options(&self, id: &str) -> ClientResult<()>;

    async fn get_route_table(&self, id: &str) -> ClientResult<RouteTable>;

    async fn create_route_table(&self, details: CreateRouteTableDetails)
    -> ClientResult<RouteTable>;

    async fn update_route_table(
        &self,
        id: &str,
        details: UpdateRouteTableDetails,
    ) -> ClientResult<RouteTable>;

    async fn delete_route_table(&self, id: &str) -> ClientResult<()>;

    async fn get_security_list(&self, id: &str) -> ClientResult<SecurityList>;

    async fn create_security_list(
        &self,
        details: CreateSecurityListDetails,
    ) -> ClientResult<SecurityList>;

    async fn update_security_list(
        &self,
        id: &str,
        details: UpdateSecurityListDetails,
    ) -> ClientResult<SecurityList>;

    async fn delete_security_list(&self, id: &str) -> ClientResult<()>;
}

/// Identity API (policies)
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn get_policy(&self, id: &str) -> ClientResult<Policy>;

    async fn create_policy(&self, details: CreatePolicyDetails) -> ClientResult<Policy>;

    async fn update_policy(&self, id: &str, details: UpdatePolicyDetails) -> ClientResult<Policy>;

    async fn delete_policy(&self, id: &str) -> ClientResult<()>;

    async fn list_policies(&self, compartment_id: &str) -> ClientResult<Vec<Policy>>;
}

/// Client handles shared by all resource handlers
#[derive(Clone)]
pub struct OciClients {
    pub virtual_network: Arc<dyn VirtualNetworkClient>,
    pub identity: Arc<dyn IdentityClient>,
}

impl OciClients {
    pub fn new(
        virtual_network: Arc<dyn VirtualNetworkClient>,
        identity: Arc<dyn IdentityClient>,
    ) -> Self {
        Self {
            virtual_network,
            identity,
        }
    }

    /// Both APIs served by one in-memory client
    pub fn memory(client: Arc<MemoryClient>) -> Self {
        Self {
            virtual_network: client.clone(),
            identity: client,
        }
    }
}
