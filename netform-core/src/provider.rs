//! Provider - Trait abstracting resource operations
//!
//! A Provider exposes the resource types of one cloud (OCI, ...) to an
//! infrastructure-as-code host. The host speaks JSON: configuration comes in as
//! a JSON object and persisted state goes back out as one.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::resource::ResourceId;
use crate::schema::ResourceSchema;

/// Category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The cloud API rejected or failed the call
    Api,
    /// The cloud API reports the resource does not exist
    NotFound,
    /// The configuration was rejected before any API call
    InvalidConfig,
    /// A wait for a target lifecycle state ran out of time
    Timeout,
    /// The resource reached a state outside the expected pending/target sets
    UnexpectedState,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Api,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::NotFound)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::InvalidConfig)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::Timeout)
    }

    pub fn unexpected_state(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::UnexpectedState)
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "oci_core_route_table")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects. State values are the
/// JSON form of the resource data the provider persisted last time.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "oci")
    fn name(&self) -> &'static str;

    /// Managed resource types
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Read-only data source types
    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Create a resource and return its state
    fn create(&self, resource_type: &str, config: &Value) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Refresh a resource
    ///
    /// Returns `None` once the resource no longer exists.
    fn read(
        &self,
        resource_type: &str,
        state: &Value,
    ) -> BoxFuture<'_, ProviderResult<Option<Value>>>;

    /// Update a resource in place
    fn update(
        &self,
        resource_type: &str,
        prior: &Value,
        config: &Value,
    ) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Adopt an existing resource into management by its identifier
    ///
    /// Only resource types whose schema is importable accept this. Returns
    /// `None` when no resource has that identifier.
    fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> BoxFuture<'_, ProviderResult<Option<Value>>>;

    /// Remove a resource
    fn delete(&self, resource_type: &str, state: &Value) -> BoxFuture<'_, ProviderResult<()>>;

    /// Read a data source
    fn read_data_source(
        &self,
        data_source_type: &str,
        config: &Value,
    ) -> BoxFuture<'_, ProviderResult<Value>>;
}
