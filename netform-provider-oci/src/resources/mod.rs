//! Resource types of the OCI provider
//!
//! Each submodule holds the typed data of one resource, the mapping functions
//! between that data and the API models, and its lifecycle handler.

pub mod dhcp_options;
pub mod identity_policy_datasource;
pub mod policy;
pub mod route_table;
pub mod security_list;

use chrono::{DateTime, SecondsFormat, Utc};
use netform_core::provider::{ProviderError, ProviderResult, ResourceType};
use netform_core::resource::{ResourceData, ResourceId};
use netform_core::schema::ResourceSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schemas::{identity, network};

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(DhcpOptionsType, network::DHCP_OPTIONS, network::dhcp_options_schema);
define_resource_type!(RouteTableType, network::ROUTE_TABLE, network::route_table_schema);
define_resource_type!(SecurityListType, network::SECURITY_LIST, network::security_list_schema);
define_resource_type!(PolicyType, identity::POLICY, identity::policy_schema);
define_resource_type!(PoliciesType, identity::POLICIES, identity::policies_schema);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(DhcpOptionsType),
        Box::new(RouteTableType),
        Box::new(SecurityListType),
        Box::new(PolicyType),
    ]
}

/// Returns all data source types supported by this provider
pub fn data_source_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(PoliciesType)]
}

// =============================================================================
// Request Preview
// =============================================================================

/// Build the API request a configuration would produce, without calling the API.
///
/// A configuration with `default_id` adopts an existing resource, so it yields
/// an update request; any other yields a create request.
pub fn build_request(resource_type: &str, config: &Value) -> ProviderResult<Value> {
    validate_config(resource_type, config)?;

    match resource_type {
        network::DHCP_OPTIONS => {
            let data: dhcp_options::DhcpOptionsData = parse_data(resource_type, config)?;
            if data.default_id.is_some() {
                to_json(resource_type, &dhcp_options::update_details(&data))
            } else {
                to_json(resource_type, &dhcp_options::create_details(&data)?)
            }
        }
        network::ROUTE_TABLE => {
            let data: route_table::RouteTableData = parse_data(resource_type, config)?;
            if data.default_id.is_some() {
                to_json(resource_type, &route_table::update_details(&data)?)
            } else {
                to_json(resource_type, &route_table::create_details(&data)?)
            }
        }
        network::SECURITY_LIST => {
            let data: security_list::SecurityListData = parse_data(resource_type, config)?;
            if data.default_id.is_some() {
                to_json(resource_type, &security_list::update_details(&data))
            } else {
                to_json(resource_type, &security_list::create_details(&data)?)
            }
        }
        identity::POLICY => {
            let data: policy::PolicyData = parse_data(resource_type, config)?;
            to_json(resource_type, &policy::create_details(&data))
        }
        other => Err(unknown_type(other)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn unknown_type(resource_type: &str) -> ProviderError {
    ProviderError::invalid_config(format!("Unknown resource type: {}", resource_type))
}

/// Check a configuration against the schema of its resource type
pub fn validate_config(resource_type: &str, config: &Value) -> ProviderResult<()> {
    let schema =
        crate::schemas::find_schema(resource_type).ok_or_else(|| unknown_type(resource_type))?;
    let map = config.as_object().ok_or_else(|| {
        ProviderError::invalid_config("Configuration must be an object")
            .for_resource(ResourceId::new(resource_type))
    })?;

    schema.validate(map).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ProviderError::invalid_config(messages.join("; "))
            .for_resource(ResourceId::new(resource_type))
    })
}

pub(crate) fn parse_data<T: DeserializeOwned>(
    resource_type: &str,
    value: &Value,
) -> ProviderResult<T> {
    T::deserialize(value).map_err(|e| {
        ProviderError::invalid_config(format!("Invalid configuration: {}", e))
            .for_resource(ResourceId::new(resource_type))
            .with_cause(e)
    })
}

pub(crate) fn to_json<T: Serialize>(resource_type: &str, value: &T) -> ProviderResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        ProviderError::new(format!("Failed to serialize: {}", e))
            .for_resource(ResourceId::new(resource_type))
            .with_cause(e)
    })
}

pub(crate) fn resource_id(resource_type: &str, identifier: &str) -> ResourceId {
    ResourceId::new(resource_type).with_identifier(identifier)
}

/// Identifier of data that has been created or adopted
pub(crate) fn require_id<'a, D: ResourceData>(
    data: &'a D,
    resource_type: &str,
) -> ProviderResult<&'a str> {
    data.id().ok_or_else(|| {
        ProviderError::invalid_config("Resource has no id")
            .for_resource(ResourceId::new(resource_type))
    })
}

/// Value of a field needed to create a resource
pub(crate) fn require_field<'a>(
    value: &'a Option<String>,
    name: &str,
    resource_type: &str,
) -> ProviderResult<&'a str> {
    value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
        ProviderError::invalid_config(format!(
            "'{}' is required unless 'default_id' is set",
            name
        ))
        .for_resource(ResourceId::new(resource_type))
    })
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Deserialize a list whose elements may be `null`; a `null` element becomes
/// the element type's default value and a `null` list becomes empty.
pub(crate) fn null_elements_as_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}
