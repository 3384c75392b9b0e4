//! OCI resource schema definitions

pub mod identity;
pub mod network;
pub mod types;

use netform_core::schema::ResourceSchema;

/// Schemas of all managed resource types
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        network::dhcp_options_schema(),
        network::route_table_schema(),
        network::security_list_schema(),
        identity::policy_schema(),
    ]
}

/// Schemas of all data sources
pub fn data_source_schemas() -> Vec<ResourceSchema> {
    vec![identity::policies_schema()]
}

/// Schema of a resource type or data source by name
pub fn find_schema(type_name: &str) -> Option<ResourceSchema> {
    all_schemas()
        .into_iter()
        .chain(data_source_schemas())
        .find(|s| s.resource_type == type_name)
}
