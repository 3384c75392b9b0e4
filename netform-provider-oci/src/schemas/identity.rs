//! Identity schemas: policies and the policies data source

use netform_core::crud::Timeouts;
use netform_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use super::types::{ocid, string_list};

pub const POLICY: &str = "oci_identity_policy";
pub const POLICIES: &str = "oci_identity_policies";

fn policy_attributes() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("compartment_id", ocid())
            .required()
            .force_new()
            .with_description("The OCID of the compartment containing the policy."),
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .force_new()
            .with_description("The name of the policy, unique within the tenancy."),
        AttributeSchema::new("description", AttributeType::String).required(),
        AttributeSchema::new("statements", string_list())
            .required()
            .with_description("Policy statements written in the policy language."),
        AttributeSchema::new("id", AttributeType::String).computed(),
        AttributeSchema::new("state", AttributeType::String).computed(),
        AttributeSchema::new("time_created", AttributeType::String).computed(),
    ]
}

pub fn policy_schema() -> ResourceSchema {
    policy_attributes().into_iter().fold(
        ResourceSchema::new(POLICY)
            .with_description("An IAM policy granting groups access to resources.")
            .with_timeouts(Timeouts::default())
            .importable(),
        ResourceSchema::attribute,
    )
}

pub fn policies_schema() -> ResourceSchema {
    let policy = policy_attributes()
        .into_iter()
        .fold(BlockSchema::new(), BlockSchema::attribute);

    ResourceSchema::new(POLICIES)
        .with_description("Lists the policies in a compartment.")
        .attribute(AttributeSchema::new("compartment_id", ocid()).required())
        .attribute(
            AttributeSchema::new(
                "policies",
                AttributeType::List(Box::new(AttributeType::Block(policy))),
            )
            .computed(),
        )
}
