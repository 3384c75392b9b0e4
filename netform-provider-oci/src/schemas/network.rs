//! Networking schemas: DHCP options, route tables, security lists

use netform_core::crud::Timeouts;
use netform_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::types::{default_resource_suppress_diff, icmp_number, ocid, string_list};

pub const DHCP_OPTIONS: &str = "oci_core_dhcp_options";
pub const ROUTE_TABLE: &str = "oci_core_route_table";
pub const SECURITY_LIST: &str = "oci_core_security_list";

/// Attributes every VCN-scoped resource with a default counterpart carries
fn vcn_scoped(resource_type: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .with_timeouts(Timeouts::default())
        .importable()
        .attribute(
            AttributeSchema::new("compartment_id", ocid())
                .force_new()
                .with_diff_suppress(default_resource_suppress_diff)
                .with_description("The OCID of the compartment to contain the resource."),
        )
        .attribute(
            AttributeSchema::new("vcn_id", ocid())
                .force_new()
                .with_diff_suppress(default_resource_suppress_diff)
                .with_description("The OCID of the VCN the resource belongs to."),
        )
        .attribute(
            AttributeSchema::new("default_id", ocid())
                .force_new()
                .conflicts_with(&["compartment_id", "vcn_id"])
                .with_description(
                    "The OCID of the VCN's default resource to adopt instead of creating one.",
                ),
        )
        .attribute(AttributeSchema::new("display_name", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("state", AttributeType::String).computed())
        .attribute(AttributeSchema::new("time_created", AttributeType::String).computed())
}

fn dhcp_option_block() -> AttributeType {
    AttributeType::Block(
        BlockSchema::new()
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .required()
                    .with_description("DomainNameServer or SearchDomain."),
            )
            .attribute(AttributeSchema::new("custom_dns_servers", string_list()))
            .attribute(AttributeSchema::new("server_type", AttributeType::String))
            .attribute(AttributeSchema::new("search_domain_names", string_list())),
    )
}

pub fn dhcp_options_schema() -> ResourceSchema {
    vcn_scoped(DHCP_OPTIONS)
        .with_description("A set of DHCP options used by instances in a VCN.")
        .attribute(
            AttributeSchema::new("options", AttributeType::List(Box::new(dhcp_option_block())))
                .required(),
        )
        .attribute(
            AttributeSchema::new(
                "default_options",
                AttributeType::List(Box::new(dhcp_option_block())),
            )
            .computed()
            .with_description("Options the default resource carried when it was adopted."),
        )
}

fn route_rule_block() -> AttributeType {
    AttributeType::Block(
        BlockSchema::new()
            .attribute(AttributeSchema::new("cidr_block", types::cidr()))
            .attribute(AttributeSchema::new("network_entity_id", ocid())),
    )
}

pub fn route_table_schema() -> ResourceSchema {
    vcn_scoped(ROUTE_TABLE)
        .with_description("A collection of rules routing packets from a VCN to a destination.")
        .attribute(AttributeSchema::new(
            "route_rules",
            AttributeType::List(Box::new(route_rule_block())),
        ))
        .attribute(
            AttributeSchema::new(
                "default_route_rules",
                AttributeType::List(Box::new(route_rule_block())),
            )
            .computed()
            .with_description("Rules the default resource carried when it was adopted."),
        )
        .attribute(AttributeSchema::new("time_modified", AttributeType::String).computed())
}

fn port_range_block() -> AttributeType {
    AttributeType::Block(
        BlockSchema::new()
            .attribute(AttributeSchema::new("min", types::port_number()).required())
            .attribute(AttributeSchema::new("max", types::port_number()).required()),
    )
}

fn icmp_options_block() -> AttributeType {
    AttributeType::Block(
        BlockSchema::new()
            .attribute(AttributeSchema::new("type", icmp_number()).required())
            .attribute(AttributeSchema::new("code", icmp_number())),
    )
}

fn security_rule_block(endpoint: &str) -> AttributeType {
    AttributeType::Block(
        BlockSchema::new()
            .attribute(AttributeSchema::new(endpoint, AttributeType::String).required())
            .attribute(
                AttributeSchema::new("protocol", AttributeType::String)
                    .required()
                    .with_description("IANA protocol number, or \"all\"."),
            )
            .attribute(AttributeSchema::new("icmp_options", icmp_options_block()))
            .attribute(AttributeSchema::new("tcp_options", port_range_block()))
            .attribute(AttributeSchema::new("udp_options", port_range_block()))
            .attribute(
                AttributeSchema::new("stateless", AttributeType::Bool)
                    .with_default(serde_json::Value::Bool(false)),
            ),
    )
}

pub fn security_list_schema() -> ResourceSchema {
    let egress = || AttributeType::List(Box::new(security_rule_block("destination")));
    let ingress = || AttributeType::List(Box::new(security_rule_block("source")));

    vcn_scoped(SECURITY_LIST)
        .with_description("Virtual firewall rules applied to the subnets of a VCN.")
        .attribute(AttributeSchema::new("egress_security_rules", egress()).required())
        .attribute(AttributeSchema::new("ingress_security_rules", ingress()).required())
        .attribute(
            AttributeSchema::new("default_egress_security_rules", egress())
                .computed()
                .with_description("Egress rules the default resource carried when it was adopted."),
        )
        .attribute(
            AttributeSchema::new("default_ingress_security_rules", ingress())
                .computed()
                .with_description(
                    "Ingress rules the default resource carried when it was adopted.",
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_id_conflicts_with_scope() {
        let config = json!({
            "default_id": "ocid1.routetable.oc1..aaaa",
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "route_rules": []
        });

        let errors = route_table_schema()
            .validate(config.as_object().unwrap())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("default_id"));
    }

    #[test]
    fn empty_route_rule_passes_schema_validation() {
        // Rejected later, when the request is built
        let config = json!({
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "vcn_id": "ocid1.vcn.oc1..aaaa",
            "route_rules": [null]
        });

        assert!(route_table_schema().validate(config.as_object().unwrap()).is_ok());
    }

    #[test]
    fn security_rule_ports_are_checked() {
        let config = json!({
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "vcn_id": "ocid1.vcn.oc1..aaaa",
            "egress_security_rules": [],
            "ingress_security_rules": [
                {"source": "0.0.0.0/0", "protocol": "6", "tcp_options": {"min": 0, "max": 80}}
            ]
        });

        assert!(security_list_schema().validate(config.as_object().unwrap()).is_err());
    }

    #[test]
    fn adopted_scope_changes_do_not_force_replacement() {
        let prior = json!({
            "default_id": "ocid1.dhcpoptions.oc1..aaaa",
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "vcn_id": "ocid1.vcn.oc1..aaaa"
        });
        let config = json!({"default_id": "ocid1.dhcpoptions.oc1..aaaa"});

        let replace = dhcp_options_schema()
            .requires_replacement(prior.as_object().unwrap(), config.as_object().unwrap());
        assert!(replace.is_empty());
    }

    #[test]
    fn computed_snapshot_cannot_be_configured() {
        let config = json!({
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "vcn_id": "ocid1.vcn.oc1..aaaa",
            "options": [],
            "default_options": []
        });

        assert!(dhcp_options_schema().validate(config.as_object().unwrap()).is_err());
    }
}
