//! Request and response models of the OCI core and identity APIs
//!
//! Field names follow the API's camelCase JSON. Optional sub-structures are
//! omitted from the JSON when absent.

use chrono::{DateTime, Utc};
use netform_core::resource::LifecycleState;
use serde::{Deserialize, Serialize};

// =============================================================================
// DHCP Options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpDnsOption {
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dns_servers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_domain_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    pub id: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub options: Vec<DhcpDnsOption>,
    pub lifecycle_state: LifecycleState,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDhcpOptionsDetails {
    pub compartment_id: String,
    pub vcn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub options: Vec<DhcpDnsOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDhcpOptionsDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub options: Vec<DhcpDnsOption>,
}

// =============================================================================
// Route Tables
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    #[serde(default)]
    pub cidr_block: String,
    #[serde(default)]
    pub network_entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    pub id: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub route_rules: Vec<RouteRule>,
    pub lifecycle_state: LifecycleState,
    pub time_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteTableDetails {
    pub compartment_id: String,
    pub vcn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub route_rules: Vec<RouteRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteTableDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub route_rules: Vec<RouteRule>,
}

// =============================================================================
// Security Lists
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpOptions {
    pub destination_port_range: PortRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdpOptions {
    pub destination_port_range: PortRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcmpOptions {
    #[serde(rename = "type")]
    pub icmp_type: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EgressSecurityRule {
    pub destination: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_options: Option<IcmpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_options: Option<TcpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_options: Option<UdpOptions>,
    #[serde(default)]
    pub is_stateless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSecurityRule {
    pub source: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_options: Option<IcmpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_options: Option<TcpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp_options: Option<UdpOptions>,
    #[serde(default)]
    pub is_stateless: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityList {
    pub id: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub egress_security_rules: Vec<EgressSecurityRule>,
    pub ingress_security_rules: Vec<IngressSecurityRule>,
    pub lifecycle_state: LifecycleState,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecurityListDetails {
    pub compartment_id: String,
    pub vcn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub egress_security_rules: Vec<EgressSecurityRule>,
    pub ingress_security_rules: Vec<IngressSecurityRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSecurityListDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub egress_security_rules: Vec<EgressSecurityRule>,
    pub ingress_security_rules: Vec<IngressSecurityRule>,
}

// =============================================================================
// Identity Policies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub compartment_id: String,
    pub name: String,
    pub description: String,
    pub statements: Vec<String>,
    pub lifecycle_state: LifecycleState,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyDetails {
    pub compartment_id: String,
    pub name: String,
    pub description: String,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicyDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Vec<String>>,
}

// =============================================================================
// VCN
// =============================================================================

/// A virtual cloud network and the default resources created along with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vcn {
    pub id: String,
    pub compartment_id: String,
    pub cidr_block: String,
    pub default_dhcp_options_id: String,
    pub default_route_table_id: String,
    pub default_security_list_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn security_rule_uses_api_field_names() {
        let rule = IngressSecurityRule {
            source: "0.0.0.0/0".to_string(),
            protocol: "6".to_string(),
            icmp_options: None,
            tcp_options: Some(TcpOptions {
                destination_port_range: PortRange { min: 80, max: 80 },
            }),
            udp_options: None,
            is_stateless: false,
        };

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "source": "0.0.0.0/0",
                "protocol": "6",
                "tcpOptions": {"destinationPortRange": {"min": 80, "max": 80}},
                "isStateless": false
            })
        );
    }

    #[test]
    fn dhcp_option_omits_absent_lists() {
        let option = DhcpDnsOption {
            option_type: "DomainNameServer".to_string(),
            custom_dns_servers: None,
            server_type: Some("VcnLocalPlusInternet".to_string()),
            search_domain_names: None,
        };

        assert_eq!(
            serde_json::to_value(&option).unwrap(),
            json!({"type": "DomainNameServer", "serverType": "VcnLocalPlusInternet"})
        );
    }
}
