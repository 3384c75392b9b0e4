//! In-memory OCI client
//!
//! Resources live in process. Lifecycle transitions are observed through
//! reads: a newly created resource reports `PROVISIONING` (or `CREATING`) and
//! becomes `AVAILABLE` (`ACTIVE`) on the next get; a deleted one reports
//! `TERMINATED` (`DELETED`) on the next get. Default resources created with a
//! VCN refuse deletion, as the real API does.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use netform_core::resource::LifecycleState;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::*;
use super::{ClientError, ClientResult, IdentityClient, VirtualNetworkClient};

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub operation: &'static str,
    pub id: Option<String>,
}

trait Stored: Clone {
    const KIND: &'static str;

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState;
}

impl Stored for DhcpOptions {
    const KIND: &'static str = "DhcpOptions";

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle_state
    }
}

impl Stored for RouteTable {
    const KIND: &'static str = "RouteTable";

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle_state
    }
}

impl Stored for SecurityList {
    const KIND: &'static str = "SecurityList";

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle_state
    }
}

impl Stored for Policy {
    const KIND: &'static str = "Policy";

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle_state
    }
}

#[derive(Default)]
struct Inner {
    vcns: BTreeMap<String, Vcn>,
    dhcp_options: BTreeMap<String, DhcpOptions>,
    route_tables: BTreeMap<String, RouteTable>,
    security_lists: BTreeMap<String, SecurityList>,
    policies: BTreeMap<String, Policy>,
    defaults: HashSet<String>,
    calls: Vec<ApiCall>,
}

impl Inner {
    fn record(&mut self, operation: &'static str, id: Option<&str>) {
        debug!("{} {}", operation, id.unwrap_or("-"));
        self.calls.push(ApiCall {
            operation,
            id: id.map(str::to_string),
        });
    }

    fn check_vcn(&self, vcn_id: &str) -> ClientResult<()> {
        if self.vcns.contains_key(vcn_id) {
            Ok(())
        } else {
            Err(ClientError::NotFound {
                resource: "Vcn",
                id: vcn_id.to_string(),
            })
        }
    }

    fn check_deletable(&self, kind: &'static str, id: &str) -> ClientResult<()> {
        if self.defaults.contains(id) {
            Err(ClientError::Conflict(format!(
                "default {} {} cannot be deleted",
                kind, id
            )))
        } else {
            Ok(())
        }
    }
}

fn new_ocid(kind: &str) -> String {
    format!("ocid1.{}.oc1..{}", kind, Uuid::new_v4().simple())
}

fn generated_name(kind: &str) -> String {
    format!("{}{}", kind, Utc::now().format("%Y%m%d%H%M%S"))
}

fn not_found(kind: &'static str, id: &str) -> ClientError {
    ClientError::NotFound {
        resource: kind,
        id: id.to_string(),
    }
}

/// Settle a transitional state
fn advance(state: &mut LifecycleState) {
    *state = match *state {
        LifecycleState::Provisioning => LifecycleState::Available,
        LifecycleState::Terminating => LifecycleState::Terminated,
        LifecycleState::Creating => LifecycleState::Active,
        LifecycleState::Deleting => LifecycleState::Deleted,
        other => other,
    };
}

fn is_gone(state: LifecycleState) -> bool {
    matches!(
        state,
        LifecycleState::Terminating
            | LifecycleState::Terminated
            | LifecycleState::Deleting
            | LifecycleState::Deleted
    )
}

fn fetch<T: Stored>(map: &mut BTreeMap<String, T>, id: &str) -> ClientResult<T> {
    let item = map.get_mut(id).ok_or_else(|| not_found(T::KIND, id))?;
    advance(item.lifecycle_state_mut());
    Ok(item.clone())
}

fn modify<T: Stored>(
    map: &mut BTreeMap<String, T>,
    id: &str,
    apply: impl FnOnce(&mut T),
) -> ClientResult<T> {
    let item = map.get_mut(id).ok_or_else(|| not_found(T::KIND, id))?;
    let state = *item.lifecycle_state_mut();
    if is_gone(state) {
        return Err(ClientError::Conflict(format!(
            "{} {} is {}",
            T::KIND,
            id,
            state
        )));
    }
    apply(item);
    Ok(item.clone())
}

fn remove<T: Stored>(
    map: &mut BTreeMap<String, T>,
    id: &str,
    deleting: LifecycleState,
) -> ClientResult<()> {
    let item = map.get_mut(id).ok_or_else(|| not_found(T::KIND, id))?;
    *item.lifecycle_state_mut() = deleting;
    Ok(())
}

/// In-memory implementation of the OCI clients
#[derive(Default)]
pub struct MemoryClient {
    inner: Mutex<Inner>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a VCN together with its default DHCP options, route table and
    /// security list
    pub async fn create_vcn(&self, compartment_id: &str, cidr_block: &str) -> Vcn {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let vcn_id = new_ocid("vcn");
        inner.record("CreateVcn", Some(&vcn_id));

        let dhcp = DhcpOptions {
            id: new_ocid("dhcpoptions"),
            compartment_id: compartment_id.to_string(),
            vcn_id: vcn_id.clone(),
            display_name: format!("Default DHCP Options for {}", vcn_id),
            options: vec![DhcpDnsOption {
                option_type: "DomainNameServer".to_string(),
                custom_dns_servers: None,
                server_type: Some("VcnLocalPlusInternet".to_string()),
                search_domain_names: None,
            }],
            lifecycle_state: LifecycleState::Available,
            time_created: now,
        };

        let route_table = RouteTable {
            id: new_ocid("routetable"),
            compartment_id: compartment_id.to_string(),
            vcn_id: vcn_id.clone(),
            display_name: format!("Default Route Table for {}", vcn_id),
            route_rules: Vec::new(),
            lifecycle_state: LifecycleState::Available,
            time_created: now,
            time_modified: None,
        };

        let anywhere = "0.0.0.0/0".to_string();
        let security_list = SecurityList {
            id: new_ocid("securitylist"),
            compartment_id: compartment_id.to_string(),
            vcn_id: vcn_id.clone(),
            display_name: format!("Default Security List for {}", vcn_id),
            egress_security_rules: vec![EgressSecurityRule {
                destination: anywhere.clone(),
                protocol: "all".to_string(),
                icmp_options: None,
                tcp_options: None,
                udp_options: None,
                is_stateless: false,
            }],
            ingress_security_rules: vec![
                IngressSecurityRule {
                    source: anywhere.clone(),
                    protocol: "6".to_string(),
                    icmp_options: None,
                    tcp_options: Some(TcpOptions {
                        destination_port_range: PortRange { min: 22, max: 22 },
                    }),
                    udp_options: None,
                    is_stateless: false,
                },
                IngressSecurityRule {
                    source: anywhere,
                    protocol: "1".to_string(),
                    icmp_options: Some(IcmpOptions {
                        icmp_type: 3,
                        code: Some(4),
                    }),
                    tcp_options: None,
                    udp_options: None,
                    is_stateless: false,
                },
                IngressSecurityRule {
                    source: cidr_block.to_string(),
                    protocol: "1".to_string(),
                    icmp_options: Some(IcmpOptions {
                        icmp_type: 3,
                        code: None,
                    }),
                    tcp_options: None,
                    udp_options: None,
                    is_stateless: false,
                },
            ],
            lifecycle_state: LifecycleState::Available,
            time_created: now,
        };

        let vcn = Vcn {
            id: vcn_id.clone(),
            compartment_id: compartment_id.to_string(),
            cidr_block: cidr_block.to_string(),
            default_dhcp_options_id: dhcp.id.clone(),
            default_route_table_id: route_table.id.clone(),
            default_security_list_id: security_list.id.clone(),
        };

        inner.defaults.insert(dhcp.id.clone());
        inner.defaults.insert(route_table.id.clone());
        inner.defaults.insert(security_list.id.clone());
        inner.dhcp_options.insert(dhcp.id.clone(), dhcp);
        inner.route_tables.insert(route_table.id.clone(), route_table);
        inner
            .security_lists
            .insert(security_list.id.clone(), security_list);
        inner.vcns.insert(vcn_id, vcn.clone());

        vcn
    }

    /// All API calls made so far, in order
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of calls made to `operation`
    pub async fn call_count(&self, operation: &str) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }
}

#[async_trait]
impl VirtualNetworkClient for MemoryClient {
    async fn get_dhcp_options(&self, id: &str) -> ClientResult<DhcpOptions> {
        let mut inner = self.inner.lock().await;
        inner.record("GetDhcpOptions", Some(id));
        fetch(&mut inner.dhcp_options, id)
    }

    async fn create_dhcp_options(
        &self,
        details: CreateDhcpOptionsDetails,
    ) -> ClientResult<DhcpOptions> {
        let mut inner = self.inner.lock().await;
        inner.record("CreateDhcpOptions", None);
        inner.check_vcn(&details.vcn_id)?;

        let dhcp = DhcpOptions {
            id: new_ocid("dhcpoptions"),
            compartment_id: details.compartment_id,
            vcn_id: details.vcn_id,
            display_name: details
                .display_name
                .unwrap_or_else(|| generated_name("dhcpoptions")),
            options: details.options,
            lifecycle_state: LifecycleState::Provisioning,
            time_created: Utc::now(),
        };
        inner.dhcp_options.insert(dhcp.id.clone(), dhcp.clone());
        Ok(dhcp)
    }

    async fn update_dhcp_options(
        &self,
        id: &str,
        details: UpdateDhcpOptionsDetails,
    ) -> ClientResult<DhcpOptions> {
        let mut inner = self.inner.lock().await;
        inner.record("UpdateDhcpOptions", Some(id));
        modify(&mut inner.dhcp_options, id, |dhcp| {
            if let Some(name) = details.display_name {
                dhcp.display_name = name;
            }
            dhcp.options = details.options;
        })
    }

    async fn delete_dhcp_options(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record("DeleteDhcpOptions", Some(id));
        inner.check_deletable(DhcpOptions::KIND, id)?;
        remove(&mut inner.dhcp_options, id, LifecycleState::Terminating)
    }

    async fn get_route_table(&self, id: &str) -> ClientResult<RouteTable> {
        let mut inner = self.inner.lock().await;
        inner.record("GetRouteTable", Some(id));
        fetch(&mut inner.route_tables, id)
    }

    async fn create_route_table(
        &self,
        details: CreateRouteTableDetails,
    ) -> ClientResult<RouteTable> {
        let mut inner = self.inner.lock().await;
        inner.record("CreateRouteTable", None);
        inner.check_vcn(&details.vcn_id)?;

        let route_table = RouteTable {
            id: new_ocid("routetable"),
            compartment_id: details.compartment_id,
            vcn_id: details.vcn_id,
            display_name: details
                .display_name
                .unwrap_or_else(|| generated_name("routetable")),
            route_rules: details.route_rules,
            lifecycle_state: LifecycleState::Provisioning,
            time_created: Utc::now(),
            time_modified: None,
        };
        inner
            .route_tables
            .insert(route_table.id.clone(), route_table.clone());
        Ok(route_table)
    }

    async fn update_route_table(
        &self,
        id: &str,
        details: UpdateRouteTableDetails,
    ) -> ClientResult<RouteTable> {
        let mut inner = self.inner.lock().await;
        inner.record("UpdateRouteTable", Some(id));
        modify(&mut inner.route_tables, id, |route_table| {
            if let Some(name) = details.display_name {
                route_table.display_name = name;
            }
            route_table.route_rules = details.route_rules;
            route_table.time_modified = Some(Utc::now());
        })
    }

    async fn delete_route_table(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record("DeleteRouteTable", Some(id));
        inner.check_deletable(RouteTable::KIND, id)?;
        remove(&mut inner.route_tables, id, LifecycleState::Terminating)
    }

    async fn get_security_list(&self, id: &str) -> ClientResult<SecurityList> {
        let mut inner = self.inner.lock().await;
        inner.record("GetSecurityList", Some(id));
        fetch(&mut inner.security_lists, id)
    }

    async fn create_security_list(
        &self,
        details: CreateSecurityListDetails,
    ) -> ClientResult<SecurityList> {
        let mut inner = self.inner.lock().await;
        inner.record("CreateSecurityList", None);
        inner.check_vcn(&details.vcn_id)?;

        let security_list = SecurityList {
            id: new_ocid("securitylist"),
            compartment_id: details.compartment_id,
            vcn_id: details.vcn_id,
            display_name: details
                .display_name
                .unwrap_or_else(|| generated_name("securitylist")),
            egress_security_rules: details.egress_security_rules,
            ingress_security_rules: details.ingress_security_rules,
            lifecycle_state: LifecycleState::Provisioning,
            time_created: Utc::now(),
        };
        inner
            .security_lists
            .insert(security_list.id.clone(), security_list.clone());
        Ok(security_list)
    }

    async fn update_security_list(
        &self,
        id: &str,
        details: UpdateSecurityListDetails,
    ) -> ClientResult<SecurityList> {
        let mut inner = self.inner.lock().await;
        inner.record("UpdateSecurityList", Some(id));
        modify(&mut inner.security_lists, id, |security_list| {
            if let Some(name) = details.display_name {
                security_list.display_name = name;
            }
            security_list.egress_security_rules = details.egress_security_rules;
            security_list.ingress_security_rules = details.ingress_security_rules;
        })
    }

    async fn delete_security_list(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record("DeleteSecurityList", Some(id));
        inner.check_deletable(SecurityList::KIND, id)?;
        remove(&mut inner.security_lists, id, LifecycleState::Terminating)
    }
}

#[async_trait]
impl IdentityClient for MemoryClient {
    async fn get_policy(&self, id: &str) -> ClientResult<Policy> {
        let mut inner = self.inner.lock().await;
        inner.record("GetPolicy", Some(id));
        fetch(&mut inner.policies, id)
    }

    async fn create_policy(&self, details: CreatePolicyDetails) -> ClientResult<Policy> {
        let mut inner = self.inner.lock().await;
        inner.record("CreatePolicy", None);

        let taken = inner.policies.values().any(|p| {
            p.compartment_id == details.compartment_id
                && p.name == details.name
                && !is_gone(p.lifecycle_state)
        });
        if taken {
            return Err(ClientError::Service {
                status: 409,
                code: "PolicyAlreadyExists".to_string(),
                message: format!("Policy '{}' already exists", details.name),
            });
        }

        let policy = Policy {
            id: new_ocid("policy"),
            compartment_id: details.compartment_id,
            name: details.name,
            description: details.description,
            statements: details.statements,
            lifecycle_state: LifecycleState::Creating,
            time_created: Utc::now(),
        };
        inner.policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn update_policy(&self, id: &str, details: UpdatePolicyDetails) -> ClientResult<Policy> {
        let mut inner = self.inner.lock().await;
        inner.record("UpdatePolicy", Some(id));
        modify(&mut inner.policies, id, |policy| {
            if let Some(description) = details.description {
                policy.description = description;
            }
            if let Some(statements) = details.statements {
                policy.statements = statements;
            }
        })
    }

    async fn delete_policy(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record("DeletePolicy", Some(id));
        remove(&mut inner.policies, id, LifecycleState::Deleting)
    }

    async fn list_policies(&self, compartment_id: &str) -> ClientResult<Vec<Policy>> {
        let mut inner = self.inner.lock().await;
        inner.record("ListPolicies", Some(compartment_id));

        let mut policies: Vec<Policy> = inner
            .policies
            .values_mut()
            .filter(|p| p.compartment_id == compartment_id)
            .map(|p| {
                advance(&mut p.lifecycle_state);
                p.clone()
            })
            .collect();
        policies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(policies)
    }
}
