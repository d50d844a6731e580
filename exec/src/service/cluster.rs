//! `rosa ... cluster` commands.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rosacli_core::{CapturedOutput, OutputFormat};
use rosacli_parser::{TableRow, Tree};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{ExecError, Result};
use crate::service::{ResourcesCleaner, list_or_empty};

/// One row of `rosa list cluster`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterListItem {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "STATE")]
    pub state: String,
    #[serde(rename = "TOPOLOGY")]
    pub topology: String,
}

/// Reflected `rosa list cluster` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterList {
    pub clusters: Vec<ClusterListItem>,
}

impl ClusterList {
    pub fn cluster(&self, id: &str) -> Option<&ClusterListItem> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn cluster_by_name(&self, name: &str) -> Option<&ClusterListItem> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cluster(id).is_some()
    }
}

type Entries = Vec<BTreeMap<String, String>>;

/// Reflected `rosa describe cluster` output.
///
/// Sub-blocks such as `Network:` come back as one single-entry map per
/// printed item, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterDescription {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "External ID")]
    pub external_id: String,
    #[serde(rename = "Control Plane")]
    pub control_plane: String,
    #[serde(rename = "OpenShift Version")]
    pub openshift_version: String,
    #[serde(rename = "Channel Group")]
    pub channel_group: String,
    #[serde(rename = "DNS")]
    pub dns: String,
    #[serde(rename = "AWS Account")]
    pub aws_account: String,
    #[serde(rename = "API URL")]
    pub api_url: String,
    #[serde(rename = "Console URL")]
    pub console_url: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Multi-AZ")]
    pub multi_az: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Private")]
    pub private: String,
    #[serde(rename = "Created")]
    pub created: String,
    #[serde(rename = "Details Page")]
    pub details_page: String,
    #[serde(rename = "Availability", deserialize_with = "list_or_empty")]
    pub availability: Entries,
    #[serde(rename = "Nodes", deserialize_with = "list_or_empty")]
    pub nodes: Entries,
    #[serde(rename = "Network", deserialize_with = "list_or_empty")]
    pub network: Entries,
    #[serde(rename = "Proxy", deserialize_with = "list_or_empty")]
    pub proxy: Entries,
    #[serde(rename = "EC2 Metadata Http Tokens", alias = "Ec2 Metadata Http Tokens")]
    pub ec2_metadata_http_tokens: String,
    #[serde(rename = "Role (STS) ARN")]
    pub sts_role_arn: String,
    #[serde(rename = "Support Role ARN")]
    pub support_role_arn: String,
    #[serde(rename = "Instance IAM Roles", deserialize_with = "list_or_empty")]
    pub instance_iam_roles: Entries,
    #[serde(rename = "Operator IAM Roles", deserialize_with = "list_or_empty")]
    pub operator_iam_roles: Vec<String>,
    #[serde(rename = "Managed Policies")]
    pub managed_policies: String,
    #[serde(rename = "User Workload Monitoring")]
    pub user_workload_monitoring: String,
    #[serde(rename = "OIDC Endpoint URL")]
    pub oidc_endpoint_url: String,
    #[serde(rename = "Delete Protection")]
    pub delete_protection: String,
    #[serde(rename = "Etcd Encryption")]
    pub etcd_encryption: String,
    #[serde(rename = "Audit Log Forwarding")]
    pub audit_log_forwarding: String,
    #[serde(rename = "External Authentication")]
    pub external_authentication: String,
    #[serde(rename = "Failed Inflight Checks")]
    pub failed_inflight_checks: String,
    #[serde(rename = "Provisioning Error Code")]
    pub provisioning_error_code: String,
    #[serde(rename = "Provisioning Error Message")]
    pub provisioning_error_message: String,
}

impl ClusterDescription {
    /// First value printed under `Network:` for `key` (`Machine CIDR`, ...).
    pub fn network_value(&self, key: &str) -> Option<&str> {
        self.network
            .iter()
            .find_map(|entry| entry.get(key))
            .map(String::as_str)
    }
}

/// Rewrites known quirks of `rosa describe cluster` before reflection: a
/// valueless inflight check label opens a literal block, tabs become spaces
/// and a deprecated label loses its marker.
fn normalize_description(output: &str) -> String {
    const INFLIGHT: &str = "Failed Inflight Checks:";
    let mut normalized = String::with_capacity(output.len() + 2);
    let mut block_opened = false;
    for line in output.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        // A value on the label line is already scalar; only an empty one
        // introduces the indented report.
        if !block_opened && body.starts_with(INFLIGHT) && body[INFLIGHT.len()..].trim().is_empty() {
            normalized.push_str(INFLIGHT);
            normalized.push_str(" |");
            normalized.push_str(&line[body.len()..]);
            block_opened = true;
        } else {
            normalized.push_str(line);
        }
    }
    normalized.replace('\t', "  ").replacen(
        "[DEPRECATED] User Workload Monitoring:",
        "User Workload Monitoring:",
        1,
    )
}

/// Cluster commands for one client.
pub struct ClusterService<'c> {
    client: &'c mut Client,
}

impl<'c> ClusterService<'c> {
    pub(crate) fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    pub fn describe(&self, cluster_id: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["describe", "cluster", "-c", cluster_id];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn list(&self) -> Result<CapturedOutput> {
        self.client.runner.run(["list", "cluster"])
    }

    /// `rosa create cluster -c <name> --dry-run <flags>`.
    pub fn create_dry_run(&self, name: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["create", "cluster", "-c", name, "--dry-run"];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn edit(&self, cluster_id: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["edit", "cluster", "-c", cluster_id];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn delete(&self, cluster_id: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["delete", "cluster", "-c", cluster_id];
        args.extend_from_slice(flags);
        self.client.runner.run(args)
    }

    pub fn reflect_list(&self, output: &CapturedOutput) -> Result<ClusterList> {
        let clusters = self
            .client
            .parser
            .table(output)
            .iter()
            .map(TableRow::deserialize)
            .collect::<rosacli_parser::Result<Vec<ClusterListItem>>>()?;
        Ok(ClusterList { clusters })
    }

    pub fn list_and_reflect(&self) -> Result<ClusterList> {
        let output = self.list()?;
        self.reflect_list(&output)
    }

    pub fn reflect_description(&self, output: &CapturedOutput) -> Result<ClusterDescription> {
        let parsed = self
            .client
            .parser
            .text(output)
            .with_transform(normalize_description);
        Ok(parsed.description().deserialize()?)
    }

    pub fn describe_and_reflect(&self, cluster_id: &str) -> Result<ClusterDescription> {
        let output = self.describe(cluster_id, &[])?;
        self.reflect_description(&output)
    }

    /// `rosa describe cluster` in JSON, as a dig tree.
    ///
    /// The runner's format is switched to JSON for this call only and put
    /// back afterwards, also when the call fails.
    pub fn json_description(&mut self, cluster_id: &str) -> Result<Tree> {
        let previous = self.client.runner.format();
        self.client.runner.json_format();
        let result = self.describe(cluster_id, &[]);
        self.client.runner.set_format(previous);
        let output = result?;
        Ok(Tree::parse(output.as_bytes(), OutputFormat::Json))
    }

    pub fn is_hosted_cp(&mut self, cluster_id: &str) -> Result<bool> {
        Ok(self
            .json_description(cluster_id)?
            .dig_bool(["hypershift", "enabled"]))
    }

    /// Hosted control plane clusters report STS here as well.
    pub fn is_sts(&mut self, cluster_id: &str) -> Result<bool> {
        Ok(self
            .json_description(cluster_id)?
            .dig_bool(["aws", "sts", "enabled"]))
    }

    pub fn is_private(&mut self, cluster_id: &str) -> Result<bool> {
        Ok(self.json_description(cluster_id)?.dig_string(["api", "listening"]) == "internal")
    }

    /// Polls `rosa list cluster` until `cluster_id` reports `state`.
    ///
    /// Returns `Ok(false)` when `timeout` passes first; the caller decides
    /// whether that is a failure. CLI failures end the wait with an error.
    pub fn wait_for_state(
        &self,
        cluster_id: &str,
        state: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<bool> {
        let start = Instant::now();
        loop {
            let clusters = self.list_and_reflect()?;
            let current = clusters
                .cluster(cluster_id)
                .map(|cluster| cluster.state.as_str())
                .unwrap_or_default();
            if current == state {
                info!(cluster_id, state, "Cluster reached state");
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                info!(cluster_id, state, current, "Gave up waiting for cluster state");
                return Ok(false);
            }
            debug!(cluster_id, state, current, "Waiting for cluster state");
            std::thread::sleep(interval);
        }
    }
}

impl ResourcesCleaner for ClusterService<'_> {
    fn clean_resources(&mut self, cluster_id: &str) -> Vec<ExecError> {
        debug!(cluster_id, "Cluster lifecycle is owned by the caller; nothing to clean");
        Vec::new()
    }
}
