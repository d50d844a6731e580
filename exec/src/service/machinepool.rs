//! `rosa ... machinepool` commands.

use rosacli_core::CapturedOutput;
use rosacli_parser::TableRow;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::Client;
use crate::error::{ExecError, Result};
use crate::service::{ResourceKind, ResourcesCleaner};

/// One row of `rosa list machinepool`.
///
/// Hosted control plane clusters print node pools with slightly different
/// headers (`AVAILABILITY ZONE`, `SUBNET`, `VERSION`, ...); both layouts map
/// onto this record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinePool {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "AUTOSCALING")]
    pub autoscaling: String,
    #[serde(rename = "REPLICAS")]
    pub replicas: String,
    #[serde(rename = "INSTANCE TYPE")]
    pub instance_type: String,
    #[serde(rename = "LABELS")]
    pub labels: String,
    #[serde(rename = "TAINTS")]
    pub taints: String,
    #[serde(rename = "AVAILABILITY ZONES", alias = "AVAILABILITY ZONE")]
    pub availability_zones: String,
    #[serde(rename = "SUBNETS", alias = "SUBNET")]
    pub subnets: String,
    #[serde(rename = "SPOT INSTANCES")]
    pub spot_instances: String,
    #[serde(rename = "DISK SIZE")]
    pub disk_size: String,
    #[serde(rename = "SG IDs")]
    pub security_group_ids: String,
    #[serde(rename = "VERSION")]
    pub version: String,
    #[serde(rename = "AUTOREPAIR")]
    pub auto_repair: String,
}

/// Reflected `rosa list machinepool` output, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachinePoolList {
    pub machine_pools: Vec<MachinePool>,
}

impl MachinePoolList {
    /// First pool with `id`.
    pub fn machine_pool(&self, id: &str) -> Option<&MachinePool> {
        self.machine_pools.iter().find(|pool| pool.id == id)
    }

    pub fn len(&self) -> usize {
        self.machine_pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machine_pools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MachinePool> {
        self.machine_pools.iter()
    }
}

/// Reflected `rosa describe machinepool` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinePoolDescription {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Cluster ID")]
    pub cluster_id: String,
    #[serde(rename = "Autoscaling")]
    pub autoscaling: String,
    #[serde(rename = "Replicas")]
    pub replicas: String,
    #[serde(rename = "Instance type")]
    pub instance_type: String,
    #[serde(rename = "Labels")]
    pub labels: String,
    #[serde(rename = "Taints")]
    pub taints: String,
    #[serde(rename = "Availability zones")]
    pub availability_zones: String,
    #[serde(rename = "Subnets")]
    pub subnets: String,
    #[serde(rename = "Spot instances")]
    pub spot_instances: String,
    #[serde(rename = "Disk size")]
    pub disk_size: String,
    #[serde(rename = "Additional Security Group IDs")]
    pub security_group_ids: String,
    #[serde(rename = "Tags")]
    pub tags: String,
}

/// Machine pool commands for one client.
pub struct MachinePoolService<'c> {
    client: &'c mut Client,
}

impl<'c> MachinePoolService<'c> {
    pub(crate) fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    /// `rosa create machinepool <flags> -c <cluster> --name <name>`.
    ///
    /// The pool is recorded for cleanup once the command succeeds.
    pub fn create(&mut self, cluster_id: &str, name: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["create", "machinepool"];
        args.extend_from_slice(flags);
        args.extend(["-c", cluster_id, "--name", name]);
        let output = self.client.runner.run(args)?;
        self.client
            .ledger
            .record(ResourceKind::MachinePool, cluster_id, name);
        Ok(output)
    }

    pub fn list(&self, cluster_id: &str) -> Result<CapturedOutput> {
        self.client.runner.run(["list", "machinepool", "-c", cluster_id])
    }

    pub fn describe(&self, cluster_id: &str, id: &str) -> Result<CapturedOutput> {
        self.client
            .runner
            .run(["describe", "machinepool", id, "-c", cluster_id])
    }

    pub fn edit(&self, cluster_id: &str, id: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["edit", "machinepool", id];
        args.extend_from_slice(flags);
        args.extend(["-c", cluster_id]);
        self.client.runner.run(args)
    }

    /// `rosa delete machinepool <flags> -c <cluster> <id> -y`.
    pub fn delete(&mut self, cluster_id: &str, id: &str, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["delete", "machinepool"];
        args.extend_from_slice(flags);
        args.extend(["-c", cluster_id, id, "-y"]);
        let output = self.client.runner.run(args)?;
        self.client
            .ledger
            .forget(ResourceKind::MachinePool, cluster_id, id);
        Ok(output)
    }

    pub fn reflect_list(&self, output: &CapturedOutput) -> Result<MachinePoolList> {
        let machine_pools = self
            .client
            .parser
            .table(output)
            .iter()
            .map(TableRow::deserialize)
            .collect::<rosacli_parser::Result<Vec<MachinePool>>>()?;
        Ok(MachinePoolList { machine_pools })
    }

    pub fn reflect_description(&self, output: &CapturedOutput) -> Result<MachinePoolDescription> {
        Ok(self.client.parser.description(output).deserialize()?)
    }

    pub fn list_and_reflect(&self, cluster_id: &str) -> Result<MachinePoolList> {
        let output = self.list(cluster_id)?;
        self.reflect_list(&output)
    }

    pub fn describe_and_reflect(&self, cluster_id: &str, id: &str) -> Result<MachinePoolDescription> {
        let output = self.describe(cluster_id, id)?;
        self.reflect_description(&output)
    }
}

impl ResourcesCleaner for MachinePoolService<'_> {
    fn clean_resources(&mut self, cluster_id: &str) -> Vec<ExecError> {
        let mut errors = Vec::new();
        for id in self.client.ledger.pending(ResourceKind::MachinePool, cluster_id) {
            info!(cluster_id, machine_pool = %id, "Removing remaining machine pool");
            if let Err(err) = self.delete(cluster_id, &id, &[]) {
                errors.push(err);
            }
        }
        errors
    }
}
