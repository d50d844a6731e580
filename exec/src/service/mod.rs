//! Resource service facades.
//!
//! Each service borrows the [`Client`](crate::Client) for the duration of a
//! call chain, builds argument vectors, runs them and reflects the output into
//! typed records. Services that create resources record them in the client's
//! [`Ledger`] so a test can clean up whatever it left behind.

mod cluster;
mod machinepool;
mod ocm_resource;
mod version;

pub use cluster::{ClusterDescription, ClusterList, ClusterListItem, ClusterService};
pub use machinepool::{MachinePool, MachinePoolDescription, MachinePoolList, MachinePoolService};
pub use ocm_resource::{
    AccountRole, AccountRoleList, AccountsInfo, OcmResourceService, OidcConfig, OidcConfigList,
};
pub use version::{
    OpenShiftVersion, OpenShiftVersionJson, VersionList, VersionService, parse_version,
};

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ExecError;

/// Kinds of resources a service can leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    MachinePool,
    AccountRoles,
}

/// A resource created through a service and not yet deleted through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Owning cluster; empty for account-scoped resources.
    pub cluster_id: String,
    pub name: String,
}

/// Created resources, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    resources: Vec<Resource>,
}

impl Ledger {
    pub fn record(&mut self, kind: ResourceKind, cluster_id: &str, name: &str) {
        self.resources.push(Resource {
            kind,
            cluster_id: cluster_id.to_string(),
            name: name.to_string(),
        });
    }

    /// Drops every entry matching `kind`, `cluster_id` and `name`.
    pub fn forget(&mut self, kind: ResourceKind, cluster_id: &str, name: &str) {
        self.resources.retain(|resource| {
            !(resource.kind == kind && resource.cluster_id == cluster_id && resource.name == name)
        });
    }

    /// Names of `kind` still recorded for `cluster_id`, oldest first.
    pub fn pending(&self, kind: ResourceKind, cluster_id: &str) -> Vec<String> {
        self.resources
            .iter()
            .filter(|resource| resource.kind == kind && resource.cluster_id == cluster_id)
            .map(|resource| resource.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Removes whatever a service recorded for a cluster.
pub trait ResourcesCleaner {
    /// Deletes the recorded resources of `cluster_id`, continuing past
    /// failures. Returns every failure.
    fn clean_resources(&mut self, cluster_id: &str) -> Vec<ExecError>;
}

/// Reads a described list field that the CLI may print as a list, a single
/// value, or nothing at all.
pub(crate) fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(text) if text.is_empty() => Ok(Vec::new()),
        value @ Value::Array(_) => serde_json::from_value(value).map_err(D::Error::custom),
        value => serde_json::from_value(value)
            .map(|item| vec![item])
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_record_and_forget() {
        let mut ledger = Ledger::default();
        ledger.record(ResourceKind::MachinePool, "c-1", "mp-a");
        ledger.record(ResourceKind::MachinePool, "c-1", "mp-b");
        ledger.record(ResourceKind::MachinePool, "c-2", "mp-a");
        ledger.record(ResourceKind::AccountRoles, "", "ci-prefix");

        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.pending(ResourceKind::MachinePool, "c-1"), ["mp-a", "mp-b"]);

        ledger.forget(ResourceKind::MachinePool, "c-1", "mp-a");
        assert_eq!(ledger.pending(ResourceKind::MachinePool, "c-1"), ["mp-b"]);
        assert_eq!(ledger.pending(ResourceKind::MachinePool, "c-2"), ["mp-a"]);
        assert_eq!(ledger.pending(ResourceKind::AccountRoles, ""), ["ci-prefix"]);
    }

    #[derive(Debug, Deserialize)]
    struct Described {
        #[serde(default, deserialize_with = "list_or_empty")]
        roles: Vec<String>,
    }

    #[test]
    fn test_list_or_empty() {
        let read = |value: Value| serde_json::from_value::<Described>(value).unwrap().roles;
        assert!(read(serde_json::json!({"roles": ""})).is_empty());
        assert!(read(serde_json::json!({})).is_empty());
        assert_eq!(read(serde_json::json!({"roles": "one"})), ["one"]);
        assert_eq!(read(serde_json::json!({"roles": ["a", "b"]})), ["a", "b"]);
    }
}
