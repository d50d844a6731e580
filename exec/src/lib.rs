//! Drives the `rosa` command-line tool from tests.
//!
//! A [`Client`] owns a [`Runner`] (how commands are spawned), a
//! [`Parser`](rosacli_parser::Parser) (how their output is read) and a
//! [`Ledger`] of resources created along the way. Resource services such as
//! [`MachinePoolService`] are borrowed from the client per call chain:
//!
//! ```no_run
//! use rosacli_exec::{Client, RunnerConfig};
//!
//! let mut client = Client::new(RunnerConfig::default());
//! client.machine_pool().create("c-1", "mp-ci", &["--replicas", "2"])?;
//! let description = client.machine_pool().describe_and_reflect("c-1", "mp-ci")?;
//! assert_eq!(description.replicas, "2");
//! client.clean_resources("c-1")?;
//! # Ok::<(), rosacli_exec::ExecError>(())
//! ```
//!
//! Process spawning sits behind [`CommandExecutor`], so the whole stack can
//! be exercised against scripted output.

mod client;
mod config;
mod error;
mod executor;
mod runner;
pub mod service;

pub use client::Client;
pub use config::{AuthRetry, RunnerConfig};
pub use error::{ExecError, Result};
pub use executor::{CommandExecutor, Completion, Invocation, ProcessExecutor};
pub use runner::{AUTH_TOKEN_FAILURE, Runner};
pub use service::{
    AccountRole, AccountRoleList, AccountsInfo, ClusterDescription, ClusterList, ClusterListItem,
    ClusterService, Ledger, MachinePool, MachinePoolDescription, MachinePoolList,
    MachinePoolService, OcmResourceService, OidcConfig, OidcConfigList, OpenShiftVersion,
    OpenShiftVersionJson, ResourceKind, ResourcesCleaner, VersionList, VersionService,
};
