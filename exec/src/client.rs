//! The test client: one runner, one parser, one resource ledger.

use std::sync::Arc;

use rosacli_parser::Parser;
use tracing::info;

use crate::config::RunnerConfig;
use crate::error::{ExecError, Result};
use crate::executor::CommandExecutor;
use crate::runner::Runner;
use crate::service::{
    ClusterService, Ledger, MachinePoolService, OcmResourceService, ResourcesCleaner,
    VersionService,
};

/// Entry point for driving the CLI.
///
/// The client owns the [`Runner`] state, so format or directory changes made
/// through one service are visible to the next call and to nobody else.
///
/// # Examples
///
/// ```no_run
/// use rosacli_exec::{Client, RunnerConfig};
///
/// let mut client = Client::new(RunnerConfig::default());
/// let pools = client.machine_pool().list_and_reflect("my-cluster")?;
/// if let Some(pool) = pools.machine_pool("worker") {
///     println!("{} runs {}", pool.id, pool.instance_type);
/// }
/// client.clean_resources("my-cluster")?;
/// # Ok::<(), rosacli_exec::ExecError>(())
/// ```
#[derive(Debug)]
pub struct Client {
    pub(crate) runner: Runner,
    pub(crate) parser: Parser,
    pub(crate) ledger: Ledger,
}

impl Client {
    pub fn new(config: RunnerConfig) -> Self {
        Self::from_runner(Runner::new(config))
    }

    /// Creates a client whose runner uses `executor` instead of spawning
    /// processes.
    pub fn with_executor(config: RunnerConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self::from_runner(Runner::with_executor(config, executor))
    }

    fn from_runner(runner: Runner) -> Self {
        Self {
            runner,
            parser: Parser::default(),
            ledger: Ledger::default(),
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn cluster(&mut self) -> ClusterService<'_> {
        ClusterService::new(self)
    }

    pub fn machine_pool(&mut self) -> MachinePoolService<'_> {
        MachinePoolService::new(self)
    }

    pub fn ocm_resource(&mut self) -> OcmResourceService<'_> {
        OcmResourceService::new(self)
    }

    pub fn version(&mut self) -> VersionService<'_> {
        VersionService::new(self)
    }

    /// Deletes everything the services recorded for `cluster_id`.
    ///
    /// Every service is cleaned even when an earlier one fails; all failures
    /// come back together as [`ExecError::Cleanup`].
    pub fn clean_resources(&mut self, cluster_id: &str) -> Result<()> {
        info!(cluster_id, pending = self.ledger.len(), "Cleaning resources");
        let mut errors = Vec::new();
        errors.extend(self.version().clean_resources(cluster_id));
        errors.extend(self.machine_pool().clean_resources(cluster_id));
        errors.extend(self.ocm_resource().clean_resources(cluster_id));
        errors.extend(self.cluster().clean_resources(cluster_id));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ExecError::Cleanup(errors))
        }
    }
}
