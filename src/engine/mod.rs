//! Cluster membership reconciliation.
//!
//! The engine compares the live membership of the local node against a desired membership and
//! drives the node through the minimal sequence of control commands needed to converge.
//!
//! ## Flow
//! Every operation evaluates before it acts. A fresh `ClusterStatus` and the local node
//! identity are fetched, a decision is made, and the operation either skips or executes.
//! Executing operations which need the broker application stopped do so through
//! `Engine::with_application_stopped`, which guarantees `start_app` runs once `stop_app`
//! was issued, whatever the outcome of the step in between.
//!
//! ## Errors
//! Fatal conditions abort the operation without retry. Re-running the operation re-evaluates
//! from live state, which is how a failed reconciliation is retried.
//!
//! ## Observability
//! Each decision emits an event with an `outcome` field: `skip`, `benign`, `execute`, `done`
//! or `fatal`.

mod classify;
mod guard;

use std::fmt;

pub use classify::{classify, BenignReason, Rule, CHANGE_ROLE_RULES, JOIN_RULES};

use crate::engine::guard::ApplicationGuard;
use crate::error::{ClusterError, ClusterResult};
use crate::membership::{self, DesiredMembership, DesiredRole, Role};
use crate::runner::{CommandRunner, ControlCommand};
use crate::status::ClusterStatus;

/// The terminal state of a successful reconciliation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was changed.
    Skipped(SkipReason),
    /// Control commands were executed and the node converged.
    Done,
}

/// Why an operation did not execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The join target is the local node.
    SelfJoin,
    /// The node is already running as a member of the desired cluster.
    AlreadyJoined,
    /// The node is not part of a named cluster, so it cannot be renamed.
    NotClustered,
    /// The cluster already has the desired name.
    NameUnchanged,
    /// No cluster name was given.
    EmptyName,
    /// The node already holds the desired role.
    RoleUnchanged,
    /// Stepping this node down to ram would leave the cluster without a disc node.
    DurabilityGuard,
    /// The desired role is not one the engine can act on.
    UnrecognizedRole(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfJoin => f.write_str("node was configured to join itself"),
            Self::AlreadyJoined => f.write_str("node is already a member of the target cluster"),
            Self::NotClustered => f.write_str("node is not clustered"),
            Self::NameUnchanged => f.write_str("cluster already has the desired name"),
            Self::EmptyName => f.write_str("desired cluster name is empty"),
            Self::RoleUnchanged => f.write_str("node is already of the desired type"),
            Self::DurabilityGuard => f.write_str("at least one disc node is required for the cluster"),
            Self::UnrecognizedRole(role) => write!(f, "unexpected cluster node type `{}`", role),
        }
    }
}

/// The cluster membership reconciliation engine.
pub struct Engine<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> Engine<R> {
    /// Create a new instance.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The runner used by this engine.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Join the local node to the cluster of the first desired node.
    #[tracing::instrument(level = "info", skip(self, desired), fields(cluster_name = ?desired.cluster_name))]
    pub fn join(&self, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        self.try_join(desired).map_err(fatal)
    }

    /// Rename the cluster the local node belongs to.
    #[tracing::instrument(level = "info", skip(self, desired))]
    pub fn set_cluster_name(&self, desired_name: &str, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        self.try_set_cluster_name(desired_name, desired).map_err(fatal)
    }

    /// Change the role of the local node to the one it holds in the desired membership.
    #[tracing::instrument(level = "info", skip(self, desired))]
    pub fn change_role(&self, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        self.try_change_role(desired).map_err(fatal)
    }

    fn try_join(&self, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        let target = desired.join_target()?;
        let status = self.cluster_status()?;
        let node_name = self.node_name()?;

        if node_name == target.name {
            return Ok(skip(SkipReason::SelfJoin));
        }
        let joined = membership::is_member(&node_name, &status);
        if joined && status.cluster_name == desired.cluster_name {
            return Ok(skip(SkipReason::AlreadyJoined));
        }
        if joined && desired.cluster_name.is_some() {
            tracing::warn!(
                current = ?status.cluster_name,
                desired = ?desired.cluster_name,
                "node is already a member of another cluster, rejoining the desired cluster"
            );
        }

        let ram = matches!(target.role, DesiredRole::Known(Role::Ram));
        tracing::info!(outcome = "execute", node = %node_name, target = %target.name, role = %target.role, "joining cluster");
        self.with_application_stopped(|| self.join_cluster(&target.name, ram))?;

        tracing::info!(outcome = "done", node = %node_name, target = %target.name, role = %target.role, "node joined cluster");
        self.log_final_status();
        Ok(Outcome::Done)
    }

    fn try_set_cluster_name(&self, desired_name: &str, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        desired.require_nodes()?;
        let status = self.cluster_status()?;

        let current = match status.cluster_name.as_deref() {
            Some(current) => current,
            None => return Ok(skip(SkipReason::NotClustered)),
        };
        if current == desired_name {
            return Ok(skip(SkipReason::NameUnchanged));
        }
        if desired_name.is_empty() {
            return Ok(skip(SkipReason::EmptyName));
        }

        tracing::info!(outcome = "execute", current, desired = desired_name, "setting cluster name");
        self.runner.run_checked(&ControlCommand::SetClusterName(desired_name.into()))?;

        tracing::info!(outcome = "done", cluster_name = desired_name, "cluster name has been set");
        self.log_final_status();
        Ok(Outcome::Done)
    }

    fn try_change_role(&self, desired: &DesiredMembership) -> ClusterResult<Outcome> {
        desired.require_nodes()?;
        let status = self.cluster_status()?;
        let node_name = self.node_name()?;
        let current = membership::current_role(&node_name, &status);
        let wanted = membership::desired_role_for(&node_name, desired)?;

        let role = match wanted {
            DesiredRole::Unrecognized(raw) => return Ok(skip(SkipReason::UnrecognizedRole(raw.clone()))),
            DesiredRole::Known(role) if current == Some(*role) => return Ok(skip(SkipReason::RoleUnchanged)),
            DesiredRole::Known(Role::Ram) if current == Some(Role::Disc) && status.disc_nodes.len() < 2 => {
                return Ok(skip(SkipReason::DurabilityGuard));
            }
            DesiredRole::Known(role) => *role,
        };

        tracing::info!(outcome = "execute", node = %node_name, current = ?current, desired = %role, "changing cluster node type");
        self.with_application_stopped(|| self.change_node_type(role))?;

        tracing::info!(outcome = "done", node = %node_name, role = %role, "cluster node type has been changed");
        self.log_final_status();
        Ok(Outcome::Done)
    }

    /// Fetch & parse the current cluster status.
    pub fn cluster_status(&self) -> ClusterResult<ClusterStatus> {
        let output = self.runner.run_checked(&self.runner.status_command())?;
        ClusterStatus::parse(&output.stdout)
    }

    /// Fetch the identifier of the local node.
    pub fn node_name(&self) -> ClusterResult<String> {
        let output = self.runner.run_checked(&ControlCommand::EvalNodeIdentity)?;
        let name = output.stdout.lines().next().unwrap_or_default().trim().replace('\'', "");
        if name.is_empty() {
            return Err(ClusterError::EmptyIdentity);
        }
        tracing::debug!(node = %name, "resolved local node name");
        Ok(name)
    }

    /// Run the given step with the broker application stopped.
    ///
    /// If `stop_app` fails, its error is returned and the step is not run. Otherwise
    /// `start_app` is issued after the step regardless of its result. When both the step and
    /// `start_app` fail, the step's error is returned.
    pub fn with_application_stopped<T, F>(&self, step: F) -> ClusterResult<T>
    where
        F: FnOnce() -> ClusterResult<T>,
    {
        let guard = ApplicationGuard::acquire(&self.runner)?;
        let res = step();
        let start_res = guard.release();
        match (res, start_res) {
            (Ok(val), Ok(())) => Ok(val),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(start_err)) => {
                tracing::error!(error = ?start_err, "error starting broker application after a failed step");
                Err(err)
            }
        }
    }

    /// Issue `join_cluster`, passing benign failures.
    fn join_cluster(&self, target: &str, ram: bool) -> ClusterResult<()> {
        let cmd = ControlCommand::JoinCluster { target: target.into(), ram };
        let output = self.runner.run(&cmd)?;
        if output.success() {
            tracing::info!(stdout = %output.stdout.trim_end(), "join_cluster succeeded");
            return Ok(());
        }
        tracing::warn!(stderr = %output.stderr.trim_end(), "join_cluster failed");
        match classify(JOIN_RULES, &output.stderr) {
            Some(reason) => {
                tracing::info!(outcome = "benign", %reason, "join_cluster failure will be ignored");
                Ok(())
            }
            None => Err(ClusterError::Join(output.stderr)),
        }
    }

    /// Issue `change_cluster_node_type`, passing benign failures.
    fn change_node_type(&self, role: Role) -> ClusterResult<()> {
        let cmd = ControlCommand::ChangeClusterNodeType(role);
        let output = self.runner.run(&cmd)?;
        if output.success() {
            tracing::debug!(stdout = %output.stdout.trim_end(), "change_cluster_node_type succeeded");
            return Ok(());
        }
        tracing::warn!(stderr = %output.stderr.trim_end(), "change_cluster_node_type failed");
        match classify(CHANGE_ROLE_RULES, &output.stderr) {
            Some(reason) => {
                tracing::info!(outcome = "benign", %reason, "change_cluster_node_type failure will be ignored");
                Ok(())
            }
            None => output.check(&cmd).map(|_| ()),
        }
    }

    /// Log the cluster status after a change. Failures are not fatal.
    fn log_final_status(&self) {
        match self.cluster_status() {
            Ok(status) => tracing::info!(?status, "final cluster status"),
            Err(err) => tracing::warn!(error = ?err, "error fetching final cluster status"),
        }
    }
}

/// Log & build a skip outcome.
fn skip(reason: SkipReason) -> Outcome {
    match &reason {
        SkipReason::DurabilityGuard | SkipReason::UnrecognizedRole(_) | SkipReason::SelfJoin | SkipReason::NotClustered => {
            tracing::warn!(outcome = "skip", %reason, "skipping")
        }
        _ => tracing::info!(outcome = "skip", %reason, "skipping"),
    }
    Outcome::Skipped(reason)
}

/// Log a fatal error on its way out.
fn fatal(err: ClusterError) -> ClusterError {
    tracing::error!(outcome = "fatal", error = %err, "reconciliation failed");
    err
}
