//! Broker cluster membership reconciliation.
//!
//! Inspects the cluster membership of the local broker node and converges it on a desired
//! membership through the local control tool.

mod cmd;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod engine;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod membership;
pub mod runner;
pub mod status;

use anyhow::Result;
use structopt::StructOpt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub use crate::config::Config;
pub use crate::engine::{Engine, Outcome, SkipReason};
pub use crate::error::{ClusterError, ClusterResult};
pub use crate::membership::{ClusterNode, DesiredMembership, DesiredRole, Role};
pub use crate::runner::{CommandOutput, CommandRunner, ControlCommand, CtlRunner};
pub use crate::status::ClusterStatus;

/// Reconcile the cluster membership of the local broker node.
#[derive(StructOpt)]
#[structopt(name = "broker-cluster")]
pub struct BrokerCluster {
    #[structopt(subcommand)]
    action: BrokerClusterSubcommands,
    /// Enable debug logging.
    #[structopt(short)]
    verbose: bool,
}

impl BrokerCluster {
    pub fn run(self) -> Result<()> {
        let config = Config::new()?;

        // Initialize logging based on CLI config.
        let fmt_layer = fmt::layer().with_target(true);
        let filter_layer = if self.verbose { EnvFilter::new("debug") } else { EnvFilter::new(&config.rust_log) };
        let max_level = level_filter(self.verbose);
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(max_level)
            .init();

        tracing::debug!(
            ctl_binary = %config.ctl_binary,
            home = %config.home,
            ctl_version = ?config.ctl_version.as_ref().map(ToString::to_string),
            "building control runner"
        );
        let engine = Engine::new(CtlRunner::new(&config));
        match &self.action {
            BrokerClusterSubcommands::Join(inner) => inner.run(&engine),
            BrokerClusterSubcommands::SetClusterName(inner) => inner.run(&engine),
            BrokerClusterSubcommands::ChangeRole(inner) => inner.run(&engine),
            BrokerClusterSubcommands::Status(inner) => inner.run(&engine),
        }
    }
}

/// The most verbose level emitted, whatever `RUST_LOG` asks for.
fn level_filter(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

#[derive(StructOpt)]
enum BrokerClusterSubcommands {
    /// Join the local node to the desired cluster.
    #[structopt(name = "join")]
    Join(cmd::join::Join),
    /// Set the name of the cluster the local node belongs to.
    #[structopt(name = "set-cluster-name")]
    SetClusterName(cmd::set_cluster_name::SetClusterName),
    /// Change the local node's cluster node type.
    #[structopt(name = "change-role")]
    ChangeRole(cmd::change_role::ChangeRole),
    /// Show the current cluster status of the local node.
    #[structopt(name = "status")]
    Status(cmd::status::Status),
}
