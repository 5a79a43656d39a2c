//! CLI subcommands.

pub mod change_role;
pub mod join;
#[cfg(test)]
mod mod_test;
pub mod set_cluster_name;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::engine::Outcome;
use crate::membership::DesiredMembership;

/// Options describing the desired cluster membership.
#[derive(StructOpt)]
pub struct DesiredArgs {
    /// The desired cluster nodes, as a JSON array of `{"name": "...", "type": "disc|ram"}`.
    ///
    /// The first node is the one joined by `join`.
    #[structopt(long, required_unless = "desired", conflicts_with = "desired")]
    cluster_nodes: Option<String>,
    /// The desired cluster name.
    #[structopt(long, conflicts_with = "desired")]
    cluster_name: Option<String>,
    /// A YAML document with `cluster_name` & `nodes`, used in place of the other options.
    #[structopt(long, parse(from_os_str))]
    desired: Option<PathBuf>,
}

impl DesiredArgs {
    /// Load the desired membership from the given options.
    ///
    /// Without an explicit cluster name, the name falls back to the first desired node, which
    /// is the name the control plane gives a cluster formed by joining that node.
    pub fn load(&self) -> Result<DesiredMembership> {
        let mut desired = match &self.desired {
            Some(path) => {
                let doc = std::fs::read_to_string(path).with_context(|| format!("error reading desired membership from {}", path.display()))?;
                DesiredMembership::from_yaml(&doc).context("error decoding desired membership document")?
            }
            None => {
                let nodes = self.cluster_nodes.as_deref().context("one of --cluster-nodes or --desired is required")?;
                DesiredMembership::from_json(self.cluster_name.clone(), nodes).context("error decoding --cluster-nodes")?
            }
        };
        desired.cluster_name = Some(desired.cluster_name_with_fallback());
        Ok(desired)
    }
}

/// Report the outcome of an operation.
pub fn report(action: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Skipped(reason) => tracing::debug!(action, %reason, "nothing to do"),
        Outcome::Done => tracing::debug!(action, "reconciliation complete"),
    }
}
