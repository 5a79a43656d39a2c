//! Set the cluster name.

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::cmd::{report, DesiredArgs};
use crate::engine::Engine;
use crate::runner::CommandRunner;

/// Set the name of the cluster the local node belongs to.
///
/// Without an explicit name, the name of the first desired node is used.
#[derive(StructOpt)]
#[structopt(name = "set-cluster-name")]
pub struct SetClusterName {
    #[structopt(flatten)]
    desired: DesiredArgs,
}

impl SetClusterName {
    pub fn run<R: CommandRunner>(&self, engine: &Engine<R>) -> Result<()> {
        let desired = self.desired.load()?;
        let name = desired.cluster_name_with_fallback();
        let outcome = engine.set_cluster_name(&name, &desired).context("error setting cluster name")?;
        report("set-cluster-name", &outcome);
        Ok(())
    }
}
