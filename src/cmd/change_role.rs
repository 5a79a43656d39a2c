//! Change the local node's cluster node type.

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::cmd::{report, DesiredArgs};
use crate::engine::Engine;
use crate::runner::CommandRunner;

/// Change the local node's cluster node type to the one it holds in the desired membership.
#[derive(StructOpt)]
#[structopt(name = "change-role")]
pub struct ChangeRole {
    #[structopt(flatten)]
    desired: DesiredArgs,
}

impl ChangeRole {
    pub fn run<R: CommandRunner>(&self, engine: &Engine<R>) -> Result<()> {
        let desired = self.desired.load()?;
        let outcome = engine.change_role(&desired).context("error changing cluster node type")?;
        report("change-role", &outcome);
        Ok(())
    }
}
