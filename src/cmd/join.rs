//! Join the desired cluster.

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::cmd::{report, DesiredArgs};
use crate::engine::Engine;
use crate::runner::CommandRunner;

/// Join the local node to the desired cluster.
#[derive(StructOpt)]
#[structopt(name = "join")]
pub struct Join {
    #[structopt(flatten)]
    desired: DesiredArgs,
}

impl Join {
    pub fn run<R: CommandRunner>(&self, engine: &Engine<R>) -> Result<()> {
        let desired = self.desired.load()?;
        let outcome = engine.join(&desired).context("error joining cluster")?;
        report("join", &outcome);
        Ok(())
    }
}
