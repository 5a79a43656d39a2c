//! Show the cluster status of the local node.

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::engine::Engine;
use crate::runner::CommandRunner;

/// Show the current cluster status of the local node.
#[derive(StructOpt)]
#[structopt(name = "status")]
pub struct Status {
    /// Print the status as JSON.
    #[structopt(long)]
    json: bool,
}

impl Status {
    pub fn run<R: CommandRunner>(&self, engine: &Engine<R>) -> Result<()> {
        let status = engine.cluster_status().context("error fetching cluster status")?;
        if self.json {
            let out = serde_json::to_string_pretty(&status).context("error encoding cluster status")?;
            println!("{}", out);
            return Ok(());
        }
        println!("cluster name:  {}", status.cluster_name.as_deref().unwrap_or("<none>"));
        println!("running nodes: {}", status.running_nodes.join(", "));
        println!("disc nodes:    {}", status.disc_nodes.iter().cloned().collect::<Vec<_>>().join(", "));
        println!("ram nodes:     {}", status.ram_nodes.iter().cloned().collect::<Vec<_>>().join(", "));
        Ok(())
    }
}
