//! The broker cluster reconciliation CLI.

use anyhow::Result;
use structopt::StructOpt;

use broker_cluster::BrokerCluster;

fn main() -> Result<()> {
    let cli = BrokerCluster::from_args();
    cli.run()
}
