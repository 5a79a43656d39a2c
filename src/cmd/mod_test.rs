use std::io::Write;

use anyhow::Result;
use structopt::StructOpt;
use tracing::Level;
use tracing_subscriber::prelude::*;

use crate::cmd::change_role::ChangeRole;
use crate::cmd::join::Join;
use crate::cmd::set_cluster_name::SetClusterName;
use crate::cmd::status::Status;
use crate::engine::Engine;
use crate::fixtures::{status_text, EventLevels, ScriptedRunner};
use crate::membership::Role;
use crate::runner::ControlCommand;

const LOCAL: &str = "rabbit@h2";
const SEED: &str = "rabbit@h1";
const NODES: &str = r#"[{"name":"rabbit@h1","type":"disc"},{"name":"rabbit@h2","type":"disc"}]"#;

#[test]
fn join_without_cluster_name_is_idempotent() -> Result<()> {
    // A cluster formed by joining the seed is named after it.
    let status = status_text(Some(SEED), &[SEED, LOCAL], &[SEED, LOCAL], &[]);
    let engine = Engine::new(ScriptedRunner::new(status, LOCAL));

    let cmd = Join::from_iter_safe(["join", "--cluster-nodes", NODES])?;
    cmd.run(&engine)?;
    cmd.run(&engine)?;

    assert!(engine.runner().mutations().is_empty(), "expected no mutations, got {:?}", engine.runner().mutations());
    Ok(())
}

#[test]
fn join_with_cluster_name_joins_standalone_node() -> Result<()> {
    let engine = Engine::new(ScriptedRunner::new(status_text(Some(LOCAL), &[LOCAL], &[LOCAL], &[]), LOCAL));

    Join::from_iter_safe(["join", "--cluster-nodes", NODES, "--cluster-name", "prod"])?.run(&engine)?;

    assert_eq!(
        engine.runner().mutations(),
        vec![
            ControlCommand::StopApplication,
            ControlCommand::JoinCluster { target: SEED.into(), ram: false },
            ControlCommand::StartApplication,
        ],
        "unexpected command sequence"
    );
    Ok(())
}

#[test]
fn set_cluster_name_falls_back_to_first_node() -> Result<()> {
    let engine = Engine::new(ScriptedRunner::new(status_text(Some("staging"), &[SEED, LOCAL], &[SEED, LOCAL], &[]), LOCAL));

    SetClusterName::from_iter_safe(["set-cluster-name", "--cluster-nodes", NODES])?.run(&engine)?;

    assert_eq!(engine.runner().mutations(), vec![ControlCommand::SetClusterName(SEED.into())]);
    Ok(())
}

#[test]
fn change_role_reads_desired_yaml() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        "cluster_name: prod\nnodes:\n  - name: rabbit@h1\n    type: disc\n  - name: rabbit@h2\n    type: ram"
    )?;
    let path = file.path().to_string_lossy().into_owned();
    let engine = Engine::new(ScriptedRunner::new(status_text(Some("prod"), &[SEED, LOCAL], &[SEED, LOCAL], &[]), LOCAL));

    ChangeRole::from_iter_safe(["change-role", "--desired", path.as_str()])?.run(&engine)?;

    assert_eq!(
        engine.runner().mutations(),
        vec![
            ControlCommand::StopApplication,
            ControlCommand::ChangeClusterNodeType(Role::Ram),
            ControlCommand::StartApplication,
        ],
        "unexpected command sequence"
    );
    Ok(())
}

#[test]
fn cluster_nodes_conflicts_with_desired() {
    let res = Join::from_iter_safe(["join", "--cluster-nodes", NODES, "--desired", "/tmp/desired.yaml"]);
    assert!(res.is_err(), "expected --cluster-nodes and --desired to conflict");

    let res = Join::from_iter_safe(["join"]);
    assert!(res.is_err(), "expected one of --cluster-nodes or --desired to be required");
}

#[test]
fn malformed_cluster_nodes_fail_before_any_command() -> Result<()> {
    let engine = Engine::new(ScriptedRunner::new(status_text(Some(SEED), &[LOCAL], &[LOCAL], &[]), LOCAL));

    let res = Join::from_iter_safe(["join", "--cluster-nodes", "[{name:"])?.run(&engine);

    assert!(res.is_err(), "expected malformed cluster nodes to be rejected");
    assert!(engine.runner().calls().is_empty(), "expected no commands, got {:?}", engine.runner().calls());
    Ok(())
}

#[test]
fn status_prints_without_mutations() -> Result<()> {
    let engine = Engine::new(ScriptedRunner::new(status_text(Some(SEED), &[SEED, LOCAL], &[SEED], &[LOCAL]), LOCAL));

    Status::from_iter_safe(["status", "--json"])?.run(&engine)?;

    assert!(engine.runner().mutations().is_empty());
    Ok(())
}

#[test]
fn skip_is_reported_once() -> Result<()> {
    let status = status_text(Some(SEED), &[SEED, LOCAL], &[SEED, LOCAL], &[]);
    let engine = Engine::new(ScriptedRunner::new(status, LOCAL));
    let levels = EventLevels::default();
    let subscriber = tracing_subscriber::registry().with(levels.clone());

    tracing::subscriber::with_default(subscriber, || Join::from_iter_safe(["join", "--cluster-nodes", NODES])?.run(&engine))?;

    assert_eq!(levels.at_least(Level::INFO), 1, "expected a single info event for the skip decision");
    Ok(())
}
