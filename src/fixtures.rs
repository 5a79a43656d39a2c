use std::cell::RefCell;
use std::io;
use std::sync::{Arc, Mutex};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::{ClusterError, ClusterResult};
use crate::runner::{CommandOutput, CommandRunner, ControlCommand};

/// A scripted response for a control command.
#[derive(Clone, Debug)]
pub enum Response {
    Output(CommandOutput),
    /// The command could not be spawned.
    SpawnFailure,
}

/// A runner which answers from a script & records every command it is asked to run.
///
/// Status & identity queries are answered from `status`/`node_name`; any other command
/// succeeds with empty output unless a response has been scripted for it.
pub struct ScriptedRunner {
    pub status: String,
    pub node_name: String,
    responses: Vec<(ControlCommand, Response)>,
    /// The number of status queries answered before status queries start failing.
    status_limit: Option<usize>,
    calls: RefCell<Vec<ControlCommand>>,
}

impl ScriptedRunner {
    pub fn new(status: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            node_name: node_name.into(),
            responses: vec![],
            status_limit: None,
            calls: RefCell::new(vec![]),
        }
    }

    /// Script a response for the given command.
    pub fn respond(mut self, cmd: ControlCommand, response: Response) -> Self {
        self.responses.push((cmd, response));
        self
    }

    /// Script a failure with the given stderr for the given command.
    pub fn fail(self, cmd: ControlCommand, stderr: &str) -> Self {
        self.respond(cmd, Response::Output(CommandOutput::failed(stderr)))
    }

    /// Answer only the first `limit` status queries, failing every later one.
    pub fn fail_status_after(mut self, limit: usize) -> Self {
        self.status_limit = Some(limit);
        self
    }

    /// Every command issued so far.
    pub fn calls(&self) -> Vec<ControlCommand> {
        self.calls.borrow().clone()
    }

    /// Every command issued so far, excluding status & identity queries.
    pub fn mutations(&self) -> Vec<ControlCommand> {
        self.calls
            .borrow()
            .iter()
            .filter(|cmd| !matches!(cmd, ControlCommand::QueryClusterStatus { .. } | ControlCommand::EvalNodeIdentity))
            .cloned()
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &ControlCommand) -> ClusterResult<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        if let (ControlCommand::QueryClusterStatus { .. }, Some(limit)) = (cmd, self.status_limit) {
            let queries = self.calls.borrow().iter().filter(|call| matches!(call, ControlCommand::QueryClusterStatus { .. })).count();
            if queries > limit {
                return Ok(CommandOutput::failed("Error: unable to perform an operation on node"));
            }
        }
        let scripted = self.responses.iter().find(|(scripted, _)| scripted == cmd).map(|(_, res)| res.clone());
        match (scripted, cmd) {
            (Some(Response::Output(output)), _) => Ok(output),
            (Some(Response::SpawnFailure), _) => Err(ClusterError::Execution {
                command: cmd.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            }),
            (None, ControlCommand::QueryClusterStatus { .. }) => Ok(CommandOutput::ok(self.status.clone())),
            (None, ControlCommand::EvalNodeIdentity) => Ok(CommandOutput::ok(format!("'{}'\n", self.node_name))),
            (None, _) => Ok(CommandOutput::ok("")),
        }
    }
}

/// Build raw erlang-term status output.
pub fn status_text(cluster_name: Option<&str>, running: &[&str], disc: &[&str], ram: &[&str]) -> String {
    let quote = |nodes: &[&str]| nodes.iter().map(|node| format!("'{}'", node)).collect::<Vec<_>>().join(",");
    let mut out = format!(
        "Cluster status of node {} ...\n[{{nodes,[{{disc,[{}]}},{{ram,[{}]}}]}},\n {{running_nodes,[{}]}}",
        running.first().copied().unwrap_or("rabbit@localhost"),
        quote(disc),
        quote(ram),
        quote(running),
    );
    if let Some(name) = cluster_name {
        out.push_str(&format!(",\n {{cluster_name,<<\"{}\">>}}", name));
    }
    out.push_str(",\n {partitions,[]}]\n");
    out
}

/// A layer recording the level of every event emitted.
#[derive(Clone, Default)]
pub struct EventLevels(Arc<Mutex<Vec<Level>>>);

impl EventLevels {
    /// The number of recorded events at the given level or more severe.
    pub fn at_least(&self, level: Level) -> usize {
        self.0.lock().map(|levels| levels.iter().filter(|recorded| **recorded <= level).count()).unwrap_or_default()
    }
}

impl<S: Subscriber> Layer<S> for EventLevels {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if let Ok(mut levels) = self.0.lock() {
            levels.push(*event.metadata().level());
        }
    }
}
