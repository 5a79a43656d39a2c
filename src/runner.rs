//! Control-tool invocation.
//!
//! All interaction with the local broker node goes through a `CommandRunner`. The engine only
//! deals in abstract `ControlCommand`s; `CtlRunner` renders them into the argument syntax of
//! the local control binary and executes them as blocking child processes.

use std::fmt;
use std::process::Command;

use crate::config::Config;
use crate::error::{ClusterError, ClusterResult};
use crate::membership::Role;

/// A control-plane command against the local node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Query cluster status, optionally forcing erlang term output.
    QueryClusterStatus { structured: bool },
    /// Stop the broker application, leaving the runtime up.
    StopApplication,
    /// Start the broker application.
    StartApplication,
    /// Join the cluster of the given target node.
    JoinCluster { target: String, ram: bool },
    /// Change the role of the local node.
    ChangeClusterNodeType(Role),
    /// Set the name of the cluster the local node belongs to.
    SetClusterName(String),
    /// Evaluate the identity of the local node.
    EvalNodeIdentity,
}

impl ControlCommand {
    /// Render the arguments of this command for the control binary.
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::QueryClusterStatus { structured } => {
                let mut args = vec!["-q".to_string(), "cluster_status".to_string()];
                if *structured {
                    args.extend(["--formatter".to_string(), "erlang".to_string()]);
                }
                args
            }
            Self::StopApplication => vec!["stop_app".into()],
            Self::StartApplication => vec!["start_app".into()],
            Self::JoinCluster { target, ram } => {
                let mut args = vec!["join_cluster".to_string()];
                if *ram {
                    args.push("--ram".into());
                }
                args.push(target.clone());
                args
            }
            Self::ChangeClusterNodeType(role) => vec!["change_cluster_node_type".into(), role.to_string()],
            Self::SetClusterName(name) => vec!["set_cluster_name".into(), name.clone()],
            Self::EvalNodeIdentity => vec!["eval".into(), "node().".into()],
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// The captured result of a control command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code of the process, `None` if it was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Build the output of a command which exited successfully.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build the output of a command which exited with status `1`.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            status: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status `0`.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Treat any unsuccessful exit as fatal, carrying stderr verbatim.
    pub fn check(self, command: &ControlCommand) -> ClusterResult<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(ClusterError::CommandFailed {
            command: command.to_string(),
            status: self.status.map(|code| code.to_string()).unwrap_or_else(|| "signal".into()),
            stderr: self.stderr,
        })
    }
}

/// A type which is able to run control commands against the local node.
///
/// Implementations must return unsuccessful exits as a `CommandOutput`; only a failure to
/// invoke the command at all is an error.
pub trait CommandRunner {
    /// Run the given command, blocking until it exits.
    fn run(&self, cmd: &ControlCommand) -> ClusterResult<CommandOutput>;

    /// Run the given command and fail on any unsuccessful exit.
    fn run_checked(&self, cmd: &ControlCommand) -> ClusterResult<CommandOutput> {
        let output = self.run(cmd)?.check(cmd)?;
        tracing::debug!(command = %cmd, stdout = %output.stdout.trim_end(), "control command succeeded");
        Ok(output)
    }

    /// The status query appropriate for the installed control plane.
    fn status_command(&self) -> ControlCommand {
        ControlCommand::QueryClusterStatus { structured: false }
    }
}

/// A runner which executes the local control binary as a child process.
#[derive(Clone, Debug)]
pub struct CtlRunner {
    /// The control binary to execute.
    binary: String,
    /// The home directory overlay.
    home: String,
    /// Whether status queries must force erlang term output.
    structured_status: bool,
}

impl CtlRunner {
    /// Create a new instance from the given config.
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.ctl_binary.clone(),
            home: config.home.clone(),
            structured_status: config.requires_structured_output(),
        }
    }
}

impl CommandRunner for CtlRunner {
    fn run(&self, cmd: &ControlCommand) -> ClusterResult<CommandOutput> {
        let args = cmd.args();
        tracing::debug!(binary = %self.binary, command = %cmd, "executing control command");
        let output = Command::new(&self.binary)
            .args(&args)
            .env("HOME", &self.home)
            .output()
            .map_err(|source| ClusterError::Execution {
                command: format!("{} {}", self.binary, cmd),
                source,
            })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn status_command(&self) -> ControlCommand {
        ControlCommand::QueryClusterStatus {
            structured: self.structured_status,
        }
    }
}
