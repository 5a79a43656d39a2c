//! Cluster reconciliation error abstractions.

use std::io;

use thiserror::Error;

/// A result type where the error is a `ClusterError`.
pub type ClusterResult<T> = ::std::result::Result<T, ClusterError>;

/// Cluster reconciliation error variants.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The control command could not be invoked at all.
    #[error("error executing control command `{command}`: {source}")]
    Execution {
        /// The rendered command line which failed to spawn.
        command: String,
        source: io::Error,
    },
    /// The cluster status query returned nothing to parse.
    #[error("cluster status should not be empty")]
    EmptyStatus,
    /// The control plane reported an empty identity for the local node.
    #[error("local node identity should not be empty")]
    EmptyIdentity,
    /// The desired state given by the caller is unusable for the requested operation.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The local node is not present in the desired membership.
    #[error("node {0} is not present in the desired cluster nodes")]
    UnknownNode(String),
    /// Joining the cluster failed for a reason not recognized as benign.
    #[error("error joining cluster: {0}")]
    Join(String),
    /// A control command exited unsuccessfully.
    #[error("control command `{command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        /// The exit status, rendered as `signal` when the process was killed.
        status: String,
        stderr: String,
    },
    /// The desired membership document could not be decoded.
    #[error("invalid cluster nodes: {0}")]
    InvalidMembership(String),
    /// A role value other than `disc` or `ram`.
    #[error("invalid cluster node type `{0}`, expected `disc` or `ram`")]
    InvalidRole(String),
}
