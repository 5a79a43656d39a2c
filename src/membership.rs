//! Desired cluster membership and the facts derived from a cluster status snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::status::ClusterStatus;

/// The cluster name used when neither a name nor any cluster nodes are configured.
pub const UNNAMED_CLUSTER: &str = "unnamed-rabbitmq-cluster";

/// The role of a cluster member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persists cluster metadata to disk.
    Disc,
    /// Holds cluster metadata in memory only.
    Ram,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disc => f.write_str("disc"),
            Self::Ram => f.write_str("ram"),
        }
    }
}

impl FromStr for Role {
    type Err = ClusterError;

    fn from_str(s: &str) -> ClusterResult<Self> {
        match s {
            "disc" => Ok(Self::Disc),
            "ram" => Ok(Self::Ram),
            other => Err(ClusterError::InvalidRole(other.into())),
        }
    }
}

/// A role as configured upstream, which may not be one the engine knows how to act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesiredRole {
    Known(Role),
    Unrecognized(String),
}

impl Default for DesiredRole {
    fn default() -> Self {
        Self::Known(Role::Disc)
    }
}

impl From<Role> for DesiredRole {
    fn from(role: Role) -> Self {
        Self::Known(role)
    }
}

impl fmt::Display for DesiredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(role) => role.fmt(f),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for DesiredRole {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw: String = Deserialize::deserialize(de)?;
        Ok(raw.parse::<Role>().map(Self::Known).unwrap_or(Self::Unrecognized(raw)))
    }
}

impl Serialize for DesiredRole {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

/// A member of the desired cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// The node identifier, exactly as the control plane emits it, e.g. `rabbit@host1`.
    pub name: String,
    /// The desired role of the node.
    #[serde(rename = "type", default)]
    pub role: DesiredRole,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>, role: impl Into<DesiredRole>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

/// The desired membership of the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredMembership {
    /// The desired cluster name, if explicitly configured.
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// The desired cluster nodes; the first entry is the join target.
    #[serde(default)]
    pub nodes: Vec<ClusterNode>,
}

impl DesiredMembership {
    pub fn new(cluster_name: Option<String>, nodes: Vec<ClusterNode>) -> Self {
        Self { cluster_name, nodes }
    }

    /// Decode a JSON array of cluster nodes.
    ///
    /// Hash-rocket spellings such as `[{"name"=>"rabbit@h1","type"=>"disc"}]` are accepted.
    pub fn from_json(cluster_name: Option<String>, cluster_nodes: &str) -> ClusterResult<Self> {
        let nodes = serde_json::from_str(&cluster_nodes.replace("=>", ":")).map_err(|err| ClusterError::InvalidMembership(err.to_string()))?;
        Ok(Self::new(cluster_name, nodes))
    }

    /// Decode a full YAML document with `cluster_name` & `nodes` keys.
    pub fn from_yaml(doc: &str) -> ClusterResult<Self> {
        serde_yaml::from_str(doc).map_err(|err| ClusterError::InvalidMembership(err.to_string()))
    }

    /// The desired nodes, failing if there are none.
    pub fn require_nodes(&self) -> ClusterResult<&[ClusterNode]> {
        if self.nodes.is_empty() {
            return Err(ClusterError::Precondition("cluster nodes must be non-empty".into()));
        }
        Ok(&self.nodes)
    }

    /// The node to join, which is the first desired node.
    pub fn join_target(&self) -> ClusterResult<&ClusterNode> {
        self.require_nodes().map(|nodes| &nodes[0])
    }

    /// The desired cluster name, falling back to the join target's name and then to a
    /// fixed placeholder.
    pub fn cluster_name_with_fallback(&self) -> String {
        if let Some(name) = &self.cluster_name {
            return name.clone();
        }
        self.nodes
            .first()
            .map(|node| node.name.clone())
            .unwrap_or_else(|| UNNAMED_CLUSTER.into())
    }
}

/// Whether the given node is currently running as part of the cluster.
pub fn is_member(node_id: &str, status: &ClusterStatus) -> bool {
    status.running_nodes.iter().any(|node| node == node_id)
}

/// The role the given node currently holds, if any.
pub fn current_role(node_id: &str, status: &ClusterStatus) -> Option<Role> {
    if status.disc_nodes.contains(node_id) {
        Some(Role::Disc)
    } else if status.ram_nodes.contains(node_id) {
        Some(Role::Ram)
    } else {
        None
    }
}

/// The role the given node should hold according to the desired membership.
pub fn desired_role_for<'a>(node_id: &str, desired: &'a DesiredMembership) -> ClusterResult<&'a DesiredRole> {
    desired
        .require_nodes()?
        .iter()
        .find(|node| node.name == node_id)
        .map(|node| &node.role)
        .ok_or_else(|| ClusterError::UnknownNode(node_id.into()))
}
