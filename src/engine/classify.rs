//! Classification of control command failures.
//!
//! The control tool reports some already-satisfied conditions as failures. These are matched
//! by case-sensitive substring against the captured stderr. The tables below are the only
//! place such wording is recognized; update them together when the tool's messages change.

use std::fmt;

/// Why a failed command is treated as success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BenignReason {
    /// The node is already a member of the target cluster.
    AlreadyMember,
    /// The join target is the local node.
    SelfCluster,
    /// The node is not clustered, and unclustered nodes are always disc nodes.
    NotClustered,
}

impl fmt::Display for BenignReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMember => f.write_str("node is already a member of the cluster"),
            Self::SelfCluster => f.write_str("cannot cluster node with itself"),
            Self::NotClustered => f.write_str("node is not clustered yet"),
        }
    }
}

/// A stderr pattern and the benign outcome it indicates.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub pattern: &'static str,
    pub reason: BenignReason,
}

/// Benign failures of `join_cluster`.
pub const JOIN_RULES: &[Rule] = &[
    Rule {
        pattern: "{ok,already_member}",
        reason: BenignReason::AlreadyMember,
    },
    Rule {
        pattern: "cannot_cluster_node_with_itself",
        reason: BenignReason::SelfCluster,
    },
];

/// Benign failures of `change_cluster_node_type`.
pub const CHANGE_ROLE_RULES: &[Rule] = &[Rule {
    pattern: r#"{not_clustered,"Non-clustered nodes can only be disc nodes."}"#,
    reason: BenignReason::NotClustered,
}];

/// Find the first rule matching the given stderr, if any.
pub fn classify(rules: &[Rule], stderr: &str) -> Option<BenignReason> {
    rules.iter().find(|rule| stderr.contains(rule.pattern)).map(|rule| rule.reason)
}
