//! Cluster status parsing.
//!
//! The control tool's status output is not a stable machine interface, and its layout varies
//! across versions. All text pattern extraction lives here; everything else works with the
//! structured `ClusterStatus`.
//!
//! Each field is extracted independently from the normalized erlang-term output, e.g.
//!
//! ```text
//! [{nodes,[{disc,['rabbit@h1']},{ram,['rabbit@h2']}]},
//!  {running_nodes,['rabbit@h1','rabbit@h2']},
//!  {cluster_name,<<"prod">>}]
//! ```
//!
//! and a missing field is simply absent from the result.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{ClusterError, ClusterResult};

/// The trailing marker emitted by older control-tool versions.
const LEGACY_DONE_MARKER: &str = "...done.";

lazy_static! {
    static ref RE_NEWLINE_INDENT: Regex = Regex::new(r"\r?\n\s*").expect("failed to compile RE_NEWLINE_INDENT regex");
    static ref RE_SPACES: Regex = Regex::new(r"[ \t]+").expect("failed to compile RE_SPACES regex");
    static ref RE_CLUSTER_NAME: Regex = Regex::new(r#"\{cluster_name,\s*<<"(.*?)">>\}"#).expect("failed to compile RE_CLUSTER_NAME regex");
    static ref RE_RUNNING_NODES: Regex = Regex::new(r"\{running_nodes,\s*\[(.*?)\]\}").expect("failed to compile RE_RUNNING_NODES regex");
    static ref RE_DISC_NODES: Regex = Regex::new(r"\{disc,\s*\[(.*?)\]\}").expect("failed to compile RE_DISC_NODES regex");
    static ref RE_RAM_NODES: Regex = Regex::new(r"\{ram,\s*\[(.*?)\]\}").expect("failed to compile RE_RAM_NODES regex");
}

/// A point-in-time snapshot of cluster membership as reported by the local node.
///
/// Never cached: a fresh snapshot is taken for every decision the engine makes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStatus {
    /// The name of the cluster, absent when the node is not part of a named cluster.
    pub cluster_name: Option<String>,
    /// The nodes currently up, in reported order.
    pub running_nodes: Vec<String>,
    /// The nodes configured as disc members.
    pub disc_nodes: BTreeSet<String>,
    /// The nodes configured as ram members, disjoint from `disc_nodes`.
    pub ram_nodes: BTreeSet<String>,
}

impl ClusterStatus {
    /// Parse the raw output of a cluster status query.
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        let text = normalize(raw);
        if text.is_empty() {
            return Err(ClusterError::EmptyStatus);
        }

        let cluster_name = capture(&RE_CLUSTER_NAME, &text).filter(|name| !name.is_empty()).map(String::from);
        let running_nodes = capture(&RE_RUNNING_NODES, &text).map(split_nodes).unwrap_or_default();
        let disc_nodes: BTreeSet<String> = capture(&RE_DISC_NODES, &text).map(split_nodes).unwrap_or_default().into_iter().collect();
        let mut ram_nodes: BTreeSet<String> = capture(&RE_RAM_NODES, &text).map(split_nodes).unwrap_or_default().into_iter().collect();

        let overlap: Vec<String> = ram_nodes.intersection(&disc_nodes).cloned().collect();
        for node in overlap {
            tracing::warn!(node = %node, "node reported as both disc and ram, treating it as disc");
            ram_nodes.remove(&node);
        }

        let status = Self {
            cluster_name,
            running_nodes,
            disc_nodes,
            ram_nodes,
        };
        tracing::debug!(?status, "parsed cluster status");
        Ok(status)
    }
}

/// Normalize raw status output into a single line.
///
/// Newlines and the indentation following them are removed, runs of spaces collapse to one,
/// and the legacy `...done.` marker is stripped.
pub fn normalize(raw: &str) -> String {
    let joined = RE_NEWLINE_INDENT.replace_all(raw, "");
    let squeezed = RE_SPACES.replace_all(&joined, " ");
    squeezed.replace(LEGACY_DONE_MARKER, "").trim().to_string()
}

/// The first capture group of the given pattern, if it matches.
fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Split a bracketed node list body, dropping quotes & empty entries.
fn split_nodes(list: &str) -> Vec<String> {
    list.replace('\'', "")
        .split(',')
        .map(str::trim)
        .filter(|node| !node.is_empty())
        .map(String::from)
        .collect()
}
