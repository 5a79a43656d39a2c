//! Runtime configuration.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};

/// The home directory used by the control tool when none is set in the environment.
pub const DEFAULT_HOME: &str = "/var/lib/rabbitmq";
/// The control-plane binary used when none is configured.
pub const DEFAULT_CTL_BINARY: &str = "rabbitmqctl";
/// The first control-plane version whose default status output is no longer erlang terms.
pub const DEFAULT_STRUCTURED_OUTPUT_VERSION: &str = "3.8.0";

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The logging config, which uses `tracing_subscriber::EnvFilter` directives.
    #[serde(default = "Config::default_rust_log")]
    pub rust_log: String,
    /// The home directory passed through to every control-tool invocation.
    ///
    /// The control tool discovers its erlang cookie and config through this variable.
    #[serde(default = "Config::default_home")]
    pub home: String,
    /// The local control-plane binary.
    #[serde(default = "Config::default_ctl_binary")]
    pub ctl_binary: String,
    /// The installed broker version, if known.
    #[serde(default, deserialize_with = "Config::parse_opt_version")]
    pub ctl_version: Option<ControlVersion>,
    /// The version at or above which status queries need an explicit output format.
    #[serde(default = "Config::default_structured_output_version", deserialize_with = "Config::parse_version")]
    pub structured_output_version: ControlVersion,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }

    /// Whether cluster status queries must request structured output.
    ///
    /// An unknown installed version is treated as a legacy control plane.
    pub fn requires_structured_output(&self) -> bool {
        self.ctl_version
            .as_ref()
            .map(|version| version >= &self.structured_output_version)
            .unwrap_or(false)
    }

    fn default_rust_log() -> String {
        "info".into()
    }

    fn default_home() -> String {
        DEFAULT_HOME.into()
    }

    fn default_ctl_binary() -> String {
        DEFAULT_CTL_BINARY.into()
    }

    fn default_structured_output_version() -> ControlVersion {
        ControlVersion(vec![3, 8, 0])
    }

    fn parse_version<'de, D: Deserializer<'de>>(val: D) -> Result<ControlVersion, D::Error> {
        let raw: String = Deserialize::deserialize(val)?;
        raw.parse().map_err(|err| DeError::custom(format!("error parsing version: {}", err)))
    }

    fn parse_opt_version<'de, D: Deserializer<'de>>(val: D) -> Result<Option<ControlVersion>, D::Error> {
        let raw: Option<String> = Deserialize::deserialize(val)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|err| DeError::custom(format!("error parsing CTL_VERSION: {}", err))),
        }
    }
}

/// A broker package version, compared component by component.
///
/// Package revisions and development qualifiers after the first `-` are discarded, so
/// `3.7.13-1` compares equal to `3.7.13`. Missing trailing components count as zero.
#[derive(Clone, Debug, Eq)]
pub struct ControlVersion(Vec<u64>);

impl ControlVersion {
    fn component(&self, idx: usize) -> u64 {
        self.0.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for ControlVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let base = s.trim().split('-').next().unwrap_or_default();
        anyhow::ensure!(!base.is_empty(), "empty version string");
        base.split('.')
            .map(|part| part.parse::<u64>().with_context(|| format!("invalid version component `{}` in `{}`", part, s)))
            .collect::<Result<Vec<_>>>()
            .map(ControlVersion)
    }
}

impl PartialEq for ControlVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for ControlVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ControlVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|idx| self.component(idx).cmp(&other.component(idx)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for ControlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|part| part.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}
