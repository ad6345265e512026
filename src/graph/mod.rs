//! Evaluation graph contract
//!
//! The resolver never computes configurations, configured targets or
//! artifacts itself. It asks the graph, which either has the value ready or
//! answers "not yet" (`Ok(None)`), in which case the whole resolution attempt
//! is abandoned and re-run by the driver once the value has been computed.
//!
//! ## Keys
//! - `BaselineOptions`: build options after the exec transition to a platform
//! - `ConfiguredTarget`: a label analyzed in a build configuration
//! - `Artifact`: an action output, ready once it has been built

mod memory;

pub use memory::InMemoryGraph;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::label::Label;
use crate::value::ProviderView;

/// Graph query failure. "Not ready" is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("evaluation interrupted")]
    Interrupted,

    /// The requested value can never be computed
    #[error("{key}: {message}")]
    DependencyFailed { key: GraphKey, message: String },

    #[error("{key}: graph returned a {found} value")]
    UnexpectedValue { key: GraphKey, found: &'static str },
}

/// Read-only access to the evaluation graph.
pub trait GraphLookup {
    /// `Ok(None)` means the value is not computed yet and will be; it never
    /// means "does not exist".
    fn query(&self, key: &GraphKey) -> Result<Option<GraphValue>, GraphError>;
}

impl<G: GraphLookup + ?Sized> GraphLookup for &G {
    fn query(&self, key: &GraphKey) -> Result<Option<GraphValue>, GraphError> {
        (**self).query(key)
    }
}

// =============================================================================
// KEYS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphKey {
    BaselineOptions {
        after_exec_transition: bool,
        platform: Label,
    },
    ConfiguredTarget(ConfiguredTargetKey),
    Artifact(ArtifactKey),
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaselineOptions {
                after_exec_transition,
                platform,
            } => write!(
                f,
                "BaselineOptions({}, exec={})",
                platform, after_exec_transition
            ),
            Self::ConfiguredTarget(key) => write!(f, "ConfiguredTarget({})", key),
            Self::Artifact(key) => write!(f, "Artifact({})", key.exec_path),
        }
    }
}

/// Build options, as a flat option name → value map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildOptions(pub BTreeMap<String, String>);

impl BuildOptions {
    pub fn with(mut self, option: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(option.into(), value.into());
        self
    }

    /// Stable digest of the options; equal options hash equal.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for (option, value) in &self.0 {
            hasher.update(option.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Identifies a build configuration by the checksum of its options.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildConfigurationKey {
    checksum: String,
}

impl BuildConfigurationKey {
    pub fn from_options(options: &BuildOptions) -> Self {
        Self {
            checksum: options.checksum(),
        }
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfiguredTargetKey {
    pub label: Label,
    pub configuration: BuildConfigurationKey,
}

impl fmt::Display for ConfiguredTargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let checksum = &self.configuration.checksum;
        let short = checksum.get(..12).unwrap_or(checksum.as_str());
        write!(f, "{} ({})", self.label, short)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub exec_path: String,
}

// =============================================================================
// VALUES
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum GraphValue {
    BaselineOptions(BuildOptions),
    ConfiguredTarget(ConfiguredTargetValue),
    Artifact(ArtifactValue),
}

impl GraphValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BaselineOptions(_) => "baseline options",
            Self::ConfiguredTarget(_) => "configured target",
            Self::Artifact(_) => "artifact",
        }
    }
}

/// Result of analyzing a target.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfiguredTargetValue {
    Rule(RuleConfiguredTarget),
    /// Source files, package groups, aliases to such and the like
    Other { label: Label, kind: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleConfiguredTarget {
    pub label: Label,
    pub providers: ProviderView,
    pub actions: Vec<ActionMetadata>,
}

impl RuleConfiguredTarget {
    /// Every output of every registered action, in registration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Artifact> {
        self.actions.iter().flat_map(|a| a.outputs.iter())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionMetadata {
    pub mnemonic: String,
    pub outputs: Vec<Artifact>,
}

/// A derived file produced by an action.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub exec_path: String,
}

impl Artifact {
    pub fn new(exec_path: impl Into<String>) -> Self {
        Self {
            exec_path: exec_path.into(),
        }
    }

    pub fn key(&self) -> GraphKey {
        GraphKey::Artifact(ArtifactKey {
            exec_path: self.exec_path.clone(),
        })
    }
}

/// Metadata of a built artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactValue {
    pub digest: String,
    pub size: u64,
}
