use serde::{Deserialize, Serialize};

/// How node keys are minted when a tree is imported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// A fresh token per node; safe when the same document is mounted several times.
    #[default]
    GloballyUnique,
    /// `node1`, `node2`, ... derived from a per-graph counter. Incoming `node<N>`
    /// keys advance the counter so later grafts never reuse them.
    LocalSequential,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphConfig {
    pub key_policy: KeyPolicy,
}

impl GraphConfig {
    pub fn with_key_policy(key_policy: KeyPolicy) -> Self {
        Self { key_policy }
    }

    pub fn local() -> Self {
        Self::with_key_policy(KeyPolicy::LocalSequential)
    }
}
