use composer_graph::{GraphConfig, KeyPolicy};

pub const DEFAULT_ERROR_OUTPUT_NAME: &str = "exception";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposerConfig {
    pub key_policy: KeyPolicy,
    /// Output that always sorts last among a node's outputs.
    pub error_output_name: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::LocalSequential,
            error_output_name: DEFAULT_ERROR_OUTPUT_NAME.to_string(),
        }
    }
}

impl ComposerConfig {
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig::with_key_policy(self.key_policy)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageComposerConfig {
    pub key_policy: KeyPolicy,
}

impl PageComposerConfig {
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig::with_key_policy(self.key_policy)
    }
}
