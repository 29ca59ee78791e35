use crate::ComposerError;
use composer_graph::{GraphError, TreeNode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flow resource file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDocument {
    #[serde(default)]
    pub flow_name: String,
    #[serde(default)]
    pub model: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_test: Option<bool>,
}

/// A page resource file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub page_path: String,
    #[serde(default)]
    pub components_tree: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_test: Option<bool>,
}

/// A template resource file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub components_tree: Value,
}

impl FlowDocument {
    pub fn model_tree(&self) -> Result<TreeNode, GraphError> {
        TreeNode::from_value_lossy(&self.model)
    }

    pub fn is_disabled(&self) -> bool {
        self.is_disabled.unwrap_or(false)
    }

    pub fn is_test(&self) -> bool {
        self.is_test.unwrap_or(false)
    }

    pub fn to_json(&self) -> Result<String, ComposerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl PageDocument {
    pub fn components_tree(&self) -> Result<TreeNode, GraphError> {
        TreeNode::from_value_lossy(&self.components_tree)
    }

    pub fn is_test(&self) -> bool {
        self.is_test.unwrap_or(false)
    }

    pub fn to_json(&self) -> Result<String, ComposerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TemplateDocument {
    pub fn components_tree(&self) -> Result<TreeNode, GraphError> {
        TreeNode::from_value_lossy(&self.components_tree)
    }

    pub fn to_json(&self) -> Result<String, ComposerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn parse_flow_declarations(source: &str) -> Vec<FlowDocument> {
    parse_declarations(source, "flow")
}

pub fn parse_page_declarations(source: &str) -> Vec<PageDocument> {
    parse_declarations(source, "page")
}

pub fn parse_template_declarations(source: &str) -> Vec<TemplateDocument> {
    parse_declarations(source, "template")
}

/// One declaration per resource file; an unreadable file declares nothing.
fn parse_declarations<T: DeserializeOwned>(source: &str, kind: &str) -> Vec<T> {
    match serde_json::from_str(source) {
        Ok(document) => vec![document],
        Err(error) => {
            tracing::error!(kind, %error, "could not parse resource source");
            Vec::new()
        }
    }
}
