use crate::{GraphError, NodeModel, NodeProps};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Plain nested tree: the storage and rendering form of a document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub props: NodeProps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_props(mut self, props: NodeProps) -> Self {
        self.props = props;
        self
    }

    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = TreeNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.node_type.is_empty()
    }

    /// Decodes a tree coming from storage. Children that are not objects or
    /// carry no string `type` are dropped; a root like that is reported as a
    /// missing tree.
    pub fn from_value_lossy(value: &Value) -> Result<Self, GraphError> {
        value
            .as_object()
            .and_then(decode_node)
            .ok_or(GraphError::MissingTree)
    }

    pub fn from_json_str(source: &str) -> Result<Self, GraphError> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_value_lossy(&value)
    }

    pub fn to_value(&self) -> Result<Value, GraphError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Visits this subtree in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut TreeNode)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

impl From<&NodeModel> for TreeNode {
    fn from(node: &NodeModel) -> Self {
        Self {
            key: Some(node.key.clone()),
            node_type: node.node_type.clone(),
            props: node.props.clone(),
            index: Some(node.index),
            children: Vec::new(),
        }
    }
}

fn decode_node(object: &Map<String, Value>) -> Option<TreeNode> {
    let node_type = object.get("type").and_then(Value::as_str)?.to_string();
    let key = object
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(ToOwned::to_owned);
    let props = match object.get("props") {
        None | Some(Value::Null) => NodeProps::default(),
        Some(Value::Object(map)) => NodeProps::from_map_lossy(map),
        Some(other) => {
            tracing::warn!(node_type = %node_type, props = %other, "node props are not an object; dropping them");
            NodeProps::default()
        }
    };
    let children = match object.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let child = item.as_object().and_then(decode_node);
                if child.is_none() {
                    tracing::warn!(parent_type = %node_type, "skipping malformed child node");
                }
                child
            })
            .collect(),
        _ => Vec::new(),
    };
    Some(TreeNode {
        key,
        node_type,
        props,
        index: None,
        children,
    })
}

pub type TreeComparator<'a> = &'a dyn Fn(&TreeNode, &TreeNode) -> Ordering;
pub type ExcludeFilter<'a> = &'a dyn Fn(&NodeModel) -> bool;

/// Export options for turning the graph back into a plain tree.
#[derive(Clone, Copy, Default)]
pub struct TreeExport<'a> {
    /// Omit node keys; keys are editor-session local and never persisted.
    pub strip_keys: bool,
    /// Child order. Defaults to ascending `index`.
    pub comparator: Option<TreeComparator<'a>>,
    /// Subtrees for which this returns true are left out. Never applied to the root.
    pub exclude: Option<ExcludeFilter<'a>>,
}

impl<'a> TreeExport<'a> {
    pub fn keyed() -> Self {
        Self::default()
    }

    pub fn serializable() -> Self {
        Self {
            strip_keys: true,
            ..Self::default()
        }
    }

    pub fn with_comparator(mut self, comparator: TreeComparator<'a>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_exclude(mut self, exclude: ExcludeFilter<'a>) -> Self {
        self.exclude = Some(exclude);
        self
    }
}

pub fn by_index(a: &TreeNode, b: &TreeNode) -> Ordering {
    a.index.cmp(&b.index)
}
