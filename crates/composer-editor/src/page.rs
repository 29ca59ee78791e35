use crate::{ComposerError, PageComposerConfig, RemoveSelectedPass};
use composer_graph::{
    GraphModel, NodeKey, NodeModel, NodePatch, NodeProps, TreeExport, TreeNode, run_rewrite,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstanceRef {
    pub component_name: String,
    pub component_instance: String,
}

/// Editing session over a page or template components tree.
#[derive(Clone, Debug)]
pub struct PageComposer {
    graph: GraphModel,
}

impl PageComposer {
    pub fn new(components_tree: &TreeNode, config: PageComposerConfig) -> Result<Self, ComposerError> {
        let mut graph = GraphModel::new(config.graph_config());
        graph.init(components_tree)?;
        Ok(Self { graph })
    }

    pub fn from_value(components_tree: &Value, config: PageComposerConfig) -> Result<Self, ComposerError> {
        Self::new(&TreeNode::from_value_lossy(components_tree)?, config)
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn model(&self) -> Result<TreeNode, ComposerError> {
        Ok(self.graph.get_tree(TreeExport::keyed())?)
    }

    /// Key-stripped copy without selection flags.
    pub fn serializable_model(&self) -> Result<TreeNode, ComposerError> {
        let mut clean = self.graph.clone();
        run_rewrite(&mut clean, &RemoveSelectedPass)?;
        Ok(clean.get_serializable_tree(TreeExport::default())?)
    }

    pub fn select(&mut self, key: &str) -> Result<bool, ComposerError> {
        if !self.graph.node_exists(key) {
            return Ok(false);
        }
        run_rewrite(&mut self.graph, &RemoveSelectedPass)?;
        let Some(node) = self.graph.get_node(key) else {
            return Ok(false);
        };
        let mut props = node.props.clone();
        props.mark_selected();
        Ok(self.graph.assign_node(key, NodePatch::props(props)).is_some())
    }

    pub fn selected_keys(&self) -> Result<Vec<NodeKey>, ComposerError> {
        Ok(self.graph.traverse(None, |context| {
            if context.node.props.is_selected() {
                vec![context.node.key.clone()]
            } else {
                Vec::new()
            }
        })?)
    }

    pub fn append_child(&mut self, parent: &str, subtree: &TreeNode) -> Result<Option<NodeKey>, ComposerError> {
        let key = self.graph.add_child(parent, subtree, None)?;
        self.graph.reindex_children(parent);
        Ok(key)
    }

    pub fn insert_before(&mut self, target: &str, subtree: &TreeNode) -> Result<Option<NodeKey>, ComposerError> {
        self.insert_next_to(target, subtree, 0)
    }

    pub fn insert_after(&mut self, target: &str, subtree: &TreeNode) -> Result<Option<NodeKey>, ComposerError> {
        self.insert_next_to(target, subtree, 1)
    }

    fn insert_next_to(
        &mut self,
        target: &str,
        subtree: &TreeNode,
        offset: usize,
    ) -> Result<Option<NodeKey>, ComposerError> {
        let Some((parent, position)) = self.sibling_slot(target, None) else {
            return Ok(None);
        };
        let key = self.graph.add_child(&parent, subtree, Some(position + offset))?;
        self.graph.reindex_children(&parent);
        Ok(key)
    }

    /// Parent of `target` and its position among the siblings, not counting `moving`.
    fn sibling_slot(&self, target: &str, moving: Option<&str>) -> Option<(NodeKey, usize)> {
        let parent = self.graph.get_parent_key(target)?.to_string();
        let position = self
            .graph
            .get_children_keys(&parent)
            .iter()
            .filter(|sibling| Some(sibling.as_str()) != moving)
            .position(|sibling| sibling == target)?;
        Some((parent, position))
    }

    pub fn replace(&mut self, target: &str, subtree: &TreeNode) -> Result<Option<NodeKey>, ComposerError> {
        Ok(self.graph.replace_node(target, subtree)?)
    }

    /// Removes a non-root node and closes the gap it leaves among its siblings.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(parent) = self.graph.get_parent_key(key).map(ToOwned::to_owned) else {
            tracing::debug!(key, "page root or missing node cannot be deleted");
            return false;
        };
        self.graph.delete_node(key);
        self.graph.reindex_children(&parent);
        true
    }

    pub fn move_before(&mut self, key: &str, target: &str) -> Result<bool, ComposerError> {
        self.move_next_to(key, target, 0)
    }

    pub fn move_after(&mut self, key: &str, target: &str) -> Result<bool, ComposerError> {
        self.move_next_to(key, target, 1)
    }

    fn move_next_to(&mut self, key: &str, target: &str, offset: usize) -> Result<bool, ComposerError> {
        if key == target {
            return Ok(false);
        }
        let Some((parent, position)) = self.sibling_slot(target, Some(key)) else {
            return Ok(false);
        };
        self.relocate(key, &parent, Some(position + offset))
    }

    pub fn move_into(&mut self, key: &str, parent: &str) -> Result<bool, ComposerError> {
        self.relocate(key, parent, None)
    }

    fn relocate(&mut self, key: &str, parent: &str, at_index: Option<usize>) -> Result<bool, ComposerError> {
        if key == parent || self.graph.get_all_parent_keys(parent).iter().any(|ancestor| ancestor == key) {
            tracing::debug!(key, parent, "cannot move a node into its own subtree");
            return Ok(false);
        }
        let Some(old_parent) = self.graph.get_parent_key(key).map(ToOwned::to_owned) else {
            return Ok(false);
        };
        if !self.graph.move_node(key, parent, at_index)? {
            return Ok(false);
        }
        self.graph.reindex_children(&old_parent);
        self.graph.reindex_children(parent);
        Ok(true)
    }

    /// The page reduced to its component instances. Nodes that are not
    /// instances are elided and their instance descendants move up.
    pub fn instances_tree<F>(&self, mut mapper: F) -> Result<Vec<TreeNode>, ComposerError>
    where
        F: FnMut(&NodeProps, &TreeNode) -> TreeNode,
    {
        let root = self
            .graph
            .root_key()
            .ok_or(composer_graph::GraphError::NotInitialized)?;
        Ok(self.collect_instances(root, &mut mapper))
    }

    fn collect_instances<F>(&self, key: &str, mapper: &mut F) -> Vec<TreeNode>
    where
        F: FnMut(&NodeProps, &TreeNode) -> TreeNode,
    {
        let Some(node) = self.graph.get_node(key) else {
            return Vec::new();
        };
        let nested: Vec<TreeNode> = self
            .graph
            .get_children_keys(key)
            .iter()
            .flat_map(|child| self.collect_instances(child, &mut *mapper))
            .collect();
        if instance_ref(&node.props).is_none() {
            return nested;
        }
        let Some(branch) = self.graph.get_subtree(key, TreeExport::serializable()) else {
            return nested;
        };
        let mut mapped = mapper(&node.props, &branch);
        mapped.children.extend(nested);
        vec![mapped]
    }

    /// Distinct `(componentName, componentInstance)` pairs in pre-order.
    pub fn instances_list_unique(&self) -> Result<Vec<ComponentInstanceRef>, ComposerError> {
        let mut seen = BTreeSet::new();
        let all = self
            .graph
            .traverse(None, |context| instance_ref(&context.node.props).into_iter().collect::<Vec<_>>())?;
        Ok(all.into_iter().filter(|instance| seen.insert(instance.clone())).collect())
    }

    pub fn find_instances(&self, component_instance: &str) -> Result<Vec<&NodeModel>, ComposerError> {
        let pattern = json!({"props": {"componentInstance": component_instance}});
        Ok(self.graph.find_all_nodes_match(&pattern, None)?)
    }
}

fn instance_ref(props: &NodeProps) -> Option<ComponentInstanceRef> {
    Some(ComponentInstanceRef {
        component_name: props.component_name.clone()?,
        component_instance: props.component_instance.clone()?,
    })
}
