use crate::node_types::{
    APPLICATION_TITLE, COMPONENT_INSTANCE, FLOW_APPLICATION, FLOW_COMPONENT_INSTANCE, FLOW_PAGE,
    FLOW_USER_FUNCTION, PAGE, USER_FUNCTION, resource_tag,
};
use crate::{
    ComposerConfig, ComposerError, EnrichmentPass, FlowParticle, FlowParticleQuery, PrunePass,
    RemoveSelectedPass, SelectedNode, SelectedQuery,
};
use composer_graph::{
    GraphModel, NodeKey, NodePatch, NodeProps, TreeExport, TreeNode, run_query, run_rewrite,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Where a node sits in the flow diagram basket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Editing session over one flow document.
///
/// Every structural edit reruns enrichment, so `acceptableTypes` and port
/// order are always current when the model is exported.
#[derive(Clone, Debug)]
pub struct FlowComposer {
    config: ComposerConfig,
    graph: GraphModel,
}

impl FlowComposer {
    pub fn new(tree: &TreeNode, config: ComposerConfig) -> Result<Self, ComposerError> {
        let mut graph = GraphModel::new(config.graph_config());
        graph.init(tree)?;
        let mut composer = Self { config, graph };
        composer.enrich()?;
        Ok(composer)
    }

    pub fn from_value(model: &Value, config: ComposerConfig) -> Result<Self, ComposerError> {
        Self::new(&TreeNode::from_value_lossy(model)?, config)
    }

    pub fn with_default_model(config: ComposerConfig) -> Result<Self, ComposerError> {
        Self::new(&Self::default_model(), config)
    }

    pub fn default_model() -> TreeNode {
        TreeNode::new(FLOW_APPLICATION).with_props(NodeProps {
            title: Some(APPLICATION_TITLE.to_string()),
            ..NodeProps::default()
        })
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn flow_model(&self) -> Result<TreeNode, ComposerError> {
        Ok(self.graph.get_tree(TreeExport::keyed())?)
    }

    /// The form written to storage: no keys, no enrichment scratch state.
    pub fn serializable_flow_model(&self) -> Result<TreeNode, ComposerError> {
        let mut pruned = self.graph.clone();
        PrunePass.run(&mut pruned)?;
        Ok(pruned.get_serializable_tree(TreeExport::default())?)
    }

    /// blake3 digest of the serializable model.
    pub fn fingerprint(&self) -> Result<String, ComposerError> {
        let encoded = serde_json::to_vec(&self.serializable_flow_model()?)?;
        Ok(blake3::hash(&encoded).to_hex().to_string())
    }

    /// Re-imports `tree` and keeps the result only when it differs from the
    /// current model. Returns whether the session was replaced.
    pub fn reload(&mut self, tree: &TreeNode) -> Result<bool, ComposerError> {
        let fresh = Self::new(tree, self.config.clone())?;
        if fresh.serializable_flow_model()? == self.serializable_flow_model()? {
            tracing::debug!("reloaded flow model is unchanged");
            return Ok(false);
        }
        *self = fresh;
        Ok(true)
    }

    pub fn enrich(&mut self) -> Result<usize, ComposerError> {
        let pass = EnrichmentPass::new(self.config.error_output_name.as_str());
        Ok(pass.run(&mut self.graph)?)
    }

    pub fn selected(&self) -> Result<Option<SelectedNode>, ComposerError> {
        Ok(self.all_selected()?.into_iter().next())
    }

    pub fn all_selected(&self) -> Result<Vec<SelectedNode>, ComposerError> {
        Ok(run_query(&self.graph, &SelectedQuery)?)
    }

    /// Makes `key` the only selected node. Unknown keys leave the selection alone.
    pub fn select(&mut self, key: &str) -> Result<bool, ComposerError> {
        if !self.graph.node_exists(key) {
            return Ok(false);
        }
        self.clear_selection()?;
        Ok(set_selected(&mut self.graph, key))
    }

    pub fn clear_selection(&mut self) -> Result<usize, ComposerError> {
        Ok(run_rewrite(&mut self.graph, &RemoveSelectedPass)?)
    }

    /// Drops a resource on the empty diagram area; the root takes any particle.
    pub fn add_resource_to_basket(
        &mut self,
        resource: &TreeNode,
        position: Position,
    ) -> Result<Option<NodeKey>, ComposerError> {
        let Some(mut node) = flow_node_from_resource(resource) else {
            return Ok(None);
        };
        node.props.extra.insert("position".to_string(), serde_json::to_value(position)?);
        let key = self.graph.add_child_to_root(&node)?;
        self.enrich()?;
        Ok(Some(key))
    }

    /// Appends a resource under `destination` when the destination accepts its type.
    pub fn drop_resource(
        &mut self,
        resource: &TreeNode,
        destination: &str,
    ) -> Result<Option<NodeKey>, ComposerError> {
        let Some(target) = self.graph.get_node(destination) else {
            return Ok(None);
        };
        ensure_accepts(&target.props, &target.key, &resource.node_type)?;
        let Some(node) = flow_node_from_resource(resource) else {
            return Ok(None);
        };
        let key = self.graph.add_child(destination, &node, None)?;
        self.enrich()?;
        Ok(key)
    }

    /// Swaps `destination` for a node made from `resource`, keeping its position
    /// and its downstream nodes. The root cannot be replaced.
    pub fn replace_with_resource(
        &mut self,
        resource: &TreeNode,
        destination: &str,
    ) -> Result<Option<NodeKey>, ComposerError> {
        let Some(parent) = self.graph.get_parent_node(destination) else {
            tracing::debug!(destination, "replace target is missing or is the root");
            return Ok(None);
        };
        ensure_accepts(&parent.props, &parent.key, &resource.node_type)?;
        let Some(mut node) = flow_node_from_resource(resource) else {
            return Ok(None);
        };
        if let Some(current) = self.graph.get_subtree(destination, TreeExport::keyed()) {
            if let Some(position) = current.props.get_extra("position") {
                node.props.extra.insert("position".to_string(), position.clone());
            }
            node.children = current.children;
        }
        let key = self.graph.replace_node(destination, &node)?;
        self.enrich()?;
        Ok(key)
    }

    /// Wires `output_name` of one node to `input_name` of another. The input
    /// node moves under the output node and becomes the selection.
    pub fn connect_input(
        &mut self,
        output_key: &str,
        output_name: &str,
        input_key: &str,
        input_name: &str,
    ) -> Result<bool, ComposerError> {
        let (Some(output_node), Some(input_node)) =
            (self.graph.get_node(output_key), self.graph.get_node(input_key))
        else {
            return Ok(false);
        };
        if output_key == input_key
            || output_node.props.find_output(output_name).is_none()
            || input_node.props.find_input(input_name).is_none()
        {
            tracing::debug!(output_key, output_name, input_key, input_name, "connection ports do not match");
            return Ok(false);
        }
        if self
            .graph
            .get_all_parent_keys(output_key)
            .iter()
            .any(|parent| parent == input_key)
        {
            tracing::debug!(output_key, input_key, "connection would create a cycle");
            return Ok(false);
        }
        let accepted = resource_tag(&input_node.node_type).is_some_and(|tag| output_node.props.accepts(tag));
        if !accepted {
            tracing::debug!(output_key, input_key, input_type = %input_node.node_type, "output node does not accept the input node");
            return Ok(false);
        }

        let mut props = input_node.props.clone();
        for input in props.inputs.iter_mut().flatten() {
            input.connected_to = (input.name == input_name).then(|| output_name.to_string());
        }
        let old_parent = self.graph.get_parent_key(input_key).map(ToOwned::to_owned);
        self.graph.move_node(input_key, output_key, None)?;
        if let Some(old_parent) = old_parent {
            self.graph.reindex_children(&old_parent);
        }
        self.graph.assign_node(input_key, NodePatch::props(props));
        self.select(input_key)?;
        self.enrich()?;
        Ok(true)
    }

    /// Removes every selected node except the root, with its subtree.
    pub fn delete_selected(&mut self) -> Result<Vec<NodeKey>, ComposerError> {
        let keys: Vec<NodeKey> = self
            .all_selected()?
            .into_iter()
            .filter(|selected| selected.parent_model.is_some())
            .map(|selected| selected.node_model.key)
            .collect();
        let mut deleted = Vec::new();
        for key in keys {
            if !self.graph.node_exists(&key) {
                continue;
            }
            let parent = self.graph.get_parent_key(&key).map(ToOwned::to_owned);
            self.graph.delete_node(&key);
            if let Some(parent) = parent {
                self.graph.reindex_children(&parent);
            }
            deleted.push(key);
        }
        if !deleted.is_empty() {
            self.enrich()?;
        }
        Ok(deleted)
    }

    pub fn set_basket_position(&mut self, key: &str, position: Position) -> Result<bool, ComposerError> {
        let patch = json!({"props": {"position": serde_json::to_value(position)?}});
        Ok(self.graph.merge_node(key, &patch)?.is_some())
    }

    pub fn flow_particles(&self) -> Result<Vec<FlowParticle>, ComposerError> {
        Ok(run_query(&self.graph, &FlowParticleQuery)?)
    }
}

fn set_selected(graph: &mut GraphModel, key: &str) -> bool {
    let Some(node) = graph.get_node(key) else {
        return false;
    };
    let mut props = node.props.clone();
    props.mark_selected();
    graph.assign_node(key, NodePatch::props(props)).is_some()
}

fn ensure_accepts(props: &NodeProps, destination: &str, resource_type: &str) -> Result<(), ComposerError> {
    if props.accepts(resource_type) {
        return Ok(());
    }
    tracing::warn!(destination, resource_type, "drop rejected");
    Err(ComposerError::NotAcceptable {
        resource_type: resource_type.to_string(),
        destination: destination.to_string(),
    })
}

/// Builds the flow node a dragged project resource turns into. Resources
/// that are not particles yield `None`.
pub fn flow_node_from_resource(resource: &TreeNode) -> Option<TreeNode> {
    let source = &resource.props;
    let mut props = NodeProps {
        inputs: source.inputs.clone(),
        outputs: source.outputs.clone(),
        ..NodeProps::default()
    };
    let (node_type, name) = match resource.node_type.as_str() {
        USER_FUNCTION | FLOW_USER_FUNCTION => {
            props.function_name = source.function_name.clone();
            (FLOW_USER_FUNCTION, source.function_name.clone())
        }
        COMPONENT_INSTANCE | FLOW_COMPONENT_INSTANCE => {
            props.component_name = source.component_name.clone();
            props.component_instance = source.component_instance.clone();
            (FLOW_COMPONENT_INSTANCE, source.component_instance.clone())
        }
        PAGE => {
            for field in ["pagePath", "pageName"] {
                if let Some(value) = source.get_extra(field) {
                    props.extra.insert(field.to_string(), value.clone());
                }
            }
            (FLOW_PAGE, source.get_str("pageName").map(ToOwned::to_owned))
        }
        other => {
            tracing::debug!(resource_type = other, "resource is not a flow particle");
            return None;
        }
    };
    props.title = source
        .title
        .clone()
        .or_else(|| source.get_str("displayName").map(ToOwned::to_owned))
        .or(name);
    Some(TreeNode::new(node_type).with_props(props))
}
