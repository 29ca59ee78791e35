use composer_graph::{
    GraphCommand, NodeModel, NodePatch, PortModel, QueryPass, RewritePass, VisitContext,
};
use serde::Serialize;

/// A selected node with the wire that ties it to its parent, when there is one.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedNode {
    pub parent_model: Option<NodeModel>,
    pub node_model: NodeModel,
    pub input_model: Option<PortModel>,
    pub output_model: Option<PortModel>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SelectedQuery;

impl QueryPass for SelectedQuery {
    type Record = SelectedNode;

    fn name(&self) -> &str {
        "selected"
    }

    fn visit(&self, context: VisitContext<'_>) -> Vec<SelectedNode> {
        if !context.node.props.is_selected() {
            return Vec::new();
        }
        let (input_model, output_model) = context
            .parent
            .and_then(|parent| connection_anchor(context.node, parent))
            .map_or((None, None), |(input, output)| (Some(input), Some(output)));
        vec![SelectedNode {
            parent_model: context.parent.cloned(),
            node_model: context.node.clone(),
            input_model,
            output_model,
        }]
    }
}

/// Last input of `node` whose `connectedTo` names an output of `parent`.
pub fn connection_anchor(node: &NodeModel, parent: &NodeModel) -> Option<(PortModel, PortModel)> {
    node.props.inputs().iter().rev().find_map(|input| {
        let output = parent.props.find_output(input.connected_to.as_deref()?)?;
        Some((input.clone(), output.clone()))
    })
}

/// Clears `isSelected` on every node and on every port of every node.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoveSelectedPass;

impl RewritePass for RemoveSelectedPass {
    fn name(&self) -> &str {
        "remove-selected"
    }

    fn visit(&self, context: VisitContext<'_>) -> Vec<GraphCommand> {
        let mut props = context.node.props.clone();
        props.clear_selected();
        for port in props
            .inputs
            .iter_mut()
            .chain(props.outputs.iter_mut())
            .flatten()
        {
            port.is_selected = None;
        }
        if props == context.node.props {
            return Vec::new();
        }
        vec![GraphCommand::Assign {
            key: context.node.key.clone(),
            patch: NodePatch::props(props),
        }]
    }
}
