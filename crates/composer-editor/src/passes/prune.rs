use composer_graph::{GraphCommand, GraphError, GraphModel, NodePatch, RewritePass, VisitContext, run_rewrite};

/// Strips the `acceptableTypes` scratch field before a model is persisted or compared.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrunePass;

impl PrunePass {
    pub fn run(&self, graph: &mut GraphModel) -> Result<usize, GraphError> {
        run_rewrite(graph, self)
    }
}

impl RewritePass for PrunePass {
    fn name(&self) -> &str {
        "prune"
    }

    fn visit(&self, context: VisitContext<'_>) -> Vec<GraphCommand> {
        if !context.node.props.has_acceptable_types() {
            return Vec::new();
        }
        let mut props = context.node.props.clone();
        props.clear_acceptable_types();
        vec![GraphCommand::Assign {
            key: context.node.key.clone(),
            patch: NodePatch::props(props),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnrichmentPass;
    use composer_graph::{GraphConfig, NodeProps, PortModel, TreeExport, TreeNode};
    use serde_json::json;

    #[test]
    fn prune_after_enrichment_removes_only_acceptable_types() {
        let tree = TreeNode::new("flowApplication").with_child(
            TreeNode::new("flowComponentInstance").with_props(
                NodeProps {
                    component_name: Some("Button".to_string()),
                    outputs: Some(vec![PortModel::new("onClick")]),
                    ..NodeProps::default()
                }
                .with_extra("position", json!({"x": 10, "y": 20})),
            ),
        );
        let mut graph = GraphModel::from_tree(&tree, GraphConfig::local()).expect("import");
        EnrichmentPass::default().run(&mut graph).expect("enrichment");
        let enriched = graph.get_tree(TreeExport::serializable()).expect("export");
        assert!(enriched.children[0].props.acceptable_types.is_some());

        assert_eq!(PrunePass.run(&mut graph).expect("prune"), 2);
        let pruned = graph.get_tree(TreeExport::serializable()).expect("export");
        let mut expected = enriched;
        expected.walk_mut(&mut |node| node.props.acceptable_types = None);
        assert_eq!(pruned, expected);
    }

    #[test]
    fn prune_node_with_malformed_inputs_expected_scratch_removed() {
        let tree = TreeNode::from_value_lossy(&json!({
            "type": "flowApplication",
            "props": {},
            "children": [{
                "type": "flowUserFunction",
                "props": {"inputs": "broken", "acceptableTypes": ["page"], "isSelected": true}
            }]
        }))
        .expect("tree should decode");
        let mut graph = GraphModel::from_tree(&tree, GraphConfig::local()).expect("import");
        PrunePass.run(&mut graph).expect("prune");
        run_rewrite(&mut graph, &crate::RemoveSelectedPass).expect("clear selection");

        let exported = graph.get_tree(TreeExport::serializable()).expect("export");
        assert_eq!(
            serde_json::to_value(&exported.children[0].props).expect("props should encode"),
            json!({"inputs": "broken"})
        );
    }
}
