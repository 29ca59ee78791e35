use crate::DEFAULT_ERROR_OUTPUT_NAME;
use crate::node_types::{NODE_ACCEPTABLE_TYPES, ROOT_ACCEPTABLE_TYPES};
use composer_graph::{
    GraphCommand, GraphError, GraphModel, NodePatch, PortModel, RewritePass, VisitContext,
    run_rewrite,
};
use std::cmp::Ordering;

/// Sorts every node's inputs and outputs and stamps its `acceptableTypes`.
#[derive(Clone, Debug)]
pub struct EnrichmentPass {
    error_output_name: String,
}

impl Default for EnrichmentPass {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_OUTPUT_NAME)
    }
}

impl EnrichmentPass {
    pub fn new(error_output_name: impl Into<String>) -> Self {
        Self {
            error_output_name: error_output_name.into(),
        }
    }

    pub fn run(&self, graph: &mut GraphModel) -> Result<usize, GraphError> {
        run_rewrite(graph, self)
    }
}

impl RewritePass for EnrichmentPass {
    fn name(&self) -> &str {
        "enrichment"
    }

    fn visit(&self, context: VisitContext<'_>) -> Vec<GraphCommand> {
        let mut props = context.node.props.clone();
        let order = |a: &PortModel, b: &PortModel| compare_ports(a, b, &self.error_output_name);
        if let Some(inputs) = props.inputs.as_mut() {
            inputs.sort_by(order);
        }
        if let Some(outputs) = props.outputs.as_mut() {
            outputs.sort_by(order);
        }
        let accepted: &[&str] = if context.is_root() {
            &ROOT_ACCEPTABLE_TYPES
        } else {
            &NODE_ACCEPTABLE_TYPES
        };
        props.set_acceptable_types(accepted.iter().map(|tag| tag.to_string()).collect());

        if props == context.node.props {
            return Vec::new();
        }
        vec![GraphCommand::Assign {
            key: context.node.key.clone(),
            patch: NodePatch::props(props),
        }]
    }
}

/// The error port goes last; the rest sort by name, ignoring case first.
pub fn compare_ports(a: &PortModel, b: &PortModel, error_output_name: &str) -> Ordering {
    match (a.name == error_output_name, b.name == error_output_name) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}
