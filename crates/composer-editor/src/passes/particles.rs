use crate::node_types::{FLOW_COMPONENT_INSTANCE, FLOW_USER_FUNCTION};
use composer_graph::{PortModel, QueryPass, VisitContext};
use serde::{Deserialize, Serialize};

/// Operational unit of a flow handed to the code generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flowParticleType")]
pub enum FlowParticle {
    #[serde(rename = "flowUserFunction", rename_all = "camelCase")]
    UserFunction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inputs: Option<Vec<PortModel>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outputs: Option<Vec<PortModel>>,
    },
    #[serde(rename = "flowComponentInstance", rename_all = "camelCase")]
    ComponentInstance {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_instance: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inputs: Option<Vec<PortModel>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outputs: Option<Vec<PortModel>>,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FlowParticleQuery;

impl QueryPass for FlowParticleQuery {
    type Record = FlowParticle;

    fn name(&self) -> &str {
        "flow-particles"
    }

    fn visit(&self, context: VisitContext<'_>) -> Vec<FlowParticle> {
        let props = &context.node.props;
        let particle = match context.node.node_type.as_str() {
            FLOW_USER_FUNCTION => FlowParticle::UserFunction {
                function_name: props.function_name.clone(),
                inputs: props.inputs.clone(),
                outputs: props.outputs.clone(),
            },
            FLOW_COMPONENT_INSTANCE => FlowParticle::ComponentInstance {
                component_name: props.component_name.clone(),
                component_instance: props.component_instance.clone(),
                inputs: props.inputs.clone(),
                outputs: props.outputs.clone(),
            },
            _ => return Vec::new(),
        };
        vec![particle]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_graph::{GraphConfig, GraphModel, NodeProps, TreeNode, run_query};
    use serde_json::json;

    #[test]
    fn flow_particles_function_and_component_in_traversal_order() {
        let tree = TreeNode::new("flowApplication").with_children([
            TreeNode::new("flowUserFunction").with_props(NodeProps {
                function_name: Some("doThing".to_string()),
                ..NodeProps::default()
            }),
            TreeNode::new("flowComponentInstance").with_props(NodeProps {
                component_name: Some("Button".to_string()),
                component_instance: Some("btn1".to_string()),
                ..NodeProps::default()
            }),
            TreeNode::new("flowPage"),
        ]);
        let graph = GraphModel::from_tree(&tree, GraphConfig::local()).expect("import");
        let particles = run_query(&graph, &FlowParticleQuery).expect("query");
        assert_eq!(particles.len(), 2);
        assert!(matches!(
            &particles[0],
            FlowParticle::UserFunction { function_name: Some(name), .. } if name == "doThing"
        ));
        assert_eq!(
            serde_json::to_value(&particles).expect("particles should encode"),
            json!([
                {"flowParticleType": "flowUserFunction", "functionName": "doThing"},
                {"flowParticleType": "flowComponentInstance", "componentName": "Button", "componentInstance": "btn1"}
            ])
        );
    }
}
