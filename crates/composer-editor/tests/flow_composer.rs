use composer_editor::node_types::{FLOW_COMPONENT_INSTANCE, FLOW_USER_FUNCTION};
use composer_editor::{
    ComposerConfig, ComposerError, FlowComposer, FlowDocument, FlowParticle, Position,
    parse_flow_declarations,
};
use composer_graph::{NodeProps, PortModel, TreeNode};
use serde_json::json;

fn component_resource(name: &str, instance: &str, outputs: &[&str]) -> TreeNode {
    TreeNode::new("componentInstance").with_props(NodeProps {
        component_name: Some(name.to_string()),
        component_instance: Some(instance.to_string()),
        inputs: Some(vec![PortModel::new("trigger")]),
        outputs: Some(outputs.iter().map(|output| PortModel::new(*output)).collect()),
        ..NodeProps::default()
    })
}

fn function_resource(name: &str, inputs: &[&str]) -> TreeNode {
    TreeNode::new("userFunction").with_props(NodeProps {
        function_name: Some(name.to_string()),
        inputs: Some(inputs.iter().map(|input| PortModel::new(*input)).collect()),
        outputs: Some(vec![PortModel::new("exception"), PortModel::new("done")]),
        ..NodeProps::default()
    })
}

/// Root with a button instance and a function sitting in the basket.
fn composer_with_button_and_function() -> (FlowComposer, String, String) {
    let mut composer = FlowComposer::with_default_model(ComposerConfig::default()).expect("composer");
    let root = composer.graph().root_key().expect("root").to_string();
    let button = composer
        .drop_resource(&component_resource("Button", "btn1", &["onClick", "onHover"]), &root)
        .expect("root accepts component instances")
        .expect("resource converts");
    let function = composer
        .add_resource_to_basket(&function_resource("doThing", &["callback", "args"]), Position::new(5.0, 5.0))
        .expect("basket drop")
        .expect("resource converts");
    (composer, button, function)
}

#[test]
fn default_model_expected_application_root() {
    let composer = FlowComposer::with_default_model(ComposerConfig::default()).expect("composer");
    let model = composer.flow_model().expect("model");
    assert_eq!(model.node_type, "flowApplication");
    assert_eq!(model.key.as_deref(), Some("node1"));
    assert_eq!(model.props.title.as_deref(), Some("Application"));
    assert_eq!(model.props.acceptable_types.as_ref().map(Vec::len), Some(3));
}

#[test]
fn connect_input_moves_node_and_selects_it() {
    let (mut composer, button, function) = composer_with_button_and_function();
    let root = composer.graph().root_key().expect("root").to_string();
    assert!(composer
        .connect_input(&button, "onClick", &function, "callback")
        .expect("connect"));

    assert_eq!(composer.graph().get_parent_key(&function), Some(button.as_str()));
    assert_eq!(composer.graph().get_children_keys(&root), vec![button.clone()]);
    assert_eq!(composer.graph().get_node(&button).map(|node| node.index), Some(0));

    let selected = composer.selected().expect("query").expect("function is selected");
    assert_eq!(selected.node_model.key, function);
    assert_eq!(selected.input_model.map(|port| port.name).as_deref(), Some("callback"));
    assert_eq!(selected.output_model.map(|port| port.name).as_deref(), Some("onClick"));
}

#[test]
fn connect_input_overwrites_previous_connection() {
    let (mut composer, button, function) = composer_with_button_and_function();
    assert!(composer.connect_input(&button, "onClick", &function, "callback").expect("connect"));
    assert!(composer.connect_input(&button, "onHover", &function, "args").expect("connect"));
    let node = composer.graph().get_node(&function).expect("function");
    let connected: Vec<(&str, Option<&str>)> = node
        .props
        .inputs()
        .iter()
        .map(|port| (port.name.as_str(), port.connected_to.as_deref()))
        .collect();
    assert_eq!(connected, vec![("args", Some("onHover")), ("callback", None)]);
}

#[test]
fn connect_input_rejects_unknown_ports_and_cycles() {
    let (mut composer, button, function) = composer_with_button_and_function();
    assert!(!composer.connect_input(&button, "missing", &function, "callback").expect("connect"));
    assert!(!composer.connect_input(&button, "onClick", &function, "missing").expect("connect"));
    assert!(!composer.connect_input(&button, "onClick", &button, "callback").expect("connect"));
    assert!(composer.connect_input(&button, "onClick", &function, "callback").expect("connect"));
    // the button now lies upstream of the function
    assert!(!composer.connect_input(&function, "done", &button, "trigger").expect("connect"));
    assert_eq!(composer.graph().get_parent_key(&function), Some(button.as_str()));
}

#[test]
fn delete_selected_removes_subtree_and_renumbers() {
    let (mut composer, button, function) = composer_with_button_and_function();
    let root = composer.graph().root_key().expect("root").to_string();
    assert!(composer.select(&button).expect("select"));
    let deleted = composer.delete_selected().expect("delete");
    assert_eq!(deleted, vec![button]);
    assert_eq!(composer.graph().get_children_keys(&root), vec![function.clone()]);
    assert_eq!(composer.graph().get_node(&function).map(|node| node.index), Some(0));

    assert!(composer.select(&root).expect("select"));
    assert!(composer.delete_selected().expect("delete").is_empty());
}

#[test]
fn replace_with_resource_keeps_position_and_downstream_nodes() {
    let (mut composer, button, function) = composer_with_button_and_function();
    assert!(composer.connect_input(&button, "onClick", &function, "callback").expect("connect"));
    let replacement = composer
        .replace_with_resource(&component_resource("Link", "link1", &["onClick"]), &button)
        .expect("root accepts component instances")
        .expect("resource converts");
    assert!(!composer.graph().node_exists(&button));
    assert_eq!(composer.graph().get_node(&replacement).map(|node| node.index), Some(0));
    assert_eq!(composer.graph().get_children_count(&replacement), 1);

    let rejected = composer.replace_with_resource(&function_resource("other", &[]), &replacement);
    assert!(matches!(rejected, Err(ComposerError::NotAcceptable { .. })));
}

#[test]
fn serializable_model_has_no_keys_or_acceptable_types() {
    let (composer, _, _) = composer_with_button_and_function();
    let value = composer
        .serializable_flow_model()
        .expect("model")
        .to_value()
        .expect("encode");
    let text = value.to_string();
    assert!(!text.contains("acceptableTypes"));
    assert!(!text.contains("\"key\""));
    assert_eq!(value["children"][1]["props"]["position"], json!({"x": 5.0, "y": 5.0}));
}

#[test]
fn reload_identical_model_expected_unchanged() {
    let (mut composer, button, _) = composer_with_button_and_function();
    let fingerprint = composer.fingerprint().expect("fingerprint");
    let persisted = composer.serializable_flow_model().expect("model");
    assert!(!composer.reload(&persisted).expect("reload"));
    assert_eq!(composer.fingerprint().expect("fingerprint"), fingerprint);

    assert!(composer.set_basket_position(&button, Position::new(1.0, 2.0)).expect("position"));
    assert_ne!(composer.fingerprint().expect("fingerprint"), fingerprint);
    assert!(composer.reload(&persisted).expect("reload"));
    assert_eq!(composer.fingerprint().expect("fingerprint"), fingerprint);
}

#[test]
fn flow_particles_from_document() {
    let source = json!({
        "flowName": "main",
        "model": {
            "type": "flowApplication",
            "props": {"title": "Application"},
            "children": [
                {"type": "flowComponentInstance", "props": {"componentName": "Button", "componentInstance": "btn1"},
                 "children": [{"type": "flowUserFunction", "props": {"functionName": "doThing"}}]},
                {"type": "flowPage", "props": {"pagePath": "/"}}
            ]
        }
    })
    .to_string();
    let documents: Vec<FlowDocument> = parse_flow_declarations(&source);
    let tree = documents[0].model_tree().expect("model");
    let composer = FlowComposer::new(&tree, ComposerConfig::default()).expect("composer");
    let particles = composer.flow_particles().expect("particles");
    let kinds: Vec<&str> = particles
        .iter()
        .map(|particle| match particle {
            FlowParticle::UserFunction { .. } => FLOW_USER_FUNCTION,
            FlowParticle::ComponentInstance { .. } => FLOW_COMPONENT_INSTANCE,
        })
        .collect();
    assert_eq!(kinds, vec![FLOW_COMPONENT_INSTANCE, FLOW_USER_FUNCTION]);
}

#[test]
fn set_basket_position_on_node_with_malformed_inputs_expected_merged() {
    let model = json!({
        "type": "flowApplication",
        "props": {},
        "children": [{
            "type": "flowUserFunction",
            "props": {"functionName": "legacy", "inputs": "broken", "acceptableTypes": ["page"]}
        }]
    });
    let mut composer = FlowComposer::from_value(&model, ComposerConfig::default()).expect("composer");
    assert!(composer
        .set_basket_position("node2", Position::new(7.0, 9.0))
        .expect("position should merge"));

    let node = composer.graph().get_node("node2").expect("node exists");
    assert_eq!(node.props.get_extra("position"), Some(&json!({"x": 7.0, "y": 9.0})));
    let persisted = composer
        .serializable_flow_model()
        .expect("model")
        .to_value()
        .expect("encode");
    let props = &persisted["children"][0]["props"];
    assert_eq!(props.get("inputs"), Some(&json!("broken")));
    assert!(props.get("acceptableTypes").is_none());
}
