use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub type NodeKey = String;

const ACCEPTABLE_TYPES_FIELD: &str = "acceptableTypes";
const IS_SELECTED_FIELD: &str = "isSelected";
const TYPED_FIELDS: [&str; 8] = [
    "title",
    "componentName",
    "componentInstance",
    "functionName",
    "inputs",
    "outputs",
    IS_SELECTED_FIELD,
    ACCEPTABLE_TYPES_FIELD,
];

/// A declared input or output of a node, e.g. an event handler of a component
/// instance or an argument of a user function.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortModel {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn connected_to(mut self, output_name: impl Into<String>) -> Self {
        self.connected_to = Some(output_name.into());
        self
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected.unwrap_or(false)
    }
}

/// Node properties. The fields the engine and the editor passes reason about are
/// typed; everything else a document carries rides along in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<PortModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<PortModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptable_types: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a props object field by field. A typed field with an unexpected
    /// shape is kept verbatim in `extra`; the other fields stay typed.
    pub fn from_map_lossy(map: &Map<String, Value>) -> Self {
        let mut typed = Map::new();
        let mut parked = Map::new();
        for (name, value) in map {
            if Self::is_typed_field(name) && !typed_field_decodes(name, value) {
                tracing::warn!(field = %name, "node prop does not match its typed shape; keeping it verbatim");
                parked.insert(name.clone(), value.clone());
            } else {
                typed.insert(name.clone(), value.clone());
            }
        }
        let mut props = match serde_json::from_value::<Self>(Value::Object(typed.clone())) {
            Ok(props) => props,
            Err(error) => {
                tracing::warn!(%error, "node props do not match the typed shape; keeping them verbatim");
                Self {
                    extra: typed,
                    ..Self::default()
                }
            }
        };
        props.extra.extend(parked);
        props
    }

    pub fn is_typed_field(name: &str) -> bool {
        TYPED_FIELDS.contains(&name)
    }

    /// Stamps the drop-target types, dropping any malformed copy held in `extra`.
    pub fn set_acceptable_types(&mut self, types: Vec<String>) {
        self.extra.remove(ACCEPTABLE_TYPES_FIELD);
        self.acceptable_types = Some(types);
    }

    pub fn clear_acceptable_types(&mut self) {
        self.extra.remove(ACCEPTABLE_TYPES_FIELD);
        self.acceptable_types = None;
    }

    pub fn has_acceptable_types(&self) -> bool {
        self.acceptable_types.is_some() || self.extra.contains_key(ACCEPTABLE_TYPES_FIELD)
    }

    pub fn mark_selected(&mut self) {
        self.extra.remove(IS_SELECTED_FIELD);
        self.is_selected = Some(true);
    }

    pub fn clear_selected(&mut self) {
        self.extra.remove(IS_SELECTED_FIELD);
        self.is_selected = None;
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    pub fn get_extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected.unwrap_or(false)
    }

    pub fn inputs(&self) -> &[PortModel] {
        self.inputs.as_deref().unwrap_or_default()
    }

    pub fn outputs(&self) -> &[PortModel] {
        self.outputs.as_deref().unwrap_or_default()
    }

    pub fn find_input(&self, name: &str) -> Option<&PortModel> {
        self.inputs().iter().find(|port| port.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<&PortModel> {
        self.outputs().iter().find(|port| port.name == name)
    }

    pub fn accepts(&self, type_tag: &str) -> bool {
        self.acceptable_types
            .as_deref()
            .is_some_and(|types| types.iter().any(|accepted| accepted == type_tag))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    pub key: NodeKey,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub props: NodeProps,
    #[serde(default)]
    pub index: usize,
}

/// Shallow overwrite of a node's fields. Key and position are never touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
    pub node_type: Option<String>,
    pub props: Option<NodeProps>,
}

impl NodePatch {
    pub fn props(props: NodeProps) -> Self {
        Self {
            node_type: None,
            props: Some(props),
        }
    }

    pub fn node_type(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            props: None,
        }
    }
}

fn typed_field_decodes(name: &str, value: &Value) -> bool {
    let mut single = Map::new();
    single.insert(name.to_string(), value.clone());
    serde_json::from_value::<NodeProps>(Value::Object(single)).is_ok()
}

pub fn index_order(a: &NodeModel, b: &NodeModel) -> Ordering {
    a.index.cmp(&b.index)
}
