//! Type tags of drag sources (project resources) and of flow graph nodes.

pub const COMPONENT_INSTANCE: &str = "componentInstance";
pub const FLOW_COMPONENT_INSTANCE: &str = "flowComponentInstance";
pub const USER_FUNCTION: &str = "userFunction";
pub const FLOW_USER_FUNCTION: &str = "flowUserFunction";
pub const PAGE: &str = "page";

pub const FLOW_APPLICATION: &str = "flowApplication";
pub const FLOW_PAGE: &str = "flowPage";

pub const APPLICATION_TITLE: &str = "Application";

/// What the flow root accepts as a dropped child.
pub const ROOT_ACCEPTABLE_TYPES: [&str; 3] = [COMPONENT_INSTANCE, FLOW_COMPONENT_INSTANCE, PAGE];

/// What every node below the flow root accepts.
pub const NODE_ACCEPTABLE_TYPES: [&str; 5] = [
    COMPONENT_INSTANCE,
    FLOW_COMPONENT_INSTANCE,
    USER_FUNCTION,
    FLOW_USER_FUNCTION,
    PAGE,
];

/// The resource tag a flow node answers to when checked against `acceptableTypes`.
pub fn resource_tag(flow_node_type: &str) -> Option<&'static str> {
    match flow_node_type {
        FLOW_USER_FUNCTION => Some(FLOW_USER_FUNCTION),
        FLOW_COMPONENT_INSTANCE => Some(FLOW_COMPONENT_INSTANCE),
        FLOW_PAGE => Some(PAGE),
        _ => None,
    }
}
