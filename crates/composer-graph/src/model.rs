use crate::keys::KeyAllocator;
use crate::value::{deep_merge, is_match};
use crate::{
    by_index, GraphConfig, GraphError, NodeKey, NodeModel, NodePatch, NodeProps, TreeExport, TreeNode,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What a visitor sees for each node.
#[derive(Clone, Copy, Debug)]
pub struct VisitContext<'a> {
    pub node: &'a NodeModel,
    pub parent: Option<&'a NodeModel>,
}

impl VisitContext<'_> {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Clone, Debug)]
struct GraphEntry {
    model: NodeModel,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// Keyed node set with a single parent per node and sibling order by `index`.
///
/// Children are always reported in ascending `index` order; nodes sharing an
/// index keep the order in which they were attached.
#[derive(Clone, Debug)]
pub struct GraphModel {
    config: GraphConfig,
    nodes: BTreeMap<NodeKey, GraphEntry>,
    root_key: Option<NodeKey>,
    keys: KeyAllocator,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl GraphModel {
    pub fn new(config: GraphConfig) -> Self {
        let keys = KeyAllocator::new(config.key_policy);
        Self {
            config,
            nodes: BTreeMap::new(),
            root_key: None,
            keys,
        }
    }

    pub fn from_tree(tree: &TreeNode, config: GraphConfig) -> Result<Self, GraphError> {
        let mut graph = Self::new(config);
        graph.init(tree)?;
        Ok(graph)
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Rebuilds the graph from `tree`, dropping every node it held before.
    pub fn init(&mut self, tree: &TreeNode) -> Result<NodeKey, GraphError> {
        self.init_with(tree, false)
    }

    pub fn init_from_value(&mut self, value: &Value) -> Result<NodeKey, GraphError> {
        let tree = TreeNode::from_value_lossy(value)?;
        self.init(&tree)
    }

    fn init_with(&mut self, tree: &TreeNode, refresh_keys: bool) -> Result<NodeKey, GraphError> {
        if tree.is_empty() {
            return Err(GraphError::MissingTree);
        }
        self.nodes.clear();
        self.keys.reset();
        let root_key = self.map_tree(tree, 0, None, refresh_keys);
        self.root_key = Some(root_key.clone());
        Ok(root_key)
    }

    fn map_tree(
        &mut self,
        tree: &TreeNode,
        index: usize,
        parent: Option<&str>,
        refresh_keys: bool,
    ) -> NodeKey {
        let nodes = &self.nodes;
        let key = self
            .keys
            .assign(tree.key.as_deref(), refresh_keys, |candidate| nodes.contains_key(candidate));

        self.nodes.insert(
            key.clone(),
            GraphEntry {
                model: NodeModel {
                    key: key.clone(),
                    node_type: tree.node_type.clone(),
                    props: tree.props.clone(),
                    index,
                },
                parent: parent.map(ToOwned::to_owned),
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.push(key.clone());
        }

        for (child_index, child) in tree.children.iter().enumerate() {
            self.map_tree(child, child_index, Some(&key), refresh_keys);
        }
        key
    }

    /// Default child order of exports.
    pub fn index_comparator() -> fn(&TreeNode, &TreeNode) -> Ordering {
        by_index
    }

    pub fn root_key(&self) -> Option<&str> {
        self.root_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require_root(&self) -> Result<&str, GraphError> {
        self.root_key.as_deref().ok_or(GraphError::NotInitialized)
    }

    pub fn get_tree(&self, options: TreeExport<'_>) -> Result<TreeNode, GraphError> {
        let root = self.require_root()?;
        self.extract(root, &options, true)
            .ok_or(GraphError::NotInitialized)
    }

    /// Exports without keys, the form handed to the storage collaborator.
    pub fn get_serializable_tree(&self, options: TreeExport<'_>) -> Result<TreeNode, GraphError> {
        self.get_tree(TreeExport {
            strip_keys: true,
            ..options
        })
    }

    /// Exports the subtree rooted at `key`, or `None` when it does not exist.
    pub fn get_subtree(&self, key: &str, options: TreeExport<'_>) -> Option<TreeNode> {
        self.extract(key, &options, true)
    }

    fn extract(&self, key: &str, options: &TreeExport<'_>, is_root: bool) -> Option<TreeNode> {
        let entry = self.nodes.get(key)?;
        if !is_root && options.exclude.is_some_and(|exclude| exclude(&entry.model)) {
            return None;
        }
        let mut tree = TreeNode::from(&entry.model);
        if options.strip_keys {
            tree.key = None;
        }
        tree.children = self
            .ordered_children(key)
            .into_iter()
            .filter_map(|child| self.extract(child, options, false))
            .collect();
        if let Some(comparator) = options.comparator {
            tree.children.sort_by(|a, b| comparator(a, b));
        }
        Some(tree)
    }

    fn ordered_children(&self, key: &str) -> Vec<&str> {
        let Some(entry) = self.nodes.get(key) else {
            return Vec::new();
        };
        let mut children: Vec<&str> = entry.children.iter().map(String::as_str).collect();
        children.sort_by_key(|child| self.nodes.get(*child).map_or(usize::MAX, |entry| entry.model.index));
        children
    }

    /// Pre-order traversal; concatenates whatever the visitor returns per node.
    pub fn traverse<T, F>(&self, start: Option<&str>, mut visitor: F) -> Result<Vec<T>, GraphError>
    where
        F: FnMut(VisitContext<'_>) -> Vec<T>,
    {
        let start = self.resolve_start(start)?;
        let mut collected = Vec::new();
        self.traverse_from(start, &mut visitor, &mut collected);
        Ok(collected)
    }

    fn traverse_from<T, F>(&self, key: &str, visitor: &mut F, collected: &mut Vec<T>)
    where
        F: FnMut(VisitContext<'_>) -> Vec<T>,
    {
        let Some(context) = self.context(key) else {
            return;
        };
        collected.extend(visitor(context));
        for child in self.ordered_children(key) {
            self.traverse_from(child, visitor, collected);
        }
    }

    /// Pre-order traversal threading one accumulator through every visit.
    pub fn traverse_with_accumulator<A, F>(
        &self,
        start: Option<&str>,
        accumulator: A,
        mut visitor: F,
    ) -> Result<A, GraphError>
    where
        F: FnMut(A, VisitContext<'_>) -> A,
    {
        let start = self.resolve_start(start)?;
        Ok(self.fold_from(start, accumulator, &mut visitor))
    }

    fn fold_from<A, F>(&self, key: &str, accumulator: A, visitor: &mut F) -> A
    where
        F: FnMut(A, VisitContext<'_>) -> A,
    {
        let Some(context) = self.context(key) else {
            return accumulator;
        };
        let mut accumulator = visitor(accumulator, context);
        for child in self.ordered_children(key) {
            accumulator = self.fold_from(child, accumulator, visitor);
        }
        accumulator
    }

    fn resolve_start<'a>(&'a self, start: Option<&'a str>) -> Result<&'a str, GraphError> {
        let root = self.require_root()?;
        Ok(start.unwrap_or(root))
    }

    fn context(&self, key: &str) -> Option<VisitContext<'_>> {
        let entry = self.nodes.get(key)?;
        let parent = entry
            .parent
            .as_deref()
            .and_then(|parent| self.nodes.get(parent))
            .map(|parent| &parent.model);
        Some(VisitContext {
            node: &entry.model,
            parent,
        })
    }

    pub fn preorder_keys(&self, start: Option<&str>) -> Result<Vec<NodeKey>, GraphError> {
        self.traverse(start, |context| vec![context.node.key.clone()])
    }

    /// Keys in post-order from the root: children before their parent.
    pub fn get_postorder_keys(&self) -> Vec<NodeKey> {
        let mut keys = Vec::new();
        if let Some(root) = self.root_key.as_deref() {
            self.postorder_from(root, &mut keys);
        }
        keys
    }

    fn postorder_from(&self, key: &str, keys: &mut Vec<NodeKey>) {
        for child in self.ordered_children(key) {
            self.postorder_from(child, keys);
        }
        if self.nodes.contains_key(key) {
            keys.push(key.to_string());
        }
    }

    /// Nodes in pre-order whose serialized form partially matches `pattern`,
    /// e.g. `{"type": "page"}` or `{"props": {"componentInstance": "btn1"}}`.
    pub fn find_all_nodes_match(
        &self,
        pattern: &Value,
        start: Option<&str>,
    ) -> Result<Vec<&NodeModel>, GraphError> {
        let mut matches = Vec::new();
        for key in self.preorder_keys(start)? {
            let Some(node) = self.get_node(&key) else {
                continue;
            };
            if is_match(&serde_json::to_value(node)?, pattern) {
                matches.push(node);
            }
        }
        Ok(matches)
    }

    pub fn get_node(&self, key: &str) -> Option<&NodeModel> {
        self.nodes.get(key).map(|entry| &entry.model)
    }

    pub fn node_exists(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get_parent_key(&self, key: &str) -> Option<&str> {
        self.nodes.get(key)?.parent.as_deref()
    }

    pub fn get_parent_node(&self, key: &str) -> Option<&NodeModel> {
        self.get_parent_key(key).and_then(|parent| self.get_node(parent))
    }

    /// Ancestor keys, nearest first.
    pub fn get_all_parent_keys(&self, key: &str) -> Vec<NodeKey> {
        let mut keys = Vec::new();
        let mut current = self.get_parent_key(key);
        while let Some(parent) = current {
            keys.push(parent.to_string());
            current = self.get_parent_key(parent);
        }
        keys
    }

    pub fn get_all_parent_nodes(&self, key: &str) -> Vec<&NodeModel> {
        self.get_all_parent_keys(key)
            .iter()
            .filter_map(|parent| self.get_node(parent))
            .collect()
    }

    /// Every child of this node's parent, the node itself included. The root
    /// is its own only sibling.
    pub fn get_all_sibling_nodes(&self, key: &str) -> Vec<&NodeModel> {
        if !self.node_exists(key) {
            return Vec::new();
        }
        match self.get_parent_key(key) {
            Some(parent) => self
                .ordered_children(parent)
                .into_iter()
                .filter_map(|child| self.get_node(child))
                .collect(),
            None => self.get_node(key).into_iter().collect(),
        }
    }

    pub fn get_children_keys(&self, key: &str) -> Vec<NodeKey> {
        self.ordered_children(key)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn get_children_count(&self, key: &str) -> usize {
        self.nodes.get(key).map_or(0, |entry| entry.children.len())
    }

    /// Looks up every existing key and sorts the nodes with `comparator`.
    pub fn get_ordered_nodes_by_keys<I, S>(
        &self,
        keys: I,
        comparator: impl Fn(&NodeModel, &NodeModel) -> Ordering,
    ) -> Vec<&NodeModel>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes: Vec<&NodeModel> = keys
            .into_iter()
            .filter_map(|key| self.get_node(key.as_ref()))
            .collect();
        nodes.sort_by(|a, b| comparator(a, b));
        nodes
    }

    /// Attaches a copy of `subtree` under `parent`.
    ///
    /// `at_index` is a position among the ordered children. When it names an
    /// existing child, that child and every later sibling move one index on;
    /// otherwise the copy is appended after the last sibling. Returns `None` when `parent` does not exist.
    pub fn graft(
        &mut self,
        parent: &str,
        subtree: &TreeNode,
        at_index: Option<usize>,
        refresh_keys: bool,
    ) -> Result<Option<NodeKey>, GraphError> {
        if subtree.is_empty() {
            return Err(GraphError::MissingTree);
        }
        if !self.node_exists(parent) {
            tracing::debug!(parent, "graft target does not exist");
            return Ok(None);
        }
        let index = self.make_room(parent, at_index);
        Ok(Some(self.map_tree(subtree, index, Some(parent), refresh_keys)))
    }

    pub fn add_child(
        &mut self,
        parent: &str,
        subtree: &TreeNode,
        at_index: Option<usize>,
    ) -> Result<Option<NodeKey>, GraphError> {
        self.graft(parent, subtree, at_index, true)
    }

    pub fn add_child_to_root(&mut self, subtree: &TreeNode) -> Result<NodeKey, GraphError> {
        let root = self.require_root()?.to_string();
        self.graft(&root, subtree, None, false)?
            .ok_or(GraphError::NotInitialized)
    }

    /// Inserts a copy of `subtree` right after `key` among its siblings.
    pub fn insert_sibling_after(
        &mut self,
        key: &str,
        subtree: &TreeNode,
    ) -> Result<Option<NodeKey>, GraphError> {
        let Some(parent) = self.get_parent_key(key).map(ToOwned::to_owned) else {
            return Ok(None);
        };
        let position = self
            .get_children_keys(&parent)
            .iter()
            .position(|sibling| sibling == key)
            .map_or(0, |position| position + 1);
        self.add_child(&parent, subtree, Some(position))
    }

    /// Frees the slot at child position `at_index` and returns the index the
    /// new child takes there. Out-of-range or absent positions append.
    fn make_room(&mut self, parent: &str, at_index: Option<usize>) -> usize {
        let children = self.get_children_keys(parent);
        let indices: Vec<usize> = children
            .iter()
            .filter_map(|child| self.get_node(child).map(|node| node.index))
            .collect();
        match at_index.and_then(|position| indices.get(position).copied()) {
            Some(slot) => {
                for child in &children {
                    if let Some(entry) = self.nodes.get_mut(child.as_str()) {
                        if entry.model.index >= slot {
                            entry.model.index += 1;
                        }
                    }
                }
                slot
            }
            None => indices.iter().max().map_or(0, |last| last + 1),
        }
    }

    /// Swaps the node and its subtree for a freshly keyed copy of `subtree` at
    /// the same parent and index. Replacing the root rebuilds the graph.
    pub fn replace_node(
        &mut self,
        key: &str,
        subtree: &TreeNode,
    ) -> Result<Option<NodeKey>, GraphError> {
        if subtree.is_empty() {
            return Err(GraphError::MissingTree);
        }
        let Some(entry) = self.nodes.get(key) else {
            return Ok(None);
        };
        let index = entry.model.index;
        match entry.parent.clone() {
            Some(parent) => {
                self.remove_subtree(key);
                Ok(Some(self.map_tree(subtree, index, Some(&parent), true)))
            }
            None => self.init_with(subtree, true).map(Some),
        }
    }

    /// Drops every descendant of `key` and attaches one copy of `subtree`.
    pub fn replace_children(
        &mut self,
        key: &str,
        subtree: &TreeNode,
    ) -> Result<Option<NodeKey>, GraphError> {
        if !self.node_exists(key) {
            return Ok(None);
        }
        self.delete_children(key);
        self.add_child(key, subtree, None)
    }

    /// Removes the node with its subtree. Surviving siblings keep their indices.
    pub fn delete_node(&mut self, key: &str) {
        if !self.node_exists(key) {
            tracing::debug!(key, "delete of a missing node ignored");
            return;
        }
        self.remove_subtree(key);
        if self.root_key.as_deref() == Some(key) {
            self.root_key = None;
        }
    }

    pub fn delete_children(&mut self, key: &str) {
        for child in self.get_children_keys(key) {
            self.remove_subtree(&child);
        }
    }

    fn remove_subtree(&mut self, key: &str) {
        let Some(entry) = self.nodes.remove(key) else {
            return;
        };
        if let Some(parent) = entry.parent.as_deref().and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.retain(|child| child != key);
        }
        for child in entry.children {
            self.remove_subtree(&child);
        }
    }

    /// Deep-merges `patch` (shaped like a serialized node, e.g.
    /// `{"props": {"position": {"x": 1}}}`) into the node. Key and index stay.
    /// Malformed fields the patch does not touch are carried over verbatim.
    pub fn merge_node(&mut self, key: &str, patch: &Value) -> Result<Option<&NodeModel>, GraphError> {
        let Some(current) = self.get_node(key) else {
            return Ok(None);
        };
        let mut merged = serde_json::to_value(current)?;
        deep_merge(&mut merged, patch);

        let node_type = merged
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GraphError::InvalidPatch("node type must be a string".to_string()))?
            .to_string();
        let props = match merged.get("props") {
            Some(Value::Object(map)) => NodeProps::from_map_lossy(map),
            None | Some(Value::Null) => NodeProps::default(),
            Some(other) => {
                return Err(GraphError::InvalidPatch(format!("node props must be an object, found {other}")));
            }
        };
        let patched_fields = patch.get("props").and_then(Value::as_object);
        if let Some(field) = patched_fields
            .into_iter()
            .flat_map(|fields| fields.keys())
            .find(|name| NodeProps::is_typed_field(name) && props.extra.contains_key(name.as_str()))
        {
            return Err(GraphError::InvalidPatch(format!(
                "props field '{field}' does not match its typed shape"
            )));
        }

        if let Some(entry) = self.nodes.get_mut(key) {
            entry.model.node_type = node_type;
            entry.model.props = props;
        }
        Ok(self.get_node(key))
    }

    /// Overwrites the fields present in `patch`. Key and index stay.
    pub fn assign_node(&mut self, key: &str, patch: NodePatch) -> Option<&NodeModel> {
        let entry = self.nodes.get_mut(key)?;
        if let Some(node_type) = patch.node_type {
            entry.model.node_type = node_type;
        }
        if let Some(props) = patch.props {
            entry.model.props = props;
        }
        Some(&entry.model)
    }

    pub fn set_index(&mut self, key: &str, index: usize) -> bool {
        match self.nodes.get_mut(key) {
            Some(entry) => {
                entry.model.index = index;
                true
            }
            None => false,
        }
    }

    /// Renumbers the children of `key` to `0..n` keeping their current order.
    pub fn reindex_children(&mut self, key: &str) {
        for (index, child) in self.get_children_keys(key).iter().enumerate() {
            self.set_index(child, index);
        }
    }

    /// Re-parents `key` under `new_parent`, keeping its key and subtree.
    /// Old siblings keep their indices. Returns false when either node is missing.
    pub fn move_node(
        &mut self,
        key: &str,
        new_parent: &str,
        at_index: Option<usize>,
    ) -> Result<bool, GraphError> {
        if !self.node_exists(key) || !self.node_exists(new_parent) {
            return Ok(false);
        }
        if key == new_parent || self.get_all_parent_keys(new_parent).iter().any(|parent| parent == key) {
            return Err(GraphError::CyclicMove {
                key: key.to_string(),
                parent: new_parent.to_string(),
            });
        }

        let old_parent = self.get_parent_key(key).map(ToOwned::to_owned);
        if let Some(old_parent) = old_parent.as_deref().and_then(|parent| self.nodes.get_mut(parent)) {
            old_parent.children.retain(|child| child != key);
        }
        let index = self.make_room(new_parent, at_index);
        if let Some(entry) = self.nodes.get_mut(key) {
            entry.parent = Some(new_parent.to_string());
            entry.model.index = index;
        }
        if let Some(parent) = self.nodes.get_mut(new_parent) {
            parent.children.push(key.to_string());
        }
        Ok(true)
    }
}
