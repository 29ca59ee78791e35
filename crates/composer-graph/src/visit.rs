use crate::{GraphError, GraphModel, NodeKey, NodePatch, VisitContext};
use serde_json::Value;

/// A deferred mutation produced by a rewrite pass.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphCommand {
    Assign { key: NodeKey, patch: NodePatch },
    Merge { key: NodeKey, patch: Value },
    Delete { key: NodeKey },
    DeleteChildren { key: NodeKey },
    Reindex { key: NodeKey },
}

impl GraphCommand {
    pub fn key(&self) -> &str {
        match self {
            Self::Assign { key, .. }
            | Self::Merge { key, .. }
            | Self::Delete { key }
            | Self::DeleteChildren { key }
            | Self::Reindex { key } => key.as_str(),
        }
    }
}

/// Read-only pass: every visit yields records, collected in pre-order.
pub trait QueryPass {
    type Record;

    fn name(&self) -> &str;
    fn visit(&self, context: VisitContext<'_>) -> Vec<Self::Record>;
}

/// Pass that describes mutations instead of performing them. The commands are
/// applied once the traversal is over.
pub trait RewritePass {
    fn name(&self) -> &str;
    fn visit(&self, context: VisitContext<'_>) -> Vec<GraphCommand>;
}

pub fn run_query<P: QueryPass + ?Sized>(
    graph: &GraphModel,
    pass: &P,
) -> Result<Vec<P::Record>, GraphError> {
    run_query_from(graph, pass, None)
}

pub fn run_query_from<P: QueryPass + ?Sized>(
    graph: &GraphModel,
    pass: &P,
    start: Option<&str>,
) -> Result<Vec<P::Record>, GraphError> {
    let records = graph.traverse(start, |context| pass.visit(context))?;
    tracing::debug!(pass = pass.name(), records = records.len(), "query pass finished");
    Ok(records)
}

/// Traverses with `pass`, then commits what it collected. Returns the number
/// of commands that found their node.
pub fn run_rewrite<P: RewritePass + ?Sized>(
    graph: &mut GraphModel,
    pass: &P,
) -> Result<usize, GraphError> {
    let commands = graph.traverse(None, |context| pass.visit(context))?;
    let total = commands.len();
    let applied = apply_commands(graph, commands)?;
    tracing::debug!(pass = pass.name(), total, applied, "rewrite pass committed");
    Ok(applied)
}

/// Applies commands in order. Commands naming a key that is gone by the time
/// they run are skipped.
pub fn apply_commands(
    graph: &mut GraphModel,
    commands: impl IntoIterator<Item = GraphCommand>,
) -> Result<usize, GraphError> {
    let mut applied = 0;
    for command in commands {
        if !graph.node_exists(command.key()) {
            tracing::debug!(key = command.key(), "skipping command for a removed node");
            continue;
        }
        match command {
            GraphCommand::Assign { key, patch } => {
                graph.assign_node(&key, patch);
            }
            GraphCommand::Merge { key, patch } => {
                graph.merge_node(&key, &patch)?;
            }
            GraphCommand::Delete { key } => graph.delete_node(&key),
            GraphCommand::DeleteChildren { key } => graph.delete_children(&key),
            GraphCommand::Reindex { key } => graph.reindex_children(&key),
        }
        applied += 1;
    }
    Ok(applied)
}
