/// Undo/redo history of graph edits
///
/// Every edit is applied as a command that records enough of the previous
/// state to be reversed. The history only tracks structure and configuration;
/// run results written into node state are never part of an edit.

use crate::error::EditError;
use crate::workflow::types::{Edge, Node, Position, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An edit requested by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditCommand {
    /// Add a node; an empty id is replaced by the next free id for its type
    AddNode { node: Node },
    /// Remove a node together with every edge touching it
    RemoveNode { id: String },
    MoveNode { id: String, position: Position },
    /// Replace a node's configuration, keeping its run state
    UpdateNode { node: Node },
    /// Add an edge; an empty id is generated
    AddEdge { edge: Edge },
    RemoveEdge { id: String },
}

/// A command after it was applied, carrying what is needed to reverse it
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedEdit {
    AddedNode {
        node: Node,
        index: usize,
    },
    RemovedNode {
        node: Node,
        index: usize,
        /// Removed edges with their former positions, ascending
        edges: Vec<(usize, Edge)>,
    },
    MovedNode {
        id: String,
        from: Position,
        to: Position,
    },
    UpdatedNode {
        before: Node,
        after: Node,
    },
    AddedEdge {
        edge: Edge,
        index: usize,
    },
    RemovedEdge {
        edge: Edge,
        index: usize,
    },
}

impl EditCommand {
    /// Apply to the workflow, returning the reversible record
    pub fn apply(self, workflow: &mut Workflow) -> Result<AppliedEdit, EditError> {
        match self {
            EditCommand::AddNode { mut node } => {
                if node.id.trim().is_empty() {
                    node.id = workflow.next_node_id(node.node_type());
                }
                if workflow.node(&node.id).is_some() {
                    return Err(EditError::DuplicateNode(node.id));
                }
                node.validate().map_err(|source| EditError::InvalidNode {
                    node_id: node.id.clone(),
                    source,
                })?;
                let index = workflow.nodes.len();
                workflow.nodes.push(node.clone());
                Ok(AppliedEdit::AddedNode { node, index })
            }
            EditCommand::RemoveNode { id } => {
                let index = node_position(workflow, &id)?;
                let node = workflow.nodes.remove(index);

                let mut edges = Vec::new();
                let mut position = 0;
                workflow.edges.retain(|edge| {
                    let touches = edge.source == id || edge.target == id;
                    if touches {
                        edges.push((position, edge.clone()));
                    }
                    position += 1;
                    !touches
                });

                Ok(AppliedEdit::RemovedNode { node, index, edges })
            }
            EditCommand::MoveNode { id, position } => {
                let index = node_position(workflow, &id)?;
                let from = workflow.nodes[index].position;
                workflow.nodes[index].position = position;
                Ok(AppliedEdit::MovedNode {
                    id,
                    from,
                    to: position,
                })
            }
            EditCommand::UpdateNode { node } => {
                let index = node_position(workflow, &node.id)?;
                node.validate().map_err(|source| EditError::InvalidNode {
                    node_id: node.id.clone(),
                    source,
                })?;
                let before = workflow.nodes[index].clone();
                let after = Node {
                    state: before.state.clone(),
                    ..node
                };
                workflow.nodes[index] = after.clone();
                Ok(AppliedEdit::UpdatedNode { before, after })
            }
            EditCommand::AddEdge { mut edge } => {
                if edge.id.trim().is_empty() {
                    edge.id = format!("{}-{}-{}", edge.source, edge.target, uuid::Uuid::new_v4());
                }
                if workflow.edge(&edge.id).is_some() {
                    return Err(EditError::DuplicateEdge(edge.id));
                }
                for endpoint in [&edge.source, &edge.target] {
                    if workflow.node(endpoint).is_none() {
                        return Err(EditError::DanglingEdge {
                            edge_id: edge.id.clone(),
                            node_id: endpoint.clone(),
                        });
                    }
                }
                let index = workflow.edges.len();
                workflow.edges.push(edge.clone());
                Ok(AppliedEdit::AddedEdge { edge, index })
            }
            EditCommand::RemoveEdge { id } => {
                let index = workflow
                    .edges
                    .iter()
                    .position(|e| e.id == id)
                    .ok_or(EditError::EdgeNotFound(id))?;
                let edge = workflow.edges.remove(index);
                Ok(AppliedEdit::RemovedEdge { edge, index })
            }
        }
    }
}

impl AppliedEdit {
    /// Reverse this edit
    pub fn undo(&self, workflow: &mut Workflow) {
        match self {
            AppliedEdit::AddedNode { node, .. } => {
                workflow.nodes.retain(|n| n.id != node.id);
            }
            AppliedEdit::RemovedNode { node, index, edges } => {
                insert_clamped(&mut workflow.nodes, *index, node.clone());
                for (position, edge) in edges {
                    insert_clamped(&mut workflow.edges, *position, edge.clone());
                }
            }
            AppliedEdit::MovedNode { id, from, .. } => {
                if let Some(node) = workflow.node_mut(id) {
                    node.position = *from;
                }
            }
            AppliedEdit::UpdatedNode { before, .. } => restore_config(workflow, before),
            AppliedEdit::AddedEdge { edge, .. } => {
                workflow.edges.retain(|e| e.id != edge.id);
            }
            AppliedEdit::RemovedEdge { edge, index } => {
                insert_clamped(&mut workflow.edges, *index, edge.clone());
            }
        }
    }

    /// Re-apply this edit after an undo
    pub fn redo(&self, workflow: &mut Workflow) {
        match self {
            AppliedEdit::AddedNode { node, index } => {
                insert_clamped(&mut workflow.nodes, *index, node.clone());
            }
            AppliedEdit::RemovedNode { node, .. } => {
                workflow.nodes.retain(|n| n.id != node.id);
                workflow
                    .edges
                    .retain(|e| e.source != node.id && e.target != node.id);
            }
            AppliedEdit::MovedNode { id, to, .. } => {
                if let Some(node) = workflow.node_mut(id) {
                    node.position = *to;
                }
            }
            AppliedEdit::UpdatedNode { after, .. } => restore_config(workflow, after),
            AppliedEdit::AddedEdge { edge, index } => {
                insert_clamped(&mut workflow.edges, *index, edge.clone());
            }
            AppliedEdit::RemovedEdge { edge, .. } => {
                workflow.edges.retain(|e| e.id != edge.id);
            }
        }
    }
}

fn node_position(workflow: &Workflow, id: &str) -> Result<usize, EditError> {
    workflow
        .nodes
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| EditError::NodeNotFound(id.to_string()))
}

fn insert_clamped<T>(items: &mut Vec<T>, index: usize, item: T) {
    let index = index.min(items.len());
    items.insert(index, item);
}

/// Put back a node's configuration without touching its run state
fn restore_config(workflow: &mut Workflow, snapshot: &Node) {
    if let Some(node) = workflow.node_mut(&snapshot.id) {
        node.config = snapshot.config.clone();
        node.position = snapshot.position;
        node.continue_on_failure = snapshot.continue_on_failure;
    }
}

/// Bounded undo/redo stacks
#[derive(Debug)]
pub struct EditHistory {
    undo: VecDeque<AppliedEdit>,
    redo: Vec<AppliedEdit>,
    limit: usize,
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Apply a new edit; clears the redo stack
    pub fn apply(&mut self, workflow: &mut Workflow, command: EditCommand) -> Result<AppliedEdit, EditError> {
        let applied = command.apply(workflow)?;
        self.redo.clear();
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(applied.clone());
        Ok(applied)
    }

    /// Reverse the latest edit; false when there is nothing to undo
    pub fn undo(&mut self, workflow: &mut Workflow) -> bool {
        match self.undo.pop_back() {
            Some(edit) => {
                edit.undo(workflow);
                self.redo.push(edit);
                true
            }
            None => false,
        }
    }

    /// Re-apply the latest undone edit; false when there is nothing to redo
    pub fn redo(&mut self, workflow: &mut Workflow) -> bool {
        match self.redo.pop() {
            Some(edit) => {
                edit.redo(workflow);
                self.undo.push_back(edit);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
