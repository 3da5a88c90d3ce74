/// Live workflow document shared by the editor API and the engine
///
/// Readers take lock-free snapshots through `ArcSwap`. Writers (edits, undo/redo and
/// run results) are serialized by the history mutex and publish a new
/// snapshot with an atomic pointer swap.

use crate::error::EditError;
use crate::runtime::callbacks::RunCallbacks;
use crate::workflow::history::{AppliedEdit, EditCommand, EditHistory};
use crate::workflow::types::{NodeState, Workflow};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
pub struct WorkflowDocument {
    current: ArcSwap<Workflow>,
    history: Mutex<EditHistory>,
}

impl WorkflowDocument {
    pub fn new(workflow: Workflow, history_limit: usize) -> Self {
        Self {
            current: ArcSwap::new(Arc::new(workflow)),
            history: Mutex::new(EditHistory::new(history_limit)),
        }
    }

    /// Current workflow; never blocks
    pub fn snapshot(&self) -> Arc<Workflow> {
        self.current.load_full()
    }

    /// Replace the whole document and forget the edit history
    pub fn replace(&self, workflow: Workflow) {
        let mut history = self.history.lock();
        history.clear();
        self.current.store(Arc::new(workflow));
        tracing::info!("🔥 Workflow document replaced");
    }

    /// Apply an edit and record it for undo
    pub fn apply(&self, command: EditCommand) -> Result<AppliedEdit, EditError> {
        let mut history = self.history.lock();
        let mut workflow = Workflow::clone(&self.current.load());
        let applied = history.apply(&mut workflow, command)?;
        self.current.store(Arc::new(workflow));
        tracing::debug!("✏️ Applied edit: {:?}", applied);
        Ok(applied)
    }

    /// Undo the latest edit; false when there is nothing to undo
    pub fn undo(&self) -> bool {
        self.modify_history(|history, workflow| history.undo(workflow))
    }

    /// Redo the latest undone edit; false when there is nothing to redo
    pub fn redo(&self) -> bool {
        self.modify_history(|history, workflow| history.redo(workflow))
    }

    pub fn can_undo(&self) -> bool {
        self.history.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.lock().can_redo()
    }

    /// Write engine results into a node without touching the edit history
    ///
    /// Returns false when the node no longer exists.
    pub fn update_node_state(&self, node_id: &str, state: NodeState) -> bool {
        let _guard = self.history.lock();
        let mut workflow = Workflow::clone(&self.current.load());
        match workflow.node_mut(node_id) {
            Some(node) => node.state = state,
            None => return false,
        }
        self.current.store(Arc::new(workflow));
        true
    }

    fn modify_history(&self, op: impl FnOnce(&mut EditHistory, &mut Workflow) -> bool) -> bool {
        let mut history = self.history.lock();
        let mut workflow = Workflow::clone(&self.current.load());
        let changed = op(&mut history, &mut workflow);
        if changed {
            self.current.store(Arc::new(workflow));
        }
        changed
    }
}

impl RunCallbacks for WorkflowDocument {
    fn on_node_update(&self, node_id: &str, state: &NodeState) {
        if !self.update_node_state(node_id, state.clone()) {
            tracing::warn!("⚠️ Dropping result for node '{}' removed during the run", node_id);
        }
    }
}
