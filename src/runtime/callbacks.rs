/// Observer hooks the engine reports run progress through
///
/// Every method defaults to a no-op so embedders implement only what their
/// UI needs. Callbacks are invoked from the run task and must not block.

use crate::runtime::state::{LogEntry, RunStatus};
use crate::workflow::types::NodeState;
use serde_json::Value;
use std::collections::HashMap;

pub trait RunCallbacks: Send + Sync {
    /// A node execution (or one iteration of it) finished
    fn on_log(&self, _entry: &LogEntry) {}

    /// The set of in-flight nodes changed; ids are sorted
    fn on_executing_change(&self, _executing: &[String]) {}

    /// Result or error state of a node changed
    fn on_node_update(&self, _node_id: &str, _state: &NodeState) {}

    fn on_last_input(&self, _node_id: &str, _input: &Value) {}

    fn on_last_output(&self, _node_id: &str, _output: &Value) {}

    fn on_status_change(&self, _status: RunStatus) {}

    /// A node wrote an environment variable; carries the full variable map
    fn on_environment_change(&self, _variables: &HashMap<String, String>) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl RunCallbacks for NoopCallbacks {}
