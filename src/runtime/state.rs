/// Execution state shared between the engine, callbacks and the API
///
/// `ExecutionState` holds what the UI observes about the current run: status,
/// the append-only log, the executing set and the last input/output per node.
/// `NodeStateStore` holds collector and counter values, which outlive runs and
/// are cleared only by an explicit reset.

use crate::workflow::types::NodeType;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// One node execution, or one iteration of a node inside an iterator region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Node id
    pub name: String,
    /// Predecessors whose output fed this execution
    pub source_ids: Vec<String>,
    /// Input the node received, keyed by predecessor id
    pub source_data: Value,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Iteration index of the innermost enclosing iterator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    /// Id of the innermost enclosing iterator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterator_id: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct RunView {
    run_id: Option<Uuid>,
    status: RunStatus,
    log: Vec<LogEntry>,
    executing: BTreeSet<String>,
    last_inputs: HashMap<String, Value>,
    last_outputs: HashMap<String, Value>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Serializable copy of the execution state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
    pub run_id: Option<Uuid>,
    pub status: RunStatus,
    pub executing: Vec<String>,
    pub log: Vec<LogEntry>,
    pub last_inputs: BTreeMap<String, Value>,
    pub last_outputs: BTreeMap<String, Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Observable state of the current (or last) run
#[derive(Debug, Default)]
pub struct ExecutionState {
    inner: RwLock<RunView>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-run state for a new run; last input/output caches are kept
    pub fn begin_run(&self, run_id: Uuid) {
        let mut inner = self.inner.write();
        inner.run_id = Some(run_id);
        inner.status = RunStatus::Running;
        inner.log.clear();
        inner.executing.clear();
        inner.started_at = Some(Utc::now());
        inner.finished_at = None;
    }

    pub fn set_status(&self, status: RunStatus) {
        let mut inner = self.inner.write();
        inner.status = status;
        if status.is_terminal() {
            inner.finished_at = Some(Utc::now());
            inner.executing.clear();
        }
    }

    pub fn status(&self) -> RunStatus {
        self.inner.read().status
    }

    pub fn append_log(&self, entry: LogEntry) {
        self.inner.write().log.push(entry);
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.inner.read().log.clone()
    }

    /// Add to the executing set, returning the updated set
    pub fn mark_executing(&self, node_id: &str) -> Vec<String> {
        let mut inner = self.inner.write();
        inner.executing.insert(node_id.to_string());
        inner.executing.iter().cloned().collect()
    }

    /// Remove from the executing set, returning the updated set
    pub fn unmark_executing(&self, node_id: &str) -> Vec<String> {
        let mut inner = self.inner.write();
        inner.executing.remove(node_id);
        inner.executing.iter().cloned().collect()
    }

    pub fn executing(&self) -> Vec<String> {
        self.inner.read().executing.iter().cloned().collect()
    }

    pub fn record_input(&self, node_id: &str, input: Value) {
        self.inner.write().last_inputs.insert(node_id.to_string(), input);
    }

    pub fn record_output(&self, node_id: &str, output: Value) {
        self.inner.write().last_outputs.insert(node_id.to_string(), output);
    }

    pub fn last_input(&self, node_id: &str) -> Option<Value> {
        self.inner.read().last_inputs.get(node_id).cloned()
    }

    pub fn last_output(&self, node_id: &str) -> Option<Value> {
        self.inner.read().last_outputs.get(node_id).cloned()
    }

    /// Forget cached input/output of a node
    pub fn clear_node(&self, node_id: &str) {
        let mut inner = self.inner.write();
        inner.last_inputs.remove(node_id);
        inner.last_outputs.remove(node_id);
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        let inner = self.inner.read();
        ExecutionSnapshot {
            run_id: inner.run_id,
            status: inner.status,
            executing: inner.executing.iter().cloned().collect(),
            log: inner.log.clone(),
            last_inputs: inner.last_inputs.clone().into_iter().collect(),
            last_outputs: inner.last_outputs.clone().into_iter().collect(),
            started_at: inner.started_at,
            finished_at: inner.finished_at,
        }
    }
}

/// Values a collector or counter node keeps between executions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistentNodeState {
    pub collected: Vec<Value>,
    pub count: u64,
}

/// Result of adding values to a collector
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    /// Downstream receives these values
    Emit(Vec<Value>),
    /// Batch not full yet; carries the current length
    Pending(usize),
}

/// Result of a counter execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    /// Count was below the limit and has been incremented to this value
    Passed(u64),
    /// Limit reached; carries the unchanged count
    Paused(u64),
}

/// Collector arrays and counter values keyed by node id
///
/// A single mutex serializes updates, so each collect/increment is atomic.
#[derive(Debug, Default)]
pub struct NodeStateStore {
    nodes: Mutex<HashMap<String, PersistentNodeState>>,
}

impl NodeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values to a collector
    ///
    /// Without a batch size every call emits the whole accumulated array.
    /// With one, the array is emitted and cleared once it reaches the size.
    pub fn collect(
        &self,
        node_id: &str,
        values: Vec<Value>,
        make_unique: bool,
        batch_size: Option<usize>,
    ) -> CollectOutcome {
        let mut nodes = self.nodes.lock();
        let state = nodes.entry(node_id.to_string()).or_default();

        for value in values {
            if make_unique && state.collected.contains(&value) {
                continue;
            }
            state.collected.push(value);
        }

        match batch_size {
            Some(size) if state.collected.len() >= size => {
                CollectOutcome::Emit(std::mem::take(&mut state.collected))
            }
            Some(_) => CollectOutcome::Pending(state.collected.len()),
            None => CollectOutcome::Emit(state.collected.clone()),
        }
    }

    /// Increment a counter unless it already reached `limit`
    pub fn try_increment(&self, node_id: &str, limit: u64) -> CounterOutcome {
        let mut nodes = self.nodes.lock();
        let state = nodes.entry(node_id.to_string()).or_default();
        if state.count >= limit {
            CounterOutcome::Paused(state.count)
        } else {
            state.count += 1;
            CounterOutcome::Passed(state.count)
        }
    }

    pub fn get(&self, node_id: &str) -> Option<PersistentNodeState> {
        self.nodes.lock().get(node_id).cloned()
    }

    /// Clear a node's collected values and count; false when nothing was stored
    pub fn reset(&self, node_id: &str) -> bool {
        self.nodes.lock().remove(node_id).is_some()
    }

    pub fn reset_all(&self) {
        self.nodes.lock().clear();
    }

    pub fn snapshot(&self) -> BTreeMap<String, PersistentNodeState> {
        self.nodes
            .lock()
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }
}
