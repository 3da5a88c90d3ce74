/// Petgraph-based DAG execution engine
///
/// Runs a workflow snapshot wave by wave: every node whose incoming edges are
/// all resolved is dispatched concurrently, results are settled in document
/// order, and the outgoing edges of each settled node are marked taken or
/// skipped. A node with no taken incoming edge is skipped, and the skip
/// spreads downstream.
///
/// Nodes reachable from an iterator form its region. The region runs as a
/// nested frame once per iteration payload, sequentially, once the iterator
/// and every predecessor of the region outside it have settled. A node
/// reachable from two unrelated iterators belongs to neither region and runs
/// once, as a join of both.

use crate::error::{EngineError, NodeError};
use crate::expression::Scope;
use crate::runtime::callbacks::RunCallbacks;
use crate::runtime::executor::NodeExecutor;
use crate::runtime::nodes::{NodeContext, NodeOutput, Propagation};
use crate::runtime::services::Services;
use crate::runtime::state::{ExecutionState, LogEntry, NodeStateStore, RunStatus};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::{Edge, Environment, Integration, LastData, Node, NodeState, NodeType, Workflow};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Cooperative cancellation flag shared with the API
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a run needs besides the injected services
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub workflow: Arc<Workflow>,
    pub environment: Environment,
    pub integrations: Vec<Integration>,
}

impl RunRequest {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self {
            workflow,
            environment: Environment::default(),
            integrations: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_integrations(mut self, integrations: Vec<Integration>) -> Self {
        self.integrations = integrations;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRunStatus {
    Completed,
    Failed,
    Skipped,
}

/// Per-node outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub status: NodeRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of executions, one per iteration inside an iterator region
    pub executions: usize,
}

impl NodeResult {
    fn skipped() -> Self {
        Self {
            status: NodeRunStatus::Skipped,
            data: None,
            error: None,
            executions: 0,
        }
    }

    /// A failure in any iteration sticks; a completion beats a skip
    fn record(&mut self, data: Value, error: Option<String>) {
        self.executions += 1;
        self.data = Some(data);
        match error {
            Some(error) => {
                self.status = NodeRunStatus::Failed;
                self.error = Some(error);
            }
            None if self.status == NodeRunStatus::Skipped => self.status = NodeRunStatus::Completed,
            None => {}
        }
    }
}

/// Final report of a run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// False if any node without `continueOnFailure` failed, or the run was halted or cancelled
    pub success: bool,
    pub node_results: BTreeMap<String, NodeResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Exclusive right to run on the engine that issued it, released on drop
#[derive(Debug)]
pub struct RunSlot(tokio::sync::OwnedMutexGuard<()>);

/// DAG execution engine
///
/// Owns the observable execution state and the persistent collector/counter
/// store. At most one run is active at a time.
#[derive(Debug)]
pub struct ExecutionEngine {
    /// Node executor for handling individual node execution
    executor: Arc<NodeExecutor>,
    state: Arc<ExecutionState>,
    store: Arc<NodeStateStore>,
    cancel: CancelHandle,
    run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ExecutionEngine {
    /// Create new execution engine with node executor
    pub fn new(executor: Arc<NodeExecutor>) -> Self {
        Self {
            executor,
            state: Arc::new(ExecutionState::new()),
            store: Arc::new(NodeStateStore::new()),
            cancel: CancelHandle::default(),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn executor(&self) -> &Arc<NodeExecutor> {
        &self.executor
    }

    pub fn state(&self) -> &Arc<ExecutionState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<NodeStateStore> {
        &self.store
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Request cancellation of the active run; false when nothing is running
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        tracing::info!("🛑 Cancellation requested");
        self.cancel.cancel();
        true
    }

    /// Clear a collector's or counter's persisted values and cached I/O
    pub fn reset_node_state(&self, node_id: &str) -> bool {
        self.state.clear_node(node_id);
        self.store.reset(node_id)
    }

    /// Clear every collector and counter
    pub fn reset_all_node_state(&self) {
        tracing::info!("🧹 Clearing all collector and counter state");
        self.store.reset_all();
    }

    /// Claim the engine for one run; `RunInProgress` while another holds it
    pub fn reserve(&self) -> Result<RunSlot, EngineError> {
        self.run_lock.clone().try_lock_owned().map(RunSlot).map_err(|_| {
            tracing::warn!("⚠️ Rejecting run: another run is in progress");
            EngineError::RunInProgress
        })
    }

    /// Execute a workflow snapshot to completion
    ///
    /// Fails with `RunInProgress` while another run is active and with
    /// `GraphCycle` before any node runs. Node failures never surface here;
    /// they are reported through callbacks and the summary.
    pub async fn execute(
        &self,
        request: RunRequest,
        services: &Services,
        callbacks: Arc<dyn RunCallbacks>,
    ) -> Result<RunSummary, EngineError> {
        let slot = self.reserve()?;
        self.execute_reserved(slot, request, services, callbacks).await
    }

    /// Execute with a slot obtained from `reserve`, held until the run ends
    pub async fn execute_reserved(
        &self,
        _slot: RunSlot,
        request: RunRequest,
        services: &Services,
        callbacks: Arc<dyn RunCallbacks>,
    ) -> Result<RunSummary, EngineError> {

        let workflow = request.workflow.clone();
        let graph = WorkflowGraph::new(&workflow);
        graph.ensure_acyclic()?;

        self.cancel.reset();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let workflow_start_time = Instant::now();

        tracing::info!(
            "🚀 Starting workflow execution: {} (run {}, {} nodes, {} edges)",
            workflow.id,
            run_id,
            workflow.nodes.len(),
            workflow.edges.len()
        );

        self.state.begin_run(run_id);
        callbacks.on_status_change(RunStatus::Running);

        let previous_results = workflow
            .nodes
            .iter()
            .filter_map(|n| n.state.result.as_ref().map(|r| (n.id.clone(), r.payload.clone())))
            .collect();

        let reach: HashMap<&str, HashSet<&str>> = graph
            .node_ids()
            .filter(|id| graph.node(id).map(|n| n.node_type() == NodeType::Iterator).unwrap_or(false))
            .map(|id| (id, graph.descendants(id)))
            .collect();
        // a node reachable from two unrelated iterators joins both loops and
        // belongs to neither region
        let regions = reach
            .iter()
            .map(|(&id, below)| {
                let region: HashSet<&str> = below
                    .iter()
                    .copied()
                    .filter(|node| {
                        reach.iter().all(|(&other, other_below)| {
                            other == id
                                || !other_below.contains(node)
                                || below.contains(other)
                                || other_below.contains(id)
                        })
                    })
                    .collect();
                (id, region)
            })
            .collect();

        let run = RunContext {
            engine: self,
            graph: &graph,
            services,
            callbacks: callbacks.as_ref(),
            integrations: &request.integrations,
            previous_results,
            regions,
        };
        let mut progress = RunProgress {
            env: request.environment.variables.clone(),
            results: BTreeMap::new(),
            failed: false,
            halted: false,
        };

        let root = run.frame(graph.node_ids().collect(), HashSet::new(), Map::new(), None);
        run.run_frame(&mut progress, root).await;

        let status = if self.cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if progress.halted || progress.failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        self.state.set_status(status);
        callbacks.on_status_change(status);

        let duration = workflow_start_time.elapsed();
        match status {
            RunStatus::Completed => {
                tracing::info!("🎉 Workflow '{}' completed in {:?}", workflow.id, duration)
            }
            RunStatus::Cancelled => {
                tracing::warn!("🛑 Workflow '{}' cancelled after {:?}", workflow.id, duration)
            }
            _ => tracing::error!("❌ Workflow '{}' failed after {:?}", workflow.id, duration),
        }

        Ok(RunSummary {
            run_id,
            status,
            success: status == RunStatus::Completed,
            node_results: progress.results,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeState {
    Taken,
    Skipped,
}

#[derive(Debug, PartialEq, Eq)]
enum Readiness {
    Waiting,
    Ready,
    Skip,
}

/// Read-only view shared by every frame of a run
struct RunContext<'a> {
    engine: &'a ExecutionEngine,
    graph: &'a WorkflowGraph<'a>,
    services: &'a Services,
    callbacks: &'a dyn RunCallbacks,
    integrations: &'a [Integration],
    previous_results: HashMap<String, Value>,
    /// Iterator id to the nodes it repeats
    regions: HashMap<&'a str, HashSet<&'a str>>,
}

/// Mutable state carried across frames
struct RunProgress {
    env: HashMap<String, String>,
    results: BTreeMap<String, NodeResult>,
    failed: bool,
    halted: bool,
}

/// A set of nodes executed together: the top level, or one iteration of a region
struct Frame<'a> {
    members: Vec<&'a str>,
    member_set: HashSet<&'a str>,
    /// Nodes repeated by a member iterator, mapped to that iterator
    nested: HashMap<&'a str, &'a str>,
    /// Edges from the enclosing iterator, always taken
    seeded: HashSet<usize>,
    /// Outputs visible to templates, keyed by node id
    scope: Map<String, Value>,
    iteration: Option<(&'a str, usize)>,
    /// Members dispatched or skipped
    done: HashSet<&'a str>,
    /// Completed iterators whose region has not run yet
    pending: Vec<PendingRegion<'a>>,
}

impl Frame<'_> {
    /// The iterator is done and its region finished or will never run
    fn region_settled(&self, iterator: &str) -> bool {
        self.done.contains(iterator) && !self.pending.iter().any(|p| p.iterator.id == iterator)
    }
}

struct PendingRegion<'a> {
    iterator: &'a Node,
    data: Value,
    payloads: Vec<Value>,
}

struct Prepared<'a> {
    node: &'a Node,
    input: Value,
    sources: Vec<String>,
}

struct Dispatched {
    result: Result<NodeOutput, NodeError>,
    duration: Duration,
}

impl<'a> RunContext<'a> {
    /// Drop candidates that belong to the region of an iterator among them
    fn frame_members(&self, candidates: Vec<&'a str>) -> Vec<&'a str> {
        let nested: HashSet<&str> = candidates
            .iter()
            .filter_map(|id| self.regions.get(id))
            .flatten()
            .copied()
            .collect();
        candidates.into_iter().filter(|id| !nested.contains(id)).collect()
    }

    /// Build a frame over the candidates not repeated by a member iterator
    fn frame(
        &self,
        candidates: Vec<&'a str>,
        seeded: HashSet<usize>,
        scope: Map<String, Value>,
        iteration: Option<(&'a str, usize)>,
    ) -> Frame<'a> {
        let members = self.frame_members(candidates);
        let mut nested = HashMap::new();
        for &id in &members {
            if let Some(region) = self.regions.get(id) {
                nested.extend(region.iter().map(|&node| (node, id)));
            }
        }
        Frame {
            member_set: members.iter().copied().collect(),
            members,
            nested,
            seeded,
            scope,
            iteration,
            done: HashSet::new(),
            pending: Vec::new(),
        }
    }

    fn run_frame<'s>(&'s self, progress: &'s mut RunProgress, mut frame: Frame<'a>) -> BoxFuture<'s, Map<String, Value>> {
        Box::pin(async move {
            let mut edge_states: HashMap<usize, EdgeState> = HashMap::new();
            let mut local = Map::new();
            let mut step = 0;

            loop {
                if self.engine.cancel.is_cancelled() {
                    tracing::warn!("🛑 Run cancelled, no further nodes are dispatched");
                    break;
                }
                if progress.halted {
                    break;
                }

                self.skip_unreachable(&mut frame, &mut edge_states, progress);

                if let Some(pos) = frame
                    .pending
                    .iter()
                    .position(|p| self.region_ready(&frame, p.iterator.id.as_str()))
                {
                    let region = frame.pending.remove(pos);
                    self.run_iterations(progress, &mut frame, &mut local, region).await;
                    continue;
                }

                let ready: Vec<&'a str> = frame
                    .members
                    .iter()
                    .copied()
                    .filter(|id| !frame.done.contains(id) && self.readiness(&frame, &edge_states, id) == Readiness::Ready)
                    .collect();
                if ready.is_empty() {
                    if frame.pending.is_empty() {
                        break;
                    }
                    let region = frame.pending.remove(0);
                    tracing::warn!(
                        "⚠️ Region of '{}' still has unsettled predecessors, running it anyway",
                        region.iterator.id
                    );
                    self.run_iterations(progress, &mut frame, &mut local, region).await;
                    continue;
                }
                frame.done.extend(ready.iter().copied());

                step += 1;
                tracing::info!("📍 Step {}: dispatching {:?}", step, ready);

                let prepared: Vec<Prepared<'a>> = ready
                    .iter()
                    .filter_map(|id| {
                        let node = self.graph.node(id)?;
                        let (input, sources) = self.gather_input(&frame, &edge_states, id);
                        Some(Prepared { node, input, sources })
                    })
                    .collect();

                let data = Value::Object(frame.scope.clone());
                let env = progress.env.clone();
                let results = join_all(
                    prepared
                        .iter()
                        .map(|p| self.dispatch(p, &data, &env)),
                )
                .await;

                for (prepared, dispatched) in prepared.iter().zip(results) {
                    if let Some(dispatched) = dispatched {
                        self.settle(progress, &mut frame, &mut edge_states, &mut local, prepared, dispatched);
                    }
                }
            }

            local
        })
    }

    /// True once every predecessor of the region outside it has settled
    fn region_ready(&self, frame: &Frame<'a>, iterator: &str) -> bool {
        let Some(region) = self.regions.get(iterator) else {
            return true;
        };
        region.iter().all(|&member| {
            self.graph.incoming_edges(member).iter().all(|&e| {
                let Some(edge) = self.graph.edge(e) else {
                    return true;
                };
                let source = edge.source.as_str();
                if source == iterator || region.contains(source) {
                    true
                } else if frame.member_set.contains(source) {
                    frame.done.contains(source)
                } else if let Some(owner) = frame.nested.get(source) {
                    frame.region_settled(owner)
                } else {
                    // enclosing frames settle before this one starts
                    true
                }
            })
        })
    }

    fn readiness(&self, frame: &Frame<'a>, edge_states: &HashMap<usize, EdgeState>, id: &str) -> Readiness {
        let mut has_edge = false;
        let mut any_taken = false;

        for &e in self.graph.incoming_edges(id) {
            let Some(edge) = self.graph.edge(e) else {
                continue;
            };
            if frame.seeded.contains(&e) {
                has_edge = true;
                any_taken = true;
                continue;
            }
            let source = edge.source.as_str();
            // outputs of a repeated node count once its whole region finished
            if let Some(owner) = frame.nested.get(source) {
                if !frame.region_settled(owner) {
                    return Readiness::Waiting;
                }
                has_edge = true;
                any_taken |= frame.scope.contains_key(source);
                continue;
            }
            // enclosing frames settle before this one starts
            if !frame.member_set.contains(source) {
                continue;
            }
            has_edge = true;
            match edge_states.get(&e) {
                None => return Readiness::Waiting,
                Some(EdgeState::Taken) => any_taken = true,
                Some(EdgeState::Skipped) => {}
            }
        }

        if !has_edge || any_taken {
            Readiness::Ready
        } else {
            Readiness::Skip
        }
    }

    /// Mark every node whose incoming edges were all skipped, until nothing changes
    fn skip_unreachable(
        &self,
        frame: &mut Frame<'a>,
        edge_states: &mut HashMap<usize, EdgeState>,
        progress: &mut RunProgress,
    ) {
        loop {
            let skipped: Vec<&'a str> = {
                let view: &Frame<'a> = frame;
                let states: &HashMap<usize, EdgeState> = edge_states;
                view.members
                    .iter()
                    .copied()
                    .filter(|id| !view.done.contains(id) && self.readiness(view, states, id) == Readiness::Skip)
                    .collect()
            };
            if skipped.is_empty() {
                return;
            }
            for id in skipped {
                tracing::debug!("⏭️ Skipping node '{}': no incoming edge was taken", id);
                frame.done.insert(id);
                for e in self.frame_outgoing(frame, id) {
                    edge_states.insert(e, EdgeState::Skipped);
                }
                progress
                    .results
                    .entry(id.to_string())
                    .or_insert_with(NodeResult::skipped);
            }
        }
    }

    /// Outgoing edges whose target runs in this frame
    fn frame_outgoing(&self, frame: &Frame<'a>, id: &str) -> Vec<usize> {
        self.graph
            .outgoing_edges(id)
            .iter()
            .copied()
            .filter(|&e| {
                self.graph
                    .edge(e)
                    .map(|edge| frame.member_set.contains(edge.target.as_str()))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Merge the outputs of active predecessors, keyed by predecessor id
    fn gather_input(&self, frame: &Frame<'a>, edge_states: &HashMap<usize, EdgeState>, id: &str) -> (Value, Vec<String>) {
        let mut input = Map::new();
        let mut sources = Vec::new();

        for &e in self.graph.incoming_edges(id) {
            let Some(edge) = self.graph.edge(e) else {
                continue;
            };
            let source = edge.source.as_str();
            let active = frame.seeded.contains(&e)
                || !frame.member_set.contains(source)
                || edge_states.get(&e) == Some(&EdgeState::Taken);
            if !active || input.contains_key(source) {
                continue;
            }
            if let Some(output) = frame.scope.get(source) {
                input.insert(source.to_string(), output.clone());
                sources.push(source.to_string());
            }
        }

        (Value::Object(input), sources)
    }

    async fn dispatch(&self, prepared: &Prepared<'a>, data: &Value, env: &HashMap<String, String>) -> Option<Dispatched> {
        let node = prepared.node;
        if self.engine.cancel.is_cancelled() {
            return None;
        }

        let executing = self.engine.state.mark_executing(&node.id);
        self.callbacks.on_executing_change(&executing);
        self.engine.state.record_input(&node.id, prepared.input.clone());
        self.callbacks.on_last_input(&node.id, &prepared.input);

        let ctx = NodeContext {
            node_id: &node.id,
            input: &prepared.input,
            sources: &prepared.sources,
            scope: Scope::new(data, env),
            store: &self.engine.store,
            integrations: self.integrations,
            previous_results: &self.previous_results,
            timeout: self.engine.executor.timeout_for(node),
        };

        let start_time = Instant::now();
        let result = self.engine.executor.execute_node(node, &ctx, self.services).await;
        let duration = start_time.elapsed();

        let executing = self.engine.state.unmark_executing(&node.id);
        self.callbacks.on_executing_change(&executing);

        if self.engine.cancel.is_cancelled() {
            tracing::info!("🛑 Discarding result of '{}' after cancellation", node.id);
            return None;
        }

        Some(Dispatched { result, duration })
    }

    /// Apply one node's result: state, log, variables, edges, and its region
    fn settle(
        &self,
        progress: &mut RunProgress,
        frame: &mut Frame<'a>,
        edge_states: &mut HashMap<usize, EdgeState>,
        local: &mut Map<String, Value>,
        prepared: &Prepared<'a>,
        dispatched: Dispatched,
    ) {
        let node = prepared.node;
        let id = node.id.as_str();

        let (data, error, propagation, writes, halt) = match dispatched.result {
            Ok(NodeOutput {
                data,
                propagation,
                variable_writes,
                failure,
                halt,
            }) => (data, failure.map(|e| e.to_string()), propagation, variable_writes, halt),
            Err(e) => (json!({ "error": e.to_string() }), Some(e.to_string()), Propagation::All, Vec::new(), false),
        };
        let failed = error.is_some();

        if !failed || node.continue_on_failure {
            self.engine.state.record_output(id, data.clone());
            self.callbacks.on_last_output(id, &data);
        }

        let node_state = NodeState {
            result: (!failed || node.continue_on_failure).then(|| LastData::now(data.clone())),
            error: error.clone(),
        };
        self.callbacks.on_node_update(id, &node_state);

        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            node_type: node.node_type(),
            name: id.to_string(),
            source_ids: prepared.sources.clone(),
            source_data: prepared.input.clone(),
            data: data.clone(),
            error: error.clone(),
            iteration: frame.iteration.map(|(_, index)| index),
            iterator_id: frame.iteration.map(|(iterator, _)| iterator.to_string()),
            duration_ms: dispatched.duration.as_millis() as u64,
        };
        self.engine.state.append_log(entry.clone());
        self.callbacks.on_log(&entry);

        if !writes.is_empty() {
            for (name, value) in writes {
                tracing::debug!("🔧 Setting environment variable '{}'", name);
                progress.env.insert(name, value);
            }
            self.callbacks.on_environment_change(&progress.env);
        }

        progress
            .results
            .entry(id.to_string())
            .or_insert_with(NodeResult::skipped)
            .record(data.clone(), error.clone());

        match &error {
            None => tracing::info!("✅ Node '{}' completed in {:?}", id, dispatched.duration),
            Some(e) if node.continue_on_failure => {
                tracing::warn!("⚠️ Node '{}' failed, continuing: {}", id, e)
            }
            Some(e) => {
                tracing::error!("❌ Node '{}' failed: {}", id, e);
                progress.failed = true;
            }
        }
        if halt {
            tracing::warn!("🛑 Node '{}' stopped the run", id);
            progress.halted = true;
        }

        frame.scope.insert(id.to_string(), data.clone());
        local.insert(id.to_string(), data.clone());

        let continues = !failed || node.continue_on_failure;
        let taken: HashSet<usize> = match &propagation {
            _ if !continues => HashSet::new(),
            Propagation::All | Propagation::Iterate(_) => self.graph.outgoing_edges(id).iter().copied().collect(),
            Propagation::Suppress => HashSet::new(),
            Propagation::Branch { index, conditions } => self.select_branch(id, *index, *conditions),
        };
        for e in self.frame_outgoing(frame, id) {
            let state = if taken.contains(&e) {
                EdgeState::Taken
            } else {
                EdgeState::Skipped
            };
            edge_states.insert(e, state);
        }

        // the region waits until its outside predecessors settled
        if let (false, Propagation::Iterate(payloads)) = (failed, propagation) {
            frame.pending.push(PendingRegion {
                iterator: node,
                data,
                payloads,
            });
        }
    }

    /// Outgoing edges a conditional fires
    ///
    /// When any outgoing edge carries a branch index, edges are matched by
    /// that index and untagged edges form the else branch. Otherwise edge `i`
    /// belongs to condition `i` and the edge after the last condition is else.
    /// Without a dedicated else edge, else takes the last outgoing edge.
    fn select_branch(&self, id: &str, index: Option<usize>, conditions: usize) -> HashSet<usize> {
        let outgoing = self.graph.outgoing_edges(id);
        let tagged = outgoing
            .iter()
            .any(|&e| self.graph.edge(e).and_then(Edge::branch).is_some());

        let mut selected: HashSet<usize> = if tagged {
            outgoing
                .iter()
                .copied()
                .filter(|&e| self.graph.edge(e).map(|edge| edge.branch() == index).unwrap_or(false))
                .collect()
        } else {
            outgoing.get(index.unwrap_or(conditions)).copied().into_iter().collect()
        };

        if selected.is_empty() {
            match index {
                Some(i) => tracing::warn!("⚠️ Conditional '{}' matched condition {} but has no edge for it", id, i),
                None => {
                    tracing::debug!("↪️ Conditional '{}' has no else edge, taking its last edge", id);
                    selected.extend(outgoing.last().copied());
                }
            }
        }
        selected
    }

    /// Run an iterator's region once per payload, then store the aggregate on the iterator
    async fn run_iterations(
        &self,
        progress: &mut RunProgress,
        frame: &mut Frame<'a>,
        local: &mut Map<String, Value>,
        region: PendingRegion<'a>,
    ) {
        let PendingRegion {
            iterator,
            data,
            payloads,
        } = region;
        let id = iterator.id.as_str();
        let candidates: Vec<&'a str> = match self.regions.get(id) {
            Some(region) => self.graph.node_ids().filter(|n| region.contains(n)).collect(),
            None => Vec::new(),
        };
        let seeded: HashSet<usize> = self.graph.outgoing_edges(id).iter().copied().collect();

        tracing::info!(
            "🔁 Iterator '{}' running {} iteration(s) over {:?}",
            id,
            payloads.len(),
            candidates
        );

        let mut iterations = Vec::with_capacity(payloads.len());
        let mut latest = Map::new();
        for (index, payload) in payloads.into_iter().enumerate() {
            if self.engine.cancel.is_cancelled() || progress.halted {
                break;
            }
            let mut scope = frame.scope.clone();
            scope.insert(id.to_string(), payload);
            let child = self.frame(candidates.clone(), seeded.clone(), scope, Some((id, index)));
            let outputs = self.run_frame(progress, child).await;
            for (node_id, output) in &outputs {
                latest.insert(node_id.clone(), output.clone());
            }
            iterations.push(json!({ "index": index, "outputs": outputs }));
        }

        // later nodes see the most recent output of every repeated node
        for (node_id, output) in latest {
            frame.scope.insert(node_id.clone(), output.clone());
            local.insert(node_id, output);
        }

        let mut aggregate = match data {
            Value::Object(map) => map,
            other => Map::from_iter([("items".to_string(), other)]),
        };
        aggregate.insert("iterations".to_string(), Value::Array(iterations));
        let aggregate = Value::Object(aggregate);

        self.engine.state.record_output(id, aggregate.clone());
        self.callbacks.on_last_output(id, &aggregate);
        self.callbacks.on_node_update(
            id,
            &NodeState {
                result: Some(LastData::now(aggregate.clone())),
                error: None,
            },
        );
        if let Some(result) = progress.results.get_mut(id) {
            result.data = Some(aggregate.clone());
        }
        frame.scope.insert(id.to_string(), aggregate.clone());
        local.insert(id.to_string(), aggregate);
    }
}
