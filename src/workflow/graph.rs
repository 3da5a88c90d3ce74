/// Graph Model & Topology Resolver
///
/// Builds a petgraph `DiGraph` over a workflow snapshot and answers the
/// adjacency questions the engine asks: roots, predecessors, successors,
/// ordered outgoing edges, reachability and cycle detection.
///
/// The workflow is live, user-editable state, so malformed edges (dangling
/// endpoints, empty ids) are tolerated: they are dropped with a warning and
/// never make a lookup fail.

use crate::error::EngineError;
use crate::workflow::types::{Edge, Node, Workflow};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Index-based view of a workflow
///
/// Graph node weights are indices into `workflow.nodes`, edge weights are
/// indices into `workflow.edges`, so edge-array order is preserved.
#[derive(Debug)]
pub struct WorkflowGraph<'w> {
    workflow: &'w Workflow,
    graph: DiGraph<usize, usize>,
    node_id_to_index: HashMap<&'w str, NodeIndex>,
    /// Valid incoming edge indices per node, ascending
    incoming: HashMap<&'w str, Vec<usize>>,
    /// Valid outgoing edge indices per node, ascending
    outgoing: HashMap<&'w str, Vec<usize>>,
}

impl<'w> WorkflowGraph<'w> {
    /// Build the graph, skipping malformed edges
    pub fn new(workflow: &'w Workflow) -> Self {
        tracing::debug!(
            "🏗️ Building workflow graph with {} nodes and {} edges",
            workflow.nodes.len(),
            workflow.edges.len()
        );

        let mut graph = DiGraph::new();
        let mut node_id_to_index = HashMap::new();

        for (position, node) in workflow.nodes.iter().enumerate() {
            if node.id.is_empty() {
                tracing::warn!("⚠️ Ignoring node with empty id at position {}", position);
                continue;
            }
            if node_id_to_index.contains_key(node.id.as_str()) {
                tracing::warn!("⚠️ Ignoring duplicate node id '{}'", node.id);
                continue;
            }
            let index = graph.add_node(position);
            node_id_to_index.insert(node.id.as_str(), index);
        }

        let mut incoming: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<usize>> = HashMap::new();

        for (position, edge) in workflow.edges.iter().enumerate() {
            let endpoints = (
                node_id_to_index.get(edge.source.as_str()),
                node_id_to_index.get(edge.target.as_str()),
            );
            let (Some(&from), Some(&to)) = endpoints else {
                tracing::warn!(
                    "⚠️ Ignoring edge '{}' with unknown endpoint: '{}' → '{}'",
                    edge.id,
                    edge.source,
                    edge.target
                );
                continue;
            };
            graph.add_edge(from, to, position);
            outgoing.entry(edge.source.as_str()).or_default().push(position);
            incoming.entry(edge.target.as_str()).or_default().push(position);
        }

        Self {
            workflow,
            graph,
            node_id_to_index,
            incoming,
            outgoing,
        }
    }

    pub fn workflow(&self) -> &'w Workflow {
        self.workflow
    }

    pub fn node(&self, id: &str) -> Option<&'w Node> {
        let index = self.node_id_to_index.get(id)?;
        self.workflow.nodes.get(self.graph[*index])
    }

    pub fn edge(&self, index: usize) -> Option<&'w Edge> {
        self.workflow.edges.get(index)
    }

    /// Valid node ids in document order
    pub fn node_ids(&self) -> impl Iterator<Item = &'w str> + '_ {
        self.graph
            .node_indices()
            .filter_map(|i| self.workflow.nodes.get(self.graph[i]))
            .map(|n| n.id.as_str())
    }

    /// Fail with `GraphCycle` naming a node on the cycle
    pub fn ensure_acyclic(&self) -> Result<(), EngineError> {
        tracing::debug!("🔍 Validating DAG structure (checking for cycles)");
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let node_id = self
                    .workflow
                    .nodes
                    .get(self.graph[cycle.node_id()])
                    .map(|n| n.id.clone())
                    .unwrap_or_default();
                tracing::error!("❌ Workflow contains a cycle through '{}'", node_id);
                Err(EngineError::GraphCycle { node_id })
            }
        }
    }

    /// Nodes with no incoming edge, in document order
    pub fn root_nodes(&self) -> Vec<&'w Node> {
        self.node_ids()
            .filter(|id| self.incoming_edges(id).is_empty())
            .filter_map(|id| self.node(id))
            .collect()
    }

    /// Incoming edge indices in edge-array order
    pub fn incoming_edges(&self, id: &str) -> &[usize] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outgoing edge indices in edge-array order
    pub fn outgoing_edges(&self, id: &str) -> &[usize] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source nodes of incoming edges, in edge-array order, without repeats
    pub fn previous_nodes(&self, id: &str) -> Vec<&'w Node> {
        self.collect_unique(self.incoming_edges(id).iter().map(|&e| self.workflow.edges[e].source.as_str()))
    }

    /// Target nodes of outgoing edges, in edge-array order, without repeats
    pub fn next_nodes(&self, id: &str) -> Vec<&'w Node> {
        self.collect_unique(self.outgoing_edges(id).iter().map(|&e| self.workflow.edges[e].target.as_str()))
    }

    /// Every node reachable from `id`, excluding `id` itself
    pub fn descendants(&self, id: &str) -> HashSet<&'w str> {
        let mut reachable = HashSet::new();
        let Some(&start) = self.node_id_to_index.get(id) else {
            return reachable;
        };

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for edge in self.graph.edges_directed(current, Direction::Outgoing) {
                let target = edge.target();
                if seen.insert(target) {
                    queue.push_back(target);
                    if let Some(node) = self.workflow.nodes.get(self.graph[target]) {
                        reachable.insert(node.id.as_str());
                    }
                }
            }
        }

        reachable
    }

    fn collect_unique<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Vec<&'w Node> {
        let mut seen = HashSet::new();
        ids.filter(|id| seen.insert(id.to_string()))
            .filter_map(|id| self.node(id))
            .collect()
    }
}
