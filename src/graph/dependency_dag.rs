use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::graph::flatten::FlatTasks;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Precedence graph over the solvable leaves. Edges run predecessor to
/// successor; node weights are the leaf ids.
pub struct DependencyDag {
    pub graph: DiGraph<String, ()>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl DependencyDag {
    /// Fails with [`ScheduleError::DependencyCycle`] if the retained
    /// predecessor links are not acyclic.
    pub fn build(flat: &FlatTasks) -> Result<Self> {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();

        for task in flat.solvable() {
            let node_ix = graph.add_node(task.id.clone());
            id_to_index.insert(task.id.clone(), node_ix);
        }

        for task in flat.solvable() {
            let Some(limit) = &task.limit else {
                continue;
            };
            for pred in &limit.predecessors {
                if let (Some(&u), Some(&v)) = (id_to_index.get(pred), id_to_index.get(&task.id)) {
                    graph.add_edge(u, v, ());
                }
            }
        }

        toposort(&graph, None)
            .map_err(|cycle| ScheduleError::DependencyCycle(graph[cycle.node_id()].clone()))?;

        Ok(Self { graph, id_to_index })
    }

    /// Topological order that releases the highest-weighted ready task
    /// first, breaking ties by input order.
    pub fn priority_order(&self, flat: &FlatTasks, config: &SchedulerConfig) -> Vec<String> {
        let weight = |ix: NodeIndex| {
            flat.leaf(&self.graph[ix])
                .map_or(1, |task| config.weight(task.effective_priority()))
        };

        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|ix| self.graph.neighbors_directed(ix, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<(i64, Reverse<usize>)> = self
            .graph
            .node_indices()
            .filter(|ix| in_degree[ix.index()] == 0)
            .map(|ix| (weight(ix), Reverse(ix.index())))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some((_, Reverse(raw))) = ready.pop() {
            let ix = NodeIndex::new(raw);
            order.push(self.graph[ix].clone());
            for next in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push((weight(next), Reverse(next.index())));
                }
            }
        }
        order
    }
}
