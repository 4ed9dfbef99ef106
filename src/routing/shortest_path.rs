//! Single-origin shortest-path tree, used as the inner loop of all-or-nothing loading.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use crate::graph::{EdgeIdx, Graph, NodeIdx};

/// Most paths through a planning-scale network are short; inlining the first 8 hops
/// avoids a heap allocation for the common case.
pub type PathLinks = SmallVec<[EdgeIdx; 8]>;

/// Binary-heap entry for label-setting Dijkstra. Ordered by ascending cost (via `Ord`
/// on `Reverse`-wrapped entries at the call site would also work; here we implement a
/// min-heap directly by reversing the comparison).
#[derive(Copy, Clone, Debug)]
struct CostNode {
    node: NodeIdx,
    cost: f64,
}

impl Eq for CostNode {}

impl PartialEq for CostNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Ord for CostNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so that `BinaryHeap` (a max-heap) pops the smallest cost first
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for CostNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Predecessor/distance tree rooted at one origin centroid.
pub struct ShortestPathTree {
    /// `pred[n]` is the link used to reach `n`, or `None` for the origin / unreached nodes.
    pub pred: Vec<Option<EdgeIdx>>,
    pub dist: Vec<f64>,
}

impl ShortestPathTree {
    /// Walks predecessors from `dest` back to the tree's origin, returning the links
    /// used in origin-to-destination order. Empty if `dest` is unreached.
    pub fn path_to(&self, graph: &Graph, dest: NodeIdx) -> PathLinks {
        let mut links = PathLinks::new();
        let mut cur = dest;
        while let Some(edge_idx) = self.pred[*cur] {
            links.push(edge_idx);
            cur = graph.link(edge_idx).a_node;
        }
        links.reverse();
        links
    }
}

/// Reusable scratch buffers for repeated single-origin Dijkstra runs, so an
/// all-or-nothing pass over many origins does not reallocate per origin.
pub struct Dijkstra {
    queue: BinaryHeap<CostNode>,
    dist: Vec<f64>,
    pred: Vec<Option<EdgeIdx>>,
    visited: Vec<bool>,
}

impl Dijkstra {
    pub fn new(node_count: usize) -> Self {
        Dijkstra {
            queue: BinaryHeap::new(),
            dist: vec![f64::INFINITY; node_count],
            pred: vec![None; node_count],
            visited: vec![false; node_count],
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.dist.iter_mut().for_each(|d| *d = f64::INFINITY);
        self.pred.iter_mut().for_each(|p| *p = None);
        self.visited.iter_mut().for_each(|v| *v = false);
    }

    /// Computes the shortest-path tree from `origin` under `graph`'s current cost
    /// vector, honoring `graph.blocked_centroid_flows()`.
    pub fn compute(&mut self, graph: &Graph, origin: NodeIdx) -> ShortestPathTree {
        self.reset();

        let cost = graph.cost();
        self.dist[*origin] = 0.0;
        self.queue.push(CostNode {
            node: origin,
            cost: 0.0,
        });

        while let Some(CostNode { node, cost: node_cost }) = self.queue.pop() {
            if self.visited[*node] {
                continue;
            }
            if node_cost > self.dist[*node] {
                continue;
            }
            self.visited[*node] = true;

            // blocked-centroid flows: a centroid other than the origin is terminal —
            // it may be reached, but no edge leaving it may be relaxed.
            if graph.blocked_centroid_flows() && graph.is_centroid(node) && node != origin {
                continue;
            }

            for &edge_idx in graph.leaving_links(node) {
                let link = graph.link(edge_idx);
                let new_cost = node_cost + cost[*edge_idx];
                if new_cost < self.dist[*link.b_node] {
                    self.dist[*link.b_node] = new_cost;
                    self.pred[*link.b_node] = Some(edge_idx);
                    self.queue.push(CostNode {
                        node: link.b_node,
                        cost: new_cost,
                    });
                }
            }
        }

        ShortestPathTree {
            pred: self.pred.clone(),
            dist: self.dist.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, LinkRecord};

    fn line_graph() -> crate::graph::Graph {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap()
            .push_link(LinkRecord::new(2, 2, 3, 1, 100.0, 5.0, 1.0))
            .unwrap();
        builder.finalize(&[1, 3]).unwrap()
    }

    #[test]
    fn finds_shortest_distance_along_a_chain() {
        let graph = line_graph();
        let mut dijkstra = Dijkstra::new(graph.node_count());
        let origin = graph.node_idx(1).unwrap();
        let tree = dijkstra.compute(&graph, origin);
        let dst = graph.node_idx(3).unwrap();
        assert_eq!(tree.dist[*dst], 15.0);
    }

    #[test]
    fn unreachable_node_has_infinite_distance() {
        let mut builder = GraphBuilder::new();
        builder
            .push_link(LinkRecord::new(1, 1, 2, 1, 100.0, 10.0, 1.0))
            .unwrap();
        // node 3 has no links at all and so isn't a graph node; use two components instead
        builder
            .push_link(LinkRecord::new(2, 10, 20, 1, 100.0, 1.0, 1.0))
            .unwrap();
        let graph = builder.finalize(&[1, 10]).unwrap();
        let mut dijkstra = Dijkstra::new(graph.node_count());
        let origin = graph.node_idx(1).unwrap();
        let tree = dijkstra.compute(&graph, origin);
        let unreachable = graph.node_idx(20).unwrap();
        assert!(tree.dist[*unreachable].is_infinite());
    }
}
