use std::{cmp::Ordering, collections::BinaryHeap, collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::graph::{EdgeId, Graph, VertexId};

pub type RouteId = u64;

/// Answer for a single `build_route` call. The id stays valid until
/// `release_route` is called for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub id: RouteId,
    pub weight: f64,
    pub edge_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RouteData {
    weight: f64,
    prev_edge: Option<EdgeId>,
}

/// Ordered by weight ascending (reversed for the max-heap), vertex id as a
/// deterministic tie breaker.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    weight: f64,
    vertex: VertexId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Shortest-path router over a frozen [`Graph`].
///
/// Two strategies share the same query surface and return identical answers
/// for non-negative weights:
/// - [`Router::new`] runs a label-setting search per query with scratch state,
/// - [`Router::all_pairs`] precomputes an O(V^2) table at construction and
///   answers from it.
///
/// Successful queries park their expanded edge list in a cache keyed by an
/// opaque, monotonically issued [`RouteId`]; callers read edges through
/// [`Router::route_edge`] and must free the entry with
/// [`Router::release_route`]. Asking for an edge of a released or never
/// issued id is a usage error and panics.
#[derive(Debug, Serialize, Deserialize)]
pub struct Router {
    graph: Arc<Graph>,
    all_pairs: Option<Vec<Vec<Option<RouteData>>>>,
    next_route_id: RouteId,
    expanded_routes: HashMap<RouteId, Box<[EdgeId]>>,
}

impl Router {
    /// Per-query strategy: nothing precomputed, every `build_route` runs a
    /// fresh search.
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            all_pairs: None,
            next_route_id: 0,
            expanded_routes: HashMap::new(),
        }
    }

    /// All-pairs strategy: relaxes every route through every intermediate
    /// vertex up front, then answers queries in O(path length).
    pub fn all_pairs(graph: Arc<Graph>) -> Self {
        let vertex_count = graph.vertex_count();
        let mut data = vec![vec![None; vertex_count]; vertex_count];

        for vertex in 0..vertex_count {
            data[vertex][vertex] = Some(RouteData {
                weight: 0.0,
                prev_edge: None,
            });
            for edge_id in graph.incident_edges(vertex) {
                let edge = graph.edge(edge_id);
                debug_assert!(edge.weight >= 0.0);
                let cell = &mut data[vertex][edge.to];
                if cell.is_none_or(|existing| existing.weight > edge.weight) {
                    *cell = Some(RouteData {
                        weight: edge.weight,
                        prev_edge: Some(edge_id),
                    });
                }
            }
        }

        for through in 0..vertex_count {
            for from in 0..vertex_count {
                let Some(route_from) = data[from][through] else {
                    continue;
                };
                for to in 0..vertex_count {
                    let Some(route_to) = data[through][to] else {
                        continue;
                    };
                    let candidate = route_from.weight + route_to.weight;
                    let cell = &mut data[from][to];
                    if cell.is_none_or(|existing| candidate < existing.weight) {
                        *cell = Some(RouteData {
                            weight: candidate,
                            // Prefer the edge closer to the destination so
                            // backtracking keeps working across the splice
                            prev_edge: route_to.prev_edge.or(route_from.prev_edge),
                        });
                    }
                }
            }
        }

        Self {
            graph,
            all_pairs: Some(data),
            next_route_id: 0,
            expanded_routes: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Finds the lightest path `from -> to`. Returns `None` when `to` is
    /// unreachable. A successful answer occupies a cache slot until released.
    pub fn build_route(&mut self, from: VertexId, to: VertexId) -> Option<RouteSummary> {
        let vertex_count = self.graph.vertex_count();
        assert!(from < vertex_count && to < vertex_count, "vertex out of range");

        let (weight, edges) = match &self.all_pairs {
            Some(table) => {
                let target = table[from][to]?;
                let mut edges = Vec::new();
                let mut prev_edge = target.prev_edge;
                while let Some(edge_id) = prev_edge {
                    edges.push(edge_id);
                    let tail = self.graph.edge(edge_id).from;
                    prev_edge = table[from][tail].and_then(|data| data.prev_edge);
                }
                edges.reverse();
                (target.weight, edges)
            }
            None => {
                let labels = self.search(from, to);
                let target = labels[to]?;
                let mut edges = Vec::new();
                let mut prev_edge = target.prev_edge;
                while let Some(edge_id) = prev_edge {
                    edges.push(edge_id);
                    let tail = self.graph.edge(edge_id).from;
                    prev_edge = labels[tail].and_then(|data| data.prev_edge);
                }
                edges.reverse();
                (target.weight, edges)
            }
        };

        let id = self.next_route_id;
        self.next_route_id += 1;
        let edge_count = edges.len();
        self.expanded_routes.insert(id, edges.into());
        Some(RouteSummary {
            id,
            weight,
            edge_count,
        })
    }

    /// The `idx`-th edge of a built route, in traversal order.
    pub fn route_edge(&self, route_id: RouteId, idx: usize) -> EdgeId {
        self.expanded_routes
            .get(&route_id)
            .expect("route id was released or never issued")[idx]
    }

    pub fn release_route(&mut self, route_id: RouteId) {
        self.expanded_routes.remove(&route_id);
    }

    /// Label-setting search from `from`, stopping once `to` is settled.
    fn search(&self, from: VertexId, to: VertexId) -> Vec<Option<RouteData>> {
        let mut labels: Vec<Option<RouteData>> = vec![None; self.graph.vertex_count()];
        labels[from] = Some(RouteData {
            weight: 0.0,
            prev_edge: None,
        });
        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry {
            weight: 0.0,
            vertex: from,
        });

        while let Some(entry) = queue.pop() {
            let settled = labels[entry.vertex].expect("queued vertex always has a label");
            if entry.weight > settled.weight {
                continue; // stale queue entry
            }
            if entry.vertex == to {
                break;
            }
            for edge_id in self.graph.incident_edges(entry.vertex) {
                let edge = self.graph.edge(edge_id);
                debug_assert!(edge.weight >= 0.0);
                let candidate = settled.weight + edge.weight;
                let cell = &mut labels[edge.to];
                if cell.is_none_or(|existing| existing.weight > candidate) {
                    *cell = Some(RouteData {
                        weight: candidate,
                        prev_edge: Some(edge_id),
                    });
                    queue.push(QueueEntry {
                        weight: candidate,
                        vertex: edge.to,
                    });
                }
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn diamond() -> Arc<Graph> {
        // 0 -> 1 -> 3 costs 3.0, 0 -> 2 -> 3 costs 2.5, 0 -> 3 direct costs 4.0
        let mut graph = Graph::new(4);
        graph.add_edge(Edge {
            from: 0,
            to: 1,
            weight: 1.0,
        });
        graph.add_edge(Edge {
            from: 1,
            to: 3,
            weight: 2.0,
        });
        graph.add_edge(Edge {
            from: 0,
            to: 2,
            weight: 2.0,
        });
        graph.add_edge(Edge {
            from: 2,
            to: 3,
            weight: 0.5,
        });
        graph.add_edge(Edge {
            from: 0,
            to: 3,
            weight: 4.0,
        });
        Arc::new(graph)
    }

    #[test]
    fn finds_the_lightest_path() {
        let mut router = Router::new(diamond());
        let summary = router.build_route(0, 3).unwrap();
        assert_eq!(summary.weight, 2.5);
        assert_eq!(summary.edge_count, 2);
        let edges: Vec<_> = (0..summary.edge_count)
            .map(|idx| router.route_edge(summary.id, idx))
            .collect();
        assert_eq!(edges, vec![2, 3]);
        router.release_route(summary.id);
    }

    #[test]
    fn strategies_agree() {
        let graph = diamond();
        let mut per_query = Router::new(Arc::clone(&graph));
        let mut precomputed = Router::all_pairs(graph);
        for from in 0..4 {
            for to in 0..4 {
                let lhs = per_query.build_route(from, to);
                let rhs = precomputed.build_route(from, to);
                match (lhs, rhs) {
                    (None, None) => {}
                    (Some(l), Some(r)) => {
                        assert_eq!(l.weight, r.weight, "{from} -> {to}");
                        assert_eq!(l.edge_count, r.edge_count, "{from} -> {to}");
                    }
                    other => panic!("strategies disagree for {from} -> {to}: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn strategies_agree_on_a_random_graph() {
        // xorshift, fixed seed
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let vertex_count = 24;
        let mut graph = Graph::new(vertex_count);
        for _ in 0..120 {
            graph.add_edge(Edge {
                from: next() as usize % vertex_count,
                to: next() as usize % vertex_count,
                weight: (next() % 1000) as f64 / 10.0,
            });
        }
        let graph = Arc::new(graph);

        let mut per_query = Router::new(Arc::clone(&graph));
        let mut precomputed = Router::all_pairs(graph);
        for from in 0..vertex_count {
            for to in 0..vertex_count {
                let lhs = per_query.build_route(from, to).map(|s| s.weight);
                let rhs = precomputed.build_route(from, to).map(|s| s.weight);
                match (lhs, rhs) {
                    (None, None) => {}
                    (Some(l), Some(r)) => {
                        assert!((l - r).abs() < 1e-9, "{from} -> {to}: {l} vs {r}")
                    }
                    other => panic!("strategies disagree for {from} -> {to}: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn unreachable_vertex_yields_none() {
        let mut graph = Graph::new(3);
        graph.add_edge(Edge {
            from: 0,
            to: 1,
            weight: 1.0,
        });
        let mut router = Router::new(Arc::new(graph));
        assert!(router.build_route(1, 2).is_none());
        assert!(router.build_route(2, 0).is_none());
    }

    #[test]
    fn route_to_self_is_empty() {
        let mut router = Router::all_pairs(diamond());
        let summary = router.build_route(2, 2).unwrap();
        assert_eq!(summary.weight, 0.0);
        assert_eq!(summary.edge_count, 0);
    }

    #[test]
    fn route_ids_are_distinct() {
        let mut router = Router::new(diamond());
        let first = router.build_route(0, 3).unwrap();
        let second = router.build_route(0, 3).unwrap();
        assert_ne!(first.id, second.id);
        router.release_route(first.id);
        // the second expansion must survive the first release
        assert_eq!(router.route_edge(second.id, 0), 2);
    }

    #[test]
    #[should_panic]
    fn released_route_cannot_be_read() {
        let mut router = Router::new(diamond());
        let summary = router.build_route(0, 3).unwrap();
        router.release_route(summary.id);
        router.route_edge(summary.id, 0);
    }
}
