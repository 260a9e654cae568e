use serde::{Deserialize, Serialize};

pub mod router;

pub type VertexId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f64,
}

/// Directed weighted graph over a fixed set of vertices.
///
/// Vertices and edges are plain dense ids. Edges are append-only and keep
/// their insertion order as id, which lets callers maintain metadata in
/// arrays parallel to the edge list.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Graph {
    edges: Vec<Edge>,
    incidence_lists: Vec<Vec<EdgeId>>,
}

impl Graph {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            edges: Vec::new(),
            incidence_lists: vec![Vec::new(); vertex_count],
        }
    }

    /// Appends an edge and returns its id. Both endpoints must be allocated
    /// vertices and the weight must be non-negative.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        assert!(
            edge.from < self.vertex_count() && edge.to < self.vertex_count(),
            "edge ({} -> {}) references a vertex outside 0..{}",
            edge.from,
            edge.to,
            self.vertex_count()
        );
        debug_assert!(edge.weight >= 0.0);
        self.edges.push(edge);
        let id = self.edges.len() - 1;
        self.incidence_lists[edge.from].push(id);
        id
    }

    pub fn vertex_count(&self) -> usize {
        self.incidence_lists.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Ids of the edges leaving `vertex`, in insertion order.
    pub fn incident_edges(&self, vertex: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.incidence_lists[vertex].iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_ids_follow_insertion_order() {
        let mut graph = Graph::new(3);
        assert_eq!(graph.vertex_count(), 3);
        let a = graph.add_edge(Edge {
            from: 0,
            to: 1,
            weight: 1.0,
        });
        let b = graph.add_edge(Edge {
            from: 1,
            to: 2,
            weight: 2.5,
        });
        let c = graph.add_edge(Edge {
            from: 0,
            to: 2,
            weight: 4.0,
        });
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edge(b).to, 2);
    }

    #[test]
    fn incident_edges_are_ordered() {
        let mut graph = Graph::new(2);
        graph.add_edge(Edge {
            from: 0,
            to: 1,
            weight: 1.0,
        });
        graph.add_edge(Edge {
            from: 1,
            to: 0,
            weight: 1.0,
        });
        graph.add_edge(Edge {
            from: 0,
            to: 0,
            weight: 0.5,
        });
        let outgoing: Vec<_> = graph.incident_edges(0).collect();
        assert_eq!(outgoing, vec![0, 2]);
        assert_eq!(graph.incident_edges(1).count(), 1);
    }

    #[test]
    #[should_panic]
    fn unknown_vertex_is_rejected() {
        let mut graph = Graph::new(1);
        graph.add_edge(Edge {
            from: 0,
            to: 1,
            weight: 1.0,
        });
    }
}
