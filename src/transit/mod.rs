use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    graph::{Edge, Graph, VertexId, router::Router},
    model::{self, Bus, RoutingSettings, Stop, stops_distance},
};

/// Two graph vertices back every stop: `entry` is where a journey starts and
/// where rides deliver passengers, `board` is reached after waiting for a bus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StopVertices {
    entry: VertexId,
    board: VertexId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexInfo {
    pub stop: Arc<str>,
}

/// Out-of-band metadata for an edge, stored densely parallel to edge ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `entry -> board` edge of one stop, weight is the fixed wait time.
    Wait,
    /// `board -> entry` edge covering `stops[start_idx..=finish_idx]` of one
    /// bus without intermediate boarding.
    Ride {
        bus: Arc<str>,
        start_idx: usize,
        finish_idx: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteItem {
    Wait {
        stop: Arc<str>,
        time: f64,
    },
    Bus {
        bus: Arc<str>,
        time: f64,
        span_count: usize,
        start_idx: usize,
        finish_idx: usize,
    },
}

/// A found journey: alternating wait/ride items plus the total time in
/// minutes. Request-scoped, not retained by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub total_time: f64,
    pub items: Vec<RouteItem>,
}

/// Maps the stop/bus topology onto a weighted graph and answers fastest-route
/// queries over it.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransitRouter {
    settings: RoutingSettings,
    graph: Arc<Graph>,
    router: Router,
    stop_vertices: HashMap<Arc<str>, StopVertices>,
    vertices: Vec<VertexInfo>,
    edges: Vec<EdgeKind>,
}

impl TransitRouter {
    pub fn new(
        stops: &BTreeMap<Arc<str>, Stop>,
        buses: &BTreeMap<Arc<str>, Bus>,
        settings: RoutingSettings,
    ) -> Result<Self, model::Error> {
        let vertex_count = stops.len() * 2;
        let mut graph = Graph::new(vertex_count);
        let mut stop_vertices = HashMap::with_capacity(stops.len());
        let mut vertices = Vec::with_capacity(vertex_count);
        let mut edges = Vec::new();

        fill_with_stops(
            &mut graph,
            &mut stop_vertices,
            &mut vertices,
            &mut edges,
            stops,
            &settings,
        );
        fill_with_buses(&mut graph, &stop_vertices, &mut edges, stops, buses, &settings)?;
        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "transit graph built"
        );

        let graph = Arc::new(graph);
        Ok(Self {
            settings,
            router: Router::new(Arc::clone(&graph)),
            graph,
            stop_vertices,
            vertices,
            edges,
        })
    }

    pub fn settings(&self) -> RoutingSettings {
        self.settings
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Edge metadata parallel to the graph's edge ids.
    pub fn edge_kinds(&self) -> &[EdgeKind] {
        &self.edges
    }

    /// Fastest journey between two registered stops. `None` when they are
    /// disconnected. Both names must name stops the router was built over.
    pub fn find_route(&mut self, stop_from: &str, stop_to: &str) -> Option<Route> {
        let vertex_from = self
            .stop_vertices
            .get(stop_from)
            .expect("unregistered departure stop")
            .entry;
        let vertex_to = self
            .stop_vertices
            .get(stop_to)
            .expect("unregistered arrival stop")
            .entry;

        let summary = self.router.build_route(vertex_from, vertex_to)?;
        let mut items = Vec::with_capacity(summary.edge_count);
        for edge_idx in 0..summary.edge_count {
            let edge_id = self.router.route_edge(summary.id, edge_idx);
            let edge = self.graph.edge(edge_id);
            items.push(match &self.edges[edge_id] {
                EdgeKind::Wait => RouteItem::Wait {
                    stop: self.vertices[edge.from].stop.clone(),
                    time: edge.weight,
                },
                EdgeKind::Ride {
                    bus,
                    start_idx,
                    finish_idx,
                } => RouteItem::Bus {
                    bus: bus.clone(),
                    time: edge.weight,
                    span_count: finish_idx - start_idx,
                    start_idx: *start_idx,
                    finish_idx: *finish_idx,
                },
            });
        }
        self.router.release_route(summary.id);

        Some(Route {
            total_time: summary.weight,
            items,
        })
    }
}

fn fill_with_stops(
    graph: &mut Graph,
    stop_vertices: &mut HashMap<Arc<str>, StopVertices>,
    vertices: &mut Vec<VertexInfo>,
    edges: &mut Vec<EdgeKind>,
    stops: &BTreeMap<Arc<str>, Stop>,
    settings: &RoutingSettings,
) {
    let mut vertex_id = 0;
    for name in stops.keys() {
        let ids = StopVertices {
            entry: vertex_id,
            board: vertex_id + 1,
        };
        vertex_id += 2;
        stop_vertices.insert(name.clone(), ids);
        vertices.push(VertexInfo { stop: name.clone() });
        vertices.push(VertexInfo { stop: name.clone() });

        edges.push(EdgeKind::Wait);
        let edge_id = graph.add_edge(Edge {
            from: ids.entry,
            to: ids.board,
            weight: f64::from(settings.bus_wait_time),
        });
        debug_assert_eq!(edge_id, edges.len() - 1);
    }
    debug_assert_eq!(vertex_id, graph.vertex_count());
}

fn fill_with_buses(
    graph: &mut Graph,
    stop_vertices: &HashMap<Arc<str>, StopVertices>,
    edges: &mut Vec<EdgeKind>,
    stops: &BTreeMap<Arc<str>, Stop>,
    buses: &BTreeMap<Arc<str>, Bus>,
    settings: &RoutingSettings,
) -> Result<(), model::Error> {
    // m / (km/h * 1000 / 60) = minutes
    let meters_per_minute = settings.bus_velocity * 1000.0 / 60.0;

    for bus in buses.values() {
        let stop_count = bus.stops.len();
        if stop_count <= 1 {
            continue;
        }
        for name in &bus.stops {
            if !stops.contains_key(name) {
                return Err(model::Error::UnknownStop {
                    bus: bus.name.clone(),
                    stop: name.clone(),
                });
            }
        }
        for start_idx in 0..stop_count - 1 {
            let board_vertex = stop_vertices[&bus.stops[start_idx]].board;
            let mut total_distance = 0u64;
            for finish_idx in start_idx + 1..stop_count {
                total_distance += u64::from(stops_distance(
                    &stops[&bus.stops[finish_idx - 1]],
                    &stops[&bus.stops[finish_idx]],
                )?);
                edges.push(EdgeKind::Ride {
                    bus: bus.name.clone(),
                    start_idx,
                    finish_idx,
                });
                let edge_id = graph.add_edge(Edge {
                    from: board_vertex,
                    to: stop_vertices[&bus.stops[finish_idx]].entry,
                    weight: total_distance as f64 / meters_per_minute,
                });
                debug_assert_eq!(edge_id, edges.len() - 1);
            }
        }
    }
    Ok(())
}
