use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    model::{self, Bus, Description, RoutingSettings, Stop, stops_distance},
    render::{MapRenderer, RenderSettings},
    transit::{Route, TransitRouter},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("bus_wait_time must be positive")]
    InvalidWaitTime,
    #[error("bus_velocity must be positive and finite")]
    InvalidVelocity,
    #[error(transparent)]
    Data(#[from] model::Error),
}

/// Per-stop statistics: the name-sorted set of buses serving it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSummary {
    pub buses: BTreeSet<Arc<str>>,
}

/// Per-bus statistics over the expanded (round-trip) stop sequence.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSummary {
    pub stop_count: usize,
    pub unique_stop_count: usize,
    /// Sum of recorded road distances along the sequence, meters.
    pub road_route_length: u64,
    /// Sum of great-circle distances along the sequence, meters.
    pub geo_route_length: f64,
}

impl BusSummary {
    /// How much longer the roads are than the straight lines.
    pub fn curvature(&self) -> f64 {
        if self.geo_route_length > 0.0 {
            self.road_route_length as f64 / self.geo_route_length
        } else {
            // degenerate one-stop line
            1.0
        }
    }
}

/// The built database: statistics, the transit router and the map renderer,
/// all constructed once from the parsed descriptions. The descriptions
/// themselves are not retained.
#[derive(Debug)]
pub struct TransportCatalog {
    stop_summaries: BTreeMap<Arc<str>, StopSummary>,
    bus_summaries: BTreeMap<Arc<str>, BusSummary>,
    router: TransitRouter,
    renderer: MapRenderer,
}

impl TransportCatalog {
    pub fn new(
        descriptions: Vec<Description>,
        routing_settings: RoutingSettings,
        render_settings: RenderSettings,
    ) -> Result<Self, Error> {
        if routing_settings.bus_wait_time == 0 {
            return Err(Error::InvalidWaitTime);
        }
        if !(routing_settings.bus_velocity > 0.0 && routing_settings.bus_velocity.is_finite()) {
            return Err(Error::InvalidVelocity);
        }

        let mut stops: BTreeMap<Arc<str>, Stop> = BTreeMap::new();
        let mut buses: BTreeMap<Arc<str>, Bus> = BTreeMap::new();
        for description in descriptions {
            match description {
                Description::Stop(stop) => {
                    stops.insert(stop.name.clone(), stop);
                }
                Description::Bus(bus) => {
                    buses.insert(bus.name.clone(), bus);
                }
            }
        }
        debug!(stops = stops.len(), buses = buses.len(), "catalog input split");

        let mut stop_summaries: BTreeMap<Arc<str>, StopSummary> = stops
            .keys()
            .map(|name| (name.clone(), StopSummary::default()))
            .collect();
        let mut bus_summaries = BTreeMap::new();
        for bus in buses.values() {
            bus_summaries.insert(bus.name.clone(), summarize_bus(bus, &stops)?);
            for stop in &bus.stops {
                stop_summaries
                    .get_mut(stop)
                    .ok_or_else(|| model::Error::UnknownStop {
                        bus: bus.name.clone(),
                        stop: stop.clone(),
                    })?
                    .buses
                    .insert(bus.name.clone());
            }
        }

        let router = TransitRouter::new(&stops, &buses, routing_settings)?;
        let renderer = MapRenderer::new(&stops, &buses, render_settings);

        Ok(Self {
            stop_summaries,
            bus_summaries,
            router,
            renderer,
        })
    }

    pub fn stop(&self, name: &str) -> Option<&StopSummary> {
        self.stop_summaries.get(name)
    }

    pub fn bus(&self, name: &str) -> Option<&BusSummary> {
        self.bus_summaries.get(name)
    }

    /// Fastest journey between two stops. `None` when either name is unknown
    /// or the stops are disconnected.
    pub fn find_route(&mut self, from: &str, to: &str) -> Option<Route> {
        if !self.stop_summaries.contains_key(from) || !self.stop_summaries.contains_key(to) {
            return None;
        }
        self.router.find_route(from, to)
    }

    pub fn render_map(&self) -> String {
        self.renderer.render_map()
    }

    pub fn render_route(&self, from: &str, route: &Route) -> String {
        self.renderer.render_route(from, route)
    }

    pub fn routing_settings(&self) -> RoutingSettings {
        self.router.settings()
    }
}

fn summarize_bus(bus: &Bus, stops: &BTreeMap<Arc<str>, Stop>) -> Result<BusSummary, Error> {
    let unique: BTreeSet<&Arc<str>> = bus.stops.iter().collect();
    let mut summary = BusSummary {
        stop_count: bus.stops.len(),
        unique_stop_count: unique.len(),
        road_route_length: 0,
        geo_route_length: 0.0,
    };
    for pair in bus.stops.windows(2) {
        let lookup = |name: &Arc<str>| {
            stops.get(name).ok_or_else(|| model::Error::UnknownStop {
                bus: bus.name.clone(),
                stop: name.clone(),
            })
        };
        let (lhs, rhs) = (lookup(&pair[0])?, lookup(&pair[1])?);
        summary.road_route_length += u64::from(stops_distance(lhs, rhs)?);
        summary.geo_route_length += lhs.position.distance(&rhs.position);
    }
    Ok(summary)
}
