use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::geo::Point;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("no road distance recorded between {0} and {1}")]
    MissingDistance(Arc<str>, Arc<str>),
    #[error("bus {bus} references unknown stop {stop}")]
    UnknownStop { bus: Arc<str>, stop: Arc<str> },
}

/// A named point of the network, parsed once and never mutated.
///
/// Road distances are stored one direction per pair; see [`stops_distance`]
/// for the lookup convention.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub name: Arc<str>,
    #[serde(flatten)]
    pub position: Point,
    #[serde(default, rename = "road_distances")]
    pub distances: HashMap<Arc<str>, u32>,
}

/// Road distance between two stops in meters.
///
/// Tries `lhs -> rhs` first and falls back to `rhs -> lhs`, so a distance
/// recorded in either direction counts for both. Input data that records
/// neither direction cannot be routed over and fails the build.
pub fn stops_distance(lhs: &Stop, rhs: &Stop) -> Result<u32, Error> {
    lhs.distances
        .get(&*rhs.name)
        .or_else(|| rhs.distances.get(&*lhs.name))
        .copied()
        .ok_or_else(|| Error::MissingDistance(lhs.name.clone(), rhs.name.clone()))
}

/// A bus line as an ordered stop sequence.
///
/// Linear (non-roundtrip) lines are mirrored at parse time, so `stops` always
/// describes the full round trip. `endpoints` keeps the first and last stop
/// of the sequence as given, collapsed to one entry when they coincide.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "BusDescription")]
pub struct Bus {
    pub name: Arc<str>,
    pub stops: Vec<Arc<str>>,
    pub endpoints: Vec<Arc<str>>,
}

#[derive(Debug, Clone, Deserialize)]
struct BusDescription {
    name: Arc<str>,
    #[serde(default)]
    stops: Vec<Arc<str>>,
    #[serde(default)]
    is_roundtrip: bool,
}

impl From<BusDescription> for Bus {
    fn from(description: BusDescription) -> Self {
        let mut endpoints = Vec::new();
        if let (Some(first), Some(last)) = (description.stops.first(), description.stops.last()) {
            endpoints.push(first.clone());
            if last != first {
                endpoints.push(last.clone());
            }
        }

        let mut stops = description.stops;
        if !description.is_roundtrip && stops.len() > 1 {
            // Mirror the tail back onto itself, the last stop is not repeated
            for idx in (0..stops.len() - 1).rev() {
                stops.push(stops[idx].clone());
            }
        }

        Self {
            name: description.name,
            stops,
            endpoints,
        }
    }
}

/// One entry of the `base_requests` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Description {
    Stop(Stop),
    Bus(Bus),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Minutes spent at a stop before any bus can be boarded.
    pub bus_wait_time: u32,
    /// Bus travel speed in km/h.
    pub bus_velocity: f64,
}
