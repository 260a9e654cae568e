use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    model::{Bus, Stop},
    render::{RenderSettings, svg},
    shared::geo,
};

/// Projects geographic stop positions onto the canvas.
///
/// Real-world coordinates cluster stops unreadably, so instead of a linear
/// projection the stops are compressed onto a grid: support stops (endpoints
/// and junctions) anchor the layout at their true geography, every other stop
/// is spread evenly between its surrounding support stops, and each axis is
/// collapsed to consecutive indices that only keep the "renders at least as
/// far as its route neighbours" ordering.
#[derive(Debug, Clone)]
pub struct Projector {
    points: BTreeMap<Arc<str>, svg::Point>,
}

impl Projector {
    pub fn new(
        stops: &BTreeMap<Arc<str>, Stop>,
        buses: &BTreeMap<Arc<str>, Bus>,
        settings: &RenderSettings,
    ) -> Self {
        let support = support_stops(buses);
        let positions = interpolate(stops, buses, &support);

        let longitudes = compress_axis(&positions, buses, |point| point.longitude);
        let latitudes = compress_axis(&positions, buses, |point| point.latitude);

        let x_step = step(settings.max_width, settings.padding, longitudes.max_idx);
        let y_step = step(settings.max_height, settings.padding, latitudes.max_idx);

        let points = positions
            .iter()
            .map(|(name, position)| {
                let idx = longitudes.idx(position.longitude);
                let idy = latitudes.idx(position.latitude);
                let point = svg::Point {
                    x: settings.padding + idx as f64 * x_step,
                    // canvas y grows downward, latitude grows upward
                    y: settings.max_height - settings.padding - idy as f64 * y_step,
                };
                (name.clone(), point)
            })
            .collect();
        Self { points }
    }

    /// Canvas position of a registered stop.
    pub fn stop_point(&self, name: &str) -> svg::Point {
        self.points[name]
    }

    /// All stops with their canvas positions, ordered by name.
    pub fn points(&self) -> &BTreeMap<Arc<str>, svg::Point> {
        &self.points
    }
}

/// Stops whose canvas position comes straight from their geography: route
/// endpoints and junctions (served by two different buses, or passed more
/// than twice by a single bus).
fn support_stops(buses: &BTreeMap<Arc<str>, Bus>) -> HashSet<Arc<str>> {
    let mut support: HashSet<Arc<str>> = HashSet::new();
    let mut bus_count: HashMap<&Arc<str>, HashSet<&Arc<str>>> = HashMap::new();

    for bus in buses.values() {
        support.extend(bus.endpoints.iter().cloned());

        let mut multiplicity: HashMap<&Arc<str>, usize> = HashMap::new();
        for stop in &bus.stops {
            *multiplicity.entry(stop).or_default() += 1;
            bus_count.entry(stop).or_default().insert(&bus.name);
        }
        support.extend(
            multiplicity
                .into_iter()
                .filter(|(_, count)| *count > 2)
                .map(|(stop, _)| stop.clone()),
        );
    }

    support.extend(
        bus_count
            .into_iter()
            .filter(|(_, names)| names.len() >= 2)
            .map(|(stop, _)| stop.clone()),
    );
    support
}

/// True positions for support stops, equal-spaced geo interpolation between
/// the bracketing support stops for everything in between.
fn interpolate(
    stops: &BTreeMap<Arc<str>, Stop>,
    buses: &BTreeMap<Arc<str>, Bus>,
    support: &HashSet<Arc<str>>,
) -> BTreeMap<Arc<str>, geo::Point> {
    let mut positions: BTreeMap<Arc<str>, geo::Point> = stops
        .iter()
        .map(|(name, stop)| (name.clone(), stop.position))
        .collect();

    for bus in buses.values() {
        let anchors: Vec<usize> = bus
            .stops
            .iter()
            .enumerate()
            .filter(|(_, stop)| support.contains(*stop))
            .map(|(idx, _)| idx)
            .collect();
        for pair in anchors.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let from = stops[&bus.stops[left]].position;
            let to = stops[&bus.stops[right]].position;
            let span = (right - left) as f64;
            for idx in left + 1..right {
                let ratio = (idx - left) as f64 / span;
                positions.insert(
                    bus.stops[idx].clone(),
                    geo::Point {
                        latitude: from.latitude + (to.latitude - from.latitude) * ratio,
                        longitude: from.longitude + (to.longitude - from.longitude) * ratio,
                    },
                );
            }
        }
    }
    positions
}

/// One compressed axis: distinct coordinate values with their grid indices.
struct Axis {
    values: Vec<f64>,
    indices: Vec<usize>,
    max_idx: usize,
}

impl Axis {
    fn rank(&self, value: f64) -> usize {
        self.values
            .binary_search_by(|probe| probe.total_cmp(&value))
            .expect("axis value was collected during construction")
    }

    fn idx(&self, value: f64) -> usize {
        self.indices[self.rank(value)]
    }
}

/// Assigns each distinct coordinate value the smallest grid index that keeps
/// it after every smaller value it is route-adjacent to.
fn compress_axis(
    positions: &BTreeMap<Arc<str>, geo::Point>,
    buses: &BTreeMap<Arc<str>, Bus>,
    coordinate: impl Fn(&geo::Point) -> f64,
) -> Axis {
    let mut values: Vec<f64> = positions.values().map(&coordinate).collect();
    values.par_sort_unstable_by(f64::total_cmp);
    values.dedup_by(|a, b| a.total_cmp(b).is_eq());

    let rank = |value: f64| {
        values
            .binary_search_by(|probe: &f64| probe.total_cmp(&value))
            .expect("every position was collected")
    };

    // predecessors[r] holds ranks that must be laid out strictly before r
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); values.len()];
    for bus in buses.values() {
        for pair in bus.stops.windows(2) {
            if pair[0] == pair[1] {
                continue;
            }
            let lhs = rank(coordinate(&positions[&pair[0]]));
            let rhs = rank(coordinate(&positions[&pair[1]]));
            match lhs.cmp(&rhs) {
                std::cmp::Ordering::Less => predecessors[rhs].push(lhs),
                std::cmp::Ordering::Greater => predecessors[lhs].push(rhs),
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    // predecessors only point at smaller values, one ascending pass settles all
    let mut indices = vec![0usize; values.len()];
    for r in 0..values.len() {
        indices[r] = predecessors[r]
            .iter()
            .map(|&p| indices[p] + 1)
            .max()
            .unwrap_or(0);
    }
    let max_idx = indices.iter().copied().max().unwrap_or(0);

    Axis {
        values,
        indices,
        max_idx,
    }
}

fn step(extent: f64, padding: f64, max_idx: usize) -> f64 {
    if max_idx == 0 {
        0.0
    } else {
        (extent - 2.0 * padding) / max_idx as f64
    }
}
