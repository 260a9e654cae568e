use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::{
    catalog::{self, TransportCatalog},
    model::{Description, RoutingSettings},
    render::RenderSettings,
    transit::RouteItem,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed input document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] catalog::Error),
}

/// The whole input JSON: network descriptions, settings, queries.
#[derive(Debug, Deserialize)]
pub struct InputDocument {
    pub base_requests: Vec<Description>,
    pub routing_settings: RoutingSettings,
    pub render_settings: RenderSettings,
    #[serde(default)]
    pub stat_requests: Vec<StatRequest>,
}

/// One entry of the `stat_requests` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StatRequest {
    Stop { id: u64, name: Arc<str> },
    Bus { id: u64, name: Arc<str> },
    Route { id: u64, from: Arc<str>, to: Arc<str> },
    Map { id: u64 },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ItemResponse<'a> {
    Bus {
        bus: &'a str,
        time: f64,
        span_count: usize,
    },
    Wait {
        stop_name: &'a str,
        time: f64,
    },
}

fn not_found(id: u64) -> Value {
    json!({ "request_id": id, "error_message": "not found" })
}

/// Answers every request in order. Each response echoes its `request_id`;
/// unknown stop and bus names produce the `error_message` form.
pub fn process_all(catalog: &mut TransportCatalog, requests: &[StatRequest]) -> Vec<Value> {
    requests
        .iter()
        .map(|request| match request {
            StatRequest::Stop { id, name } => match catalog.stop(name) {
                Some(summary) => json!({ "request_id": id, "buses": summary.buses }),
                None => not_found(*id),
            },
            StatRequest::Bus { id, name } => match catalog.bus(name) {
                Some(summary) => json!({
                    "request_id": id,
                    "stop_count": summary.stop_count,
                    "unique_stop_count": summary.unique_stop_count,
                    "route_length": summary.road_route_length,
                    "curvature": summary.curvature(),
                }),
                None => not_found(*id),
            },
            StatRequest::Route { id, from, to } => match catalog.find_route(from, to) {
                Some(route) => {
                    let items: Vec<ItemResponse> = route
                        .items
                        .iter()
                        .map(|item| match item {
                            RouteItem::Wait { stop, time } => ItemResponse::Wait {
                                stop_name: stop,
                                time: *time,
                            },
                            RouteItem::Bus {
                                bus,
                                time,
                                span_count,
                                ..
                            } => ItemResponse::Bus {
                                bus,
                                time: *time,
                                span_count: *span_count,
                            },
                        })
                        .collect();
                    json!({
                        "request_id": id,
                        "total_time": route.total_time,
                        "items": items,
                        "map": catalog.render_route(from, &route),
                    })
                }
                None => not_found(*id),
            },
            StatRequest::Map { id } => json!({ "request_id": id, "map": catalog.render_map() }),
        })
        .collect()
}

/// Parses the input document, builds the catalog and answers its queries.
pub fn process_document(input: &str) -> Result<Vec<Value>, Error> {
    let document: InputDocument = serde_json::from_str(input)?;
    debug!(
        descriptions = document.base_requests.len(),
        requests = document.stat_requests.len(),
        "input document parsed"
    );
    let mut catalog = TransportCatalog::new(
        document.base_requests,
        document.routing_settings,
        document.render_settings,
    )?;
    Ok(process_all(&mut catalog, &document.stat_requests))
}
