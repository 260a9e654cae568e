use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    model::{Bus, Stop},
    transit::{Route, RouteItem},
};

pub mod projector;
pub mod svg;

pub use projector::Projector;
use svg::{Circle, Color, Document, Point, Polyline, Rect, Text};

/// One drawing pass over the map. The settings list them in paint order,
/// bottom first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    BusLines,
    BusLabels,
    StopPoints,
    StopLabels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(rename = "width")]
    pub max_width: f64,
    #[serde(rename = "height")]
    pub max_height: f64,
    pub padding: f64,
    /// Extra bleed of the route underlayer past the canvas edges.
    #[serde(default)]
    pub outer_margin: f64,
    pub stop_radius: f64,
    pub line_width: f64,
    pub stop_label_font_size: u32,
    pub stop_label_offset: [f64; 2],
    pub bus_label_font_size: u32,
    pub bus_label_offset: [f64; 2],
    pub underlayer_color: Color,
    pub underlayer_width: f64,
    #[serde(rename = "color_palette")]
    pub palette: Vec<Color>,
    pub layers: Vec<Layer>,
}

#[cfg(test)]
impl RenderSettings {
    pub(crate) fn test_default() -> Self {
        Self {
            max_width: 400.0,
            max_height: 400.0,
            padding: 50.0,
            outer_margin: 0.0,
            stop_radius: 5.0,
            line_width: 10.0,
            stop_label_font_size: 18,
            stop_label_offset: [7.0, -3.0],
            bus_label_font_size: 20,
            bus_label_offset: [7.0, 15.0],
            underlayer_color: Color::Named("white".into()),
            underlayer_width: 3.0,
            palette: vec![
                Color::Named("green".into()),
                Color::Rgb([255, 160, 0]),
                Color::Named("red".into()),
            ],
            layers: vec![
                Layer::BusLines,
                Layer::BusLabels,
                Layer::StopPoints,
                Layer::StopLabels,
            ],
        }
    }
}

/// Everything the renderer needs to know about one bus line.
#[derive(Debug, Clone)]
struct BusSketch {
    stops: Vec<Arc<str>>,
    endpoints: Vec<Arc<str>>,
    color: Color,
}

/// Draws the network as schematic SVG: the whole map once (cached after the
/// first render), and journey overlays on top of it per request.
#[derive(Debug)]
pub struct MapRenderer {
    settings: RenderSettings,
    projector: Projector,
    buses: BTreeMap<Arc<str>, BusSketch>,
    whole_map: OnceLock<Document>,
}

impl MapRenderer {
    pub fn new(
        stops: &BTreeMap<Arc<str>, Stop>,
        buses: &BTreeMap<Arc<str>, Bus>,
        settings: RenderSettings,
    ) -> Self {
        let projector = Projector::new(stops, buses, &settings);

        let mut palette = settings.palette.iter().cycle();
        let sketches = buses
            .values()
            .map(|bus| {
                let color = if bus.stops.is_empty() {
                    Color::default()
                } else {
                    palette.next().cloned().unwrap_or_default()
                };
                let sketch = BusSketch {
                    stops: bus.stops.clone(),
                    endpoints: bus.endpoints.clone(),
                    color,
                };
                (bus.name.clone(), sketch)
            })
            .collect();

        Self {
            settings,
            projector,
            buses: sketches,
            whole_map: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The full network map as an SVG string.
    pub fn render_map(&self) -> String {
        self.whole_map().render()
    }

    /// The full map dimmed by an underlayer sheet, with the journey's spans
    /// drawn on top. An empty journey highlights the departure stop alone.
    pub fn render_route(&self, from: &str, route: &Route) -> String {
        let mut doc = self.whole_map().clone();
        let margin = self.settings.outer_margin;
        doc.add(
            Rect::default()
                .corner(Point {
                    x: -margin,
                    y: -margin,
                })
                .size(
                    self.settings.max_width + 2.0 * margin,
                    self.settings.max_height + 2.0 * margin,
                )
                .fill(self.settings.underlayer_color.clone()),
        );

        for layer in &self.settings.layers {
            match layer {
                Layer::BusLines => self.draw_route_lines(&mut doc, route),
                Layer::BusLabels => self.draw_route_bus_labels(&mut doc, route),
                Layer::StopPoints => self.draw_route_stop_points(&mut doc, from, route),
                Layer::StopLabels => self.draw_route_stop_labels(&mut doc, from, route),
            }
        }
        doc.render()
    }

    fn whole_map(&self) -> &Document {
        self.whole_map.get_or_init(|| {
            let mut doc = Document::default();
            for layer in &self.settings.layers {
                match layer {
                    Layer::BusLines => self.draw_bus_lines(&mut doc),
                    Layer::BusLabels => self.draw_bus_labels(&mut doc),
                    Layer::StopPoints => self.draw_stop_points(&mut doc),
                    Layer::StopLabels => self.draw_stop_labels(&mut doc),
                }
            }
            debug!(
                buses = self.buses.len(),
                stops = self.projector.points().len(),
                "base map rendered"
            );
            doc
        })
    }

    fn draw_bus_lines(&self, doc: &mut Document) {
        for sketch in self.buses.values() {
            if sketch.stops.is_empty() {
                continue;
            }
            doc.add(self.line(&sketch.stops, &sketch.color));
        }
    }

    fn draw_bus_labels(&self, doc: &mut Document) {
        for (name, sketch) in &self.buses {
            for endpoint in &sketch.endpoints {
                self.add_bus_label(doc, name, &sketch.color, endpoint);
            }
        }
    }

    fn draw_stop_points(&self, doc: &mut Document) {
        for name in self.projector.points().keys() {
            self.add_stop_point(doc, name);
        }
    }

    fn draw_stop_labels(&self, doc: &mut Document) {
        for name in self.projector.points().keys() {
            self.add_stop_label(doc, name);
        }
    }

    fn draw_route_lines(&self, doc: &mut Document, route: &Route) {
        for item in &route.items {
            let RouteItem::Bus {
                bus,
                start_idx,
                finish_idx,
                ..
            } = item
            else {
                continue;
            };
            let sketch = &self.buses[bus];
            doc.add(self.line(&sketch.stops[*start_idx..=*finish_idx], &sketch.color));
        }
    }

    fn draw_route_bus_labels(&self, doc: &mut Document, route: &Route) {
        for item in &route.items {
            let RouteItem::Bus {
                bus,
                start_idx,
                finish_idx,
                ..
            } = item
            else {
                continue;
            };
            let sketch = &self.buses[bus];
            for idx in [*start_idx, *finish_idx] {
                let stop = &sketch.stops[idx];
                if sketch.endpoints.contains(stop) {
                    self.add_bus_label(doc, bus, &sketch.color, stop);
                }
            }
        }
    }

    fn draw_route_stop_points(&self, doc: &mut Document, from: &str, route: &Route) {
        if route.items.is_empty() {
            self.add_stop_point(doc, from);
            return;
        }
        for item in &route.items {
            let RouteItem::Bus {
                bus,
                start_idx,
                finish_idx,
                ..
            } = item
            else {
                continue;
            };
            let sketch = &self.buses[bus];
            for stop in &sketch.stops[*start_idx..=*finish_idx] {
                self.add_stop_point(doc, stop);
            }
        }
    }

    fn draw_route_stop_labels(&self, doc: &mut Document, from: &str, route: &Route) {
        for item in &route.items {
            if let RouteItem::Wait { stop, .. } = item {
                self.add_stop_label(doc, stop);
            }
        }
        // arrival stop of the last span, or the departure stop when the
        // journey never leaves it
        let last = route.items.iter().rev().find_map(|item| match item {
            RouteItem::Bus {
                bus, finish_idx, ..
            } => Some(&self.buses[bus].stops[*finish_idx]),
            RouteItem::Wait { .. } => None,
        });
        match last {
            Some(stop) => self.add_stop_label(doc, stop),
            None => self.add_stop_label(doc, from),
        }
    }

    fn line(&self, stops: &[Arc<str>], color: &Color) -> Polyline {
        let mut line = Polyline::default()
            .fill(Color::default())
            .stroke(color.clone())
            .stroke_width(self.settings.line_width)
            .round_caps();
        for stop in stops {
            line = line.point(self.projector.stop_point(stop));
        }
        line
    }

    fn add_bus_label(&self, doc: &mut Document, name: &Arc<str>, color: &Color, stop: &str) {
        let base = Text::default()
            .point(self.projector.stop_point(stop))
            .offset(Point {
                x: self.settings.bus_label_offset[0],
                y: self.settings.bus_label_offset[1],
            })
            .font_size(self.settings.bus_label_font_size)
            .font_family("Verdana")
            .font_weight("bold")
            .data(name.clone());
        doc.add(self.underlay(base.clone()));
        doc.add(base.fill(color.clone()));
    }

    fn add_stop_point(&self, doc: &mut Document, stop: &str) {
        doc.add(
            Circle::default()
                .center(self.projector.stop_point(stop))
                .radius(self.settings.stop_radius)
                .fill(Color::Named("white".into())),
        );
    }

    fn add_stop_label(&self, doc: &mut Document, stop: &str) {
        let (name, point) = self
            .projector
            .points()
            .get_key_value(stop)
            .expect("label for an unregistered stop");
        let base = Text::default()
            .point(*point)
            .offset(Point {
                x: self.settings.stop_label_offset[0],
                y: self.settings.stop_label_offset[1],
            })
            .font_size(self.settings.stop_label_font_size)
            .font_family("Verdana")
            .data(name.clone());
        doc.add(self.underlay(base.clone()));
        doc.add(base.fill(Color::Named("black".into())));
    }

    fn underlay(&self, text: Text) -> Text {
        text.fill(self.settings.underlayer_color.clone())
            .stroke(self.settings.underlayer_color.clone())
            .stroke_width(self.settings.underlayer_width)
            .round_caps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geo;
    use std::collections::HashMap;

    #[test]
    fn settings_parse_with_renamed_fields() {
        let settings: RenderSettings = serde_json::from_str(
            r#"{
                "width": 1200.0,
                "height": 500.0,
                "padding": 50.0,
                "outer_margin": 100.0,
                "stop_radius": 5.0,
                "line_width": 14.0,
                "stop_label_font_size": 18,
                "stop_label_offset": [7.0, -3.0],
                "bus_label_font_size": 20,
                "bus_label_offset": [7.0, 15.0],
                "underlayer_color": [255, 255, 255, 0.85],
                "underlayer_width": 3.0,
                "color_palette": ["green", [255, 160, 0], "red"],
                "layers": ["bus_lines", "bus_labels", "stop_points", "stop_labels"]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.max_width, 1200.0);
        assert_eq!(settings.max_height, 500.0);
        assert_eq!(settings.outer_margin, 100.0);
        assert_eq!(settings.palette.len(), 3);
        assert_eq!(settings.layers[2], Layer::StopPoints);
    }

    #[test]
    fn outer_margin_defaults_to_zero() {
        let settings: RenderSettings = serde_json::from_str(
            r#"{
                "width": 100.0, "height": 100.0, "padding": 10.0,
                "stop_radius": 3.0, "line_width": 2.0,
                "stop_label_font_size": 10, "stop_label_offset": [1.0, 1.0],
                "bus_label_font_size": 10, "bus_label_offset": [1.0, 1.0],
                "underlayer_color": "white", "underlayer_width": 1.0,
                "color_palette": ["red"], "layers": []
            }"#,
        )
        .unwrap();
        assert_eq!(settings.outer_margin, 0.0);
    }

    fn fixture() -> (BTreeMap<Arc<str>, Stop>, BTreeMap<Arc<str>, Bus>) {
        let stops: BTreeMap<Arc<str>, Stop> = [("a", 10.0, 20.0), ("b", 10.0, 20.5)]
            .into_iter()
            .map(|(name, latitude, longitude)| {
                (
                    Arc::from(name),
                    Stop {
                        name: name.into(),
                        position: geo::Point {
                            latitude,
                            longitude,
                        },
                        distances: HashMap::new(),
                    },
                )
            })
            .collect();
        let buses: BTreeMap<Arc<str>, Bus> = [(
            Arc::from("33"),
            Bus {
                name: "33".into(),
                stops: vec!["a".into(), "b".into(), "a".into()],
                endpoints: vec!["a".into(), "b".into()],
            },
        )]
        .into();
        (stops, buses)
    }

    #[test]
    fn layers_paint_in_configured_order() {
        let (stops, buses) = fixture();
        let renderer = MapRenderer::new(&stops, &buses, RenderSettings::test_default());
        let rendered = renderer.render_map();
        let line = rendered.find("<polyline").unwrap();
        let circle = rendered.find("<circle").unwrap();
        assert!(line < circle);
        // bus 33 gets the first palette color
        assert!(rendered.contains(r#"stroke="green""#));
        // two endpoints, label drawn at both, underlayer plus fill each
        assert_eq!(rendered.matches(">33</text>").count(), 4);
    }

    #[test]
    fn route_overlay_starts_with_the_underlayer_sheet() {
        let (stops, buses) = fixture();
        let mut settings = RenderSettings::test_default();
        settings.outer_margin = 100.0;
        let renderer = MapRenderer::new(&stops, &buses, settings);
        let route = Route {
            total_time: 0.0,
            items: Vec::new(),
        };
        let rendered = renderer.render_route("a", &route);
        assert!(rendered.contains(r#"<rect x="-100" y="-100" width="600" height="600""#));
        // the departure stop alone is highlighted
        assert!(rendered.contains(">a</text>"));
    }

    #[test]
    fn route_overlay_draws_only_travelled_spans() {
        let (stops, buses) = fixture();
        let renderer = MapRenderer::new(&stops, &buses, RenderSettings::test_default());
        let base = renderer.render_map();
        let route = Route {
            total_time: 7.0,
            items: vec![
                RouteItem::Wait {
                    stop: "a".into(),
                    time: 6.0,
                },
                RouteItem::Bus {
                    bus: "33".into(),
                    time: 1.0,
                    span_count: 1,
                    start_idx: 0,
                    finish_idx: 1,
                },
            ],
        };
        let rendered = renderer.render_route("a", &route);
        assert!(rendered.len() > base.len());
        // one extra polyline for the travelled span
        assert_eq!(
            rendered.matches("<polyline").count(),
            base.matches("<polyline").count() + 1
        );
    }
}
