use std::{fmt, fmt::Write, sync::Arc};

use serde::{Deserialize, Serialize};

/// Canvas coordinate, y grows downward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Matches the palette JSON: a color name, `[r, g, b]` or `[r, g, b, a]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(Arc<str>),
    Rgb([u8; 3]),
    Rgba(u8, u8, u8, f64),
}

impl Default for Color {
    fn default() -> Self {
        Self::Named("none".into())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Rgb([r, g, b]) => write!(f, "rgb({r},{g},{b})"),
            Self::Rgba(r, g, b, a) => write!(f, "rgba({r},{g},{b},{a})"),
        }
    }
}

/// Presentation attributes shared by every shape.
#[derive(Debug, Default, Clone)]
struct PathProps {
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: Option<f64>,
    line_cap: Option<&'static str>,
    line_join: Option<&'static str>,
}

impl PathProps {
    fn render(&self, out: &mut String) {
        if let Some(fill) = &self.fill {
            let _ = write!(out, r#" fill="{fill}""#);
        }
        if let Some(stroke) = &self.stroke {
            let _ = write!(out, r#" stroke="{stroke}""#);
        }
        if let Some(width) = self.stroke_width {
            let _ = write!(out, r#" stroke-width="{width}""#);
        }
        if let Some(cap) = self.line_cap {
            let _ = write!(out, r#" stroke-linecap="{cap}""#);
        }
        if let Some(join) = self.line_join {
            let _ = write!(out, r#" stroke-linejoin="{join}""#);
        }
    }
}

macro_rules! props_setters {
    () => {
        pub fn fill(mut self, color: Color) -> Self {
            self.props.fill = Some(color);
            self
        }

        pub fn stroke(mut self, color: Color) -> Self {
            self.props.stroke = Some(color);
            self
        }

        pub fn stroke_width(mut self, width: f64) -> Self {
            self.props.stroke_width = Some(width);
            self
        }

        pub fn round_caps(mut self) -> Self {
            self.props.line_cap = Some("round");
            self.props.line_join = Some("round");
            self
        }
    };
}

#[derive(Debug, Default, Clone)]
pub struct Polyline {
    points: Vec<Point>,
    props: PathProps,
}

impl Polyline {
    props_setters!();

    pub fn point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }

    fn render(&self, out: &mut String) {
        out.push_str("<polyline points=\"");
        for point in &self.points {
            let _ = write!(out, "{},{} ", point.x, point.y);
        }
        out.push('"');
        self.props.render(out);
        out.push_str("/>");
    }
}

#[derive(Debug, Default, Clone)]
pub struct Circle {
    center: Point,
    radius: f64,
    props: PathProps,
}

impl Circle {
    props_setters!();

    pub fn center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    fn render(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"<circle cx="{}" cy="{}" r="{}""#,
            self.center.x, self.center.y, self.radius
        );
        self.props.render(out);
        out.push_str("/>");
    }
}

#[derive(Debug, Default, Clone)]
pub struct Rect {
    corner: Point,
    width: f64,
    height: f64,
    props: PathProps,
}

impl Rect {
    props_setters!();

    pub fn corner(mut self, corner: Point) -> Self {
        self.corner = corner;
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn render(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}""#,
            self.corner.x, self.corner.y, self.width, self.height
        );
        self.props.render(out);
        out.push_str("/>");
    }
}

#[derive(Debug, Default, Clone)]
pub struct Text {
    point: Point,
    offset: Point,
    font_size: u32,
    font_family: Option<&'static str>,
    font_weight: Option<&'static str>,
    data: Arc<str>,
    props: PathProps,
}

impl Text {
    props_setters!();

    pub fn point(mut self, point: Point) -> Self {
        self.point = point;
        self
    }

    pub fn offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    pub fn font_family(mut self, family: &'static str) -> Self {
        self.font_family = Some(family);
        self
    }

    pub fn font_weight(mut self, weight: &'static str) -> Self {
        self.font_weight = Some(weight);
        self
    }

    pub fn data(mut self, data: Arc<str>) -> Self {
        self.data = data;
        self
    }

    fn render(&self, out: &mut String) {
        let _ = write!(
            out,
            r#"<text x="{}" y="{}" dx="{}" dy="{}" font-size="{}""#,
            self.point.x, self.point.y, self.offset.x, self.offset.y, self.font_size
        );
        if let Some(family) = self.font_family {
            let _ = write!(out, r#" font-family="{family}""#);
        }
        if let Some(weight) = self.font_weight {
            let _ = write!(out, r#" font-weight="{weight}""#);
        }
        self.props.render(out);
        out.push('>');
        escape_into(&self.data, out);
        out.push_str("</text>");
    }
}

fn escape_into(data: &str, out: &mut String) {
    for ch in data.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Polyline(Polyline),
    Circle(Circle),
    Rect(Rect),
    Text(Text),
}

impl From<Polyline> for Shape {
    fn from(shape: Polyline) -> Self {
        Self::Polyline(shape)
    }
}

impl From<Circle> for Shape {
    fn from(shape: Circle) -> Self {
        Self::Circle(shape)
    }
}

impl From<Rect> for Shape {
    fn from(shape: Rect) -> Self {
        Self::Rect(shape)
    }
}

impl From<Text> for Shape {
    fn from(shape: Text) -> Self {
        Self::Text(shape)
    }
}

/// An SVG document built shape by shape, rendered to a string on demand.
#[derive(Debug, Default, Clone)]
pub struct Document {
    shapes: Vec<Shape>,
}

impl Document {
    pub fn add(&mut self, shape: impl Into<Shape>) {
        self.shapes.push(shape.into());
    }

    pub fn render(&self) -> String {
        let mut out = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" ?><svg xmlns="http://www.w3.org/2000/svg" version="1.1">"#,
        );
        for shape in &self.shapes {
            match shape {
                Shape::Polyline(polyline) => polyline.render(&mut out),
                Shape::Circle(circle) => circle.render(&mut out),
                Shape::Rect(rect) => rect.render(&mut out),
                Shape::Text(text) => text.render(&mut out),
            }
        }
        out.push_str("</svg>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_display() {
        assert_eq!(Color::default().to_string(), "none");
        assert_eq!(Color::Named("purple".into()).to_string(), "purple");
        assert_eq!(Color::Rgb([255, 160, 0]).to_string(), "rgb(255,160,0)");
        assert_eq!(
            Color::Rgba(255, 160, 0, 0.85).to_string(),
            "rgba(255,160,0,0.85)"
        );
    }

    #[test]
    fn color_from_palette_json() {
        let palette: Vec<Color> =
            serde_json::from_str(r#"["green", [255, 160, 0], [255, 160, 0, 0.85]]"#).unwrap();
        assert_eq!(palette[0], Color::Named("green".into()));
        assert_eq!(palette[1], Color::Rgb([255, 160, 0]));
        assert_eq!(palette[2], Color::Rgba(255, 160, 0, 0.85));
    }

    #[test]
    fn document_renders_shapes_in_order() {
        let mut doc = Document::default();
        doc.add(
            Circle::default()
                .center(Point { x: 5.0, y: 10.0 })
                .radius(2.0)
                .fill(Color::Named("white".into())),
        );
        doc.add(
            Polyline::default()
                .point(Point { x: 0.0, y: 0.0 })
                .point(Point { x: 1.0, y: 1.0 })
                .stroke(Color::Rgb([1, 2, 3]))
                .stroke_width(1.5)
                .round_caps(),
        );
        let rendered = doc.render();
        let circle = rendered.find("<circle").unwrap();
        let line = rendered.find("<polyline").unwrap();
        assert!(circle < line);
        assert!(rendered.contains(r#"fill="white""#));
        assert!(rendered.contains(r#"stroke="rgb(1,2,3)""#));
        assert!(rendered.contains(r#"stroke-linecap="round""#));
        assert!(rendered.ends_with("</svg>"));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = Document::default();
        doc.add(Text::default().data("a < b & c".into()));
        assert!(doc.render().contains(">a &lt; b &amp; c</text>"));
    }
}
