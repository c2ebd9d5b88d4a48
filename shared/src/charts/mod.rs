//! Concrete charts. Each one assembles the projection, labels, picker and
//! compositor pieces it needs; the governor only sees the [`Chart`] trait.

pub mod eclipse_map;
pub mod ecliptic;
pub mod insolation;
pub mod orbit;
pub mod sky;

use serde::{Deserialize, Serialize};

use crate::colors::Rgba;
use crate::ephemeris::BodyId;
use crate::frame::{DrawingContext, FontMetrics};
use crate::geom::ScreenPoint;
use crate::labels::{LabelCategory, LabelClass, LabelRequest, LabelSink};
use crate::marquee::CursorStyle;
use crate::projection::{Projector, SphericalCoord, ViewState};
use crate::surface::Surface;

pub use eclipse_map::{EclipseMapChart, EclipseModel, GaussianShadow};
pub use ecliptic::EclipticChart;
pub use insolation::InsolationChart;
pub use orbit::OrbitChart;
pub use sky::SkyChart;

/// What a chart reports back after drawing one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawOutcome {
    /// More incremental work is pending; the governor schedules a continuation.
    pub continuation: bool,
    /// Compositor items at or beyond this depth are dropped.
    pub max_depth: f64,
}

impl Default for DrawOutcome {
    fn default() -> Self {
        Self {
            continuation: false,
            max_depth: f64::INFINITY,
        }
    }
}

pub trait Chart {
    fn name(&self) -> &'static str;

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome;

    fn background(&self) -> Rgba {
        Rgba::NIGHT_SKY
    }

    fn cursor(&self, hovering: bool) -> CursorStyle {
        if hovering {
            CursorStyle::Crosshair
        } else {
            CursorStyle::Default
        }
    }
}

/// Symbol radius in device px for a point source of the given magnitude.
fn star_radius(magnitude: f64, scale: f64, brighten: bool) -> f64 {
    let boost = if brighten { 1.35 } else { 1.0 };
    ((6.5 - magnitude).clamp(0.0, 8.0) * 0.45 * boost).max(0.6) * scale
}

/// Strokes through consecutive visible points. Hidden points and jumps
/// longer than `max_jump` (wraparound) break the line.
fn polyline<I>(surface: &mut dyn Surface, view: &ViewState, coords: I, color: Rgba, max_jump: f64)
where
    I: IntoIterator<Item = SphericalCoord>,
{
    let mut previous: Option<ScreenPoint> = None;
    for coord in coords {
        let point = view.project(&coord).map(|p| p.point);
        if let (Some(a), Some(b)) = (previous, point)
            && a.distance_to(b) <= max_jump
        {
            surface.stroke_line(a, b, color);
        }
        previous = point;
    }
}

/// Queues a body-class label named after the body.
fn label_body(ctx: &mut DrawingContext<'_>, body: BodyId, anchor: ScreenPoint, symbol_radius: f64, color: Rgba, font: FontMetrics) {
    let Some(name) = ctx.ephemeris.name(body) else {
        return;
    };
    let is_sun = ctx.ephemeris.sun() == Some(body);
    ctx.acc.labels.add_label(LabelRequest {
        body,
        text: name.to_string(),
        anchor,
        symbol_radius,
        category: LabelCategory::for_body(body.kind, is_sun),
        class: LabelClass::Body,
        color,
        font,
    });
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Sky,
    Ecliptic,
    Orbit,
    EclipseMap,
    Insolation,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Sky,
        ChartKind::Ecliptic,
        ChartKind::Orbit,
        ChartKind::EclipseMap,
        ChartKind::Insolation,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sky" => Some(ChartKind::Sky),
            "ecliptic" => Some(ChartKind::Ecliptic),
            "orbit" => Some(ChartKind::Orbit),
            "eclipse" | "eclipse_map" | "map" => Some(ChartKind::EclipseMap),
            "insolation" => Some(ChartKind::Insolation),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Sky => "Sky",
            ChartKind::Ecliptic => "Ecliptic",
            ChartKind::Orbit => "Orbits",
            ChartKind::EclipseMap => "Eclipse map",
            ChartKind::Insolation => "Insolation",
        }
    }

    /// Default chart instance for this kind.
    pub fn build(self) -> Box<dyn Chart> {
        match self {
            ChartKind::Sky => Box::new(SkyChart::default()),
            ChartKind::Ecliptic => Box::new(EclipticChart::default()),
            ChartKind::Orbit => Box::new(OrbitChart::default()),
            ChartKind::EclipseMap => Box::new(EclipseMapChart::new(Box::new(GaussianShadow::default()))),
            ChartKind::Insolation => Box::new(InsolationChart::default()),
        }
    }
}
