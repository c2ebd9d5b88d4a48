use tracing::debug;

use super::{Chart, DrawOutcome};
use crate::astro;
use crate::colors::Rgba;
use crate::ephemeris::{BodyId, BodyKind};
use crate::flood_fill::{FillStats, ShadowPainter, ShadowThresholds};
use crate::frame::DrawingContext;
use crate::geom::{Rect, ScreenPoint};
use crate::labels::{LabelCategory, LabelClass, LabelRequest, LabelSink};
use crate::picker::{PickBias, Picker};
use crate::surface::Raster;
use crate::timers::Clock;

const OCEAN: Rgba = Rgba::rgb(18, 40, 70);
const GRATICULE_STEP_DEG: i32 = 30;
const MARKER_RADIUS_PX: f64 = 5.0;

/// Default magnitude bars: faint penumbra starts showing at 0.05 and the
/// fill keeps expanding through cells at 0.2 and above.
pub const DEFAULT_THRESHOLDS: ShadowThresholds = ShadowThresholds {
    visible: 0.05,
    search: 0.2,
};

/// Supplies eclipse geometry. Like the ephemeris, the engine never computes
/// it; a host plugs in a real model.
pub trait EclipseModel {
    /// Obscured fraction of the Sun seen from a ground point, 0 to 1.
    fn magnitude(&self, longitude_deg: f64, latitude_deg: f64, jd_et: f64) -> f64;

    /// Ground point of greatest eclipse, or `None` when the shadow misses.
    fn center(&self, jd_et: f64) -> Option<(f64, f64)>;
}

/// Synthetic shadow: a Gaussian bump drifting east at a fixed rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianShadow {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub radius_deg: f64,
    pub peak: f64,
    pub drift_deg_per_day: f64,
    pub epoch_jd: f64,
}

impl Default for GaussianShadow {
    fn default() -> Self {
        Self {
            longitude_deg: -40.0,
            latitude_deg: 25.0,
            radius_deg: 18.0,
            peak: 1.0,
            drift_deg_per_day: 0.0,
            epoch_jd: 2_451_545.0,
        }
    }
}

impl GaussianShadow {
    fn center_at(&self, jd_et: f64) -> (f64, f64) {
        let lon = self.longitude_deg + self.drift_deg_per_day * (jd_et - self.epoch_jd);
        (astro::normalize_signed_deg(lon), self.latitude_deg)
    }
}

impl EclipseModel for GaussianShadow {
    fn magnitude(&self, longitude_deg: f64, latitude_deg: f64, jd_et: f64) -> f64 {
        let (lon, lat) = self.center_at(jd_et);
        let d = astro::angular_separation_deg(lon, lat, longitude_deg, latitude_deg) / self.radius_deg;
        self.peak * (-d * d).exp()
    }

    fn center(&self, jd_et: f64) -> Option<(f64, f64)> {
        (self.peak > 0.0 && self.radius_deg > 0.0).then(|| self.center_at(jd_et))
    }
}

/// Where the equirectangular map sits on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
struct MapArea {
    rect: Rect,
}

impl MapArea {
    fn fit(width: f64, height: f64) -> Self {
        let w = width.min(height * 2.0).floor();
        let h = (w / 2.0).floor();
        Self {
            rect: Rect::new(((width - w) / 2.0).floor(), ((height - h) / 2.0).floor(), w, h),
        }
    }

    fn to_screen(&self, lon: f64, lat: f64) -> ScreenPoint {
        ScreenPoint::new(
            self.rect.x + (astro::normalize_signed_deg(lon) + 180.0) / 360.0 * self.rect.w,
            self.rect.y + (90.0 - lat) / 180.0 * self.rect.h,
        )
    }

    /// Geographic coordinates of a cell centre.
    fn cell_geo(&self, x: u32, y: u32) -> (f64, f64) {
        (
            -180.0 + (x as f64 + 0.5) * 360.0 / self.rect.w,
            90.0 - (y as f64 + 0.5) * 180.0 / self.rect.h,
        )
    }

    fn cell(&self, lon: f64, lat: f64) -> (u32, u32) {
        let p = self.to_screen(lon, lat);
        let x = ((p.x - self.rect.x).floor().max(0.0) as u32).min(self.rect.w as u32 - 1);
        let y = ((p.y - self.rect.y).floor().max(0.0) as u32).min(self.rect.h as u32 - 1);
        (x, y)
    }
}

/// A shadow fill for one instant and map size, possibly still expanding.
#[derive(Clone, Debug)]
struct ShadowFill {
    jd_et: f64,
    width: u32,
    height: u32,
    painter: ShadowPainter,
}

/// World map with the Moon's shadow flood-filled from the point of greatest
/// eclipse. A large fill spreads over several passes, each bounded by the
/// progressive time budget.
pub struct EclipseMapChart {
    model: Box<dyn EclipseModel>,
    thresholds: ShadowThresholds,
    fill: Option<ShadowFill>,
    fills: usize,
}

impl EclipseMapChart {
    pub fn new(model: Box<dyn EclipseModel>) -> Self {
        Self {
            model,
            thresholds: DEFAULT_THRESHOLDS,
            fill: None,
            fills: 0,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ShadowThresholds) -> Self {
        self.thresholds = thresholds;
        self.fill = None;
        self
    }

    /// Fills started so far; a finished overlay is reused across passes.
    pub fn fill_count(&self) -> usize {
        self.fills
    }

    pub fn last_stats(&self) -> Option<FillStats> {
        self.fill.as_ref().map(|f| f.painter.stats())
    }

    pub fn overlay(&self) -> Option<&Raster> {
        self.fill.as_ref().map(|f| f.painter.overlay())
    }

    /// Starts a new fill when the instant or map size changed, then expands
    /// it until `budget_ms` has elapsed. `None` when the shadow misses Earth.
    fn advance_shadow(
        &mut self,
        area: &MapArea,
        jd_et: f64,
        clock: &dyn Clock,
        budget_ms: f64,
    ) -> Option<&ShadowPainter> {
        let (width, height) = (area.rect.w as u32, area.rect.h as u32);
        let model = &self.model;
        let mut magnitude = |x: u32, y: u32| {
            let (lon, lat) = area.cell_geo(x, y);
            model.magnitude(lon, lat, jd_et)
        };
        let current = self
            .fill
            .as_ref()
            .is_some_and(|f| f.jd_et == jd_et && f.width == width && f.height == height);
        if !current {
            self.fill = None;
            let (lon, lat) = model.center(jd_et)?;
            let (x, y) = area.cell(lon, lat);
            let mut painter = ShadowPainter::new(width, height, self.thresholds, Rgba::UMBRA);
            painter.seed(x, y, &mut magnitude);
            self.fills += 1;
            self.fill = Some(ShadowFill {
                jd_et,
                width,
                height,
                painter,
            });
        }
        let fill = self.fill.as_mut()?;
        if !fill.painter.stats().complete {
            let start = clock.now_ms();
            let stats = fill
                .painter
                .run_until(&mut magnitude, || clock.now_ms() - start >= budget_ms);
            if stats.complete {
                debug!(evaluated = stats.evaluated, painted = stats.painted(), "shadow fill");
            }
        }
        self.fill.as_ref().map(|f| &f.painter)
    }

    fn draw_graticule(ctx: &mut DrawingContext<'_>, area: &MapArea) {
        let color = ctx.color(Rgba::GRID);
        for lon in (-180..=180).step_by(GRATICULE_STEP_DEG as usize) {
            let lon = lon as f64;
            ctx.surface
                .stroke_line(area.to_screen(lon, 90.0), area.to_screen(lon, -90.0), color);
        }
        for lat in (-90..=90).step_by(GRATICULE_STEP_DEG as usize) {
            let lat = lat as f64;
            let y = area.to_screen(0.0, lat).y;
            ctx.surface.stroke_line(
                ScreenPoint::new(area.rect.x, y),
                ScreenPoint::new(area.rect.right(), y),
                color,
            );
        }
    }
}

impl Chart for EclipseMapChart {
    fn name(&self) -> &'static str {
        "eclipse_map"
    }

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
        let area = MapArea::fit(ctx.frame.width(), ctx.frame.height());
        if area.rect.w < 2.0 || area.rect.h < 1.0 {
            return DrawOutcome::default();
        }
        let ocean = ctx.color(OCEAN);
        ctx.surface.fill_rect(area.rect, ocean);
        Self::draw_graticule(ctx, &area);

        let jd = ctx.frame.jd_et;
        let center = self.model.center(jd);
        let mut continuation = false;
        if let Some(painter) = self.advance_shadow(&area, jd, ctx.clock, ctx.config.progressive_budget_ms) {
            continuation = !painter.stats().complete;
            ctx.surface
                .blit(painter.overlay(), area.rect.x as i32, area.rect.y as i32);
        }
        if let Some((lon, lat)) = center {
            let point = area.to_screen(lon, lat);
            let body = BodyId::new(BodyKind::MoonShadow, 0);
            ctx.acc.picker.qualify(body, Some(point), PickBias::Neutral, 0.0);
            ctx.acc.labels.add_label(LabelRequest {
                body,
                text: "Greatest eclipse".to_string(),
                anchor: point,
                symbol_radius: 2.0 * ctx.frame.scale,
                category: LabelCategory::Moon,
                class: LabelClass::Body,
                color: Rgba::LABEL,
                font: ctx.frame.fonts.small,
            });
        }

        let observer = area.to_screen(ctx.frame.observer.longitude_deg, ctx.frame.observer.latitude_deg);
        let marker = ctx.color(Rgba::SELECTION);
        let r = MARKER_RADIUS_PX * ctx.frame.scale;
        ctx.surface.stroke_circle(observer, r, marker);
        ctx.surface
            .stroke_line(observer.offset(-r * 1.6, 0.0), observer.offset(r * 1.6, 0.0), marker);
        ctx.surface
            .stroke_line(observer.offset(0.0, -r * 1.6), observer.offset(0.0, r * 1.6), marker);
        DrawOutcome {
            continuation,
            ..DrawOutcome::default()
        }
    }

    fn background(&self) -> Rgba {
        Rgba::BLACK
    }
}
