use super::{Chart, DrawOutcome, label_body, polyline, star_radius};
use crate::colors::{Rgba, body_color};
use crate::ephemeris::{BodyId, BodyKind};
use crate::frame::DrawingContext;
use crate::geom::ScreenPoint;
use crate::picker::{PickBias, Picker};
use crate::projection::{EclipticBand, Projector, SphericalCoord, ViewMode, ViewState};

const DEFAULT_SPAN_DEG: f64 = 20.0;
const TICK_STEP_DEG: usize = 30;
const BODY_RADIUS_PX: f64 = 4.0;

/// The zodiac as an annulus: longitude runs around the ring, latitude across it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EclipticChart {
    band: EclipticBand,
}

impl Default for EclipticChart {
    fn default() -> Self {
        Self {
            band: EclipticBand {
                span_deg: DEFAULT_SPAN_DEG,
                rotation_deg: 0.0,
            },
        }
    }
}

impl EclipticChart {
    pub fn new(band: EclipticBand) -> Self {
        Self { band }
    }

    fn view(&self, ctx: &DrawingContext<'_>) -> ViewState {
        let band = match ctx.config.view {
            ViewMode::EclipticBand(band) => band,
            _ => self.band,
        };
        ViewState::for_frame(ctx.frame, ViewMode::EclipticBand(band))
    }

    fn draw_grid(ctx: &mut DrawingContext<'_>, view: &ViewState, half: f64) {
        let color = ctx.color(Rgba::GRID);
        let max_jump = ctx.frame.width().max(ctx.frame.height());
        for lat in [-half, 0.0, half] {
            let ring = (0..=360).map(|lon| SphericalCoord::ecliptic(lon as f64, lat).grid());
            polyline(ctx.surface, view, ring, color, max_jump);
        }
        let font = ctx.frame.fonts.small;
        let text_color = ctx.color(Rgba::LABEL);
        for lon in (0..360).step_by(TICK_STEP_DEG) {
            let lon = lon as f64;
            let inner = view.project(&SphericalCoord::ecliptic(lon, -half).grid());
            let outer = view.project(&SphericalCoord::ecliptic(lon, half).grid());
            if let (Some(a), Some(b)) = (inner, outer) {
                ctx.surface.stroke_line(a.point, b.point, color);
                ctx.surface
                    .fill_text(&format!("{lon:.0}\u{b0}"), b.point.offset(2.0, -2.0), &font, text_color);
            }
        }
    }

    fn plot(ctx: &mut DrawingContext<'_>, view: &ViewState, body: BodyId) -> Option<ScreenPoint> {
        let pos = ctx.ephemeris.position(body, ctx.frame.jd_et)?;
        let point = view
            .project(&SphericalCoord::equatorial(pos.ra_deg, pos.dec_deg))
            .map(|p| p.point);
        let priority = ctx.ephemeris.is_priority(body);
        let extra = if body.kind == BodyKind::Star { 0.0 } else { BODY_RADIUS_PX * ctx.frame.scale };
        ctx.acc
            .picker
            .qualify(body, point, PickBias::for_body(body.kind, priority), extra);
        point
    }
}

impl Chart for EclipticChart {
    fn name(&self) -> &'static str {
        "ecliptic"
    }

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
        let view = self.view(ctx);
        let half = match view.mode {
            ViewMode::EclipticBand(band) => band.span_deg / 2.0,
            _ => DEFAULT_SPAN_DEG / 2.0,
        };
        Self::draw_grid(ctx, &view, half);

        let jd = ctx.frame.jd_et;
        let star_color = ctx.color(body_color(BodyKind::Star));
        let small = ctx.frame.fonts.small;
        for index in 0..ctx.ephemeris.count(BodyKind::Star) {
            let body = BodyId::new(BodyKind::Star, index);
            let magnitude = ctx.ephemeris.magnitude(body, jd).unwrap_or(6.0);
            if magnitude > ctx.config.star_magnitude_limit {
                continue;
            }
            if let Some(point) = Self::plot(ctx, &view, body) {
                let radius = star_radius(magnitude, ctx.frame.scale, ctx.config.brighten_stars);
                ctx.surface.fill_circle(point, radius, star_color);
                label_body(ctx, body, point, radius, Rgba::LABEL, small);
            }
        }

        let mut kinds = Vec::with_capacity(2);
        if ctx.config.bodies.planets {
            kinds.push(BodyKind::Planet);
        }
        if ctx.config.bodies.moon {
            kinds.push(BodyKind::Moon);
        }
        let radius = BODY_RADIUS_PX * ctx.frame.scale;
        let medium = ctx.frame.fonts.medium;
        for kind in kinds {
            let color = ctx.color(body_color(kind));
            for index in 0..ctx.ephemeris.count(kind) {
                let body = BodyId::new(kind, index);
                if let Some(point) = Self::plot(ctx, &view, body) {
                    ctx.surface.fill_circle(point, radius, color);
                    label_body(ctx, body, point, radius, Rgba::LABEL, medium);
                }
            }
        }
        DrawOutcome::default()
    }
}
