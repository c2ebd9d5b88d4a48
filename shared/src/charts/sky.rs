use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::{Chart, DrawOutcome, label_body, polyline, star_radius};
use crate::colors::{Rgba, body_color};
use crate::ephemeris::{BodyId, BodyKind};
use crate::frame::DrawingContext;
use crate::geom::ScreenPoint;
use crate::labels::{LabelCategory, LabelClass, LabelRequest, LabelSink};
use crate::picker::{PickBias, Picker};
use crate::projection::{Projector, SphericalCoord, ViewMode, ViewState};
use crate::surface::Raster;

/// Stars at least this bright are labelled.
const LABEL_MAGNITUDE: f64 = 1.5;
const PLANET_RADIUS_PX: f64 = 3.5;
const MOON_RADIUS_PX: f64 = 6.0;
const SUN_RADIUS_PX: f64 = 7.0;
const DEEP_SKY_RADIUS_PX: f64 = 3.0;
const GRID_STEP_DEG: f64 = 3.0;

/// Sky seen from the observer: horizon, full-sky, zenith or tracking views.
#[derive(Debug, Default)]
pub struct SkyChart {
    textures: HashMap<BodyId, Raster>,
    missing_texture: HashSet<BodyId>,
}

impl SkyChart {
    pub fn with_texture(mut self, body: BodyId, texture: Raster) -> Self {
        self.textures.insert(body, texture);
        self
    }

    fn view(ctx: &DrawingContext<'_>) -> ViewState {
        let mode = match ctx.config.view {
            // Sky views only; the band and orbit modes belong to their own charts.
            ViewMode::EclipticBand(_) | ViewMode::Orbit(_) => ViewMode::default(),
            mode => mode,
        };
        ViewState::for_frame(ctx.frame, mode)
    }

    fn draw_grid(ctx: &mut DrawingContext<'_>, view: &ViewState) {
        let max_jump = ctx.frame.width().max(ctx.frame.height()) / 2.0;
        let steps = (360.0 / GRID_STEP_DEG) as usize;
        for alt in [0.0, 30.0, 60.0] {
            let color = ctx.color(if alt == 0.0 { Rgba::HORIZON } else { Rgba::GRID });
            let ring = (0..=steps).map(|i| SphericalCoord::horizontal(i as f64 * GRID_STEP_DEG, alt).grid());
            polyline(ctx.surface, view, ring, color, max_jump);
        }
        let color = ctx.color(Rgba::GRID);
        for az in (0..360).step_by(45) {
            let meridian = (0..=30).map(|i| SphericalCoord::horizontal(az as f64, i as f64 * GRID_STEP_DEG).grid());
            polyline(ctx.surface, view, meridian, color, max_jump);
        }
    }

    fn star_point(ctx: &DrawingContext<'_>, view: &ViewState, index: usize) -> Option<ScreenPoint> {
        let pos = ctx.ephemeris.position(BodyId::new(BodyKind::Star, index), ctx.frame.jd_et)?;
        view.project(&SphericalCoord::equatorial(pos.ra_deg, pos.dec_deg))
            .map(|p| p.point)
    }

    fn draw_constellations(ctx: &mut DrawingContext<'_>, view: &ViewState) {
        let color = ctx.color(body_color(BodyKind::Constellation));
        for index in 0..ctx.ephemeris.count(BodyKind::Constellation) {
            for &(a, b) in ctx.ephemeris.constellation_lines(index) {
                if let (Some(pa), Some(pb)) = (Self::star_point(ctx, view, a), Self::star_point(ctx, view, b)) {
                    ctx.surface.stroke_line(pa, pb, color);
                }
            }
            let body = BodyId::new(BodyKind::Constellation, index);
            let Some(pos) = ctx.ephemeris.position(body, ctx.frame.jd_et) else {
                continue;
            };
            let Some(anchor) = view.project(&SphericalCoord::equatorial(pos.ra_deg, pos.dec_deg)) else {
                continue;
            };
            if let Some(name) = ctx.ephemeris.name(body) {
                ctx.acc.labels.add_label(LabelRequest {
                    body,
                    text: name.to_uppercase(),
                    anchor: anchor.point,
                    symbol_radius: 0.0,
                    category: LabelCategory::Other,
                    class: LabelClass::Constellation,
                    color: body_color(BodyKind::Constellation),
                    font: ctx.frame.fonts.medium,
                });
            }
        }
    }

    fn draw_stars(ctx: &mut DrawingContext<'_>, view: &ViewState) {
        let jd = ctx.frame.jd_et;
        let mut limit = ctx.config.star_magnitude_limit;
        if ctx.is_quick() {
            limit = limit.min(ctx.config.quick_magnitude_limit);
        }
        let mut base = body_color(BodyKind::Star);
        if ctx.config.brighten_stars {
            base = base.brighten(1.2);
        }
        let color = ctx.color(base);
        let font = ctx.frame.fonts.small;
        for index in 0..ctx.ephemeris.count(BodyKind::Star) {
            let body = BodyId::new(BodyKind::Star, index);
            let magnitude = ctx.ephemeris.magnitude(body, jd).unwrap_or(limit);
            if magnitude > limit {
                continue;
            }
            let point = Self::star_point(ctx, view, index);
            ctx.acc.picker.qualify(body, point, PickBias::Penalty, 0.0);
            let Some(point) = point else {
                continue;
            };
            let radius = star_radius(magnitude, ctx.frame.scale, ctx.config.brighten_stars);
            ctx.surface.fill_circle(point, radius, color);
            if magnitude <= LABEL_MAGNITUDE {
                label_body(ctx, body, point, radius, Rgba::LABEL, font);
            }
        }
    }

    fn draw_deep_sky(ctx: &mut DrawingContext<'_>, view: &ViewState) {
        let color = ctx.color(body_color(BodyKind::DeepSky));
        let radius = DEEP_SKY_RADIUS_PX * ctx.frame.scale;
        let font = ctx.frame.fonts.small;
        for index in 0..ctx.ephemeris.count(BodyKind::DeepSky) {
            let body = BodyId::new(BodyKind::DeepSky, index);
            let Some(pos) = ctx.ephemeris.position(body, ctx.frame.jd_et) else {
                continue;
            };
            let point = view
                .project(&SphericalCoord::equatorial(pos.ra_deg, pos.dec_deg))
                .map(|p| p.point);
            let priority = ctx.ephemeris.is_priority(body);
            ctx.acc
                .picker
                .qualify(body, point, PickBias::for_body(BodyKind::DeepSky, priority), 0.0);
            let Some(point) = point else {
                continue;
            };
            ctx.surface.stroke_circle(point, radius, color);
            if priority {
                label_body(ctx, body, point, radius, body_color(BodyKind::DeepSky), font);
            }
        }
    }

    /// Apparent disc radius in the tracking close-up, where discs have real size.
    fn apparent_radius(view: &ViewState, diameter_arcsec: Option<f64>) -> Option<f64> {
        let ViewMode::Tracking(tracking) = view.mode else {
            return None;
        };
        let px_per_deg = view.width.min(view.height) / tracking.field_deg;
        diameter_arcsec.map(|d| d / 3600.0 / 2.0 * px_per_deg)
    }

    fn draw_disc(&mut self, ctx: &mut DrawingContext<'_>, body: BodyId, point: ScreenPoint, radius: f64) {
        if let Some(texture) = self.textures.get(&body) {
            let x = (point.x - texture.width() as f64 / 2.0).round() as i32;
            let y = (point.y - texture.height() as f64 / 2.0).round() as i32;
            ctx.surface.blit(texture, x, y);
            return;
        }
        if self.missing_texture.insert(body) {
            warn!(
                body = ctx.ephemeris.name(body).unwrap_or("?"),
                "no texture loaded, drawing flat disc"
            );
        }
        let color = ctx.color(body_color(body.kind));
        ctx.surface.fill_circle(point, radius, color);
    }

    fn draw_solar_system(&mut self, ctx: &mut DrawingContext<'_>, view: &ViewState) {
        let jd = ctx.frame.jd_et;
        let sun = ctx.ephemeris.sun();
        let font = ctx.frame.fonts.medium;
        let mut kinds = Vec::with_capacity(2);
        if ctx.config.bodies.planets {
            kinds.push(BodyKind::Planet);
        }
        if ctx.config.bodies.moon {
            kinds.push(BodyKind::Moon);
        }
        for kind in kinds {
            for index in 0..ctx.ephemeris.count(kind) {
                let body = BodyId::new(kind, index);
                let Some(pos) = ctx.ephemeris.position(body, jd) else {
                    continue;
                };
                let projected = view.project(&SphericalCoord::equatorial(pos.ra_deg, pos.dec_deg));
                let base = match kind {
                    _ if sun == Some(body) => SUN_RADIUS_PX,
                    BodyKind::Moon => MOON_RADIUS_PX,
                    _ => PLANET_RADIUS_PX,
                } * ctx.frame.scale;
                let radius = Self::apparent_radius(view, ctx.ephemeris.angular_diameter_arcsec(body, jd))
                    .map_or(base, |r| r.max(base));
                let point = projected.map(|p| p.point);
                ctx.acc
                    .picker
                    .qualify(body, point, PickBias::for_body(kind, false), radius);
                let Some(point) = point else {
                    continue;
                };
                self.draw_disc(ctx, body, point, radius);
                label_body(ctx, body, point, radius, Rgba::LABEL, font);
            }
        }
    }
}

impl Chart for SkyChart {
    fn name(&self) -> &'static str {
        "sky"
    }

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
        let view = Self::view(ctx);
        Self::draw_grid(ctx, &view);
        if ctx.config.show_constellations {
            Self::draw_constellations(ctx, &view);
        }
        Self::draw_stars(ctx, &view);
        if ctx.config.bodies.deep_sky {
            Self::draw_deep_sky(ctx, &view);
        }
        self.draw_solar_system(ctx, &view);
        DrawOutcome::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::ephemeris::{CatalogEphemeris, Ephemeris};
    use crate::projection::Tracking;
    use crate::testing::{DrawOp, ManualTimers, draw_chart, test_frame};

    fn kinds(pass: &crate::testing::ChartPass) -> Vec<BodyKind> {
        pass.acc.picker.candidates().iter().map(|c| c.body.kind).collect()
    }

    fn tracking_on(eph: &CatalogEphemeris, name: &str) -> RenderConfig {
        let body = eph.find(name).expect("in sample");
        let pos = eph.position(body, 2_460_000.0).expect("has position");
        RenderConfig {
            view: ViewMode::Tracking(Tracking {
                center_ra_deg: pos.ra_deg,
                center_dec_deg: pos.dec_deg,
                field_deg: 10.0,
                parallactic: false,
            }),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn quick_pass_drops_faint_stars() {
        let eph = CatalogEphemeris::sample();
        let clock = ManualTimers::default();
        let config = RenderConfig {
            quick_magnitude_limit: -10.0,
            ..RenderConfig::default()
        };
        let full = draw_chart(&mut SkyChart::default(), &eph, &config, test_frame(400, 400, true, None), &clock);
        let quick = draw_chart(&mut SkyChart::default(), &eph, &config, test_frame(400, 400, false, None), &clock);
        assert!(kinds(&full).contains(&BodyKind::Star), "Polaris is always up from New York");
        assert!(!kinds(&quick).contains(&BodyKind::Star));
    }

    #[test]
    fn planet_without_texture_gets_flat_disc() {
        let eph = CatalogEphemeris::sample();
        let clock = ManualTimers::default();
        let config = tracking_on(&eph, "Jupiter");
        let pass = draw_chart(&mut SkyChart::default(), &eph, &config, test_frame(200, 200, true, None), &clock);
        let disc = pass.surface.ops().iter().any(|op| {
            matches!(op, DrawOp::FillCircle { center, color, .. }
                if center.distance_to(ScreenPoint::new(100.0, 100.0)) < 1e-6
                    && *color == body_color(BodyKind::Planet))
        });
        assert!(disc, "expected a planet-coloured disc at the centre");
        assert!(pass.acc.labels.labels().iter().any(|l| l.text == "Jupiter"));
    }

    #[test]
    fn texture_is_blitted_centred() {
        let eph = CatalogEphemeris::sample();
        let clock = ManualTimers::default();
        let jupiter = eph.find("Jupiter").expect("in sample");
        let config = tracking_on(&eph, "Jupiter");
        let mut chart = SkyChart::default().with_texture(jupiter, Raster::filled(10, 8, Rgba::WHITE));
        let pass = draw_chart(&mut chart, &eph, &config, test_frame(200, 200, true, None), &clock);
        assert!(pass.surface.ops().contains(&DrawOp::Blit {
            x: 95,
            y: 96,
            width: 10,
            height: 8
        }));
    }

    #[test]
    fn body_filter_hides_groups() {
        let eph = CatalogEphemeris::sample();
        let clock = ManualTimers::default();
        let mut config = tracking_on(&eph, "Jupiter");
        config.bodies.planets = false;
        let pass = draw_chart(&mut SkyChart::default(), &eph, &config, test_frame(200, 200, true, None), &clock);
        assert!(!kinds(&pass).contains(&BodyKind::Planet));
    }

    #[test]
    fn pointer_on_star_qualifies_it() {
        let eph = CatalogEphemeris::sample();
        let clock = ManualTimers::default();
        let config = tracking_on(&eph, "Betelgeuse");
        let pointer = Some(ScreenPoint::new(101.0, 100.0));
        let mut pass = draw_chart(&mut SkyChart::default(), &eph, &config, test_frame(200, 200, true, pointer), &clock);
        let (selection, _) = pass.acc.picker.finish(&pass.acc.labels);
        let betelgeuse = eph.find("Betelgeuse").expect("in sample");
        assert_eq!(selection.map(|s| s.body), Some(betelgeuse));
    }
}
