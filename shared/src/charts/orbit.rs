use super::{Chart, DrawOutcome};
use crate::colors::{Rgba, body_color};
use crate::ephemeris::{BodyId, BodyKind, OrbitElements};
use crate::frame::DrawingContext;
use crate::labels::{LabelCategory, LabelClass, LabelRequest, LabelSink};
use crate::marquee::CursorStyle;
use crate::picker::{PickBias, Picker};
use crate::projection::{ORBIT_NEAR_AU, OrbitCamera, Projector, SphericalCoord, ViewMode, ViewState};

/// Straight segments per orbit ellipse.
pub const ORBIT_SEGMENTS: usize = 180;
const PLANET_RADIUS_PX: f64 = 4.0;
const SUN_RADIUS_PX: f64 = 7.0;

/// Tilted 3-D view of the planetary orbits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitChart {
    camera: OrbitCamera,
}

impl Default for OrbitChart {
    fn default() -> Self {
        Self {
            camera: OrbitCamera {
                rot_x_deg: -60.0,
                rot_y_deg: 0.0,
                rot_z_deg: 0.0,
                distance_au: 80.0,
                zoom: 1.0,
            },
        }
    }
}

impl OrbitChart {
    pub fn new(camera: OrbitCamera) -> Self {
        Self { camera }
    }

    fn camera(&self, ctx: &DrawingContext<'_>) -> OrbitCamera {
        match ctx.config.view {
            ViewMode::Orbit(camera) => camera,
            _ => self.camera,
        }
    }

    fn draw_orbit(ctx: &mut DrawingContext<'_>, view: &ViewState, orbit: &OrbitElements, color: Rgba) {
        let step = 360.0 / ORBIT_SEGMENTS as f64;
        let mut previous = view.project(&SphericalCoord::heliocentric(orbit.point(0.0)));
        for i in 1..=ORBIT_SEGMENTS {
            let next = view.project(&SphericalCoord::heliocentric(orbit.point(i as f64 * step)));
            if let (Some(a), Some(b)) = (previous, next) {
                let depth = (a.depth + b.depth) / 2.0;
                ctx.acc.zbuffer.add_line(color, a.point, b.point, depth, depth > 0.0);
            }
            previous = next;
        }
    }
}

impl Chart for OrbitChart {
    fn name(&self) -> &'static str {
        "orbit"
    }

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
        let camera = self.camera(ctx);
        let view = ViewState::for_frame(ctx.frame, ViewMode::Orbit(camera));
        let jd = ctx.frame.jd_et;
        let sun = ctx.ephemeris.sun();
        let orbit_color = ctx.color(Rgba::GRID);
        let font = ctx.frame.fonts.medium;

        for index in 0..ctx.ephemeris.count(BodyKind::Planet) {
            let body = BodyId::new(BodyKind::Planet, index);
            if let Some(orbit) = ctx.ephemeris.orbit(body) {
                Self::draw_orbit(ctx, &view, &orbit, orbit_color);
            }
            let is_sun = sun == Some(body);
            let xyz = if is_sun { Some([0.0; 3]) } else { ctx.ephemeris.heliocentric(body, jd) };
            let projected = xyz.and_then(|xyz| view.project(&SphericalCoord::heliocentric(xyz)));
            let radius = if is_sun { SUN_RADIUS_PX } else { PLANET_RADIUS_PX } * ctx.frame.scale;
            ctx.acc.picker.qualify(
                body,
                projected.map(|p| p.point),
                PickBias::for_body(BodyKind::Planet, false),
                radius,
            );
            let Some(projected) = projected else {
                continue;
            };
            let color = ctx.color(body_color(BodyKind::Planet));
            ctx.acc
                .zbuffer
                .add_circle(color, projected.point, radius, projected.depth, true);
            if let Some(name) = ctx.ephemeris.name(body) {
                ctx.acc.labels.add_label(LabelRequest {
                    body,
                    text: name.to_string(),
                    anchor: projected.point,
                    symbol_radius: radius,
                    category: LabelCategory::for_body(BodyKind::Planet, is_sun),
                    class: LabelClass::Body,
                    color: Rgba::LABEL,
                    font,
                });
            }
        }
        DrawOutcome {
            continuation: false,
            max_depth: camera.distance_au - ORBIT_NEAR_AU,
        }
    }

    fn cursor(&self, hovering: bool) -> CursorStyle {
        if hovering { CursorStyle::Crosshair } else { CursorStyle::Drag }
    }
}
