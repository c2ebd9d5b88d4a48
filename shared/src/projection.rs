use serde::{Deserialize, Serialize};

use crate::astro::{self, Horizontal};
use crate::frame::FrameConstants;
use crate::geom::ScreenPoint;

/// Horizon-to-zenith warp coefficient (1 - 1/√2).
pub const HORIZON_WARP_K: f64 = 0.29289;
/// Altitude that maps to warp parameter y = 1.
pub const HORIZON_WARP_ALT_DEG: f64 = 45.0;
/// Closest a point may get to the orbit camera, in AU.
pub const ORBIT_NEAR_AU: f64 = 1e-3;
/// Half-extent in AU of the orbit view at zoom 1.
pub const ORBIT_BASE_EXTENT_AU: f64 = 10.0;
/// Sidereal degrees per 1e-6 day, used to step off the zenith singularity.
const ZENITH_NUDGE_DEG: f64 = 360.985_647_366_29 * 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordFrame {
    Equatorial,
    Horizontal,
    Ecliptic,
    /// Heliocentric ecliptic; `radius` carries the distance in AU.
    Heliocentric,
}

/// Who is asking: bodies and their labels, or background grid lines.
/// Band boundaries are inclusive for grids and exclusive for subjects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usage {
    #[default]
    Subject,
    Grid,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphericalCoord {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub radius: Option<f64>,
    pub frame: CoordFrame,
    pub usage: Usage,
}

impl SphericalCoord {
    fn new(frame: CoordFrame, lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            radius: None,
            frame,
            usage: Usage::Subject,
        }
    }

    pub fn equatorial(ra_deg: f64, dec_deg: f64) -> Self {
        Self::new(CoordFrame::Equatorial, ra_deg, dec_deg)
    }

    pub fn horizontal(azimuth_deg: f64, altitude_deg: f64) -> Self {
        Self::new(CoordFrame::Horizontal, azimuth_deg, altitude_deg)
    }

    pub fn ecliptic(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(CoordFrame::Ecliptic, lon_deg, lat_deg)
    }

    pub fn heliocentric(xyz_au: [f64; 3]) -> Self {
        let (lon, lat) = astro::from_unit(xyz_au);
        let r = (xyz_au[0].powi(2) + xyz_au[1].powi(2) + xyz_au[2].powi(2)).sqrt();
        Self {
            radius: Some(r),
            ..Self::new(CoordFrame::Heliocentric, lon, lat)
        }
    }

    pub fn grid(self) -> Self {
        Self {
            usage: Usage::Grid,
            ..self
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lon_deg.is_finite()
            && self.lat_deg.is_finite()
            && self.radius.is_none_or(f64::is_finite)
    }

    /// Rectangular position; unit length when no radius is attached.
    pub fn xyz(&self) -> [f64; 3] {
        let r = self.radius.unwrap_or(1.0);
        let [x, y, z] = astro::to_unit(self.lon_deg, self.lat_deg);
        [x * r, y * r, z * r]
    }
}

/// A visible projected point. `depth` is only meaningful in the orbit view,
/// where larger values are nearer the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub point: ScreenPoint,
    pub depth: f64,
}

impl Projected {
    fn flat(x: f64, y: f64) -> Option<Self> {
        let point = ScreenPoint::new(x, y);
        point.is_finite().then_some(Self { point, depth: 0.0 })
    }
}

/// Azimuthal view of the visible hemisphere, zenith at the centre, north up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullSky {
    /// Dome compression: r = R·sin(z/2)·√2 instead of r = R·z/90.
    pub dome: bool,
    #[serde(default)]
    pub rotation_deg: f64,
}

/// Rectangular window onto the horizon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HorizonBand {
    pub min_alt_deg: f64,
    pub max_alt_deg: f64,
    pub az_center_deg: f64,
    pub az_span_deg: f64,
    pub warped: bool,
}

/// Stereographic cap around the zenith.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zenith {
    pub radius_deg: f64,
}

/// Gnomonic close-up centred on a tracked body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    pub center_ra_deg: f64,
    pub center_dec_deg: f64,
    pub field_deg: f64,
    /// Rotate so the zenith is up instead of celestial north.
    pub parallactic: bool,
}

/// Annulus: longitude is the angle, latitude offset within the band is the radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EclipticBand {
    pub span_deg: f64,
    #[serde(default)]
    pub rotation_deg: f64,
}

/// Rotate-and-perspective camera for heliocentric positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitCamera {
    pub rot_x_deg: f64,
    pub rot_y_deg: f64,
    pub rot_z_deg: f64,
    /// Camera distance from the rotation origin along +z, AU.
    pub distance_au: f64,
    /// 1.0 fits ORBIT_BASE_EXTENT_AU between centre and the nearest edge.
    pub zoom: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewMode {
    FullSky(FullSky),
    HorizonBand(HorizonBand),
    Zenith(Zenith),
    Tracking(Tracking),
    EclipticBand(EclipticBand),
    Orbit(OrbitCamera),
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::FullSky(FullSky {
            dome: false,
            rotation_deg: 0.0,
        })
    }
}

pub trait Projector {
    fn project(&self, coord: &SphericalCoord) -> Option<Projected>;

    fn screen_to_spherical(&self, _point: ScreenPoint) -> Option<SphericalCoord> {
        None
    }
}

/// Per-pass view geometry plus the mode being drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub width: f64,
    pub height: f64,
    pub lst_deg: f64,
    pub latitude_deg: f64,
    pub mode: ViewMode,
}

impl ViewState {
    pub fn for_frame(frame: &FrameConstants, mode: ViewMode) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            lst_deg: frame.local_sidereal_deg(),
            latitude_deg: frame.observer.latitude_deg,
            mode,
        }
    }

    fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    fn radius_px(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }

    fn in_bounds(&self, p: ScreenPoint) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    pub fn to_horizontal(&self, coord: &SphericalCoord) -> Horizontal {
        match coord.frame {
            CoordFrame::Horizontal => Horizontal {
                azimuth_deg: coord.lon_deg,
                altitude_deg: coord.lat_deg,
            },
            _ => {
                let (ra, dec) = self.to_equatorial(coord);
                astro::equatorial_to_horizontal(ra, dec, self.lst_deg, self.latitude_deg)
            }
        }
    }

    pub fn to_equatorial(&self, coord: &SphericalCoord) -> (f64, f64) {
        match coord.frame {
            CoordFrame::Equatorial => (coord.lon_deg, coord.lat_deg),
            CoordFrame::Ecliptic | CoordFrame::Heliocentric => {
                astro::ecliptic_to_equatorial(coord.lon_deg, coord.lat_deg)
            }
            CoordFrame::Horizontal => astro::horizontal_to_equatorial(
                Horizontal {
                    azimuth_deg: coord.lon_deg,
                    altitude_deg: coord.lat_deg,
                },
                self.lst_deg,
                self.latitude_deg,
            ),
        }
    }

    pub fn to_ecliptic(&self, coord: &SphericalCoord) -> (f64, f64) {
        match coord.frame {
            CoordFrame::Ecliptic | CoordFrame::Heliocentric => (coord.lon_deg, coord.lat_deg),
            _ => {
                let (ra, dec) = self.to_equatorial(coord);
                astro::equatorial_to_ecliptic(ra, dec)
            }
        }
    }

    fn project_full_sky(&self, view: &FullSky, coord: &SphericalCoord) -> Option<Projected> {
        let hz = self.to_horizontal(coord);
        if hz.altitude_deg < 0.0 {
            return None;
        }
        let z = 90.0 - hz.altitude_deg;
        let r = if view.dome {
            self.radius_px() * (z / 2.0).to_radians().sin() * std::f64::consts::SQRT_2
        } else {
            self.radius_px() * z / 90.0
        };
        let (cx, cy) = self.center();
        let a = (hz.azimuth_deg + view.rotation_deg).to_radians();
        Projected::flat(cx - r * a.sin(), cy - r * a.cos())
    }

    fn project_horizon_band(&self, view: &HorizonBand, coord: &SphericalCoord) -> Option<Projected> {
        let hz = self.to_horizontal(coord);
        let alt_span = view.max_alt_deg - view.min_alt_deg;
        if alt_span <= 0.0 || view.az_span_deg <= 0.0 {
            return None;
        }
        let y = (hz.altitude_deg - view.min_alt_deg) / alt_span;
        if !(0.0..=1.0).contains(&y) {
            return None;
        }
        let mut x = astro::normalize_signed_deg(hz.azimuth_deg - view.az_center_deg)
            / (view.az_span_deg / 2.0);
        if view.warped {
            x = horizon_warp(x, hz.altitude_deg / HORIZON_WARP_ALT_DEG);
        }
        if x.abs() > 1.0 {
            return None;
        }
        Projected::flat(
            self.width / 2.0 + x * self.width / 2.0,
            self.height - y * self.height,
        )
    }

    fn unproject_horizon_band(&self, view: &HorizonBand, p: ScreenPoint) -> Option<SphericalCoord> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let y = (self.height - p.y) / self.height;
        let alt = view.min_alt_deg + y * (view.max_alt_deg - view.min_alt_deg);
        let mut x = (p.x - self.width / 2.0) / (self.width / 2.0);
        if view.warped {
            x = horizon_unwarp(x, alt / HORIZON_WARP_ALT_DEG);
        }
        let az = astro::normalize_deg(view.az_center_deg + x * view.az_span_deg / 2.0);
        Some(SphericalCoord::horizontal(az, alt))
    }

    fn project_zenith(&self, view: &Zenith, coord: &SphericalCoord) -> Option<Projected> {
        let hz = self.to_horizontal(coord);
        let z = 90.0 - hz.altitude_deg;
        if z > view.radius_deg || view.radius_deg <= 0.0 || view.radius_deg >= 180.0 {
            return None;
        }
        let r = self.radius_px() * (z / 2.0).to_radians().tan()
            / (view.radius_deg / 2.0).to_radians().tan();
        let (cx, cy) = self.center();
        let a = hz.azimuth_deg.to_radians();
        Projected::flat(cx - r * a.sin(), cy - r * a.cos())
    }

    /// Rotation applied in the tracking view, in degrees.
    pub fn tracking_rotation(&self, view: &Tracking) -> f64 {
        if !view.parallactic {
            return 0.0;
        }
        let ha = self.lst_deg - view.center_ra_deg;
        astro::parallactic_angle(ha, view.center_dec_deg, self.latitude_deg)
            .or_else(|| {
                astro::parallactic_angle(ha + ZENITH_NUDGE_DEG, view.center_dec_deg, self.latitude_deg)
            })
            .unwrap_or(0.0)
    }

    fn tracking_scale(&self, view: &Tracking) -> Option<f64> {
        let half = (view.field_deg / 2.0).to_radians();
        if !(half > 0.0 && half < std::f64::consts::FRAC_PI_2) {
            return None;
        }
        Some(self.radius_px() / half.tan())
    }

    fn project_tracking(&self, view: &Tracking, coord: &SphericalCoord) -> Option<Projected> {
        let scale = self.tracking_scale(view)?;
        let (ra, dec) = self.to_equatorial(coord);
        let (ra, dec) = (ra.to_radians(), dec.to_radians());
        let (ra0, dec0) = (view.center_ra_deg.to_radians(), view.center_dec_deg.to_radians());
        let d_ra = ra - ra0;
        let cos_c = dec0.sin() * dec.sin() + dec0.cos() * dec.cos() * d_ra.cos();
        if cos_c <= 1e-9 {
            return None;
        }
        let xi = dec.cos() * d_ra.sin() / cos_c;
        let eta = (dec0.cos() * dec.sin() - dec0.sin() * dec.cos() * d_ra.cos()) / cos_c;
        let q = self.tracking_rotation(view).to_radians();
        let (s, c) = q.sin_cos();
        let (xr, yr) = (xi * c - eta * s, xi * s + eta * c);
        let (cx, cy) = self.center();
        let projected = Projected::flat(cx - xr * scale, cy - yr * scale)?;
        self.in_bounds(projected.point).then_some(projected)
    }

    fn unproject_tracking(&self, view: &Tracking, p: ScreenPoint) -> Option<SphericalCoord> {
        let scale = self.tracking_scale(view)?;
        let (cx, cy) = self.center();
        let (xr, yr) = ((cx - p.x) / scale, (cy - p.y) / scale);
        let q = self.tracking_rotation(view).to_radians();
        let (s, c) = q.sin_cos();
        let (xi, eta) = (xr * c + yr * s, -xr * s + yr * c);
        let (ra0, dec0) = (view.center_ra_deg.to_radians(), view.center_dec_deg.to_radians());
        let rho = xi.hypot(eta);
        if rho < 1e-15 {
            return Some(SphericalCoord::equatorial(view.center_ra_deg, view.center_dec_deg));
        }
        let cc = rho.atan();
        let dec = (cc.cos() * dec0.sin() + eta * cc.sin() * dec0.cos() / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let ra = ra0 + (xi * cc.sin()).atan2(rho * dec0.cos() * cc.cos() - eta * dec0.sin() * cc.sin());
        Some(SphericalCoord::equatorial(
            astro::normalize_deg(ra.to_degrees()),
            dec.to_degrees(),
        ))
    }

    /// Inner and outer radius of the ecliptic annulus.
    pub fn ecliptic_radii(&self) -> (f64, f64) {
        let outer = self.radius_px() * 0.95;
        (outer * 0.6, outer)
    }

    fn project_ecliptic(&self, view: &EclipticBand, coord: &SphericalCoord) -> Option<Projected> {
        let half = view.span_deg / 2.0;
        if half <= 0.0 {
            return None;
        }
        let (lon, lat) = self.to_ecliptic(coord);
        let outside = match coord.usage {
            Usage::Subject => lat.abs() >= half,
            Usage::Grid => lat.abs() > half,
        };
        if outside {
            return None;
        }
        let (inner, outer) = self.ecliptic_radii();
        let r = inner + (lat + half) / view.span_deg * (outer - inner);
        let a = (lon + view.rotation_deg).to_radians();
        let (cx, cy) = self.center();
        Projected::flat(cx + r * a.cos(), cy - r * a.sin())
    }

    fn project_orbit(&self, view: &OrbitCamera, coord: &SphericalCoord) -> Option<Projected> {
        let [x, y, z] = orbit_rotate(view, coord.xyz());
        let gap = view.distance_au - z;
        if gap <= ORBIT_NEAR_AU {
            return None;
        }
        let f = view.distance_au / gap;
        let px_per_au = view.zoom * self.radius_px() / ORBIT_BASE_EXTENT_AU;
        let (cx, cy) = self.center();
        let point = ScreenPoint::new(cx + x * f * px_per_au, cy - y * f * px_per_au);
        point.is_finite().then_some(Projected { point, depth: z })
    }
}

impl Projector for ViewState {
    fn project(&self, coord: &SphericalCoord) -> Option<Projected> {
        if !coord.is_finite() || !self.lst_deg.is_finite() || !self.latitude_deg.is_finite() {
            return None;
        }
        match &self.mode {
            ViewMode::FullSky(v) => self.project_full_sky(v, coord),
            ViewMode::HorizonBand(v) => self.project_horizon_band(v, coord),
            ViewMode::Zenith(v) => self.project_zenith(v, coord),
            ViewMode::Tracking(v) => self.project_tracking(v, coord),
            ViewMode::EclipticBand(v) => self.project_ecliptic(v, coord),
            ViewMode::Orbit(v) => self.project_orbit(v, coord),
        }
    }

    fn screen_to_spherical(&self, point: ScreenPoint) -> Option<SphericalCoord> {
        if !point.is_finite() {
            return None;
        }
        match &self.mode {
            ViewMode::Tracking(v) => self.unproject_tracking(v, point),
            ViewMode::HorizonBand(v) => self.unproject_horizon_band(v, point),
            _ => None,
        }
    }
}

/// Convenience form of [`Projector::project`] that drops depth.
pub fn project(coord: &SphericalCoord, view: &ViewState) -> Option<ScreenPoint> {
    view.project(coord).map(|p| p.point)
}

/// Horizontal spread for the horizon-to-zenith view. `x` is the normalized
/// azimuth offset, `y` the altitude in units of [`HORIZON_WARP_ALT_DEG`].
pub fn horizon_warp(x: f64, y: f64) -> f64 {
    if y <= 1.0 {
        x / (1.0 - HORIZON_WARP_K * y)
    } else {
        x / std::f64::consts::SQRT_2
    }
}

pub fn horizon_unwarp(x: f64, y: f64) -> f64 {
    if y <= 1.0 {
        x * (1.0 - HORIZON_WARP_K * y)
    } else {
        x * std::f64::consts::SQRT_2
    }
}

/// Applies rot_z, then rot_x, then rot_y.
pub fn orbit_rotate(view: &OrbitCamera, xyz: [f64; 3]) -> [f64; 3] {
    let xyz = astro::rotate_z(xyz, view.rot_z_deg);
    let xyz = astro::rotate_x(xyz, view.rot_x_deg);
    astro::rotate_y(xyz, view.rot_y_deg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(mode: ViewMode) -> ViewState {
        ViewState {
            width: 800.0,
            height: 600.0,
            lst_deg: 100.0,
            latitude_deg: 40.0,
            mode,
        }
    }

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < tol, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn tracking_round_trip_within_one_pixel() {
        for parallactic in [false, true] {
            let mode = ViewMode::Tracking(Tracking {
                center_ra_deg: 83.8,
                center_dec_deg: -5.4,
                field_deg: 10.0,
                parallactic,
            });
            let v = view(mode);
            let pixel_deg = 10.0 / 600.0;
            for (ra, dec) in [(83.8, -5.4), (85.0, -3.0), (81.0, -8.0), (86.5, -1.5)] {
                let coord = SphericalCoord::equatorial(ra, dec);
                let p = v.project(&coord).expect("inside the field");
                let back = v.screen_to_spherical(p.point).expect("inverse exists");
                let sep = astro::angular_separation_deg(ra, dec, back.lon_deg, back.lat_deg);
                assert!(sep < pixel_deg, "({ra}, {dec}) came back {sep}° away");
            }
        }
    }

    #[test]
    fn tracking_rejects_points_outside_viewport() {
        let v = view(ViewMode::Tracking(Tracking {
            center_ra_deg: 0.0,
            center_dec_deg: 0.0,
            field_deg: 2.0,
            parallactic: false,
        }));
        assert!(v.project(&SphericalCoord::equatorial(10.0, 0.0)).is_none());
        assert!(v.project(&SphericalCoord::equatorial(180.0, 0.0)).is_none());
    }

    #[test]
    fn tracking_at_zenith_nudges_instead_of_nan() {
        let mut v = view(ViewMode::Tracking(Tracking {
            center_ra_deg: 100.0,
            center_dec_deg: 40.0,
            field_deg: 5.0,
            parallactic: true,
        }));
        v.lst_deg = 100.0;
        let ViewMode::Tracking(t) = v.mode else { unreachable!() };
        assert!(v.tracking_rotation(&t).is_finite());
        let p = v.project(&SphericalCoord::equatorial(100.5, 40.5)).expect("visible");
        assert!(p.point.is_finite());
    }

    #[test]
    fn ecliptic_half_span_differs_for_subjects_and_grid() {
        let v = view(ViewMode::EclipticBand(EclipticBand {
            span_deg: 20.0,
            rotation_deg: 0.0,
        }));
        let edge = SphericalCoord::ecliptic(45.0, 10.0);
        assert!(v.project(&edge).is_none(), "subject on the boundary is hidden");
        assert!(v.project(&edge.grid()).is_some(), "grid on the boundary is drawn");
        assert!(v.project(&SphericalCoord::ecliptic(45.0, 10.1).grid()).is_none());
        assert!(v.project(&SphericalCoord::ecliptic(45.0, -9.9)).is_some());
    }

    #[test]
    fn ecliptic_radius_grows_with_latitude() {
        let v = view(ViewMode::EclipticBand(EclipticBand {
            span_deg: 20.0,
            rotation_deg: 0.0,
        }));
        let (inner, outer) = v.ecliptic_radii();
        let low = v.project(&SphericalCoord::ecliptic(0.0, -10.0).grid()).expect("grid");
        let high = v.project(&SphericalCoord::ecliptic(0.0, 10.0).grid()).expect("grid");
        assert_close(low.point.x - 400.0, inner, 1e-9);
        assert_close(high.point.x - 400.0, outer, 1e-9);
    }

    #[test]
    fn full_sky_hides_below_horizon_and_centres_zenith() {
        for dome in [false, true] {
            let v = view(ViewMode::FullSky(FullSky {
                dome,
                rotation_deg: 0.0,
            }));
            assert!(v.project(&SphericalCoord::horizontal(10.0, -0.5)).is_none());
            let zenith = v.project(&SphericalCoord::horizontal(0.0, 90.0)).expect("zenith");
            assert_close(zenith.point.x, 400.0, 1e-9);
            assert_close(zenith.point.y, 300.0, 1e-9);
            let north = v.project(&SphericalCoord::horizontal(0.0, 0.0)).expect("horizon");
            assert_close(north.point.y, 0.0, 1e-9);
        }
    }

    #[test]
    fn dome_compresses_less_than_linear_at_mid_altitude() {
        let flat = view(ViewMode::FullSky(FullSky { dome: false, rotation_deg: 0.0 }));
        let dome = view(ViewMode::FullSky(FullSky { dome: true, rotation_deg: 0.0 }));
        let c = SphericalCoord::horizontal(90.0, 45.0);
        let rf = 400.0 - flat.project(&c).expect("visible").point.x;
        let rd = 400.0 - dome.project(&c).expect("visible").point.x;
        assert_close(rf, 150.0, 1e-9);
        assert_close(rd, 300.0 * (22.5f64).to_radians().sin() * std::f64::consts::SQRT_2, 1e-9);
        assert!(rd > rf);
    }

    #[test]
    fn horizon_warp_constants() {
        assert_close(horizon_warp(0.5, 0.0), 0.5, 1e-12);
        assert_close(horizon_warp(0.5, 1.0), 0.5 / (1.0 - 0.29289), 1e-12);
        assert_close(horizon_warp(0.5, 1.5), 0.5 / std::f64::consts::SQRT_2, 1e-12);
        for (x, y) in [(0.3, 0.4), (-0.7, 1.8)] {
            assert_close(horizon_unwarp(horizon_warp(x, y), y), x, 1e-12);
        }
    }

    #[test]
    fn warped_band_pushes_mid_altitudes_outward() {
        let band = |warped| {
            view(ViewMode::HorizonBand(HorizonBand {
                min_alt_deg: 0.0,
                max_alt_deg: 90.0,
                az_center_deg: 180.0,
                az_span_deg: 180.0,
                warped,
            }))
        };
        let c = SphericalCoord::horizontal(210.0, 30.0);
        let plain = band(false).project(&c).expect("visible");
        let warped = band(true).project(&c).expect("visible");
        assert!(warped.point.x > plain.point.x);
        assert_eq!(warped.point.y, plain.point.y);
        let back = band(true).screen_to_spherical(warped.point).expect("inverse");
        assert_close(back.lon_deg, 210.0, 1e-9);
        assert_close(back.lat_deg, 30.0, 1e-9);
        // Near the edge the warp pushes the point out of view.
        assert!(band(true).project(&SphericalCoord::horizontal(260.0, 40.0)).is_none());
        assert!(band(false).project(&SphericalCoord::horizontal(260.0, 40.0)).is_some());
    }

    #[test]
    fn zenith_cap_is_bounded() {
        let v = view(ViewMode::Zenith(Zenith { radius_deg: 30.0 }));
        assert!(v.project(&SphericalCoord::horizontal(0.0, 55.0)).is_none());
        let rim = v.project(&SphericalCoord::horizontal(0.0, 60.0)).expect("on rim");
        assert_close(rim.point.y, 0.0, 1e-9);
    }

    #[test]
    fn orbit_perspective_and_depth() {
        let cam = OrbitCamera {
            rot_x_deg: 0.0,
            rot_y_deg: 0.0,
            rot_z_deg: 0.0,
            distance_au: 20.0,
            zoom: 1.0,
        };
        let v = view(ViewMode::Orbit(cam));
        let p = v.project(&SphericalCoord::heliocentric([1.0, 0.0, 0.0])).expect("visible");
        assert_close(p.point.x, 400.0 + 30.0, 1e-9);
        assert_close(p.depth, 0.0, 1e-12);
        let near = v.project(&SphericalCoord::heliocentric([0.0, 0.0, 5.0])).expect("visible");
        let far = v.project(&SphericalCoord::heliocentric([0.0, 0.0, -5.0])).expect("visible");
        assert!(near.depth > far.depth);
        assert!(v.project(&SphericalCoord::heliocentric([0.0, 0.0, 25.0])).is_none());
    }

    #[test]
    fn orbit_rotation_order() {
        let cam = OrbitCamera {
            rot_x_deg: 90.0,
            rot_y_deg: 0.0,
            rot_z_deg: 90.0,
            distance_au: 20.0,
            zoom: 1.0,
        };
        // z-rotation takes +x to +y, then x-rotation takes +y to +z.
        let [x, y, z] = orbit_rotate(&cam, [1.0, 0.0, 0.0]);
        assert_close(x, 0.0, 1e-12);
        assert_close(y, 0.0, 1e-12);
        assert_close(z, 1.0, 1e-12);
    }

    #[test]
    fn non_finite_input_is_not_visible() {
        let v = view(ViewMode::default());
        assert!(v.project(&SphericalCoord::equatorial(f64::NAN, 0.0)).is_none());
        assert!(project(&SphericalCoord::horizontal(0.0, 90.0), &v).is_some());
    }
}
