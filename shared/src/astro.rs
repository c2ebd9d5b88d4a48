//! Coordinate-frame conversions used by the projection layer. All angles are degrees.

use serde::{Deserialize, Serialize};

pub const OBLIQUITY_DEG: f64 = 23.4392911;
const J2000_JD: f64 = 2_451_545.0;

/// Local horizontal coordinates. Azimuth runs from north through east.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Horizontal {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
}

pub fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

/// Wraps into (-180, 180].
pub fn normalize_signed_deg(deg: f64) -> f64 {
    let d = normalize_deg(deg);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Greenwich mean sidereal time (IAU 1982 expression).
pub fn gmst_deg(jd_ut: f64) -> f64 {
    let d = jd_ut - J2000_JD;
    let t = d / 36_525.0;
    normalize_deg(
        280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t - t * t * t / 38_710_000.0,
    )
}

/// Local sidereal time for an east-positive longitude.
pub fn local_sidereal_deg(jd_ut: f64, longitude_deg: f64) -> f64 {
    normalize_deg(gmst_deg(jd_ut) + longitude_deg)
}

pub fn equatorial_to_horizontal(ra_deg: f64, dec_deg: f64, lst_deg: f64, lat_deg: f64) -> Horizontal {
    let h = (lst_deg - ra_deg).to_radians();
    let dec = dec_deg.to_radians();
    let lat = lat_deg.to_radians();
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos();
    let alt = sin_alt.clamp(-1.0, 1.0).asin();
    let az = (-h.sin() * dec.cos()).atan2(dec.sin() * lat.cos() - dec.cos() * lat.sin() * h.cos());
    Horizontal {
        azimuth_deg: normalize_deg(az.to_degrees()),
        altitude_deg: alt.to_degrees(),
    }
}

/// Inverse of [`equatorial_to_horizontal`]; returns (ra, dec).
pub fn horizontal_to_equatorial(hz: Horizontal, lst_deg: f64, lat_deg: f64) -> (f64, f64) {
    let az = hz.azimuth_deg.to_radians();
    let alt = hz.altitude_deg.to_radians();
    let lat = lat_deg.to_radians();
    let sin_dec = lat.sin() * alt.sin() + lat.cos() * alt.cos() * az.cos();
    let dec = sin_dec.clamp(-1.0, 1.0).asin();
    let h = (-az.sin() * alt.cos()).atan2(alt.sin() * lat.cos() - alt.cos() * lat.sin() * az.cos());
    (normalize_deg(lst_deg - h.to_degrees()), dec.to_degrees())
}

/// Returns (ecliptic longitude, ecliptic latitude).
pub fn equatorial_to_ecliptic(ra_deg: f64, dec_deg: f64) -> (f64, f64) {
    let (ra, dec, eps) = (ra_deg.to_radians(), dec_deg.to_radians(), OBLIQUITY_DEG.to_radians());
    let lon = (ra.sin() * eps.cos() + dec.tan() * eps.sin()).atan2(ra.cos());
    let lat = (dec.sin() * eps.cos() - dec.cos() * eps.sin() * ra.sin())
        .clamp(-1.0, 1.0)
        .asin();
    (normalize_deg(lon.to_degrees()), lat.to_degrees())
}

/// Returns (ra, dec).
pub fn ecliptic_to_equatorial(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let (lon, lat, eps) = (lon_deg.to_radians(), lat_deg.to_radians(), OBLIQUITY_DEG.to_radians());
    let ra = (lon.sin() * eps.cos() - lat.tan() * eps.sin()).atan2(lon.cos());
    let dec = (lat.sin() * eps.cos() + lat.cos() * eps.sin() * lon.sin())
        .clamp(-1.0, 1.0)
        .asin();
    (normalize_deg(ra.to_degrees()), dec.to_degrees())
}

/// Angle between the local vertical and the hour circle through a body.
/// `None` when the body sits on the zenith, where the angle is undefined.
pub fn parallactic_angle(hour_angle_deg: f64, dec_deg: f64, lat_deg: f64) -> Option<f64> {
    let h = hour_angle_deg.to_radians();
    let dec = dec_deg.to_radians();
    let lat = lat_deg.to_radians();
    let num = h.sin();
    let den = lat.tan() * dec.cos() - dec.sin() * h.cos();
    if (num.abs() < 1e-12 && den.abs() < 1e-12) || !den.is_finite() {
        return None;
    }
    Some(num.atan2(den).to_degrees())
}

pub fn angular_separation_deg(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let a = to_unit(lon1, lat1);
    let b = to_unit(lon2, lat2);
    let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

pub fn to_unit(lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let (lon, lat) = (lon_deg.to_radians(), lat_deg.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Returns (lon, lat) of a vector; its length is ignored.
pub fn from_unit(v: [f64; 3]) -> (f64, f64) {
    let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if r <= f64::EPSILON {
        return (0.0, 0.0);
    }
    let lat = (v[2] / r).clamp(-1.0, 1.0).asin();
    (normalize_deg(v[1].atan2(v[0]).to_degrees()), lat.to_degrees())
}

/// Right-handed rotation about the x axis by `deg`.
pub fn rotate_x([x, y, z]: [f64; 3], deg: f64) -> [f64; 3] {
    let (s, c) = deg.to_radians().sin_cos();
    [x, y * c - z * s, y * s + z * c]
}

pub fn rotate_y([x, y, z]: [f64; 3], deg: f64) -> [f64; 3] {
    let (s, c) = deg.to_radians().sin_cos();
    [x * c + z * s, y, -x * s + z * c]
}

pub fn rotate_z([x, y, z]: [f64; 3], deg: f64) -> [f64; 3] {
    let (s, c) = deg.to_radians().sin_cos();
    [x * c - y * s, x * s + y * c, z]
}

/// Eccentric anomaly (radians) for mean anomaly `mean_rad`, by Newton iteration.
/// Elliptic orbits only (`e < 1`).
pub fn solve_kepler(mean_rad: f64, e: f64) -> f64 {
    let m = mean_rad.rem_euclid(std::f64::consts::TAU);
    let mut ea = if e > 0.8 { std::f64::consts::PI } else { m };
    for _ in 0..30 {
        let step = (ea - e * ea.sin() - m) / (1.0 - e * ea.cos());
        ea -= step;
        if step.abs() < 1e-12 {
            break;
        }
    }
    ea
}

/// True anomaly in degrees for a mean anomaly in degrees.
pub fn true_anomaly_deg(mean_deg: f64, e: f64) -> f64 {
    let ea = solve_kepler(mean_deg.to_radians(), e);
    let nu = 2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos());
    normalize_deg(nu.to_degrees())
}

/// Low-precision apparent Sun (about 0.01° over 1950-2050): (ra, dec, distance AU).
pub fn approximate_sun(jd: f64) -> (f64, f64, f64) {
    let n = jd - J2000_JD;
    let l = 280.460 + 0.985_647_4 * n;
    let g = (357.528 + 0.985_600_3 * n).to_radians();
    let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
    let eps = (23.439 - 0.000_000_4 * n).to_radians();
    let ra = (eps.cos() * lambda.sin()).atan2(lambda.cos());
    let dec = (eps.sin() * lambda.sin()).asin();
    let r = 1.000_14 - 0.016_71 * g.cos() - 0.000_14 * (2.0 * g).cos();
    (normalize_deg(ra.to_degrees()), dec.to_degrees(), r)
}
