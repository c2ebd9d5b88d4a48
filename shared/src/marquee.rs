use serde::{Deserialize, Serialize};

use crate::astro;
use crate::ephemeris::{BodyKind, Ephemeris};
use crate::frame::FrameConstants;
use crate::picker::Selection;

/// Joins marquee fields.
pub const SEPARATOR: &str = " \u{2022} ";
pub const KM_PER_AU: f64 = 149_597_870.7;
pub const KM_PER_MILE: f64 = 1.609_344;

/// Which optional fields follow the body name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarqueeFields {
    pub ecliptic: bool,
    pub equatorial: bool,
    pub horizontal: bool,
    pub magnitude: bool,
    pub illumination: bool,
    pub diameter: bool,
    pub distance_au: bool,
    pub distance_km: bool,
    pub distance_miles: bool,
}

impl MarqueeFields {
    pub fn all() -> Self {
        Self {
            ecliptic: true,
            equatorial: true,
            horizontal: true,
            magnitude: true,
            illumination: true,
            diameter: true,
            distance_au: true,
            distance_km: true,
            distance_miles: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    Default,
    Crosshair,
    Drag,
    Custom(String),
}

impl CursorStyle {
    pub fn css_token(&self) -> &str {
        match self {
            CursorStyle::Default => "default",
            CursorStyle::Crosshair => "crosshair",
            CursorStyle::Drag => "grab",
            CursorStyle::Custom(token) => token,
        }
    }
}

fn format_hms(deg: f64) -> String {
    let total = (astro::normalize_deg(deg) / 15.0 * 3600.0).round() as i64 % 86_400;
    format!("{:02}h{:02}m{:02}s", total / 3600, total / 60 % 60, total % 60)
}

fn format_dms(deg: f64) -> String {
    let sign = if deg < 0.0 { '-' } else { '+' };
    let total = (deg.abs() * 60.0).round() as i64;
    format!("{sign}{:02}\u{b0}{:02}\u{2032}", total / 60, total % 60)
}

/// 1234567.8 -> "1,234,568".
fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}

fn format_diameter(arcsec: f64) -> String {
    if arcsec >= 60.0 {
        format!("{:.1}\u{2032}", arcsec / 60.0)
    } else {
        format!("{arcsec:.1}\u{2033}")
    }
}

/// Builds the single-line status text for a selection.
pub fn describe(
    selection: &Selection,
    fields: &MarqueeFields,
    ephemeris: &dyn Ephemeris,
    frame: &FrameConstants,
) -> Option<String> {
    let body = selection.body;
    let name = ephemeris.name(body)?;
    let mut parts = vec![name.to_string()];
    let jd = frame.jd_et;
    let position = ephemeris.position(body, jd);

    if let Some(pos) = position {
        if fields.ecliptic {
            let (lon, lat) = astro::equatorial_to_ecliptic(pos.ra_deg, pos.dec_deg);
            parts.push(format!("\u{3bb} {lon:.2}\u{b0} \u{3b2} {lat:+.2}\u{b0}"));
        }
        if fields.equatorial {
            parts.push(format!("RA {} Dec {}", format_hms(pos.ra_deg), format_dms(pos.dec_deg)));
        }
        if fields.horizontal {
            let hz = astro::equatorial_to_horizontal(
                pos.ra_deg,
                pos.dec_deg,
                frame.local_sidereal_deg(),
                frame.observer.latitude_deg,
            );
            parts.push(format!("Az {:.1}\u{b0} Alt {:+.1}\u{b0}", hz.azimuth_deg, hz.altitude_deg));
        }
    }
    if fields.magnitude
        && body.kind != BodyKind::Constellation
        && let Some(mag) = ephemeris.magnitude(body, jd)
    {
        parts.push(format!("mag {mag:.2}"));
    }
    if fields.illumination && let Some(k) = ephemeris.illuminated_fraction(body, jd) {
        parts.push(format!("{:.0}% lit", k.clamp(0.0, 1.0) * 100.0));
    }
    if fields.diameter && let Some(arcsec) = ephemeris.angular_diameter_arcsec(body, jd) {
        parts.push(format_diameter(arcsec));
    }
    if let Some(au) = position.and_then(|p| p.distance_au) {
        if fields.distance_au {
            parts.push(format!("{au:.4} AU"));
        }
        if fields.distance_km {
            parts.push(format!("{} km", group_thousands(au * KM_PER_AU)));
        }
        if fields.distance_miles {
            parts.push(format!("{} mi", group_thousands(au * KM_PER_AU / KM_PER_MILE)));
        }
    }
    Some(parts.join(SEPARATOR))
}
