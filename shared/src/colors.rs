use serde::{Deserialize, Serialize};

use crate::ephemeris::BodyKind;

/// 8-bit RGBA color, straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const NIGHT_SKY: Rgba = Rgba::rgb(8, 12, 30);
    pub const GRID: Rgba = Rgba::new(90, 110, 160, 160);
    pub const HORIZON: Rgba = Rgba::rgb(120, 150, 110);
    pub const LABEL: Rgba = Rgba::rgb(210, 220, 240);
    pub const SELECTION: Rgba = Rgba::rgb(255, 217, 102);
    pub const UMBRA: Rgba = Rgba::new(10, 10, 20, 200);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Format as a CSS color string.
    pub fn css(&self) -> String {
        let alpha = self.a as f64 / 255.0;
        format!("rgba({},{},{},{alpha:.3})", self.r, self.g, self.b)
    }

    /// Brighten by a factor (1.0 = no change, >1.0 = brighter).
    pub fn brighten(self, factor: f64) -> Self {
        let scale = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }

    /// Source-over blend of `self` onto an opaque-or-translucent `dst`.
    pub fn over(self, dst: Rgba) -> Rgba {
        if self.a == 255 {
            return self;
        }
        if self.a == 0 {
            return dst;
        }
        let sa = self.a as f64 / 255.0;
        let da = dst.a as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= f64::EPSILON {
            return Rgba::TRANSPARENT;
        }
        let mix = |s: u8, d: u8| {
            ((s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgba::new(
            mix(self.r, dst.r),
            mix(self.g, dst.g),
            mix(self.b, dst.b),
            (out_a * 255.0).round() as u8,
        )
    }

    /// Print-friendly variant: lightness is inverted so dark skies print white
    /// and bright stars print dark, hue is kept.
    pub fn ink_saver(self) -> Self {
        let (h, s, l) = rgb_to_hsl(self.r, self.g, self.b);
        let (r, g, b) = hsl_to_rgb(h, s, 1.0 - l);
        Self::new(r, g, b, self.a)
    }

    /// Applies the ink-saver transform when `ink_saver` is set.
    pub fn themed(self, ink_saver: bool) -> Self {
        if ink_saver { self.ink_saver() } else { self }
    }
}

/// Flat fallback color for a body category, used when no texture is available.
pub fn body_color(kind: BodyKind) -> Rgba {
    match kind {
        BodyKind::Star => Rgba::rgb(235, 240, 255),
        BodyKind::DeepSky => Rgba::rgb(150, 190, 255),
        BodyKind::Planet => Rgba::rgb(245, 205, 130),
        BodyKind::Moon => Rgba::rgb(215, 215, 205),
        BodyKind::MoonShadow => Rgba::rgb(60, 60, 80),
        BodyKind::Constellation => Rgba::rgb(110, 140, 200),
    }
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Piecewise-linear gradient lookup over `(position, color)` stops sorted by position.
pub fn gradient(stops: &[(f64, Rgba)], t: f64) -> Rgba {
    let Some(&(first_pos, first)) = stops.first() else {
        return Rgba::TRANSPARENT;
    };
    if t <= first_pos {
        return first;
    }
    for window in stops.windows(2) {
        let (left_pos, left) = window[0];
        let (right_pos, right) = window[1];
        if t >= left_pos && t <= right_pos {
            let span = (right_pos - left_pos).max(f64::EPSILON);
            let k = (t - left_pos) / span;
            return Rgba::new(
                lerp_u8(left.r, right.r, k),
                lerp_u8(left.g, right.g, k),
                lerp_u8(left.b, right.b, k),
                lerp_u8(left.a, right.a, k),
            );
        }
    }
    stops.last().map(|(_, color)| *color).unwrap_or(first)
}

/// Sun-altitude palette for the insolation chart: night, twilight bands, day.
pub fn insolation_color(sun_altitude_deg: f64) -> Rgba {
    const STOPS: &[(f64, Rgba)] = &[
        (-18.0, Rgba::rgb(10, 14, 40)),
        (-12.0, Rgba::rgb(25, 40, 90)),
        (-6.0, Rgba::rgb(60, 80, 150)),
        (0.0, Rgba::rgb(245, 140, 50)),
        (20.0, Rgba::rgb(245, 220, 70)),
        (60.0, Rgba::rgb(255, 250, 210)),
    ];
    gradient(STOPS, sun_altitude_deg)
}
