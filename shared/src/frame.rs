use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::astro;
use crate::colors::Rgba;
use crate::compositor::ZBuffer;
use crate::config::RenderConfig;
use crate::ephemeris::{BodyId, Ephemeris};
use crate::geom::{ScreenPoint, SurfaceSize};
use crate::labels::LabelLayout;
use crate::picker::SelectionTracker;
use crate::surface::Surface;
use crate::timers::Clock;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MS_PER_DAY: f64 = 86_400_000.0;
const J2000_JD: f64 = 2_451_545.0;

/// Font measurements used for label boxes. Widths are per-character averages
/// so layout stays deterministic without a text shaper.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub size_px: f64,
    pub char_width: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl FontMetrics {
    pub fn for_size(size_px: f64) -> Self {
        Self {
            size_px,
            char_width: size_px * 0.6,
            ascent: size_px * 0.8,
            descent: size_px * 0.2,
        }
    }

    /// Metrics from a host measurement of a reference string.
    pub fn measured(size_px: f64, sample: &str, sample_width: f64) -> Self {
        let chars = sample.chars().count().max(1) as f64;
        Self {
            char_width: sample_width / chars,
            ..Self::for_size(size_px)
        }
    }

    pub fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }

    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSet {
    pub large: FontMetrics,
    pub medium: FontMetrics,
    pub small: FontMetrics,
}

impl FontSet {
    pub fn scaled(scale: f64) -> Self {
        Self {
            large: FontMetrics::for_size(14.0 * scale),
            medium: FontMetrics::for_size(12.0 * scale),
            small: FontMetrics::for_size(10.0 * scale),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Everything a pass needs that does not change while it runs.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConstants {
    pub size: SurfaceSize,
    pub scale: f64,
    pub fonts: FontSet,
    pub observer: Observer,
    pub ut: DateTime<Utc>,
    pub jd_ut: f64,
    /// Dynamically corrected time (UT + ΔT) used for ephemeris queries.
    pub jd_et: f64,
    pub ink_saver: bool,
    pub full_draw: bool,
    pub pointer: Option<ScreenPoint>,
    pub previous_selection: Option<BodyId>,
}

#[derive(Clone, Debug)]
pub struct FrameInput {
    pub size: SurfaceSize,
    pub scale: f64,
    pub fonts: Option<FontSet>,
    pub observer: Observer,
    pub time: DateTime<Utc>,
    pub ink_saver: bool,
    pub full_draw: bool,
    pub pointer: Option<ScreenPoint>,
    pub previous_selection: Option<BodyId>,
}

impl FrameConstants {
    pub fn new(input: FrameInput) -> Self {
        let scale = if input.scale.is_finite() && input.scale > 0.0 {
            input.scale
        } else {
            1.0
        };
        let jd_ut = julian_day(input.time);
        Self {
            size: input.size,
            scale,
            fonts: input.fonts.unwrap_or_else(|| FontSet::scaled(scale)),
            observer: input.observer,
            ut: input.time,
            jd_ut,
            jd_et: jd_ut + delta_t_seconds(jd_ut) / 86_400.0,
            ink_saver: input.ink_saver,
            full_draw: input.full_draw,
            pointer: input.pointer,
            previous_selection: input.previous_selection,
        }
    }

    pub fn width(&self) -> f64 {
        self.size.width as f64
    }

    pub fn height(&self) -> f64 {
        self.size.height as f64
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width() / 2.0, self.height() / 2.0)
    }

    pub fn local_sidereal_deg(&self) -> f64 {
        astro::local_sidereal_deg(self.jd_ut, self.observer.longitude_deg)
    }

    pub fn color(&self, color: Rgba) -> Rgba {
        color.themed(self.ink_saver)
    }
}

/// Per-pass collectors. Created empty for every pass and dropped afterwards.
#[derive(Debug)]
pub struct FrameAccumulators {
    pub labels: LabelLayout,
    pub zbuffer: ZBuffer,
    pub picker: SelectionTracker,
}

impl FrameAccumulators {
    pub fn new(frame: &FrameConstants) -> Self {
        Self {
            labels: LabelLayout::new(frame.scale, frame.pointer),
            zbuffer: ZBuffer::default(),
            picker: SelectionTracker::new(frame.pointer, frame.scale, frame.previous_selection),
        }
    }
}

/// What a chart sees while drawing one pass.
pub struct DrawingContext<'a> {
    pub frame: &'a FrameConstants,
    pub acc: &'a mut FrameAccumulators,
    pub surface: &'a mut dyn Surface,
    pub ephemeris: &'a dyn Ephemeris,
    pub config: &'a RenderConfig,
    pub clock: &'a dyn Clock,
}

impl DrawingContext<'_> {
    pub fn color(&self, color: Rgba) -> Rgba {
        self.frame.color(color)
    }

    pub fn is_quick(&self) -> bool {
        !self.frame.full_draw
    }
}

pub fn julian_day(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / MS_PER_DAY + UNIX_EPOCH_JD
}

/// ΔT = TT − UT in seconds (Espenak & Meeus polynomial fits).
pub fn delta_t_seconds(jd: f64) -> f64 {
    let y = 2000.0 + (jd - J2000_JD) / 365.25;
    if (1986.0..2005.0).contains(&y) {
        let t = y - 2000.0;
        63.86 + 0.3345 * t - 0.060374 * t.powi(2)
            + 0.0017275 * t.powi(3)
            + 0.000651814 * t.powi(4)
            + 0.00002373599 * t.powi(5)
    } else if (2005.0..2050.0).contains(&y) {
        let t = y - 2000.0;
        62.92 + 0.32217 * t + 0.005589 * t * t
    } else if (2050.0..2150.0).contains(&y) {
        let u = (y - 1820.0) / 100.0;
        -20.0 + 32.0 * u * u - 0.5628 * (2150.0 - y)
    } else {
        let u = (y - 1820.0) / 100.0;
        -20.0 + 32.0 * u * u
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn julian_day_of_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).single().expect("valid date");
        assert!((julian_day(t) - J2000_JD).abs() < 1e-9);
    }

    #[test]
    fn delta_t_near_2020_is_about_seventy_seconds() {
        let jd = J2000_JD + 20.0 * 365.25;
        let dt = delta_t_seconds(jd);
        assert!((69.0..73.0).contains(&dt), "ΔT(2020) = {dt}");
    }

    #[test]
    fn ephemeris_time_runs_ahead_of_ut() {
        let t = Utc.with_ymd_and_hms(2024, 4, 8, 18, 0, 0).single().expect("valid date");
        let frame = FrameConstants::new(FrameInput {
            size: SurfaceSize::new(100, 50),
            scale: 0.0,
            fonts: None,
            observer: Observer::default(),
            time: t,
            ink_saver: false,
            full_draw: true,
            pointer: None,
            previous_selection: None,
        });
        assert_eq!(frame.scale, 1.0, "invalid scale falls back to 1");
        assert!(frame.jd_et > frame.jd_ut);
        assert_eq!(frame.center(), ScreenPoint::new(50.0, 25.0));
    }

    #[test]
    fn measured_font_uses_sample_width() {
        let font = FontMetrics::measured(10.0, "MMMM", 32.0);
        assert_eq!(font.char_width, 8.0);
        assert_eq!(font.text_width("abc"), 24.0);
    }
}
