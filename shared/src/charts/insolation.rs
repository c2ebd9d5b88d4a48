use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};

use super::{Chart, DrawOutcome};
use crate::astro;
use crate::colors::{Rgba, insolation_color};
use crate::frame::{DrawingContext, Observer, delta_t_seconds, julian_day};
use crate::geom::ScreenPoint;
use crate::progressive::{Progress, ProgressiveRenderer, SLOTS_PER_DAY};
use crate::surface::Raster;

const MINUTES_PER_SLOT: f64 = 1440.0 / SLOTS_PER_DAY as f64;

#[derive(Clone, Copy, Debug, PartialEq)]
struct ImageKey {
    year: i32,
    observer: Observer,
}

/// Sun altitude over a whole year at the observer's location: one row per
/// local day, one column per five-minute slot. Painted coarse-to-fine across
/// as many passes as the time budget needs.
#[derive(Debug, Default)]
pub struct InsolationChart {
    renderer: Option<ProgressiveRenderer>,
    key: Option<ImageKey>,
}

impl InsolationChart {
    pub fn raster(&self) -> Option<&Raster> {
        self.renderer.as_ref().map(ProgressiveRenderer::raster)
    }

    pub fn is_complete(&self) -> bool {
        self.renderer.as_ref().is_some_and(ProgressiveRenderer::is_complete)
    }

    fn local_year(ctx: &DrawingContext<'_>) -> i32 {
        (ctx.frame.ut + TimeDelta::minutes(ctx.frame.observer.utc_offset_minutes as i64)).year()
    }

    /// Julian day (UT) of local midnight opening January 1st.
    fn year_start_jd(key: &ImageKey) -> f64 {
        let midnight = NaiveDate::from_ymd_opt(key.year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
        match midnight {
            Some(naive) => {
                let utc = Utc.from_utc_datetime(&naive)
                    - TimeDelta::minutes(key.observer.utc_offset_minutes as i64);
                julian_day(utc)
            }
            None => julian_day(DateTime::<Utc>::default()),
        }
    }

    /// Day and slot of the frame's instant, for the "now" marker.
    fn now_cell(ctx: &DrawingContext<'_>, start_jd: f64) -> (f64, f64) {
        let offset = ctx.frame.jd_ut - start_jd;
        let day = offset.floor();
        (day, (offset - day) * SLOTS_PER_DAY as f64)
    }
}

impl Chart for InsolationChart {
    fn name(&self) -> &'static str {
        "insolation"
    }

    fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
        let key = ImageKey {
            year: Self::local_year(ctx),
            observer: ctx.frame.observer,
        };
        if self.key != Some(key) {
            let days = crate::progressive::days_in_year(key.year);
            match self.renderer.as_mut() {
                // Same raster size: keep the old image as a preview while repainting.
                Some(renderer) if renderer.raster().height() == days => renderer.restart(),
                _ => self.renderer = Some(ProgressiveRenderer::new(days)),
            }
            self.key = Some(key);
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return DrawOutcome::default();
        };

        let start_jd = Self::year_start_jd(&key);
        let delta_t_days = delta_t_seconds(start_jd) / 86_400.0;
        let ephemeris = ctx.ephemeris;
        let sun = ephemeris.sun();
        let mut shader = |day: u32, slot: u32| -> Rgba {
            let jd_ut = start_jd + day as f64 + slot as f64 * MINUTES_PER_SLOT / 1440.0;
            let jd_et = jd_ut + delta_t_days;
            let (ra, dec) = sun
                .and_then(|id| ephemeris.position(id, jd_et))
                .map(|p| (p.ra_deg, p.dec_deg))
                .unwrap_or_else(|| {
                    let (ra, dec, _) = astro::approximate_sun(jd_et);
                    (ra, dec)
                });
            let lst = astro::local_sidereal_deg(jd_ut, key.observer.longitude_deg);
            let hz = astro::equatorial_to_horizontal(ra, dec, lst, key.observer.latitude_deg);
            insolation_color(hz.altitude_deg)
        };
        let progress = renderer.step(&mut shader, ctx.clock, Some(ctx.config.progressive_budget_ms));

        let raster = renderer.raster();
        let x = ((ctx.frame.width() - raster.width() as f64) / 2.0).max(0.0).floor();
        let y = ((ctx.frame.height() - raster.height() as f64) / 2.0).max(0.0).floor();
        ctx.surface.blit(raster, x as i32, y as i32);

        let (day, slot) = Self::now_cell(ctx, start_jd);
        if (0.0..raster.height() as f64).contains(&day) {
            let marker = ctx.color(Rgba::SELECTION);
            let (w, h) = (raster.width() as f64, raster.height() as f64);
            ctx.surface
                .stroke_line(ScreenPoint::new(x, y + day), ScreenPoint::new(x + w, y + day), marker);
            ctx.surface
                .stroke_line(ScreenPoint::new(x + slot, y), ScreenPoint::new(x + slot, y + h), marker);
        }

        DrawOutcome {
            continuation: progress == Progress::Continue,
            ..DrawOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::ephemeris::CatalogEphemeris;
    use crate::testing::{DrawOp, TickingClock, draw_chart, test_frame};

    fn config(budget_ms: f64) -> RenderConfig {
        RenderConfig {
            progressive_budget_ms: budget_ms,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn image_builds_over_several_passes() {
        let eph = CatalogEphemeris::sample();
        let clock = TickingClock::default();
        let mut chart = InsolationChart::default();
        let config = config(20.0);
        let first = draw_chart(&mut chart, &eph, &config, test_frame(400, 400, true, None), &clock);
        assert!(first.outcome.continuation);
        assert!(first.surface.ops().contains(&DrawOp::Blit {
            x: 56,
            y: 17,
            width: 288,
            height: 366
        }));

        let mut passes = 1;
        while !chart.is_complete() {
            let pass = draw_chart(&mut chart, &eph, &config, test_frame(400, 400, true, None), &clock);
            passes += 1;
            assert_eq!(pass.outcome.continuation, !chart.is_complete());
            assert!(passes < 10_000);
        }
        assert!(passes > 2);
    }

    #[test]
    fn summer_noon_is_bright_and_winter_midnight_dark() {
        let eph = CatalogEphemeris::sample();
        let clock = TickingClock::default();
        let mut chart = InsolationChart::default();
        let unbounded = config(f64::MAX);
        draw_chart(&mut chart, &eph, &unbounded, test_frame(300, 400, true, None), &clock);
        assert!(chart.is_complete());
        let raster = chart.raster().expect("image allocated");
        let noon = raster.pixel(144, 171).expect("in range");
        let midnight = raster.pixel(0, 10).expect("in range");
        assert!(noon.r > 240 && noon.g > 230, "{noon:?}");
        assert!(midnight.r < 20 && midnight.b < 50, "{midnight:?}");
    }

    #[test]
    fn moving_the_observer_restarts_the_image() {
        let eph = CatalogEphemeris::sample();
        let clock = TickingClock::default();
        let mut chart = InsolationChart::default();
        let unbounded = config(f64::MAX);
        draw_chart(&mut chart, &eph, &unbounded, test_frame(300, 400, true, None), &clock);
        assert!(chart.is_complete());

        let mut moved = test_frame(300, 400, true, None);
        moved.observer.latitude_deg = -33.9;
        let pass = draw_chart(&mut chart, &eph, &config(5.0), moved, &clock);
        assert!(pass.outcome.continuation);
        assert!(!chart.is_complete());
    }
}
