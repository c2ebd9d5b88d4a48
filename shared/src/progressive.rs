use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::colors::Rgba;
use crate::surface::Raster;
use crate::timers::Clock;

/// Five-minute slots in a day: raster width.
pub const SLOTS_PER_DAY: u32 = 288;
/// Edge of the coarsest preview tile.
pub const INITIAL_TILE: u32 = 32;

pub trait CellShader {
    fn shade(&mut self, day: u32, slot: u32) -> Rgba;
}

impl<F> CellShader for F
where
    F: FnMut(u32, u32) -> Rgba,
{
    fn shade(&mut self, day: u32, slot: u32) -> Rgba {
        self(day, slot)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Complete,
}

/// Coarse-to-fine painter for the day-of-year by time-of-day raster. Each
/// level paints tiles of the current size, skipping tiles a coarser level
/// already painted at the same origin, then halves the size.
#[derive(Clone, Debug)]
pub struct ProgressiveRenderer {
    raster: Raster,
    tile: u32,
    row: u32,
    complete: bool,
}

pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |d| d.ordinal())
}

impl ProgressiveRenderer {
    pub fn new(days: u32) -> Self {
        Self {
            raster: Raster::new(SLOTS_PER_DAY, days),
            tile: INITIAL_TILE,
            row: 0,
            complete: days == 0,
        }
    }

    pub fn for_year(year: i32) -> Self {
        Self::new(days_in_year(year))
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn tile_size(&self) -> u32 {
        self.tile
    }

    /// Start over from the coarsest level, keeping the old pixels as a preview.
    pub fn restart(&mut self) {
        self.tile = INITIAL_TILE;
        self.row = 0;
        self.complete = self.raster.height() == 0;
    }

    fn paint_row<S: CellShader>(&mut self, shader: &mut S) {
        let tile = self.tile;
        let r = self.row;
        for c in (0..self.raster.width()).step_by(tile as usize) {
            let covered = tile < INITIAL_TILE && r % (2 * tile) == 0 && c % (2 * tile) == 0;
            if covered {
                continue;
            }
            let color = shader.shade(r, c);
            self.raster.fill_block(c, r, tile, tile, color);
        }
    }

    /// Paints rows until the image completes or `budget_ms` elapses; the
    /// budget is checked between rows. `None` runs to completion.
    pub fn step<S: CellShader>(&mut self, shader: &mut S, clock: &dyn Clock, budget_ms: Option<f64>) -> Progress {
        let start = clock.now_ms();
        while !self.complete {
            self.paint_row(shader);
            self.row += self.tile;
            if self.row >= self.raster.height() {
                if self.tile == 1 {
                    self.complete = true;
                    info!(days = self.raster.height(), "insolation image complete");
                    break;
                }
                self.tile /= 2;
                self.row = 0;
                debug!(tile = self.tile, "progressive level done");
            }
            if budget_ms.is_some_and(|budget| clock.now_ms() - start >= budget) {
                return Progress::Continue;
            }
        }
        Progress::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualTimers;

    fn pattern(day: u32, slot: u32) -> Rgba {
        Rgba::rgb((day % 251) as u8, (slot % 253) as u8, ((day * 7 + slot * 3) % 255) as u8)
    }

    #[test]
    fn year_lengths() {
        assert_eq!(days_in_year(2023), 365);
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(ProgressiveRenderer::for_year(2024).raster().height(), 366);
    }

    #[test]
    fn unbounded_call_completes_with_exact_cells() {
        let clock = ManualTimers::default();
        let mut renderer = ProgressiveRenderer::new(365);
        let mut shader = pattern;
        assert_eq!(renderer.step(&mut shader, &clock, None), Progress::Complete);
        assert!(renderer.is_complete());
        for (day, slot) in [(0, 0), (1, 1), (364, 287), (100, 33), (32, 64)] {
            assert_eq!(renderer.raster().pixel(slot, day), Some(pattern(day, slot)));
        }
    }

    #[test]
    fn time_boxed_calls_match_single_call() {
        let mut reference = ProgressiveRenderer::new(366);
        let still = ManualTimers::default();
        reference.step(&mut pattern, &still, None);

        let timers = ManualTimers::default();
        let clock = timers.clock_handle();
        let mut shader = |day: u32, slot: u32| {
            clock.set(clock.get() + 0.01);
            pattern(day, slot)
        };
        let mut renderer = ProgressiveRenderer::new(366);
        let mut calls = 0;
        while renderer.step(&mut shader, &timers, Some(5.0)) == Progress::Continue {
            calls += 1;
            assert!(calls < 10_000, "renderer never completes");
        }
        assert!(calls > 5, "expected several time-boxed calls, got {calls}");
        assert_eq!(renderer.raster(), reference.raster());
    }

    #[test]
    fn first_slice_is_a_blocky_preview() {
        let timers = ManualTimers::default();
        let clock = timers.clock_handle();
        let mut shader = |day: u32, slot: u32| {
            clock.set(clock.get() + 1.0);
            pattern(day, slot)
        };
        let mut renderer = ProgressiveRenderer::new(365);
        assert_eq!(renderer.step(&mut shader, &timers, Some(1.0)), Progress::Continue);
        assert_eq!(renderer.tile_size(), INITIAL_TILE);
        // The whole first 32x32 block carries the colour of its origin cell.
        assert_eq!(renderer.raster().pixel(31, 31), Some(pattern(0, 0)));
        assert_eq!(renderer.raster().pixel(0, 40), Some(Rgba::TRANSPARENT));
    }
}
