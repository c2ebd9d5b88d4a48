use std::collections::VecDeque;

use tracing::debug;

use crate::colors::Rgba;
use crate::surface::Raster;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Unvisited,
    Queued,
    Full,
    Partial(u8),
}

/// Eclipse-magnitude bars. Cells at or above `search` are shaded fully and
/// expand the fill; cells between the bars are shaded with interpolated alpha
/// but do not expand; anything below `visible` is left alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowThresholds {
    pub visible: f64,
    pub search: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    pub evaluated: usize,
    pub full: usize,
    pub partial: usize,
    pub complete: bool,
}

impl FillStats {
    pub fn painted(&self) -> usize {
        self.full + self.partial
    }
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Breadth-first shadow fill over an equirectangular map. The map wraps
/// left/right; stepping past the top or bottom row reflects over the pole,
/// staying on the edge row half a map width away.
#[derive(Clone, Debug)]
pub struct ShadowPainter {
    width: u32,
    height: u32,
    thresholds: ShadowThresholds,
    color: Rgba,
    states: Vec<CellState>,
    queue: VecDeque<(u32, u32)>,
    overlay: Raster,
    stats: FillStats,
}

impl ShadowPainter {
    pub fn new(width: u32, height: u32, thresholds: ShadowThresholds, color: Rgba) -> Self {
        Self {
            width,
            height,
            thresholds,
            color,
            states: vec![CellState::Unvisited; width as usize * height as usize],
            queue: VecDeque::new(),
            overlay: Raster::new(width, height),
            stats: FillStats::default(),
        }
    }

    pub fn overlay(&self) -> &Raster {
        &self.overlay
    }

    pub fn stats(&self) -> FillStats {
        self.stats
    }

    pub fn state(&self, x: u32, y: u32) -> Option<CellState> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.states.get(self.index(x, y)).copied()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn neighbour(&self, x: u32, y: u32, dx: i64, dy: i64) -> (u32, u32) {
        let w = self.width as i64;
        let h = self.height as i64;
        let mut nx = x as i64 + dx;
        let mut ny = y as i64 + dy;
        if ny < 0 {
            ny = 0;
            nx += w / 2;
        } else if ny >= h {
            ny = h - 1;
            nx += w / 2;
        }
        (nx.rem_euclid(w) as u32, ny as u32)
    }

    fn evaluate<F>(&mut self, x: u32, y: u32, magnitude: &mut F)
    where
        F: FnMut(u32, u32) -> f64,
    {
        let m = magnitude(x, y);
        self.stats.evaluated += 1;
        let idx = self.index(x, y);
        let ShadowThresholds { visible, search } = self.thresholds;
        if m >= search {
            self.states[idx] = CellState::Queued;
            self.queue.push_back((x, y));
            self.overlay.set_pixel(x, y, self.color);
            self.stats.full += 1;
        } else if m >= visible {
            let span = (search - visible).max(f64::EPSILON);
            let k = ((m - visible) / span).clamp(0.0, 1.0);
            let alpha = (k * self.color.a as f64).round() as u8;
            self.states[idx] = CellState::Partial(alpha);
            self.overlay.set_pixel(x, y, self.color.with_alpha(alpha));
            self.stats.partial += 1;
        }
    }

    /// Evaluates the seed cell. Returns false when it is below the visible bar.
    pub fn seed<F>(&mut self, x: u32, y: u32, magnitude: &mut F) -> bool
    where
        F: FnMut(u32, u32) -> f64,
    {
        if x >= self.width || y >= self.height {
            self.stats.complete = true;
            return false;
        }
        if self.states[self.index(x, y)] == CellState::Unvisited {
            self.evaluate(x, y, magnitude);
        }
        let seeded = self.states[self.index(x, y)] != CellState::Unvisited;
        self.stats.complete = self.queue.is_empty();
        seeded
    }

    /// Expands the fill until the queue drains or `should_yield` asks to stop.
    /// Call again to resume.
    pub fn run_until<F, Y>(&mut self, magnitude: &mut F, mut should_yield: Y) -> FillStats
    where
        F: FnMut(u32, u32) -> f64,
        Y: FnMut() -> bool,
    {
        while let Some((x, y)) = self.queue.pop_front() {
            let idx = self.index(x, y);
            self.states[idx] = CellState::Full;
            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = self.neighbour(x, y, dx, dy);
                if self.states[self.index(nx, ny)] == CellState::Unvisited {
                    self.evaluate(nx, ny, magnitude);
                }
            }
            if !self.queue.is_empty() && should_yield() {
                debug!(queued = self.queue.len(), "shadow fill yielding");
                self.stats.complete = false;
                return self.stats;
            }
        }
        self.stats.complete = true;
        self.stats
    }

    /// Seed and fill to completion.
    pub fn paint<F>(&mut self, seed: (u32, u32), mut magnitude: F) -> FillStats
    where
        F: FnMut(u32, u32) -> f64,
    {
        if !self.seed(seed.0, seed.1, &mut magnitude) {
            return self.stats;
        }
        self.run_until(&mut magnitude, || false)
    }
}
