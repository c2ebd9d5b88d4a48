//! Deterministic hosts for engine tests: a hand-cranked timer queue and a
//! surface that records draw calls instead of rasterizing.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use crate::charts::{Chart, DrawOutcome};
use crate::colors::Rgba;
use crate::config::RenderConfig;
use crate::ephemeris::Ephemeris;
use crate::frame::{DrawingContext, FontMetrics, FrameAccumulators, FrameConstants, FrameInput, Observer};
use crate::geom::{Rect, ScreenPoint, SurfaceSize};
use crate::surface::{Raster, Surface};
use crate::timers::{Clock, TimerHost, TimerId};

/// Virtual clock plus timer queue. Time only moves when a test moves it.
#[derive(Debug, Default)]
pub struct ManualTimers {
    now: Rc<Cell<f64>>,
    next_id: u64,
    pending: BTreeMap<TimerId, f64>,
    cancelled: Vec<TimerId>,
}

impl ManualTimers {
    /// Shared handle to the clock, for fakes that simulate work taking time.
    pub fn clock_handle(&self) -> Rc<Cell<f64>> {
        Rc::clone(&self.now)
    }

    pub fn set_now(&mut self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&mut self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_cancelled(&self, id: TimerId) -> bool {
        self.cancelled.contains(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<f64> {
        self.pending.get(&id).copied()
    }

    /// Removes the earliest timer due at or before `until` and moves the
    /// clock to its deadline.
    pub fn pop_due(&mut self, until: f64) -> Option<TimerId> {
        let (&id, &deadline) = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= until)
            .min_by(|a, b| a.1.total_cmp(b.1).then(a.0.cmp(b.0)))?;
        self.pending.remove(&id);
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
        Some(id)
    }
}

impl Clock for ManualTimers {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl TimerHost for ManualTimers {
    fn arm(&mut self, delay_ms: f64) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.insert(id, self.now.get() + delay_ms.max(0.0));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if self.pending.remove(&id).is_some() {
            self.cancelled.push(id);
        }
    }
}

/// Clock that advances one millisecond every time it is read, so any
/// time-boxed loop yields after a predictable amount of work.
#[derive(Debug, Default)]
pub struct TickingClock(Cell<f64>);

impl Clock for TickingClock {
    fn now_ms(&self) -> f64 {
        let now = self.0.get();
        self.0.set(now + 1.0);
        now
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear(Rgba),
    FillRect { rect: Rect, color: Rgba },
    RectOutline { rect: Rect, color: Rgba, line_width: f64 },
    Line { from: ScreenPoint, to: ScreenPoint, color: Rgba, line_width: f64 },
    Circle { center: ScreenPoint, radius: f64, color: Rgba, line_width: f64 },
    FillCircle { center: ScreenPoint, radius: f64, color: Rgba },
    Text { text: String, at: ScreenPoint, color: Rgba },
    Blit { x: i32, y: i32, width: u32, height: u32 },
}

/// Surface that logs every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    size: SurfaceSize,
    line_width: f64,
    ops: Vec<DrawOp>,
    resizes: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width, height),
            line_width: 1.0,
            ops: Vec::new(),
            resizes: 0,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    pub fn clear_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Clear(_))).count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.resizes += 1;
    }

    fn clear(&mut self, color: Rgba) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba) {
        self.ops.push(DrawOp::RectOutline {
            rect,
            color,
            line_width: self.line_width,
        });
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgba) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            color,
            line_width: self.line_width,
        });
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            color,
            line_width: self.line_width,
        });
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        self.ops.push(DrawOp::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, at: ScreenPoint, _font: &FontMetrics, color: Rgba) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            at,
            color,
        });
    }

    fn line_width(&self) -> f64 {
        self.line_width
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn blit(&mut self, raster: &Raster, x: i32, y: i32) {
        self.ops.push(DrawOp::Blit {
            x,
            y,
            width: raster.width(),
            height: raster.height(),
        });
    }
}

/// New York, 2024-01-15 03:00 UTC: Orion high in the south.
pub fn evening_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn new_york() -> Observer {
    Observer {
        longitude_deg: -74.0,
        latitude_deg: 40.7,
        utc_offset_minutes: -300,
    }
}

pub fn test_frame(width: u32, height: u32, full_draw: bool, pointer: Option<ScreenPoint>) -> FrameConstants {
    FrameConstants::new(FrameInput {
        size: SurfaceSize::new(width, height),
        scale: 1.0,
        fonts: None,
        observer: new_york(),
        time: evening_time(),
        ink_saver: false,
        full_draw,
        pointer,
        previous_selection: None,
    })
}

/// Everything one chart pass produced, before the governor's finishing steps.
pub struct ChartPass {
    pub frame: FrameConstants,
    pub acc: FrameAccumulators,
    pub surface: RecordingSurface,
    pub outcome: DrawOutcome,
}

/// Draws a single pass of `chart` onto a recording surface.
pub fn draw_chart(
    chart: &mut dyn Chart,
    ephemeris: &dyn Ephemeris,
    config: &RenderConfig,
    frame: FrameConstants,
    clock: &dyn Clock,
) -> ChartPass {
    let mut acc = FrameAccumulators::new(&frame);
    let mut surface = RecordingSurface::new(frame.size.width, frame.size.height);
    let outcome = {
        let mut ctx = DrawingContext {
            frame: &frame,
            acc: &mut acc,
            surface: &mut surface,
            ephemeris,
            config,
            clock,
        };
        chart.draw(&mut ctx)
    };
    ChartPass {
        frame,
        acc,
        surface,
        outcome,
    }
}
