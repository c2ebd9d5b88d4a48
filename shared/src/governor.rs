use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::charts::Chart;
use crate::colors::Rgba;
use crate::config::RenderConfig;
use crate::ephemeris::{BodyId, Ephemeris};
use crate::frame::{DrawingContext, FontSet, FrameAccumulators, FrameConstants, FrameInput, Observer};
use crate::geom::{ScreenPoint, SurfaceSize};
use crate::labels::LabelInfo;
use crate::marquee::{self, CursorStyle, MarqueeFields};
use crate::picker::{self, PickCandidate, Selection, SelectionChange};
use crate::surface::Surface;
use crate::timers::{Clock, Throttle, ThrottleDecision, TimerHost, TimerId, TimerSlot};

/// Radius of the ring drawn around the selected body, logical px.
const SELECTION_RING_PX: f64 = 9.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Full,
    Quick,
    /// Follow-up pass for a chart with incremental work pending.
    Continuation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    pub kind: PassKind,
    pub cost_ms: f64,
    pub selection: Option<Selection>,
    pub selection_change: Option<SelectionChange>,
    pub cursor: CursorStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RedrawOutcome {
    /// The view is not the active tab.
    Inactive,
    /// Zero-area surface; retried on the next natural trigger.
    NothingToDraw,
    Drawn(PassReport),
}

impl RedrawOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            RedrawOutcome::Drawn(report) => Some(report),
            _ => None,
        }
    }
}

/// Observer, time and font inputs supplied by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneInputs {
    pub observer: Observer,
    pub time: DateTime<Utc>,
    pub fonts: Option<FontSet>,
}

/// What survives a pass, for hover and hit queries until the next one.
#[derive(Clone, Debug)]
pub struct LastFrame {
    pub frame: FrameConstants,
    pub selection: Option<Selection>,
    pub labels: Vec<LabelInfo>,
    candidates: Vec<PickCandidate>,
}

impl LastFrame {
    pub fn hit_test(&self, point: ScreenPoint) -> Option<Selection> {
        picker::hit_test(&self.candidates, point, self.frame.scale)
    }
}

struct HostClock<'a>(&'a dyn TimerHost);

impl Clock for HostClock<'_> {
    fn now_ms(&self) -> f64 {
        self.0.now_ms()
    }
}

/// Owns the surface and decides when and how thoroughly to redraw. Timers
/// come from the host; the host routes each elapsed id back to [`on_timer`].
///
/// [`on_timer`]: RenderGovernor::on_timer
pub struct RenderGovernor<S: Surface> {
    surface: S,
    chart: Box<dyn Chart>,
    ephemeris: Box<dyn Ephemeris>,
    config: RenderConfig,
    scene: SceneInputs,
    scale: f64,
    active: bool,
    pointer: Option<ScreenPoint>,
    slow_streak: u32,
    last_request_ms: Option<f64>,
    deferred_full: TimerSlot,
    resize: TimerSlot,
    pending_size: Option<(SurfaceSize, f64)>,
    pointer_redraw: TimerSlot,
    pointer_throttle: Throttle,
    continuation: TimerSlot,
    last_frame: Option<LastFrame>,
    selection: Option<BodyId>,
}

impl<S: Surface> RenderGovernor<S> {
    pub fn new(
        surface: S,
        chart: Box<dyn Chart>,
        ephemeris: Box<dyn Ephemeris>,
        config: RenderConfig,
        scene: SceneInputs,
    ) -> Self {
        let throttle = Throttle::new(config.governor.pointer_throttle_ms);
        Self {
            surface,
            chart,
            ephemeris,
            config,
            scene,
            scale: 1.0,
            active: true,
            pointer: None,
            slow_streak: 0,
            last_request_ms: None,
            deferred_full: TimerSlot::default(),
            resize: TimerSlot::default(),
            pending_size: None,
            pointer_redraw: TimerSlot::default(),
            pointer_throttle: throttle,
            continuation: TimerSlot::default(),
            last_frame: None,
            selection: None,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn chart_name(&self) -> &'static str {
        self.chart.name()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn slow_streak(&self) -> u32 {
        self.slow_streak
    }

    pub fn is_quick_mode(&self) -> bool {
        self.slow_streak >= self.config.governor.slow_frame_count
    }

    pub fn last_frame(&self) -> Option<&LastFrame> {
        self.last_frame.as_ref()
    }

    pub fn selection(&self) -> Option<BodyId> {
        self.selection
    }

    pub fn has_pending_work(&self) -> bool {
        self.deferred_full.is_pending()
            || self.resize.is_pending()
            || self.pointer_redraw.is_pending()
            || self.continuation.is_pending()
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.pointer_throttle = Throttle::new(config.governor.pointer_throttle_ms);
        self.config = config;
    }

    pub fn set_chart(&mut self, chart: Box<dyn Chart>) {
        self.chart = chart;
        self.last_frame = None;
        self.selection = None;
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.scene.time = time;
    }

    pub fn set_observer(&mut self, observer: Observer) {
        self.scene.observer = observer;
    }

    pub fn set_selection(&mut self, body: Option<BodyId>) {
        self.selection = body;
    }

    /// Scheduled callbacks stay armed while inactive and no-op when they fire.
    /// Becoming active again applies any pending resize and redraws.
    pub fn set_active(&mut self, active: bool, host: &mut dyn TimerHost) -> Option<RedrawOutcome> {
        if self.active == active {
            return None;
        }
        self.active = active;
        debug!(chart = self.chart.name(), active, "view activity changed");
        if !active {
            return None;
        }
        if self.pending_size.is_some() && !self.resize.is_pending() {
            return self.apply_resize(host);
        }
        Some(self.request_redraw(true, host))
    }

    /// Redraws now, fully or quickly. After `slow_frame_count` consecutive
    /// slow full passes, unforced requests draw quickly and defer a full pass.
    pub fn request_redraw(&mut self, force: bool, host: &mut dyn TimerHost) -> RedrawOutcome {
        if !self.active {
            return RedrawOutcome::Inactive;
        }
        let now = host.now_ms();
        let quiet = self
            .last_request_ms
            .is_some_and(|last| now - last >= self.config.governor.quiet_reset_ms);
        if (force || quiet) && self.slow_streak > 0 {
            if self.is_quick_mode() {
                info!(chart = self.chart.name(), force, "leaving quick mode");
            }
            self.slow_streak = 0;
        }
        self.last_request_ms = Some(now);

        if self.is_quick_mode() {
            self.deferred_full.rearm(host, self.config.governor.deferred_full_ms);
            self.run_pass(PassKind::Quick, host)
        } else {
            self.deferred_full.cancel(host);
            self.run_pass(PassKind::Full, host)
        }
    }

    /// Debounced: only the last size within the window is applied.
    pub fn request_resize(&mut self, width: f64, height: f64, scale: f64, host: &mut dyn TimerHost) {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self.pending_size = Some((SurfaceSize::from_logical(width, height, scale), scale));
        self.resize.rearm(host, self.config.governor.resize_debounce_ms);
    }

    fn apply_resize(&mut self, host: &mut dyn TimerHost) -> Option<RedrawOutcome> {
        let (size, scale) = self.pending_size.take()?;
        self.scale = scale;
        if size != self.surface.size() {
            info!(width = size.width, height = size.height, scale, "reallocating surface");
            self.surface.resize(size);
        } else {
            debug!("resize kept existing surface");
        }
        Some(self.request_redraw(true, host))
    }

    /// Caches the pointer and redraws at most once per throttle window,
    /// with a trailing redraw at the end of a busy window.
    pub fn pointer_moved(&mut self, point: Option<ScreenPoint>, host: &mut dyn TimerHost) -> Option<RedrawOutcome> {
        self.pointer = point.filter(ScreenPoint::is_finite);
        if !self.active {
            return None;
        }
        match self.pointer_throttle.check(host.now_ms()) {
            ThrottleDecision::Run => Some(self.request_redraw(false, host)),
            ThrottleDecision::Trailing { delay_ms } => {
                self.pointer_redraw.arm_if_idle(host, delay_ms);
                None
            }
        }
    }

    /// Dispatches an elapsed timer. Ids the governor no longer tracks are ignored.
    pub fn on_timer(&mut self, id: TimerId, host: &mut dyn TimerHost) -> Option<RedrawOutcome> {
        if self.deferred_full.fire(id) {
            if !self.active {
                return None;
            }
            debug!(chart = self.chart.name(), "deferred full pass");
            return Some(self.run_pass(PassKind::Full, host));
        }
        if self.resize.fire(id) {
            if !self.active {
                return None;
            }
            return self.apply_resize(host);
        }
        if self.pointer_redraw.fire(id) {
            if !self.active {
                return None;
            }
            self.pointer_throttle.mark(host.now_ms());
            return Some(self.request_redraw(false, host));
        }
        if self.continuation.fire(id) {
            if !self.active {
                return None;
            }
            return Some(self.run_pass(PassKind::Continuation, host));
        }
        None
    }

    pub fn hit_test(&self, point: ScreenPoint) -> Option<Selection> {
        self.last_frame.as_ref()?.hit_test(point)
    }

    /// Status line for the last pass's selection.
    pub fn marquee(&self, fields: &MarqueeFields) -> Option<String> {
        let last = self.last_frame.as_ref()?;
        let selection = last.selection.as_ref()?;
        marquee::describe(selection, fields, self.ephemeris.as_ref(), &last.frame)
    }

    fn hovering(&self, selection: Option<&Selection>) -> bool {
        self.pointer.is_some()
            && selection.is_some_and(|s| s.point.is_some() && s.distance <= picker::PICK_TOLERANCE_PX * self.scale)
    }

    fn run_pass(&mut self, kind: PassKind, host: &mut dyn TimerHost) -> RedrawOutcome {
        let size = self.surface.size();
        if size.is_empty() {
            warn!(chart = self.chart.name(), "zero-area surface, nothing to draw");
            return RedrawOutcome::NothingToDraw;
        }
        let start = host.now_ms();
        let frame = FrameConstants::new(FrameInput {
            size,
            scale: self.scale,
            fonts: self.scene.fonts,
            observer: self.scene.observer,
            time: self.scene.time,
            ink_saver: self.config.ink_saver,
            full_draw: kind != PassKind::Quick,
            pointer: self.pointer,
            previous_selection: self.selection,
        });
        let mut acc = FrameAccumulators::new(&frame);

        self.surface.clear(frame.color(self.chart.background()));
        let outcome = {
            let clock = HostClock(&*host);
            let mut ctx = DrawingContext {
                frame: &frame,
                acc: &mut acc,
                surface: &mut self.surface,
                ephemeris: self.ephemeris.as_ref(),
                config: &self.config,
                clock: &clock,
            };
            self.chart.draw(&mut ctx)
        };

        acc.labels.resolve_overlaps();
        let (selection, selection_change) = acc.picker.finish(&acc.labels);
        acc.zbuffer.paint(&mut self.surface, outcome.max_depth);
        if self.config.show_labels {
            acc.labels.draw(&mut self.surface, frame.ink_saver);
        }
        if let Some(sel) = selection
            && let Some(point) = sel.point
        {
            self.surface
                .stroke_circle(point, SELECTION_RING_PX * frame.scale, frame.color(Rgba::SELECTION));
        }

        let cost_ms = host.now_ms() - start;
        if kind == PassKind::Full {
            self.record_full_cost(cost_ms);
        }
        debug!(chart = self.chart.name(), ?kind, cost_ms, "pass drawn");

        if outcome.continuation {
            self.continuation.arm_if_idle(host, 0.0);
        }
        if let Some(change) = selection_change {
            debug!(previous = ?change.previous, current = ?change.current, "selection changed");
        }
        self.selection = selection.map(|s| s.body);
        let cursor = self.chart.cursor(self.hovering(selection.as_ref()));
        self.last_frame = Some(LastFrame {
            frame,
            selection,
            labels: acc.labels.labels().to_vec(),
            candidates: acc.picker.into_candidates(),
        });
        RedrawOutcome::Drawn(PassReport {
            kind,
            cost_ms,
            selection,
            selection_change,
            cursor,
        })
    }

    fn record_full_cost(&mut self, cost_ms: f64) {
        let tuning = self.config.governor;
        if cost_ms > tuning.slow_frame_ms {
            self.slow_streak = self.slow_streak.saturating_add(1);
            if self.slow_streak == tuning.slow_frame_count {
                info!(chart = self.chart.name(), cost_ms, "entering quick mode");
            }
        } else {
            if self.is_quick_mode() {
                info!(chart = self.chart.name(), cost_ms, "leaving quick mode");
            }
            self.slow_streak = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use chrono::TimeZone;

    use super::*;
    use crate::charts::DrawOutcome;
    use crate::ephemeris::{BodyKind, CatalogEphemeris};
    use crate::labels::{LabelCategory, LabelClass, LabelRequest, LabelSink};
    use crate::picker::{PickBias, Picker};
    use crate::testing::{DrawOp, ManualTimers, RecordingSurface};

    #[derive(Default)]
    struct PassLog {
        passes: RefCell<Vec<bool>>,
        cost_ms: Cell<f64>,
        continuations: Cell<usize>,
    }

    struct FakeChart {
        log: Rc<PassLog>,
        clock: Rc<Cell<f64>>,
        bodies: Vec<(BodyId, ScreenPoint)>,
    }

    impl Chart for FakeChart {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn draw(&mut self, ctx: &mut DrawingContext<'_>) -> DrawOutcome {
            self.log.passes.borrow_mut().push(ctx.frame.full_draw);
            self.clock.set(self.clock.get() + self.log.cost_ms.get());
            ctx.surface.fill_rect(crate::geom::Rect::new(0.0, 0.0, 1.0, 1.0), Rgba::WHITE);
            ctx.acc
                .zbuffer
                .add_line(Rgba::GRID, ScreenPoint::new(0.0, 0.0), ScreenPoint::new(5.0, 5.0), 1.0, false);
            for (body, point) in &self.bodies {
                ctx.acc.picker.qualify(*body, Some(*point), PickBias::Neutral, 0.0);
                ctx.acc.labels.add_label(LabelRequest {
                    body: *body,
                    text: format!("body {}", body.index),
                    anchor: *point,
                    symbol_radius: 2.0,
                    category: LabelCategory::Star,
                    class: LabelClass::Body,
                    color: Rgba::LABEL,
                    font: ctx.frame.fonts.small,
                });
            }
            let pending = self.log.continuations.get();
            if pending > 0 {
                self.log.continuations.set(pending - 1);
            }
            DrawOutcome {
                continuation: pending > 0,
                ..DrawOutcome::default()
            }
        }
    }

    fn governor(width: u32, height: u32) -> (RenderGovernor<RecordingSurface>, ManualTimers, Rc<PassLog>) {
        let timers = ManualTimers::default();
        let log = Rc::new(PassLog::default());
        let chart = FakeChart {
            log: Rc::clone(&log),
            clock: timers.clock_handle(),
            bodies: vec![
                (BodyId::new(BodyKind::Star, 0), ScreenPoint::new(50.0, 50.0)),
                (BodyId::new(BodyKind::Star, 1), ScreenPoint::new(150.0, 120.0)),
            ],
        };
        let scene = SceneInputs {
            observer: Observer::default(),
            time: Utc.with_ymd_and_hms(2024, 3, 20, 21, 0, 0).single().expect("valid date"),
            fonts: None,
        };
        let gov = RenderGovernor::new(
            RecordingSurface::new(width, height),
            Box::new(chart),
            Box::new(CatalogEphemeris::sample()),
            RenderConfig::default(),
            scene,
        );
        (gov, timers, log)
    }

    fn run_timers(gov: &mut RenderGovernor<RecordingSurface>, timers: &mut ManualTimers, until: f64) -> Vec<RedrawOutcome> {
        let mut outcomes = Vec::new();
        while let Some(id) = timers.pop_due(until) {
            if let Some(outcome) = gov.on_timer(id, timers) {
                outcomes.push(outcome);
            }
        }
        if timers.now_ms() < until {
            timers.set_now(until);
        }
        outcomes
    }

    /// Runs every timer due within the next `ms` of virtual time.
    fn run_timers_for(gov: &mut RenderGovernor<RecordingSurface>, timers: &mut ManualTimers, ms: f64) -> Vec<RedrawOutcome> {
        let until = timers.now_ms() + ms;
        run_timers(gov, timers, until)
    }

    fn kind(outcome: &RedrawOutcome) -> Option<PassKind> {
        outcome.report().map(|r| r.kind)
    }

    fn enter_quick_mode(gov: &mut RenderGovernor<RecordingSurface>, timers: &mut ManualTimers, log: &PassLog) {
        log.cost_ms.set(80.0);
        for _ in 0..3 {
            assert_eq!(kind(&gov.request_redraw(false, timers)), Some(PassKind::Full));
            timers.advance(100.0);
        }
        assert!(gov.is_quick_mode());
    }

    #[test]
    fn inactive_view_ignores_redraws() {
        let (mut gov, mut timers, log) = governor(200, 200);
        gov.set_active(false, &mut timers);
        assert_eq!(gov.request_redraw(true, &mut timers), RedrawOutcome::Inactive);
        assert!(log.passes.borrow().is_empty());
        assert!(gov.surface().ops().is_empty());
    }

    #[test]
    fn three_slow_full_passes_switch_to_quick() {
        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        let outcome = gov.request_redraw(false, &mut timers);
        assert_eq!(kind(&outcome), Some(PassKind::Quick));
        assert_eq!(log.passes.borrow().last(), Some(&false));
        assert_eq!(timers.pending_count(), 1, "deferred full pass armed");
    }

    #[test]
    fn fast_pass_resets_the_streak() {
        let (mut gov, mut timers, log) = governor(200, 200);
        log.cost_ms.set(80.0);
        gov.request_redraw(false, &mut timers);
        gov.request_redraw(false, &mut timers);
        log.cost_ms.set(5.0);
        gov.request_redraw(false, &mut timers);
        assert_eq!(gov.slow_streak(), 0);
        log.cost_ms.set(80.0);
        gov.request_redraw(false, &mut timers);
        assert!(!gov.is_quick_mode());
    }

    #[test]
    fn deferred_full_pass_is_rescheduled_not_duplicated() {
        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        log.cost_ms.set(0.0);
        let start = timers.now_ms();
        gov.request_redraw(false, &mut timers);
        timers.advance(500.0);
        gov.request_redraw(false, &mut timers);
        timers.advance(500.0);
        gov.request_redraw(false, &mut timers);
        assert_eq!(timers.pending_count(), 1);

        // The first deadline would have been start + 1500; nothing fires there.
        assert!(run_timers(&mut gov, &mut timers, start + 1500.0).is_empty());
        let fired = run_timers(&mut gov, &mut timers, start + 1000.0 + 1500.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(kind(&fired[0]), Some(PassKind::Full));
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn force_and_quiet_period_leave_quick_mode() {
        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        assert_eq!(kind(&gov.request_redraw(true, &mut timers)), Some(PassKind::Full));

        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        timers.advance(3000.0);
        assert_eq!(kind(&gov.request_redraw(false, &mut timers)), Some(PassKind::Full));
    }

    #[test]
    fn full_pass_cancels_pending_deferred_pass() {
        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        gov.request_redraw(false, &mut timers);
        assert_eq!(timers.pending_count(), 1);
        gov.request_redraw(true, &mut timers);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn resize_is_debounced_and_reuses_same_size() {
        let (mut gov, mut timers, log) = governor(200, 100);
        for _ in 0..5 {
            gov.request_resize(100.0, 50.0, 2.0, &mut timers);
            timers.advance(30.0);
        }
        let fired = run_timers_for(&mut gov, &mut timers, 100.0);
        assert_eq!(fired.len(), 1, "one trailing resize");
        assert_eq!(gov.surface().resize_count(), 0, "same pixel size keeps the surface");
        assert_eq!(log.passes.borrow().len(), 1);

        gov.request_resize(120.0, 50.0, 2.0, &mut timers);
        run_timers_for(&mut gov, &mut timers, 100.0);
        assert_eq!(gov.surface().resize_count(), 1);
        assert_eq!(gov.surface().size(), SurfaceSize::new(240, 100));
    }

    #[test]
    fn zero_area_surface_skips_the_pass() {
        let (mut gov, mut timers, log) = governor(0, 120);
        assert_eq!(gov.request_redraw(true, &mut timers), RedrawOutcome::NothingToDraw);
        assert!(log.passes.borrow().is_empty());
        assert!(gov.last_frame().is_none());
    }

    #[test]
    fn pointer_redraws_are_throttled() {
        let (mut gov, mut timers, log) = governor(200, 200);
        assert!(gov.pointer_moved(Some(ScreenPoint::new(10.0, 10.0)), &mut timers).is_some());
        timers.advance(30.0);
        assert!(gov.pointer_moved(Some(ScreenPoint::new(12.0, 10.0)), &mut timers).is_none());
        timers.advance(30.0);
        assert!(gov.pointer_moved(Some(ScreenPoint::new(14.0, 10.0)), &mut timers).is_none());
        assert_eq!(timers.pending_count(), 1);
        let fired = run_timers(&mut gov, &mut timers, 100.0);
        assert_eq!(fired.len(), 1, "trailing redraw");
        assert_eq!(log.passes.borrow().len(), 2);
        let last = gov.last_frame().expect("drawn");
        assert_eq!(last.frame.pointer, Some(ScreenPoint::new(14.0, 10.0)));
    }

    #[test]
    fn callbacks_no_op_after_deactivation() {
        let (mut gov, mut timers, log) = governor(200, 200);
        enter_quick_mode(&mut gov, &mut timers, &log);
        gov.request_redraw(false, &mut timers);
        let passes = log.passes.borrow().len();
        gov.set_active(false, &mut timers);
        assert!(run_timers_for(&mut gov, &mut timers, 2000.0).is_empty());
        assert_eq!(log.passes.borrow().len(), passes);
    }

    #[test]
    fn reactivation_applies_pending_resize() {
        let (mut gov, mut timers, _log) = governor(200, 200);
        gov.set_active(false, &mut timers);
        gov.request_resize(300.0, 200.0, 1.0, &mut timers);
        run_timers(&mut gov, &mut timers, 200.0);
        assert_eq!(gov.surface().resize_count(), 0);
        let outcome = gov.set_active(true, &mut timers).expect("redraw on activation");
        assert_eq!(kind(&outcome), Some(PassKind::Full));
        assert_eq!(gov.surface().size(), SurfaceSize::new(300, 200));
    }

    #[test]
    fn stale_timer_ids_are_ignored() {
        let (mut gov, mut timers, _log) = governor(200, 200);
        assert!(gov.on_timer(TimerId(4242), &mut timers).is_none());
    }

    #[test]
    fn continuation_passes_run_until_chart_is_done() {
        let (mut gov, mut timers, log) = governor(200, 200);
        log.continuations.set(2);
        log.cost_ms.set(300.0);
        gov.request_redraw(true, &mut timers);
        let fired = run_timers_for(&mut gov, &mut timers, 10_000.0);
        let kinds: Vec<_> = fired.iter().filter_map(kind).collect();
        assert_eq!(kinds, vec![PassKind::Continuation, PassKind::Continuation]);
        assert_eq!(gov.slow_streak(), 1, "continuations do not count as slow full passes");
        assert!(!gov.has_pending_work());
    }

    #[test]
    fn pass_paints_in_order_and_reports_selection() {
        let (mut gov, mut timers, _log) = governor(200, 200);
        gov.pointer_moved(Some(ScreenPoint::new(149.0, 121.0)), &mut timers);
        let ops = gov.surface().ops().to_vec();
        assert!(matches!(ops.first(), Some(DrawOp::Clear(_))));
        let line_at = ops.iter().position(|op| matches!(op, DrawOp::Line { .. })).expect("zbuffer line");
        let fill_at = ops.iter().position(|op| matches!(op, DrawOp::FillRect { .. })).expect("direct fill");
        let text_at = ops.iter().position(|op| matches!(op, DrawOp::Text { .. })).expect("label");
        let ring_at = ops.iter().rposition(|op| matches!(op, DrawOp::Circle { .. })).expect("ring");
        assert!(fill_at < line_at && line_at < text_at && text_at < ring_at);

        let last = gov.last_frame().expect("snapshot");
        let selected = last.selection.expect("pointer next to body 1");
        assert_eq!(selected.body, BodyId::new(BodyKind::Star, 1));
        assert_eq!(gov.selection(), Some(selected.body));

        let hit = gov.hit_test(ScreenPoint::new(51.0, 50.0)).expect("body 0 between passes");
        assert_eq!(hit.body, BodyId::new(BodyKind::Star, 0));
        assert!(gov.marquee(&MarqueeFields::default()).is_some());
    }

    #[test]
    fn selection_change_is_reported_once() {
        let (mut gov, mut timers, _log) = governor(200, 200);
        let first = gov.pointer_moved(Some(ScreenPoint::new(50.0, 50.0)), &mut timers).expect("leading redraw");
        let change = first.report().and_then(|r| r.selection_change).expect("new selection");
        assert_eq!(change.current, Some(BodyId::new(BodyKind::Star, 0)));
        let again = gov.request_redraw(false, &mut timers);
        assert_eq!(again.report().and_then(|r| r.selection_change), None);
        assert_eq!(again.report().map(|r| r.cursor.clone()), Some(CursorStyle::Crosshair));
    }
}
