use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use skyglass_shared::{
    CatalogEphemeris, ChartKind, MarqueeFields, RedrawOutcome, RenderGovernor, SceneInputs, ScreenPoint, TimerId,
};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent, PointerEvent};

use crate::app::{ActiveChart, MarqueeFieldsSetting, MarqueeText, ObserverSetting, Preferences, SceneTime};
use crate::render_loop::RenderScheduler;
use crate::surface::CanvasSurface;
use crate::timers::BrowserTimers;

struct WindowBinding {
    window: web_sys::Window,
    event: &'static str,
    _handler: Closure<dyn Fn(web_sys::Event)>,
}

thread_local! {
    static WINDOW_BINDINGS: RefCell<Vec<WindowBinding>> = const { RefCell::new(Vec::new()) };
}

/// Replaces any earlier listener for `event` so a remount can't stack handlers.
fn bind_window(event: &'static str, handler: impl Fn(web_sys::Event) + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    WINDOW_BINDINGS.with(|slot| {
        let mut bindings = slot.borrow_mut();
        bindings.retain(|old| {
            if old.event != event {
                return true;
            }
            let _ = old
                .window
                .remove_event_listener_with_callback(old.event, old._handler.as_ref().unchecked_ref());
            false
        });
        let handler = Closure::<dyn Fn(web_sys::Event)>::new(handler);
        match window.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref()) {
            Ok(()) => bindings.push(WindowBinding {
                window,
                event,
                _handler: handler,
            }),
            Err(e) => web_sys::console::warn_1(&format!("failed to listen for {event}: {e:?}").into()),
        }
    });
}

/// Governor plus the timer host it schedules on.
struct Engine {
    governor: RenderGovernor<CanvasSurface>,
    timers: BrowserTimers,
}

impl Engine {
    fn dispatch(&mut self, id: TimerId) -> Option<RedrawOutcome> {
        let outcome = self.governor.on_timer(id, &mut self.timers);
        self.timers.fired(id);
        outcome
    }

    /// Requests a resize to the canvas container's CSS size.
    fn fit(&mut self) {
        let Some(parent) = self.governor.surface().canvas().parent_element() else {
            return;
        };
        let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
        self.governor.request_resize(
            parent.client_width() as f64,
            parent.client_height() as f64,
            dpr,
            &mut self.timers,
        );
    }

    fn device_point(&self, e: &MouseEvent) -> ScreenPoint {
        let scale = self.governor.last_frame().map_or(1.0, |last| last.frame.scale);
        ScreenPoint::new(e.offset_x() as f64 * scale, e.offset_y() as f64 * scale)
    }

    /// Pushes the outcome of a pass to the cursor and marquee.
    fn publish(&self, outcome: Option<RedrawOutcome>, marquee: RwSignal<Option<String>>, fields: MarqueeFields) {
        let Some(report) = outcome.as_ref().and_then(RedrawOutcome::report) else {
            return;
        };
        let _ = web_sys::HtmlElement::style(self.governor.surface().canvas())
            .set_property("cursor", report.cursor.css_token());
        let text = self.governor.marquee(&fields);
        if marquee.get_untracked() != text {
            marquee.set(text);
        }
    }
}

type EngineCell = Rc<RefCell<Option<Engine>>>;

/// Runs `f` on the engine unless it is missing or already borrowed. Timer
/// and frame callbacks come from the event loop, so a busy borrow means a
/// nested dispatch that can safely be dropped.
fn with_engine(engine: &EngineCell, f: impl FnOnce(&mut Engine)) {
    let Ok(mut slot) = engine.try_borrow_mut() else {
        web_sys::console::warn_1(&"chart engine busy, dropping callback".into());
        return;
    };
    if let Some(engine) = slot.as_mut() {
        f(engine);
    }
}

#[component]
pub fn ChartCanvas() -> impl IntoView {
    let ActiveChart(chart) = expect_context();
    let Preferences(preferences) = expect_context();
    let ObserverSetting(observer) = expect_context();
    let SceneTime(time) = expect_context();
    let MarqueeFieldsSetting(fields) = expect_context();
    let MarqueeText(marquee) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let engine: EngineCell = Rc::new(RefCell::new(None));

    let on_fire: Rc<dyn Fn(TimerId)> = {
        let engine: Weak<RefCell<Option<Engine>>> = Rc::downgrade(&engine);
        Rc::new(move |id| {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            with_engine(&engine, |e| {
                let outcome = e.dispatch(id);
                e.publish(outcome, marquee, fields.get_untracked());
            });
        })
    };

    let scheduler = Rc::new(RenderScheduler::new({
        let engine = engine.clone();
        move |force| {
            with_engine(&engine, |e| {
                let outcome = e.governor.request_redraw(force, &mut e.timers);
                e.publish(Some(outcome), marquee, fields.get_untracked());
            });
        }
    }));

    // Build the engine once the canvas is mounted.
    Effect::new({
        let engine = engine.clone();
        move || {
            let Some(canvas_el) = canvas_ref.get() else {
                return;
            };
            if engine.borrow().is_some() {
                return;
            }
            let canvas: &HtmlCanvasElement = &canvas_el;
            let Some(surface) = CanvasSurface::new(canvas.clone()) else {
                web_sys::console::warn_1(&"canvas 2D context unavailable".into());
                return;
            };
            let scene = SceneInputs {
                observer: observer.get_untracked(),
                time: time.get_untracked(),
                fonts: None,
            };
            let governor = RenderGovernor::new(
                surface,
                chart.get_untracked().build(),
                Box::new(CatalogEphemeris::sample()),
                preferences.get_untracked(),
                scene,
            );
            let mut created = Engine {
                governor,
                timers: BrowserTimers::new(on_fire.clone()),
            };
            created.fit();
            *engine.borrow_mut() = Some(created);
        }
    });

    // Chart switch
    let applied_chart: Rc<Cell<Option<ChartKind>>> = Rc::new(Cell::new(None));
    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            let kind = chart.get();
            let previous = applied_chart.replace(Some(kind));
            if previous.is_none_or(|p| p == kind) {
                return;
            }
            with_engine(&engine, |e| e.governor.set_chart(kind.build()));
            scheduler.request(true);
        }
    });

    // Display preferences
    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            let config = preferences.get();
            with_engine(&engine, |e| e.governor.set_config(config));
            scheduler.request(true);
        }
    });

    // Observer and clock
    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            let (observer, time) = (observer.get(), time.get());
            with_engine(&engine, |e| {
                e.governor.set_observer(observer);
                e.governor.set_time(time);
            });
            scheduler.request(false);
        }
    });

    // Marquee field toggles only change the status text.
    Effect::new({
        let engine = engine.clone();
        move || {
            let fields = fields.get();
            with_engine(&engine, |e| marquee.set(e.governor.marquee(&fields)));
        }
    });

    bind_window("resize", {
        let engine = engine.clone();
        move |_| with_engine(&engine, Engine::fit)
    });
    bind_window("visibilitychange", {
        let engine = engine.clone();
        move |_| {
            let visible = web_sys::window()
                .and_then(|w| w.document())
                .is_none_or(|d| !d.hidden());
            with_engine(&engine, |e| {
                let outcome = e.governor.set_active(visible, &mut e.timers);
                e.publish(outcome, marquee, fields.get_untracked());
            });
        }
    });

    let on_pointer_move = {
        let engine = engine.clone();
        move |e: PointerEvent| {
            with_engine(&engine, |eng| {
                let point = eng.device_point(&e);
                let outcome = eng.governor.pointer_moved(Some(point), &mut eng.timers);
                eng.publish(outcome, marquee, fields.get_untracked());
            });
        }
    };
    let on_pointer_leave = {
        let engine = engine.clone();
        move |_: PointerEvent| {
            with_engine(&engine, |eng| {
                let outcome = eng.governor.pointer_moved(None, &mut eng.timers);
                eng.publish(outcome, marquee, fields.get_untracked());
            });
        }
    };
    let on_click = {
        let engine = engine.clone();
        move |e: MouseEvent| {
            with_engine(&engine, |eng| {
                let point = eng.device_point(&e);
                let hit = eng.governor.hit_test(point);
                eng.governor.set_selection(hit.map(|s| s.body));
                let outcome = eng.governor.request_redraw(true, &mut eng.timers);
                eng.publish(Some(outcome), marquee, fields.get_untracked());
            });
        }
    };

    view! {
        <div style="position: relative; width: 100%; height: 100%; overflow: hidden;">
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: default;"
                on:pointermove=on_pointer_move
                on:pointerleave=on_pointer_leave
                on:click=on_click
            />
        </div>
    }
}
