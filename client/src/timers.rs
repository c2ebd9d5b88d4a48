use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use skyglass_shared::{Clock, TimerHost, TimerId};

/// Timer host over `setTimeout`. Each elapsed timer is reported through
/// `on_fire`; the owner routes the id to the governor and then calls
/// [`BrowserTimers::fired`].
pub struct BrowserTimers {
    next_id: u64,
    pending: HashMap<TimerId, Timeout>,
    // Elapsed handles. Their closures may still be on the stack when
    // `fired` runs, so they are dropped on the next `arm` instead.
    retired: Vec<Timeout>,
    on_fire: Rc<dyn Fn(TimerId)>,
    performance: Option<web_sys::Performance>,
}

impl BrowserTimers {
    pub fn new(on_fire: Rc<dyn Fn(TimerId)>) -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
            retired: Vec::new(),
            on_fire,
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }

    /// Drops the handle of a timer that has already run.
    pub fn fired(&mut self, id: TimerId) {
        if let Some(timeout) = self.pending.remove(&id) {
            self.retired.push(timeout);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timeout) in self.pending.drain() {
            timeout.cancel();
        }
        self.retired.clear();
    }
}

impl Clock for BrowserTimers {
    fn now_ms(&self) -> f64 {
        match self.performance.as_ref() {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }
}

impl TimerHost for BrowserTimers {
    fn arm(&mut self, delay_ms: f64) -> TimerId {
        self.retired.clear();
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let millis = if delay_ms.is_finite() { delay_ms.clamp(0.0, u32::MAX as f64).ceil() as u32 } else { 0 };
        let on_fire = Rc::clone(&self.on_fire);
        let timeout = Timeout::new(millis, move || on_fire(id));
        self.pending.insert(id, timeout);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(timeout) = self.pending.remove(&id) {
            timeout.cancel();
        }
    }
}

impl Drop for BrowserTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
