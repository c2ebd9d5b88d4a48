/// Monotonic millisecond clock supplied by the host.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Handle to a scheduled callback. Handles are never reused by a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// The host's deferred-callback mechanism. The governor arms and cancels
/// timers through this trait; when a timer elapses the host calls
/// `RenderGovernor::on_timer` with the id it handed out.
pub trait TimerHost: Clock {
    fn arm(&mut self, delay_ms: f64) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// A single cancelable slot: arming replaces (cancels) whatever was pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerSlot {
    pending: Option<TimerId>,
}

impl TimerSlot {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancel any pending timer and arm a new one.
    pub fn rearm(&mut self, host: &mut dyn TimerHost, delay_ms: f64) -> TimerId {
        if let Some(old) = self.pending.take() {
            host.cancel(old);
        }
        let id = host.arm(delay_ms.max(0.0));
        self.pending = Some(id);
        id
    }

    /// Arm only if nothing is pending. Returns the pending id either way.
    pub fn arm_if_idle(&mut self, host: &mut dyn TimerHost, delay_ms: f64) -> TimerId {
        match self.pending {
            Some(id) => id,
            None => self.rearm(host, delay_ms),
        }
    }

    pub fn cancel(&mut self, host: &mut dyn TimerHost) {
        if let Some(id) = self.pending.take() {
            host.cancel(id);
        }
    }

    /// Consume the slot if `id` is the pending timer. Stale ids return false.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

/// Leading-edge throttle with a trailing call: at most one call per window.
#[derive(Clone, Copy, Debug)]
pub struct Throttle {
    window_ms: f64,
    last_ms: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThrottleDecision {
    /// Run now.
    Run,
    /// Run when the current window ends, `delay_ms` from now.
    Trailing { delay_ms: f64 },
}

impl Throttle {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last_ms: None,
        }
    }

    pub fn check(&mut self, now_ms: f64) -> ThrottleDecision {
        match self.last_ms {
            Some(last) if now_ms - last < self.window_ms => ThrottleDecision::Trailing {
                delay_ms: self.window_ms - (now_ms - last),
            },
            _ => {
                self.last_ms = Some(now_ms);
                ThrottleDecision::Run
            }
        }
    }

    pub fn mark(&mut self, now_ms: f64) {
        self.last_ms = Some(now_ms);
    }
}
