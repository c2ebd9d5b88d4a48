use std::collections::BTreeMap;
use std::time::Duration;

use skyglass_shared::{Clock, RenderGovernor, Surface, TimerHost, TimerId};
use tokio::time::Instant;

/// Timer host backed by the tokio clock. Deadlines are kept in a list and
/// fired in order by [`TokioTimers::run`]; nothing is spawned.
#[derive(Debug)]
pub struct TokioTimers {
    origin: Instant,
    next_id: u64,
    deadlines: BTreeMap<TimerId, Instant>,
}

impl Default for TokioTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioTimers {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            next_id: 0,
            deadlines: BTreeMap::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.deadlines.len()
    }

    fn next_due(&self) -> Option<(TimerId, Instant)> {
        self.deadlines
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(id, at)| (*id, *at))
    }

    /// Sleeps until each armed timer is due and hands it to the governor,
    /// until none remain. Returns how many timers fired.
    pub async fn run<S: Surface>(&mut self, governor: &mut RenderGovernor<S>) -> usize {
        let mut fired = 0;
        while let Some((id, at)) = self.next_due() {
            tokio::time::sleep_until(at).await;
            self.deadlines.remove(&id);
            fired += 1;
            if let Some(outcome) = governor.on_timer(id, self)
                && let Some(report) = outcome.report()
            {
                tracing::debug!(timer = id.0, kind = ?report.kind, cost_ms = report.cost_ms, "timer pass");
            }
        }
        fired
    }
}

impl Clock for TokioTimers {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl TimerHost for TokioTimers {
    fn arm(&mut self, delay_ms: f64) -> TimerId {
        let delay = if delay_ms.is_finite() && delay_ms > 0.0 {
            Duration::from_secs_f64(delay_ms / 1000.0)
        } else {
            Duration::ZERO
        };
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.deadlines.insert(id, Instant::now() + delay);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.deadlines.remove(&id);
    }
}
