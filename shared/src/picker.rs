use crate::ephemeris::{BodyId, BodyKind};
use crate::geom::ScreenPoint;
use crate::labels::LabelLayout;

/// Pointer tolerance in logical px.
pub const PICK_TOLERANCE_PX: f64 = 8.0;
/// Bonus for planets and priority deep-sky objects, penalty for stars.
pub const CATEGORY_BIAS_PX: f64 = 2.0;
/// Distance given to a previously selected body that no longer qualifies.
pub const OFFSCREEN_DISTANCE: f64 = 1e6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickBias {
    Bonus,
    Neutral,
    Penalty,
}

impl PickBias {
    pub fn for_body(kind: BodyKind, priority: bool) -> Self {
        match kind {
            BodyKind::Planet => PickBias::Bonus,
            BodyKind::DeepSky if priority => PickBias::Bonus,
            BodyKind::Star => PickBias::Penalty,
            _ => PickBias::Neutral,
        }
    }

    fn px(self) -> f64 {
        match self {
            PickBias::Bonus => CATEGORY_BIAS_PX,
            PickBias::Neutral => 0.0,
            PickBias::Penalty => -CATEGORY_BIAS_PX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub body: BodyId,
    /// `None` when the body is off-screen this frame.
    pub point: Option<ScreenPoint>,
    /// Effective distance after bias and extra tolerance.
    pub distance: f64,
    pub exact: bool,
    pub labelled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<BodyId>,
    pub current: Option<BodyId>,
}

/// A drawn body kept for hit-testing between passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickCandidate {
    pub body: BodyId,
    pub point: ScreenPoint,
    pub bias: PickBias,
    pub extra_tolerance: f64,
}

pub trait Picker {
    /// Offer a body. `point` is `None` for a body that is not on screen.
    fn qualify(&mut self, body: BodyId, point: Option<ScreenPoint>, bias: PickBias, extra_tolerance: f64);
}

fn effective_distance(raw: f64, bias: PickBias, extra: f64, scale: f64) -> f64 {
    (raw - bias.px() * scale - extra).max(0.0)
}

fn beats(distance: f64, exact: bool, best: Option<&Selection>) -> bool {
    match best {
        None => true,
        Some(best) => distance <= best.distance && (exact || !best.exact),
    }
}

/// Nearest-body search for one frame.
#[derive(Clone, Debug, Default)]
pub struct SelectionTracker {
    pointer: Option<ScreenPoint>,
    scale: f64,
    previous: Option<BodyId>,
    best: Option<Selection>,
    candidates: Vec<PickCandidate>,
}

impl SelectionTracker {
    pub fn new(pointer: Option<ScreenPoint>, scale: f64, previous: Option<BodyId>) -> Self {
        Self {
            pointer,
            scale,
            previous,
            best: None,
            candidates: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        PICK_TOLERANCE_PX * self.scale
    }

    pub fn best(&self) -> Option<&Selection> {
        self.best.as_ref()
    }

    pub fn candidates(&self) -> &[PickCandidate] {
        &self.candidates
    }

    /// Final selection for the pass, with a change notice when it differs
    /// from the previous pass.
    pub fn finish(&mut self, labels: &LabelLayout) -> (Option<Selection>, Option<SelectionChange>) {
        if let Some(best) = self.best.as_mut() {
            best.labelled = labels.is_shown(best.body);
        }
        let current = self.best.map(|s| s.body);
        let change = (current != self.previous).then_some(SelectionChange {
            previous: self.previous,
            current,
        });
        (self.best, change)
    }

    pub fn into_candidates(self) -> Vec<PickCandidate> {
        self.candidates
    }
}

impl Picker for SelectionTracker {
    fn qualify(&mut self, body: BodyId, point: Option<ScreenPoint>, bias: PickBias, extra_tolerance: f64) {
        let extra = extra_tolerance.max(0.0);
        if let Some(p) = point {
            self.candidates.push(PickCandidate {
                body,
                point: p,
                bias,
                extra_tolerance: extra,
            });
        }
        let is_previous = self.previous == Some(body);
        let raw = match (self.pointer, point) {
            (Some(pointer), Some(p)) => pointer.distance_to(p),
            (_, None) if is_previous => OFFSCREEN_DISTANCE,
            _ => return,
        };
        let exact = raw <= extra;
        let mut distance = effective_distance(raw, bias, extra, self.scale);
        if distance > self.tolerance() {
            // Only an off-screen previous selection is kept out of range.
            if point.is_some() {
                return;
            }
            distance = OFFSCREEN_DISTANCE;
        }
        if beats(distance, exact, self.best.as_ref()) {
            self.best = Some(Selection {
                body,
                point,
                distance,
                exact,
                labelled: false,
            });
        }
    }
}

/// Hit-test against candidates kept from an earlier pass.
pub fn hit_test(candidates: &[PickCandidate], pointer: ScreenPoint, scale: f64) -> Option<Selection> {
    let tolerance = PICK_TOLERANCE_PX * scale;
    let mut best: Option<Selection> = None;
    for c in candidates {
        let raw = pointer.distance_to(c.point);
        let distance = effective_distance(raw, c.bias, c.extra_tolerance, scale);
        let exact = raw <= c.extra_tolerance;
        if distance <= tolerance && beats(distance, exact, best.as_ref()) {
            best = Some(Selection {
                body: c.body,
                point: Some(c.point),
                distance,
                exact,
                labelled: false,
            });
        }
    }
    best
}
