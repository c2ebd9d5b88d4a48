use crate::colors::Rgba;
use crate::ephemeris::{BodyId, BodyKind};
use crate::frame::FontMetrics;
use crate::geom::{Rect, ScreenPoint};
use crate::surface::Surface;

/// Labels whose text lies this close to the pointer (logical px) start hidden.
pub const HIDE_NEAR_CURSOR_PX: f64 = 12.0;

/// Collision class. Only labels of the same class are resolved against each
/// other; `Minor` labels never move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelClass {
    Body,
    Constellation,
    Minor,
}

/// Determines the gap between symbol and text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelCategory {
    Star,
    DeepSky,
    Planet,
    Moon,
    Sun,
    Other,
}

impl LabelCategory {
    /// Logical pixels between the symbol box and the text.
    pub fn gap_px(self) -> f64 {
        match self {
            LabelCategory::Star | LabelCategory::Other => 2.0,
            LabelCategory::DeepSky => 3.0,
            LabelCategory::Planet => 4.0,
            LabelCategory::Moon => 5.0,
            LabelCategory::Sun => 6.0,
        }
    }

    pub fn for_body(kind: BodyKind, is_sun: bool) -> Self {
        if is_sun {
            return LabelCategory::Sun;
        }
        match kind {
            BodyKind::Star => LabelCategory::Star,
            BodyKind::DeepSky => LabelCategory::DeepSky,
            BodyKind::Planet => LabelCategory::Planet,
            BodyKind::Moon | BodyKind::MoonShadow => LabelCategory::Moon,
            BodyKind::Constellation => LabelCategory::Other,
        }
    }
}

/// What a chart hands the layout engine for one body.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRequest {
    pub body: BodyId,
    pub text: String,
    pub anchor: ScreenPoint,
    /// Half-size of the drawn symbol, device px.
    pub symbol_radius: f64,
    pub category: LabelCategory,
    pub class: LabelClass,
    pub color: Rgba,
    pub font: FontMetrics,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelInfo {
    pub body: BodyId,
    pub text: String,
    pub anchor: ScreenPoint,
    /// Baseline start for `fill_text`.
    pub insert: ScreenPoint,
    pub text_box: Rect,
    pub symbol_box: Rect,
    pub class: LabelClass,
    pub hidden_near_cursor: bool,
    pub overlapped: bool,
    pub color: Rgba,
    pub font: FontMetrics,
}

impl LabelInfo {
    fn move_text_to(&mut self, text_box: Rect) {
        self.insert.y += text_box.y - self.text_box.y;
        self.text_box = text_box;
    }
}

pub trait LabelSink {
    fn add_label(&mut self, request: LabelRequest);
}

/// One frame's labels.
#[derive(Clone, Debug, Default)]
pub struct LabelLayout {
    scale: f64,
    pointer: Option<ScreenPoint>,
    labels: Vec<LabelInfo>,
}

/// Text of either label touching the other's text or symbol.
fn collides(a: &LabelInfo, b: &LabelInfo) -> bool {
    a.text_box.intersects(&b.text_box)
        || a.text_box.intersects(&b.symbol_box)
        || b.text_box.intersects(&a.symbol_box)
}

impl LabelLayout {
    pub fn new(scale: f64, pointer: Option<ScreenPoint>) -> Self {
        Self {
            scale,
            pointer,
            labels: Vec::new(),
        }
    }

    pub fn labels(&self) -> &[LabelInfo] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, body: BodyId) -> Option<&LabelInfo> {
        self.labels.iter().find(|l| l.body == body)
    }

    /// True when `body` has a label that will be painted.
    pub fn is_shown(&self, body: BodyId) -> bool {
        self.get(body).is_some_and(|l| !l.hidden_near_cursor)
    }

    /// Same-class pairs whose boxes still collide.
    pub fn overlapping_pairs(&self) -> usize {
        let mut count = 0;
        for (i, a) in self.labels.iter().enumerate() {
            for b in &self.labels[i + 1..] {
                if a.class != LabelClass::Minor && a.class == b.class && collides(a, b) {
                    count += 1;
                }
            }
        }
        count
    }

    fn conflicts_of(&self, idx: usize, text_box: Rect) -> usize {
        let candidate = LabelInfo {
            text_box,
            ..self.labels[idx].clone()
        };
        self.labels
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != idx && other.class == candidate.class && collides(&candidate, other))
            .count()
    }

    /// Pairwise vertical overlap resolution within each class. The label with
    /// the higher anchor moves: up first, then down, otherwise it keeps its
    /// best position and is flagged `overlapped`. A move is never accepted if
    /// it gives the label more collisions than it had.
    pub fn resolve_overlaps(&mut self) {
        let n = self.labels.len();
        for i in 0..n {
            if self.labels[i].class == LabelClass::Minor {
                continue;
            }
            for j in i + 1..n {
                let (a, b) = (&self.labels[i], &self.labels[j]);
                if a.class != b.class || !collides(a, b) {
                    continue;
                }
                let first_has_priority = a.anchor.y <= b.anchor.y;
                let (mut mover, mut other) = if first_has_priority { (i, j) } else { (j, i) };
                if !self.text_blocked_by(mover, other) {
                    // Only the other label's text touches our symbol; moving our
                    // text cannot help, so the other one moves.
                    std::mem::swap(&mut mover, &mut other);
                }
                self.shift_clear_of(mover, other);
            }
        }

        for idx in 0..n {
            if !self.labels[idx].hidden_near_cursor {
                continue;
            }
            let clear = self
                .labels
                .iter()
                .enumerate()
                .all(|(j, other)| j == idx || !collides(&self.labels[idx], other));
            if clear {
                self.labels[idx].hidden_near_cursor = false;
            }
        }
    }

    fn text_blocked_by(&self, mover: usize, other: usize) -> bool {
        let m = &self.labels[mover].text_box;
        let o = &self.labels[other];
        m.intersects(&o.text_box) || m.intersects(&o.symbol_box)
    }

    fn shift_clear_of(&mut self, mover: usize, other: usize) {
        let original = self.labels[mover].text_box;
        let obstacles: Vec<Rect> = [self.labels[other].text_box, self.labels[other].symbol_box]
            .into_iter()
            .filter(|r| r.intersects(&original))
            .collect();
        if obstacles.is_empty() {
            self.labels[mover].overlapped = true;
            return;
        }
        let before = self.conflicts_of(mover, original);

        let up = obstacles
            .iter()
            .map(|o| original.bottom() - o.y)
            .fold(0.0, f64::max);
        let raised = original.translated_y(-up);
        if !obstacles.iter().any(|o| o.intersects(&raised)) && self.conflicts_of(mover, raised) <= before {
            self.labels[mover].move_text_to(raised);
            return;
        }

        let down = obstacles
            .iter()
            .map(|o| o.bottom() - original.y)
            .fold(0.0, f64::max);
        let lowered = original.translated_y(down);
        let lowered_conflicts = self.conflicts_of(mover, lowered);
        if lowered_conflicts <= before {
            self.labels[mover].move_text_to(lowered);
            if obstacles.iter().any(|o| o.intersects(&lowered)) || lowered_conflicts > 0 {
                self.labels[mover].overlapped = true;
            }
            return;
        }
        self.labels[mover].overlapped = true;
    }

    /// The hidden label nearest the pointer, drawn on top of everything.
    /// Later labels win ties.
    pub fn nearest_hidden(&self, pointer: ScreenPoint) -> Option<&LabelInfo> {
        let mut best: Option<(&LabelInfo, f64)> = None;
        for label in self.labels.iter().filter(|l| l.hidden_near_cursor) {
            let d = label.anchor.distance_to(pointer);
            if best.is_none_or(|(_, bd)| d <= bd) {
                best = Some((label, d));
            }
        }
        best.map(|(label, _)| label)
    }

    pub fn draw(&self, surface: &mut dyn Surface, ink_saver: bool) {
        for label in self.labels.iter().filter(|l| !l.hidden_near_cursor) {
            surface.fill_text(&label.text, label.insert, &label.font, label.color.themed(ink_saver));
        }
        if let Some(pointer) = self.pointer
            && let Some(label) = self.nearest_hidden(pointer)
        {
            surface.fill_text(&label.text, label.insert, &label.font, label.color.themed(ink_saver));
        }
    }
}

impl LabelSink for LabelLayout {
    fn add_label(&mut self, request: LabelRequest) {
        let symbol_box = Rect::around(request.anchor, request.symbol_radius.max(0.0));
        let gap = request.category.gap_px() * self.scale;
        let width = request.font.text_width(&request.text);
        let height = request.font.height();
        let text_box = Rect::new(
            symbol_box.right() + gap,
            request.anchor.y - height / 2.0,
            width,
            height,
        );
        let insert = ScreenPoint::new(text_box.x, text_box.y + request.font.ascent);
        let hidden_near_cursor = request.class != LabelClass::Minor
            && self
                .pointer
                .is_some_and(|p| text_box.distance_to_point(p) <= HIDE_NEAR_CURSOR_PX * self.scale);

        self.labels.retain(|l| l.body != request.body);
        self.labels.push(LabelInfo {
            body: request.body,
            text: request.text,
            anchor: request.anchor,
            insert,
            text_box,
            symbol_box,
            class: request.class,
            hidden_near_cursor,
            overlapped: false,
            color: request.color,
            font: request.font,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DrawOp, RecordingSurface};

    const FONT: FontMetrics = FontMetrics {
        size_px: 10.0,
        char_width: 6.0,
        ascent: 8.0,
        descent: 2.0,
    };

    fn request(index: usize, text: &str, x: f64, y: f64) -> LabelRequest {
        LabelRequest {
            body: BodyId::new(BodyKind::Star, index),
            text: text.to_string(),
            anchor: ScreenPoint::new(x, y),
            symbol_radius: 0.0,
            category: LabelCategory::Star,
            class: LabelClass::Body,
            color: Rgba::LABEL,
            font: FONT,
        }
    }

    fn text_xs(layout: &LabelLayout) -> Vec<f64> {
        layout.labels().iter().map(|l| l.text_box.x).collect()
    }

    #[test]
    fn gaps_scale_with_device_pixels() {
        let mut layout = LabelLayout::new(2.0, None);
        let mut req = request(0, "Mars", 100.0, 50.0);
        req.category = LabelCategory::Planet;
        req.symbol_radius = 3.0;
        layout.add_label(req);
        let label = &layout.labels()[0];
        assert_eq!(label.text_box.x, 103.0 + 8.0);
        assert_eq!(label.text_box.y, 45.0, "text is centred on the anchor");
        assert_eq!(label.insert, ScreenPoint::new(111.0, 53.0));
        assert_eq!(LabelCategory::Sun.gap_px(), 6.0);
        assert_eq!(LabelCategory::for_body(BodyKind::Planet, true), LabelCategory::Sun);
    }

    #[test]
    fn second_label_for_same_body_replaces_first() {
        let mut layout = LabelLayout::new(1.0, None);
        layout.add_label(request(4, "Old", 0.0, 0.0));
        layout.add_label(request(5, "Other", 0.0, 40.0));
        layout.add_label(request(4, "New", 10.0, 10.0));
        assert_eq!(layout.labels().len(), 2);
        assert_eq!(layout.get(BodyId::new(BodyKind::Star, 4)).map(|l| l.text.as_str()), Some("New"));
    }

    #[test]
    fn stacked_labels_converge_without_moving_horizontally() {
        let mut layout = LabelLayout::new(1.0, None);
        layout.add_label(request(0, "Alpha", 0.0, 100.0));
        layout.add_label(request(1, "Beta", 0.0, 105.0));
        layout.add_label(request(2, "Gamma", 0.0, 110.0));
        let xs = text_xs(&layout);
        let before = layout.overlapping_pairs();
        assert_eq!(before, 2);

        layout.resolve_overlaps();

        assert_eq!(text_xs(&layout), xs, "labels only move vertically");
        assert!(layout.overlapping_pairs() <= before);
        assert_eq!(layout.overlapping_pairs(), 1);
        assert_eq!(layout.labels()[0].text_box.y, 90.0, "highest label moved up");
    }

    #[test]
    fn label_moves_down_when_up_is_crowded() {
        let mut layout = LabelLayout::new(1.0, None);
        layout.add_label(request(0, "DD", 0.0, 88.0));
        layout.add_label(request(1, "EE", 40.0, 88.0));
        layout.add_label(request(2, "AAAAAAAAAAAA", 0.0, 100.0));
        layout.add_label(request(3, "BB", 0.0, 103.0));
        assert_eq!(layout.overlapping_pairs(), 1);

        layout.resolve_overlaps();

        let a = &layout.labels()[2];
        assert_eq!(a.text_box.y, 108.0);
        assert_eq!(a.text_box.x, 2.0);
        assert!(!a.overlapped);
        assert_eq!(layout.overlapping_pairs(), 0);
    }

    #[test]
    fn label_boxed_in_stays_and_is_flagged() {
        let mut layout = LabelLayout::new(1.0, None);
        layout.add_label(request(0, "DD", 0.0, 88.0));
        layout.add_label(request(1, "EE", 40.0, 88.0));
        layout.add_label(request(2, "AAAAAAAAAAAA", 0.0, 100.0));
        layout.add_label(request(3, "BB", 0.0, 103.0));
        layout.add_label(request(4, "FF", 0.0, 115.0));
        layout.add_label(request(5, "GG", 40.0, 115.0));
        let before = layout.overlapping_pairs();

        layout.resolve_overlaps();

        let a = &layout.labels()[2];
        assert!(a.overlapped);
        assert_eq!(a.text_box.y, 95.0, "no move that adds collisions is kept");
        assert_eq!(a.text_box.x, 2.0);
        assert_eq!(layout.overlapping_pairs(), before);
    }

    #[test]
    fn text_touching_a_symbol_counts_as_overlap() {
        let mut layout = LabelLayout::new(1.0, None);
        let mut big = request(0, "A", 20.0, 100.0);
        big.symbol_radius = 6.0;
        layout.add_label(big);
        // Text spans x 2..38, across the symbol at 14..26.
        layout.add_label(request(1, "LONGER", 0.0, 103.0));
        assert_eq!(layout.overlapping_pairs(), 1);
        layout.resolve_overlaps();
        assert!(layout.overlapping_pairs() <= 1);
        assert_eq!(layout.labels()[1].text_box.x, 2.0);
    }

    #[test]
    fn different_classes_do_not_collide() {
        let mut layout = LabelLayout::new(1.0, None);
        layout.add_label(request(0, "Star", 0.0, 100.0));
        let mut con = request(1, "Orion", 0.0, 101.0);
        con.body = BodyId::new(BodyKind::Constellation, 0);
        con.class = LabelClass::Constellation;
        layout.add_label(con);
        assert_eq!(layout.overlapping_pairs(), 0);
        layout.resolve_overlaps();
        assert_eq!(layout.labels()[0].text_box.y, 95.0);
    }

    #[test]
    fn near_cursor_label_is_unhidden_when_clear() {
        let mut layout = LabelLayout::new(1.0, Some(ScreenPoint::new(10.0, 100.0)));
        layout.add_label(request(0, "Lonely", 0.0, 100.0));
        assert!(layout.labels()[0].hidden_near_cursor);
        layout.resolve_overlaps();
        assert!(!layout.labels()[0].hidden_near_cursor);
    }

    #[test]
    fn crowded_near_cursor_labels_stay_hidden_and_nearest_is_drawn() {
        let pointer = ScreenPoint::new(5.0, 100.0);
        let mut layout = LabelLayout::new(1.0, Some(pointer));
        layout.add_label(request(0, "DD", 0.0, 88.0));
        layout.add_label(request(1, "EE", 40.0, 88.0));
        layout.add_label(request(2, "AAAAAAAAAAAA", 0.0, 100.0));
        layout.add_label(request(3, "BB", 0.0, 103.0));
        layout.add_label(request(4, "FF", 0.0, 115.0));
        layout.add_label(request(5, "GG", 40.0, 115.0));
        layout.resolve_overlaps();

        let nearest = layout.nearest_hidden(pointer).expect("some label stays hidden");
        assert_eq!(nearest.text, "AAAAAAAAAAAA");

        let mut surface = RecordingSurface::new(200, 200);
        layout.draw(&mut surface, false);
        let texts: Vec<String> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.last().map(String::as_str), Some("AAAAAAAAAAAA"));
    }

    #[test]
    fn nearest_hidden_prefers_later_label_on_ties() {
        let pointer = ScreenPoint::new(0.0, 0.0);
        let mut layout = LabelLayout::new(1.0, Some(pointer));
        layout.add_label(request(0, "First", 3.0, 4.0));
        layout.add_label(request(1, "Second", 4.0, 3.0));
        assert!(layout.labels().iter().all(|l| l.hidden_near_cursor));
        assert_eq!(layout.nearest_hidden(pointer).map(|l| l.text.as_str()), Some("Second"));
    }
}
