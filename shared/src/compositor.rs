use crate::colors::Rgba;
use crate::geom::{Rect, ScreenPoint};
use crate::surface::Surface;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    FillRect(Rect),
    Line(ScreenPoint, ScreenPoint),
    Circle { center: ScreenPoint, radius: f64 },
    RectOutline(Rect),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZBufferItem {
    pub shape: Shape,
    pub color: Rgba,
    /// Larger is nearer the camera.
    pub depth: f64,
    /// Drawn with a doubled stroke (near-side orbit arcs).
    pub heavy: bool,
}

/// Primitives collected during a 3-D pass and painted far-to-near.
#[derive(Clone, Debug, Default)]
pub struct ZBuffer {
    items: Vec<ZBufferItem>,
}

impl ZBuffer {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn push(&mut self, shape: Shape, color: Rgba, depth: f64, heavy: bool) {
        if depth.is_nan() {
            return;
        }
        self.items.push(ZBufferItem {
            shape,
            color,
            depth,
            heavy,
        });
    }

    pub fn add_fill_rect(&mut self, color: Rgba, rect: Rect, depth: f64, heavy: bool) {
        self.push(Shape::FillRect(rect), color, depth, heavy);
    }

    pub fn add_line(&mut self, color: Rgba, from: ScreenPoint, to: ScreenPoint, depth: f64, heavy: bool) {
        self.push(Shape::Line(from, to), color, depth, heavy);
    }

    pub fn add_circle(&mut self, color: Rgba, center: ScreenPoint, radius: f64, depth: f64, heavy: bool) {
        self.push(Shape::Circle { center, radius }, color, depth, heavy);
    }

    pub fn add_rect(&mut self, color: Rgba, rect: Rect, depth: f64, heavy: bool) {
        self.push(Shape::RectOutline(rect), color, depth, heavy);
    }

    /// Paints every item with `depth < max_depth`, farthest first. Equal
    /// depths keep insertion order. Returns how many items were drawn.
    pub fn paint(&mut self, surface: &mut dyn Surface, max_depth: f64) -> usize {
        self.items.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        let base_width = surface.line_width();
        let mut drawn = 0;
        for item in self.items.iter().filter(|item| item.depth < max_depth) {
            if item.heavy {
                surface.set_line_width(base_width * 2.0);
            }
            match item.shape {
                Shape::FillRect(rect) => surface.fill_rect(rect, item.color),
                Shape::Line(from, to) => surface.stroke_line(from, to, item.color),
                Shape::Circle { center, radius } => surface.stroke_circle(center, radius, item.color),
                Shape::RectOutline(rect) => surface.stroke_rect(rect, item.color),
            }
            if item.heavy {
                surface.set_line_width(base_width);
            }
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DrawOp, RecordingSurface};

    fn depth_color(depth: u8) -> Rgba {
        Rgba::rgb(depth, 0, 0)
    }

    fn filled_depths(surface: &RecordingSurface) -> Vec<u8> {
        surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { color, .. } => Some(color.r),
                _ => None,
            })
            .collect()
    }

    fn three_rects() -> ZBuffer {
        let mut zb = ZBuffer::default();
        for depth in [5u8, 1, 3] {
            zb.add_fill_rect(depth_color(depth), Rect::new(0.0, 0.0, 4.0, 4.0), depth as f64, false);
        }
        zb
    }

    #[test]
    fn paints_far_to_near() {
        let mut zb = three_rects();
        let mut surface = RecordingSurface::new(10, 10);
        assert_eq!(zb.paint(&mut surface, f64::INFINITY), 3);
        assert_eq!(filled_depths(&surface), vec![1, 3, 5]);
    }

    #[test]
    fn max_depth_is_exclusive() {
        let mut zb = three_rects();
        let mut surface = RecordingSurface::new(10, 10);
        zb.paint(&mut surface, 3.0);
        assert_eq!(filled_depths(&surface), vec![1]);
    }

    #[test]
    fn equal_depths_keep_insertion_order() {
        let mut zb = ZBuffer::default();
        for i in 0..20u8 {
            zb.add_line(Rgba::rgb(i, 0, 0), ScreenPoint::new(0.0, 0.0), ScreenPoint::new(1.0, 1.0), 2.0, false);
        }
        zb.add_line(Rgba::rgb(99, 0, 0), ScreenPoint::new(0.0, 0.0), ScreenPoint::new(1.0, 1.0), -1.0, false);
        let mut surface = RecordingSurface::new(10, 10);
        zb.paint(&mut surface, f64::INFINITY);
        let order: Vec<u8> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Line { color, .. } => Some(color.r),
                _ => None,
            })
            .collect();
        let mut expected = vec![99];
        expected.extend(0..20u8);
        assert_eq!(order, expected);
    }

    #[test]
    fn heavy_items_double_then_restore_width() {
        let mut zb = ZBuffer::default();
        zb.add_circle(Rgba::WHITE, ScreenPoint::new(5.0, 5.0), 2.0, 1.0, true);
        zb.add_rect(Rgba::WHITE, Rect::new(1.0, 1.0, 2.0, 2.0), 2.0, false);
        let mut surface = RecordingSurface::new(10, 10);
        surface.set_line_width(1.5);
        zb.paint(&mut surface, f64::INFINITY);
        let widths: Vec<f64> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Circle { line_width, .. } | DrawOp::RectOutline { line_width, .. } => Some(*line_width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![3.0, 1.5]);
        assert_eq!(surface.line_width(), 1.5);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut zb = three_rects();
        zb.clear();
        assert!(zb.is_empty());
    }
}
