use serde::{Deserialize, Serialize};

/// A point in surface pixel coordinates (origin top-left, y down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Square of half-size `half` centred on `center`.
    pub fn around(center: ScreenPoint, half: f64) -> Self {
        Self::new(center.x - half, center.y - half, half * 2.0, half * 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Strict intersection: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Height of the shared vertical span, or 0 when the spans are disjoint.
    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0)
    }

    pub fn translated_y(&self, dy: f64) -> Self {
        Self::new(self.x, self.y + dy, self.w, self.h)
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Euclidean distance from `p` to the closest point of the rectangle (0 inside).
    pub fn distance_to_point(&self, p: ScreenPoint) -> f64 {
        let dx = (self.x - p.x).max(0.0).max(p.x - self.right());
        let dy = (self.y - p.y).max(0.0).max(p.y - self.bottom());
        dx.hypot(dy)
    }
}

/// Pixel dimensions of a backing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Device-pixel size for a logical (CSS) size at `scale` device pixels per logical pixel.
    pub fn from_logical(width: f64, height: f64, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self {
            width: (width.max(0.0) * scale).round() as u32,
            height: (height.max(0.0) * scale).round() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_sharing_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.5, 9.5, 2.0, 2.0)));
    }

    #[test]
    fn vertical_overlap_measures_shared_span() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(3.0, 6.0, 10.0, 10.0);
        assert_eq!(a.vertical_overlap(&b), 4.0);
        assert_eq!(a.vertical_overlap(&Rect::new(0.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn rect_distance_is_zero_inside() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to_point(ScreenPoint::new(5.0, 5.0)), 0.0);
        assert_eq!(r.distance_to_point(ScreenPoint::new(13.0, 14.0)), 5.0);
    }

    #[test]
    fn logical_size_rounds_to_device_pixels() {
        let size = SurfaceSize::from_logical(100.4, 50.0, 2.0);
        assert_eq!(size, SurfaceSize::new(201, 100));
        assert!(SurfaceSize::from_logical(0.0, 50.0, 2.0).is_empty());
    }
}
