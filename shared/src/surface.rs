use crate::colors::Rgba;
use crate::frame::FontMetrics;
use crate::geom::{Rect, ScreenPoint, SurfaceSize};

/// Raster drawing target. Every chart draws through this trait so the same
/// drawing code serves the browser canvas, offscreen images and headless output.
pub trait Surface {
    fn size(&self) -> SurfaceSize;

    /// Reallocate the backing store. Contents are undefined afterwards.
    fn resize(&mut self, size: SurfaceSize);

    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, rect: Rect, color: Rgba);
    fn stroke_rect(&mut self, rect: Rect, color: Rgba);
    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgba);
    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba);
    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba);

    /// Draw `text` with its baseline starting at `at`.
    fn fill_text(&mut self, text: &str, at: ScreenPoint, font: &FontMetrics, color: Rgba);

    fn measure_text(&self, text: &str, font: &FontMetrics) -> f64 {
        font.text_width(text)
    }

    fn line_width(&self) -> f64;
    fn set_line_width(&mut self, width: f64);

    /// Copy `raster` with its top-left corner at (`x`, `y`), alpha blended.
    fn blit(&mut self, raster: &Raster, x: i32, y: i32);
}

/// In-memory RGBA8 raster. Used for offscreen layers (shadow overlay,
/// insolation image, textures) and as the headless output surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
    line_width: f64,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
            line_width: 1.0,
        }
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let mut raster = Self::new(width, height);
        raster.pixels.fill(color);
        raster
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Overwrite a pixel without blending.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = color;
    }

    /// Blend a pixel with source-over; out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = color.over(self.pixels[idx]);
    }

    /// Fill a block of whole pixels, clipped to the raster.
    pub fn fill_block(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(self.height)..y_end {
            let base = row as usize * self.width as usize;
            for col in x.min(self.width)..x_end {
                self.pixels[base + col as usize] = color;
            }
        }
    }

    /// Nearest-neighbour sample at normalized coordinates (u, v) in 0..1.
    pub fn sample(&self, u: f64, v: f64) -> Option<Rgba> {
        if self.width == 0 || self.height == 0 || !u.is_finite() || !v.is_finite() {
            return None;
        }
        let x = (u.rem_euclid(1.0) * self.width as f64) as u32;
        let y = (v.clamp(0.0, 1.0) * (self.height - 1) as f64).round() as u32;
        self.pixel(x.min(self.width - 1), y)
    }

    /// Binary PPM (P6) encoding; alpha is composited over black.
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len() * 3);
        out.extend_from_slice(header.as_bytes());
        for px in &self.pixels {
            let flat = px.over(Rgba::BLACK);
            out.extend_from_slice(&[flat.r, flat.g, flat.b]);
        }
        out
    }

    fn brush(&mut self, x: i64, y: i64, color: Rgba) {
        let w = self.line_width.round().max(1.0) as i64;
        if w == 1 {
            self.put_pixel(x, y, color);
            return;
        }
        let lo = -(w / 2);
        for dy in lo..lo + w {
            for dx in lo..lo + w {
                self.put_pixel(x + dx, y + dy, color);
            }
        }
    }
}

impl Surface for Raster {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.width = size.width;
        self.height = size.height;
        self.pixels = vec![Rgba::TRANSPARENT; size.width as usize * size.height as usize];
    }

    fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let x0 = rect.x.round().max(0.0) as i64;
        let y0 = rect.y.round().max(0.0) as i64;
        let x1 = rect.right().round().min(self.width as f64) as i64;
        let y1 = rect.bottom().round().min(self.height as f64) as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                self.put_pixel(x, y, color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba) {
        let tl = ScreenPoint::new(rect.x, rect.y);
        let tr = ScreenPoint::new(rect.right(), rect.y);
        let br = ScreenPoint::new(rect.right(), rect.bottom());
        let bl = ScreenPoint::new(rect.x, rect.bottom());
        self.stroke_line(tl, tr, color);
        self.stroke_line(tr, br, color);
        self.stroke_line(br, bl, color);
        self.stroke_line(bl, tl, color);
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgba) {
        if !from.is_finite() || !to.is_finite() {
            return;
        }
        // Bresenham over rounded endpoints.
        let (mut x0, mut y0) = (from.x.round() as i64, from.y.round() as i64);
        let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let limit = self.width as i64 + self.height as i64;
        if dx > 4 * limit || -dy > 4 * limit {
            return;
        }
        loop {
            self.brush(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        if !center.is_finite() || !radius.is_finite() || radius < 0.0 {
            return;
        }
        let (w, h) = (self.width as f64, self.height as f64);
        let pad = self.line_width + 1.0;
        if radius > 4.0 * (w + h)
            || center.x + radius < -pad
            || center.y + radius < -pad
            || center.x - radius > w + pad
            || center.y - radius > h + pad
        {
            return;
        }
        // Midpoint circle.
        let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
        let r = radius.round() as i64;
        if r == 0 {
            self.brush(cx, cy, color);
            return;
        }
        let mut x = r;
        let mut y = 0i64;
        let mut err = 1 - r;
        while x >= y {
            for (px, py) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.brush(cx + px, cy + py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let y0 = (center.y - radius).floor().max(0.0) as i64;
        let y1 = (center.y + radius).ceil().min(self.height as f64) as i64;
        let x0 = (center.x - radius).floor().max(0.0) as i64;
        let x1 = (center.x + radius).ceil().min(self.width as f64) as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.put_pixel(x, y, color);
                }
            }
        }
    }

    fn fill_text(&mut self, text: &str, at: ScreenPoint, font: &FontMetrics, color: Rgba) {
        // No glyph rasterizer here: each visible character becomes a block
        // covering its advance, which keeps layout and coverage faithful.
        let glyph_w = (font.char_width * 0.7).max(1.0);
        let glyph_h = (font.ascent * 0.7).max(1.0);
        let mut x = at.x;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                self.fill_rect(Rect::new(x, at.y - glyph_h, glyph_w, glyph_h), color);
            }
            x += font.char_width;
        }
    }

    fn line_width(&self) -> f64 {
        self.line_width
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = if width.is_finite() && width > 0.0 { width } else { 1.0 };
    }

    fn blit(&mut self, raster: &Raster, x: i32, y: i32) {
        for row in 0..raster.height {
            let ty = y as i64 + row as i64;
            if ty < 0 || ty >= self.height as i64 {
                continue;
            }
            for col in 0..raster.width {
                let tx = x as i64 + col as i64;
                if let Some(px) = raster.pixel(col, row) {
                    self.put_pixel(tx, ty, px);
                }
            }
        }
    }
}
