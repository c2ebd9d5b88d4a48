use std::f64::consts::TAU;

use skyglass_shared::colors::Rgba;
use skyglass_shared::frame::FontMetrics;
use skyglass_shared::geom::{Rect, ScreenPoint, SurfaceSize};
use skyglass_shared::{Raster, Surface};
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()??
        .dyn_into::<CanvasRenderingContext2d>()
        .ok()
}

fn font_css(font: &FontMetrics) -> String {
    format!("{:.1}px 'JetBrains Mono', monospace", font.size_px)
}

/// Offscreen canvas used to alpha-blend rasters onto the visible one;
/// `put_image_data` would overwrite instead of compositing.
struct Scratch {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Scratch {
    fn new() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        let canvas = document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        let ctx = context_2d(&canvas)?;
        Some(Self { canvas, ctx })
    }
}

/// `Surface` over a `<canvas>` 2D context. Coordinates are device pixels.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    scratch: Option<Scratch>,
    size: SurfaceSize,
    line_width: f64,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Option<Self> {
        let ctx = context_2d(&canvas)?;
        let size = SurfaceSize::new(canvas.width(), canvas.height());
        ctx.set_text_baseline("alphabetic");
        Some(Self {
            canvas,
            ctx,
            scratch: None,
            size,
            line_width: 1.0,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn arc(&self, center: ScreenPoint, radius: f64) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(center.x, center.y, radius.max(0.0), 0.0, TAU);
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        self.size = size;
        // Resizing resets the 2D context state.
        self.ctx.set_line_width(self.line_width);
        self.ctx.set_text_baseline("alphabetic");
    }

    fn clear(&mut self, color: Rgba) {
        self.ctx
            .clear_rect(0.0, 0.0, self.size.width as f64, self.size.height as f64);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx
            .fill_rect(0.0, 0.0, self.size.width as f64, self.size.height as f64);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba) {
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.stroke_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgba) {
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.begin_path();
        self.ctx.move_to(from.x, from.y);
        self.ctx.line_to(to.x, to.y);
        self.ctx.stroke();
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        self.ctx.set_stroke_style_str(&color.css());
        self.arc(center, radius);
        self.ctx.stroke();
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
        self.arc(center, radius);
        self.ctx.fill();
    }

    fn fill_text(&mut self, text: &str, at: ScreenPoint, font: &FontMetrics, color: Rgba) {
        self.ctx.set_font(&font_css(font));
        self.ctx.set_fill_style_str(&color.css());
        let _ = self.ctx.fill_text(text, at.x, at.y);
    }

    fn measure_text(&self, text: &str, font: &FontMetrics) -> f64 {
        self.ctx.set_font(&font_css(font));
        self.ctx
            .measure_text(text)
            .map(|m| m.width())
            .unwrap_or_else(|_| font.text_width(text))
    }

    fn line_width(&self) -> f64 {
        self.line_width
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
        self.ctx.set_line_width(width);
    }

    fn blit(&mut self, raster: &Raster, x: i32, y: i32) {
        if raster.width() == 0 || raster.height() == 0 {
            return;
        }
        if self.scratch.is_none() {
            self.scratch = Scratch::new();
        }
        let Some(scratch) = self.scratch.as_ref() else {
            return;
        };
        let bytes: Vec<u8> = raster
            .pixels()
            .iter()
            .flat_map(|p| [p.r, p.g, p.b, p.a])
            .collect();
        let image = match ImageData::new_with_u8_clamped_array_and_sh(Clamped(&bytes), raster.width(), raster.height())
        {
            Ok(image) => image,
            Err(e) => {
                web_sys::console::warn_1(&format!("raster upload failed: {e:?}").into());
                return;
            }
        };
        if scratch.canvas.width() != raster.width() || scratch.canvas.height() != raster.height() {
            scratch.canvas.set_width(raster.width());
            scratch.canvas.set_height(raster.height());
        }
        let _ = scratch.ctx.put_image_data(&image, 0.0, 0.0);
        let _ = self
            .ctx
            .draw_image_with_html_canvas_element(&scratch.canvas, x as f64, y as f64);
    }
}
