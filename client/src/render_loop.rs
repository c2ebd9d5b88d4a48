use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into one governor redraw per animation frame.
///
/// Signal effects call [`RenderScheduler::request`] freely; the repaint
/// closure runs once on the next `requestAnimationFrame`. The governor
/// still decides how thorough that pass is.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    force: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn schedule(&self) {
        if self.raf_id.get().is_some() {
            return;
        }
        let callback = self.callback.borrow();
        let (Some(window), Some(cb)) = (self.window.as_ref(), callback.as_ref()) else {
            return;
        };
        match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => self.raf_id.set(Some(id)),
            Err(e) => web_sys::console::warn_1(&format!("requestAnimationFrame failed: {e:?}").into()),
        }
    }
}

impl RenderScheduler {
    /// `repaint(force)` receives whether any request in the batch was forced.
    pub fn new(repaint: impl Fn(bool) + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            force: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            let Some(inner) = inner_cb.upgrade() else {
                return;
            };
            inner.raf_id.set(None);
            repaint(inner.force.replace(false));
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn request(&self, force: bool) {
        if force {
            self.inner.force.set(true);
        }
        self.inner.schedule();
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.callback.borrow_mut().take();
    }
}
