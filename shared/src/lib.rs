pub mod astro;
pub mod charts;
pub mod colors;
pub mod compositor;
pub mod config;
pub mod ephemeris;
pub mod flood_fill;
pub mod frame;
pub mod geom;
pub mod governor;
pub mod labels;
pub mod marquee;
pub mod picker;
pub mod progressive;
pub mod projection;
pub mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timers;

pub use charts::{Chart, ChartKind};
pub use colors::Rgba;
pub use config::RenderConfig;
pub use ephemeris::{BodyId, BodyKind, CatalogEphemeris, Ephemeris};
pub use frame::{FontSet, Observer};
pub use geom::{ScreenPoint, SurfaceSize};
pub use governor::{PassKind, PassReport, RedrawOutcome, RenderGovernor, SceneInputs};
pub use marquee::{CursorStyle, MarqueeFields};
pub use surface::{Raster, Surface};
pub use timers::{Clock, TimerHost, TimerId};
