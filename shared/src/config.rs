use serde::{Deserialize, Serialize};

use crate::projection::ViewMode;

pub const DEFAULT_SLOW_FRAME_MS: f64 = 50.0;
pub const DEFAULT_SLOW_FRAME_COUNT: u32 = 3;
pub const DEFAULT_DEFERRED_FULL_MS: f64 = 1500.0;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: f64 = 100.0;
pub const DEFAULT_POINTER_THROTTLE_MS: f64 = 100.0;
pub const DEFAULT_QUIET_RESET_MS: f64 = 3000.0;
pub const DEFAULT_PROGRESSIVE_BUDGET_MS: f64 = 250.0;
pub const DEFAULT_STAR_MAGNITUDE_LIMIT: f64 = 6.0;
/// Stars fainter than this are skipped in quick passes.
pub const DEFAULT_QUICK_MAGNITUDE_LIMIT: f64 = 4.0;

/// Render-loop timing knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorTuning {
    pub slow_frame_ms: f64,
    pub slow_frame_count: u32,
    pub deferred_full_ms: f64,
    pub resize_debounce_ms: f64,
    pub pointer_throttle_ms: f64,
    pub quiet_reset_ms: f64,
}

impl Default for GovernorTuning {
    fn default() -> Self {
        Self {
            slow_frame_ms: DEFAULT_SLOW_FRAME_MS,
            slow_frame_count: DEFAULT_SLOW_FRAME_COUNT,
            deferred_full_ms: DEFAULT_DEFERRED_FULL_MS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            pointer_throttle_ms: DEFAULT_POINTER_THROTTLE_MS,
            quiet_reset_ms: DEFAULT_QUIET_RESET_MS,
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

impl GovernorTuning {
    fn validated(self) -> Self {
        let d = Self::default();
        Self {
            slow_frame_ms: positive_or(self.slow_frame_ms, d.slow_frame_ms),
            slow_frame_count: if self.slow_frame_count > 0 {
                self.slow_frame_count
            } else {
                d.slow_frame_count
            },
            deferred_full_ms: positive_or(self.deferred_full_ms, d.deferred_full_ms),
            resize_debounce_ms: positive_or(self.resize_debounce_ms, d.resize_debounce_ms),
            pointer_throttle_ms: positive_or(self.pointer_throttle_ms, d.pointer_throttle_ms),
            quiet_reset_ms: positive_or(self.quiet_reset_ms, d.quiet_reset_ms),
        }
    }
}

/// Which optional body groups are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyFilter {
    pub planets: bool,
    pub moon: bool,
    pub deep_sky: bool,
}

impl Default for BodyFilter {
    fn default() -> Self {
        Self {
            planets: true,
            moon: true,
            deep_sky: true,
        }
    }
}

/// Display preferences handed to every pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub ink_saver: bool,
    pub show_constellations: bool,
    pub show_labels: bool,
    pub brighten_stars: bool,
    pub star_magnitude_limit: f64,
    pub quick_magnitude_limit: f64,
    pub bodies: BodyFilter,
    pub view: ViewMode,
    pub governor: GovernorTuning,
    pub progressive_budget_ms: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ink_saver: false,
            show_constellations: true,
            show_labels: true,
            brighten_stars: false,
            star_magnitude_limit: DEFAULT_STAR_MAGNITUDE_LIMIT,
            quick_magnitude_limit: DEFAULT_QUICK_MAGNITUDE_LIMIT,
            bodies: BodyFilter::default(),
            view: ViewMode::default(),
            governor: GovernorTuning::default(),
            progressive_budget_ms: DEFAULT_PROGRESSIVE_BUDGET_MS,
        }
    }
}

impl RenderConfig {
    /// Parses a JSON config. Missing fields take defaults; non-positive
    /// timings are replaced by their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: RenderConfig =
            serde_json::from_str(json).map_err(|e| format!("render config parse error: {e}"))?;
        Ok(config.validated())
    }

    pub fn validated(self) -> Self {
        Self {
            governor: self.governor.validated(),
            progressive_budget_ms: positive_or(self.progressive_budget_ms, DEFAULT_PROGRESSIVE_BUDGET_MS),
            ..self
        }
    }
}
