use std::path::PathBuf;

use chrono::{DateTime, Utc};
use skyglass_shared::{ChartKind, Observer};

pub const DEFAULT_WIDTH: f64 = 800.0;
pub const DEFAULT_HEIGHT: f64 = 600.0;
pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_OUTPUT: &str = "skyglass.ppm";
// Greenwich
pub const DEFAULT_LATITUDE_DEG: f64 = 51.4769;
pub const DEFAULT_LONGITUDE_DEG: f64 = 0.0;

/// One render request, read from `SKYGLASS_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub chart: ChartKind,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub output: PathBuf,
    pub catalog: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub time: DateTime<Utc>,
    pub observer: Observer,
    pub ink_saver: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            chart: chart(),
            width: positive_f64("SKYGLASS_WIDTH").unwrap_or(DEFAULT_WIDTH),
            height: positive_f64("SKYGLASS_HEIGHT").unwrap_or(DEFAULT_HEIGHT),
            scale: positive_f64("SKYGLASS_SCALE").unwrap_or(DEFAULT_SCALE),
            output: path("SKYGLASS_OUTPUT").unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            catalog: path("SKYGLASS_CATALOG"),
            config: path("SKYGLASS_CONFIG"),
            time: time(),
            observer: observer(),
            ink_saver: flag("SKYGLASS_INK_SAVER"),
        }
    }
}

fn chart() -> ChartKind {
    std::env::var("SKYGLASS_CHART")
        .ok()
        .and_then(|value| ChartKind::parse(&value))
        .unwrap_or_default()
}

fn positive_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn degrees(key: &str, limit: f64) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && value.abs() <= limit)
}

fn path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

fn time() -> DateTime<Utc> {
    std::env::var("SKYGLASS_TIME")
        .ok()
        .and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn observer() -> Observer {
    Observer {
        longitude_deg: degrees("SKYGLASS_LON", 180.0).unwrap_or(DEFAULT_LONGITUDE_DEG),
        latitude_deg: degrees("SKYGLASS_LAT", 90.0).unwrap_or(DEFAULT_LATITUDE_DEG),
        // Sidereal charts only need UT; insolation rows are cut at UTC midnight.
        utc_offset_minutes: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 11] = [
        "SKYGLASS_CHART",
        "SKYGLASS_WIDTH",
        "SKYGLASS_HEIGHT",
        "SKYGLASS_SCALE",
        "SKYGLASS_OUTPUT",
        "SKYGLASS_CATALOG",
        "SKYGLASS_CONFIG",
        "SKYGLASS_TIME",
        "SKYGLASS_LAT",
        "SKYGLASS_LON",
        "SKYGLASS_INK_SAVER",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter().map(|key| (*key, None)).collect()
    }

    #[test]
    fn defaults_when_unset() {
        temp_env::with_vars(unset_all(), || {
            let settings = Settings::from_env();
            assert_eq!(settings.chart, ChartKind::Sky);
            assert_eq!(settings.width, DEFAULT_WIDTH);
            assert_eq!(settings.height, DEFAULT_HEIGHT);
            assert_eq!(settings.scale, DEFAULT_SCALE);
            assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT));
            assert!(settings.catalog.is_none());
            assert!(settings.config.is_none());
            assert_eq!(settings.observer.latitude_deg, DEFAULT_LATITUDE_DEG);
            assert!(!settings.ink_saver);
        });
    }

    #[test]
    fn reads_every_variable() {
        temp_env::with_vars(
            [
                ("SKYGLASS_CHART", Some("eclipse")),
                ("SKYGLASS_WIDTH", Some("1024")),
                ("SKYGLASS_HEIGHT", Some("512")),
                ("SKYGLASS_SCALE", Some("2")),
                ("SKYGLASS_OUTPUT", Some("/tmp/map.ppm")),
                ("SKYGLASS_CATALOG", Some("catalog.json")),
                ("SKYGLASS_CONFIG", Some("render.json")),
                ("SKYGLASS_TIME", Some("2024-04-08T18:00:00Z")),
                ("SKYGLASS_LAT", Some("-33.9")),
                ("SKYGLASS_LON", Some("18.4")),
                ("SKYGLASS_INK_SAVER", Some("yes")),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.chart, ChartKind::EclipseMap);
                assert_eq!((settings.width, settings.height, settings.scale), (1024.0, 512.0, 2.0));
                assert_eq!(settings.output, PathBuf::from("/tmp/map.ppm"));
                assert_eq!(settings.catalog, Some(PathBuf::from("catalog.json")));
                assert_eq!(settings.config, Some(PathBuf::from("render.json")));
                assert_eq!(settings.time.to_rfc3339(), "2024-04-08T18:00:00+00:00");
                assert_eq!(settings.observer.latitude_deg, -33.9);
                assert_eq!(settings.observer.longitude_deg, 18.4);
                assert!(settings.ink_saver);
            },
        );
    }

    #[test]
    fn invalid_values_fall_back() {
        temp_env::with_vars(
            [
                ("SKYGLASS_CHART", Some("planetarium")),
                ("SKYGLASS_WIDTH", Some("-5")),
                ("SKYGLASS_HEIGHT", Some("tall")),
                ("SKYGLASS_SCALE", Some("0")),
                ("SKYGLASS_OUTPUT", Some("   ")),
                ("SKYGLASS_LAT", Some("91")),
                ("SKYGLASS_LON", Some("NaN")),
                ("SKYGLASS_INK_SAVER", Some("maybe")),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.chart, ChartKind::Sky);
                assert_eq!(settings.width, DEFAULT_WIDTH);
                assert_eq!(settings.height, DEFAULT_HEIGHT);
                assert_eq!(settings.scale, DEFAULT_SCALE);
                assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT));
                assert_eq!(settings.observer.latitude_deg, DEFAULT_LATITUDE_DEG);
                assert_eq!(settings.observer.longitude_deg, DEFAULT_LONGITUDE_DEG);
                assert!(!settings.ink_saver);
            },
        );
    }

    #[test]
    fn unparseable_time_uses_now() {
        temp_env::with_var("SKYGLASS_TIME", Some("yesterday"), || {
            let before = Utc::now();
            let settings = Settings::from_env();
            assert!(settings.time >= before);
        });
    }
}
