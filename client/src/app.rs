use std::cell::RefCell;

use chrono::{DateTime, Utc};
use gloo_storage::Storage;
use gloo_timers::callback::Interval;
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use skyglass_shared::{ChartKind, MarqueeFields, Observer, RenderConfig};

use crate::canvas::ChartCanvas;

const SETTINGS_KEY: &str = "skyglass_settings";
const CLOCK_TICK_MS: u32 = 60_000;

thread_local! {
    static CLOCK_INTERVAL: RefCell<Option<Interval>> = const { RefCell::new(None) };
}

/// Newtype wrappers give each signal a distinct type for Leptos context.
#[derive(Clone, Copy)]
pub(crate) struct ActiveChart(pub RwSignal<ChartKind>);
#[derive(Clone, Copy)]
pub(crate) struct Preferences(pub RwSignal<RenderConfig>);
#[derive(Clone, Copy)]
pub(crate) struct ObserverSetting(pub RwSignal<Observer>);
#[derive(Clone, Copy)]
pub(crate) struct SceneTime(pub RwSignal<DateTime<Utc>>);
#[derive(Clone, Copy)]
pub(crate) struct MarqueeFieldsSetting(pub RwSignal<MarqueeFields>);
#[derive(Clone, Copy)]
pub(crate) struct MarqueeText(pub RwSignal<Option<String>>);

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    chart: ChartKind,
    config: RenderConfig,
    observer: Observer,
    marquee: MarqueeFields,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chart: ChartKind::default(),
            config: RenderConfig::default(),
            observer: Observer {
                longitude_deg: 0.0,
                latitude_deg: 51.4769,
                utc_offset_minutes: browser_utc_offset_minutes(),
            },
            marquee: MarqueeFields {
                equatorial: true,
                horizontal: true,
                magnitude: true,
                ..MarqueeFields::default()
            },
        }
    }
}

/// Standard-time offset of the browser's zone: the smaller of January's and July's.
fn browser_utc_offset_minutes() -> i32 {
    let offset_at = |month: u32| {
        let date = js_sys::Date::new_with_year_month_day(2024, month as i32, 1);
        -(date.get_timezone_offset() as i32)
    };
    offset_at(0).min(offset_at(6))
}

#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let chart = RwSignal::new(saved.chart);
    let preferences = RwSignal::new(saved.config.validated());
    let observer = RwSignal::new(saved.observer);
    let time = RwSignal::new(Utc::now());
    let marquee_fields = RwSignal::new(saved.marquee);
    let marquee: RwSignal<Option<String>> = RwSignal::new(None);

    provide_context(ActiveChart(chart));
    provide_context(Preferences(preferences));
    provide_context(ObserverSetting(observer));
    provide_context(SceneTime(time));
    provide_context(MarqueeFieldsSetting(marquee_fields));
    provide_context(MarqueeText(marquee));

    // Persist settings
    Effect::new(move || {
        let settings = Settings {
            chart: chart.get(),
            config: preferences.get(),
            observer: observer.get(),
            marquee: marquee_fields.get(),
        };
        if let Err(e) = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings) {
            web_sys::console::warn_1(&format!("failed to save settings: {e}").into());
        }
    });

    // Scene clock
    Effect::new(move || {
        CLOCK_INTERVAL.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                old.cancel();
            }
            *slot.borrow_mut() = Some(Interval::new(CLOCK_TICK_MS, move || time.set(Utc::now())));
        });
    });

    view! {
        <div style="display: flex; flex-direction: column; width: 100%; height: 100%; background: #080c1e; color: #d2dcf0; font-family: 'JetBrains Mono', monospace;">
            <Toolbar />
            <div style="flex: 1; position: relative; min-height: 0;">
                <ChartCanvas />
            </div>
            <div style="padding: 4px 10px; font-size: 0.8rem; min-height: 1.4em; border-top: 1px solid #282c3e;">
                {move || marquee.get().unwrap_or_default()}
            </div>
        </div>
    }
}

/// A checkbox bound to one boolean of the render config.
fn preference_toggle(
    label: &'static str,
    preferences: RwSignal<RenderConfig>,
    read: fn(&RenderConfig) -> bool,
    write: fn(&mut RenderConfig, bool),
) -> impl IntoView {
    view! {
        <label style="display: inline-flex; align-items: center; gap: 4px; margin-right: 12px;">
            <input
                type="checkbox"
                prop:checked=move || preferences.with(read)
                on:change=move |e| {
                    let checked = event_target_checked(&e);
                    preferences.update(|config| write(config, checked));
                }
            />
            {label}
        </label>
    }
}

fn degrees_input(label: &'static str, value: Signal<f64>, limit: f64, set: impl Fn(f64) + 'static) -> impl IntoView {
    view! {
        <label style="margin-right: 12px;">
            {label} " "
            <input
                type="number"
                step="0.1"
                style="width: 6em; background: #13161f; color: inherit; border: 1px solid #282c3e;"
                prop:value=move || format!("{:.2}", value.get())
                on:change=move |e| {
                    if let Ok(parsed) = event_target_value(&e).trim().parse::<f64>()
                        && parsed.is_finite()
                        && parsed.abs() <= limit
                    {
                        set(parsed);
                    }
                }
            />
        </label>
    }
}

#[component]
fn Toolbar() -> impl IntoView {
    let ActiveChart(chart) = expect_context();
    let Preferences(preferences) = expect_context();
    let ObserverSetting(observer) = expect_context();

    let tabs = ChartKind::ALL
        .into_iter()
        .map(|kind| {
            view! {
                <button
                    style=move || {
                        let background = if chart.get() == kind { "#282c3e" } else { "#13161f" };
                        format!("background: {background}; color: inherit; border: 1px solid #282c3e; border-radius: 4px; padding: 3px 10px; margin-right: 4px; cursor: pointer;")
                    }
                    on:click=move |_| chart.set(kind)
                >
                    {kind.label()}
                </button>
            }
        })
        .collect_view();

    view! {
        <div style="display: flex; flex-wrap: wrap; align-items: center; gap: 6px; padding: 6px 10px; border-bottom: 1px solid #282c3e; font-size: 0.8rem;">
            <div>{tabs}</div>
            {preference_toggle("Ink saver", preferences, |c| c.ink_saver, |c, v| c.ink_saver = v)}
            {preference_toggle("Constellations", preferences, |c| c.show_constellations, |c, v| c.show_constellations = v)}
            {preference_toggle("Labels", preferences, |c| c.show_labels, |c, v| c.show_labels = v)}
            {preference_toggle("Bright stars", preferences, |c| c.brighten_stars, |c, v| c.brighten_stars = v)}
            {degrees_input(
                "Lat",
                Signal::derive(move || observer.get().latitude_deg),
                90.0,
                move |lat| observer.update(|o| o.latitude_deg = lat),
            )}
            {degrees_input(
                "Lon",
                Signal::derive(move || observer.get().longitude_deg),
                180.0,
                move |lon| observer.update(|o| o.longitude_deg = lon),
            )}
        </div>
    }
}
