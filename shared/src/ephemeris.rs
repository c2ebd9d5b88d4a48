use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::astro;

/// Drawable body categories. Selection, labeling and hit-test bias key off these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Star,
    DeepSky,
    Planet,
    Moon,
    MoonShadow,
    Constellation,
}

impl BodyKind {
    pub fn label(&self) -> &'static str {
        match self {
            BodyKind::Star => "star",
            BodyKind::DeepSky => "deep-sky object",
            BodyKind::Planet => "planet",
            BodyKind::Moon => "moon",
            BodyKind::MoonShadow => "moon shadow",
            BodyKind::Constellation => "constellation",
        }
    }
}

/// A body addressed by category and index within that category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId {
    pub kind: BodyKind,
    pub index: usize,
}

impl BodyId {
    pub const fn new(kind: BodyKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Apparent geocentric equatorial position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquatorialPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Geocentric distance, when meaningful (solar-system bodies).
    pub distance_au: Option<f64>,
}

/// Gaussian gravitational constant expressed as degrees per day at 1 AU.
const MEAN_MOTION_1AU_DEG_PER_DAY: f64 = 0.985_607_668_6;
const J2000_JD: f64 = 2_451_545.0;

fn j2000() -> f64 {
    J2000_JD
}

/// Keplerian elements, heliocentric ecliptic (angles in degrees, `a` in AU).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitElements {
    pub semi_major_au: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub ascending_node_deg: f64,
    pub perihelion_arg_deg: f64,
    /// Mean anomaly at `epoch_jd`.
    #[serde(default)]
    pub mean_anomaly_deg: f64,
    #[serde(default = "j2000")]
    pub epoch_jd: f64,
}

impl OrbitElements {
    pub fn mean_motion_deg_per_day(&self) -> f64 {
        MEAN_MOTION_1AU_DEG_PER_DAY / self.semi_major_au.abs().max(f64::EPSILON).powf(1.5)
    }

    /// Position on the orbit at true anomaly `nu_deg`.
    pub fn point(&self, nu_deg: f64) -> [f64; 3] {
        let e = self.eccentricity;
        let r = self.semi_major_au * (1.0 - e * e) / (1.0 + e * nu_deg.to_radians().cos());
        let in_plane = astro::rotate_z([r, 0.0, 0.0], self.perihelion_arg_deg + nu_deg);
        let tilted = astro::rotate_x(in_plane, self.inclination_deg);
        astro::rotate_z(tilted, self.ascending_node_deg)
    }

    pub fn true_anomaly_at(&self, jd_et: f64) -> f64 {
        let mean = self.mean_anomaly_deg + self.mean_motion_deg_per_day() * (jd_et - self.epoch_jd);
        astro::true_anomaly_deg(mean, self.eccentricity)
    }

    /// Heliocentric ecliptic position at `jd_et`, two-body motion only.
    pub fn position_at(&self, jd_et: f64) -> [f64; 3] {
        self.point(self.true_anomaly_at(jd_et))
    }
}

/// Black-box position service. skyglass never computes ephemerides itself;
/// hosts supply an implementation and the engine only queries it.
pub trait Ephemeris {
    fn count(&self, kind: BodyKind) -> usize;
    fn name(&self, id: BodyId) -> Option<&str>;
    fn position(&self, id: BodyId, jd_et: f64) -> Option<EquatorialPosition>;
    fn magnitude(&self, id: BodyId, jd_et: f64) -> Option<f64>;
    fn angular_diameter_arcsec(&self, id: BodyId, jd_et: f64) -> Option<f64>;

    /// Heliocentric ecliptic rectangular position in AU.
    fn heliocentric(&self, _id: BodyId, _jd_et: f64) -> Option<[f64; 3]> {
        None
    }

    fn orbit(&self, _id: BodyId) -> Option<OrbitElements> {
        None
    }

    fn illuminated_fraction(&self, _id: BodyId, _jd_et: f64) -> Option<f64> {
        None
    }

    /// Deep-sky objects flagged as showpieces get a hit-test bonus.
    fn is_priority(&self, _id: BodyId) -> bool {
        false
    }

    /// The body playing the Sun, if the service models one.
    fn sun(&self) -> Option<BodyId> {
        None
    }

    /// Star index pairs forming the stick figure of constellation `index`.
    fn constellation_lines(&self, _index: usize) -> &[(usize, usize)] {
        &[]
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogBody {
    kind: BodyKind,
    name: String,
    ra_deg: f64,
    dec_deg: f64,
    #[serde(default)]
    magnitude: Option<f64>,
    #[serde(default)]
    diameter_arcsec: Option<f64>,
    #[serde(default)]
    distance_au: Option<f64>,
    #[serde(default)]
    heliocentric_au: Option<[f64; 3]>,
    #[serde(default)]
    orbit: Option<OrbitElements>,
    #[serde(default)]
    illuminated: Option<f64>,
    #[serde(default)]
    priority: bool,
    #[serde(default)]
    sun: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogConstellation {
    name: String,
    ra_deg: f64,
    dec_deg: f64,
    #[serde(default)]
    lines: Vec<(usize, usize)>,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogFile {
    bodies: Vec<CatalogBody>,
    #[serde(default)]
    constellations: Vec<CatalogConstellation>,
}

/// Catalog loaded from JSON. Sky positions are fixed apart from the Sun;
/// bodies with orbital elements move around their orbits. Stands in for a real ephemeris in the headless
/// renderer, the browser demo and tests.
#[derive(Clone, Debug, Default)]
pub struct CatalogEphemeris {
    by_kind: HashMap<BodyKind, Vec<CatalogBody>>,
    constellations: Vec<CatalogConstellation>,
    sun: Option<BodyId>,
}

const SAMPLE_CATALOG: &str = include_str!("../assets/sample_catalog.json");

impl CatalogEphemeris {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| format!("catalog parse error: {e}"))?;
        let mut by_kind: HashMap<BodyKind, Vec<CatalogBody>> = HashMap::new();
        let mut sun = None;
        for body in file.bodies {
            let list = by_kind.entry(body.kind).or_default();
            if body.sun {
                sun = Some(BodyId::new(body.kind, list.len()));
            }
            list.push(body);
        }
        let star_count = by_kind.get(&BodyKind::Star).map_or(0, Vec::len);
        for constellation in &file.constellations {
            if let Some(&(a, b)) = constellation
                .lines
                .iter()
                .find(|(a, b)| *a >= star_count || *b >= star_count)
            {
                return Err(format!(
                    "constellation {} references missing star ({a}, {b})",
                    constellation.name
                ));
            }
        }
        Ok(Self {
            by_kind,
            constellations: file.constellations,
            sun,
        })
    }

    /// Small built-in catalog: bright stars, planets, Moon, Sun, a few showpiece objects.
    pub fn sample() -> Self {
        match Self::from_json(SAMPLE_CATALOG) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "bundled catalog is invalid, sky will be empty");
                Self::default()
            }
        }
    }

    fn body(&self, id: BodyId) -> Option<&CatalogBody> {
        self.by_kind.get(&id.kind)?.get(id.index)
    }

    /// Looks a body up by display name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.by_kind.iter().find_map(|(kind, bodies)| {
            bodies
                .iter()
                .position(|b| b.name.eq_ignore_ascii_case(name))
                .map(|index| BodyId::new(*kind, index))
        })
    }
}

impl Ephemeris for CatalogEphemeris {
    fn count(&self, kind: BodyKind) -> usize {
        if kind == BodyKind::Constellation {
            return self.constellations.len();
        }
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    fn name(&self, id: BodyId) -> Option<&str> {
        if id.kind == BodyKind::Constellation {
            return self.constellations.get(id.index).map(|c| c.name.as_str());
        }
        self.body(id).map(|b| b.name.as_str())
    }

    fn position(&self, id: BodyId, jd_et: f64) -> Option<EquatorialPosition> {
        // The Sun is the one body the catalog moves, so day/night charts have a season.
        if self.sun == Some(id) {
            let (ra_deg, dec_deg, distance_au) = astro::approximate_sun(jd_et);
            return Some(EquatorialPosition {
                ra_deg,
                dec_deg,
                distance_au: Some(distance_au),
            });
        }
        if id.kind == BodyKind::Constellation {
            return self.constellations.get(id.index).map(|c| EquatorialPosition {
                ra_deg: c.ra_deg,
                dec_deg: c.dec_deg,
                distance_au: None,
            });
        }
        self.body(id).map(|b| EquatorialPosition {
            ra_deg: b.ra_deg,
            dec_deg: b.dec_deg,
            distance_au: b.distance_au,
        })
    }

    fn magnitude(&self, id: BodyId, _jd_et: f64) -> Option<f64> {
        self.body(id)?.magnitude
    }

    fn angular_diameter_arcsec(&self, id: BodyId, _jd_et: f64) -> Option<f64> {
        self.body(id)?.diameter_arcsec
    }

    fn heliocentric(&self, id: BodyId, jd_et: f64) -> Option<[f64; 3]> {
        let body = self.body(id)?;
        match body.orbit {
            Some(orbit) if orbit.eccentricity < 1.0 && orbit.semi_major_au > 0.0 => Some(orbit.position_at(jd_et)),
            _ => body.heliocentric_au,
        }
    }

    fn orbit(&self, id: BodyId) -> Option<OrbitElements> {
        self.body(id)?.orbit
    }

    fn illuminated_fraction(&self, id: BodyId, _jd_et: f64) -> Option<f64> {
        self.body(id)?.illuminated
    }

    fn is_priority(&self, id: BodyId) -> bool {
        self.body(id).is_some_and(|b| b.priority)
    }

    fn sun(&self) -> Option<BodyId> {
        self.sun
    }

    fn constellation_lines(&self, index: usize) -> &[(usize, usize)] {
        self.constellations
            .get(index)
            .map(|c| c.lines.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_parses_with_every_category() {
        let eph = CatalogEphemeris::sample();
        assert!(eph.count(BodyKind::Star) >= 10);
        assert!(eph.count(BodyKind::Planet) >= 5);
        assert!(eph.count(BodyKind::DeepSky) >= 2);
        assert_eq!(eph.count(BodyKind::Moon), 1);
        assert!(eph.count(BodyKind::Constellation) >= 1);
        let sun = eph.sun().expect("sample catalog has a sun");
        assert_eq!(eph.name(sun), Some("Sun"));
    }

    #[test]
    fn find_is_case_insensitive() {
        let eph = CatalogEphemeris::sample();
        let id = eph.find("sirius").expect("Sirius in sample");
        assert_eq!(id.kind, BodyKind::Star);
        assert_eq!(eph.name(id), Some("Sirius"));
    }

    #[test]
    fn rejects_constellation_with_dangling_star() {
        let json = r#"{
            "bodies": [{"kind": "star", "name": "A", "ra_deg": 0.0, "dec_deg": 0.0}],
            "constellations": [{"name": "Bad", "ra_deg": 0.0, "dec_deg": 0.0, "lines": [[0, 3]]}]
        }"#;
        let err = CatalogEphemeris::from_json(json).expect_err("dangling index");
        assert!(err.contains("Bad"), "unexpected error: {err}");
    }

    #[test]
    fn planets_move_along_their_orbits() {
        let eph = CatalogEphemeris::sample();
        let mars = eph.find("Mars").expect("Mars in sample");
        let orbit = eph.orbit(mars).expect("Mars has elements");
        let now = eph.heliocentric(mars, 2_460_000.0).expect("position");
        let later = eph.heliocentric(mars, 2_460_100.0).expect("position");
        assert_ne!(now, later);
        for [x, y, z] in [now, later] {
            let r = (x * x + y * y + z * z).sqrt();
            let a = orbit.semi_major_au;
            let e = orbit.eccentricity;
            assert!(r >= a * (1.0 - e) - 1e-9 && r <= a * (1.0 + e) + 1e-9, "r = {r}");
        }
        // One full period later the planet is back where it was.
        let period = 360.0 / orbit.mean_motion_deg_per_day();
        let again = eph.heliocentric(mars, 2_460_000.0 + period).expect("position");
        for (a, b) in now.iter().zip(again) {
            assert!((a - b).abs() < 1e-6, "{now:?} vs {again:?}");
        }
    }

    #[test]
    fn earth_at_j2000_sits_opposite_the_sun() {
        let earth = OrbitElements {
            semi_major_au: 1.000_001,
            eccentricity: 0.016_709,
            inclination_deg: 0.0,
            ascending_node_deg: 0.0,
            perihelion_arg_deg: 102.937,
            mean_anomaly_deg: 357.529,
            epoch_jd: J2000_JD,
        };
        let (lon, lat) = astro::from_unit(earth.position_at(J2000_JD));
        // Geocentric solar longitude on 2000-01-01.5 is about 280.4°.
        assert!((lon - 100.4).abs() < 0.1, "heliocentric longitude {lon}");
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn elements_default_to_a_j2000_epoch() {
        let json = r#"{"semi_major_au": 1.0, "eccentricity": 0.0, "inclination_deg": 0.0,
            "ascending_node_deg": 0.0, "perihelion_arg_deg": 0.0}"#;
        let orbit: OrbitElements = serde_json::from_str(json).expect("valid elements");
        assert_eq!(orbit.epoch_jd, J2000_JD);
        assert_eq!(orbit.mean_anomaly_deg, 0.0);
        assert!((orbit.mean_motion_deg_per_day() - MEAN_MOTION_1AU_DEG_PER_DAY).abs() < 1e-12);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(CatalogEphemeris::from_json("{").is_err());
    }
}
