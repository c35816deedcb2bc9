//! Per-body physical and orbital parameters, looked up by name.

use std::path::Path;

use orrery_orbit::OrbitalElements;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DEFAULT_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

/// Anything that can answer "what are the parameters of body `name`".
pub trait BodySource {
    fn record(&self, name: &str) -> Option<BodyRecord>;
}

/// Raw catalog entry. Every key is optional; units are the catalog's
/// (degrees, days, kilometres).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyRecord {
    pub texture: Option<String>,
    pub night_texture: Option<String>,
    pub radius: Option<f64>,
    pub light_source: Option<bool>,
    pub flattening: Option<f64>,
    pub shader: Option<String>,
    pub ring_texture: Option<String>,
    pub inner_radius: Option<f64>,
    pub outer_radius: Option<f64>,
    pub color: Option<Vec<f32>>,
    pub eccentricity: Option<f64>,
    pub semi_major_axis: Option<f64>,
    pub inclination: Option<f64>,
    pub ascending_node: Option<f64>,
    pub argument_periapsis: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub sidereal_revolution: Option<f64>,
    pub sidereal_rotation: Option<f64>,
    pub axial_tilt: Option<f64>,
    /// Colon-delimited satellite names.
    pub satellites: Option<String>,
}

/// In-memory catalog keyed by body name, usually loaded from RON.
#[derive(Debug, Clone, Default)]
pub struct BodyCatalog {
    records: FxHashMap<String, BodyRecord>,
}

impl BodyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, record: BodyRecord) {
        self.records.insert(name.into(), record);
    }

    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        let records: FxHashMap<String, BodyRecord> = ron::from_str(text)?;
        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_ron_str(&text)?;
        log::info!("Loaded {} bodies from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }
}

impl BodySource for BodyCatalog {
    fn record(&self, name: &str) -> Option<BodyRecord> {
        self.records.get(name).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingParams {
    pub texture: String,
    pub inner_radius: f64,
    pub outer_radius: f64,
}

/// A catalog record with defaults applied and units converted to
/// radians and seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyParams {
    pub name: String,
    pub radius: f64,
    pub flattening: f64,
    pub light_source: bool,
    pub color: [f32; 3],
    pub texture: Option<String>,
    pub night_texture: Option<String>,
    pub shader: Option<String>,
    pub ring: Option<RingParams>,
    pub elements: OrbitalElements,
    /// Sidereal rotation period in seconds.
    pub rotation_period: f64,
    /// Axial tilt in radians.
    pub axial_tilt: f64,
    pub satellites: Vec<String>,
}

impl BodyParams {
    pub fn resolve(name: &str, record: &BodyRecord) -> Self {
        let radius = record.radius.unwrap_or_else(|| {
            log::warn!("body '{name}' has no radius, using 0");
            0.0
        });

        let color = match record.color.as_deref() {
            None => DEFAULT_COLOR,
            Some([r, g, b]) => [*r, *g, *b],
            Some(other) => {
                log::warn!("body '{name}': color {other:?} size is not 3");
                let mut color = DEFAULT_COLOR;
                for (dst, src) in color.iter_mut().zip(other) {
                    *dst = *src;
                }
                color
            }
        };

        let ring = record.ring_texture.as_ref().map(|texture| RingParams {
            texture: texture.clone(),
            inner_radius: record.inner_radius.unwrap_or(0.0),
            outer_radius: record.outer_radius.unwrap_or(0.0),
        });

        let elements = OrbitalElements {
            eccentricity: record.eccentricity.unwrap_or(0.0),
            semi_major_axis: record.semi_major_axis.unwrap_or(0.0),
            inclination: record.inclination.unwrap_or(0.0).to_radians(),
            longitude_of_ascending_node: record.ascending_node.unwrap_or(0.0).to_radians(),
            argument_of_periapsis: record.argument_periapsis.unwrap_or(0.0).to_radians(),
            mean_anomaly_at_epoch: record.mean_anomaly.unwrap_or(0.0).to_radians(),
            revolution_period: record.sidereal_revolution.unwrap_or(0.0) * SECONDS_PER_DAY,
        };

        let satellites = record
            .satellites
            .as_deref()
            .unwrap_or_default()
            .split(':')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        Self {
            name: name.to_owned(),
            radius,
            flattening: record.flattening.unwrap_or(0.0),
            light_source: record.light_source.unwrap_or(false),
            color,
            texture: record.texture.clone(),
            night_texture: record.night_texture.clone(),
            shader: record.shader.clone(),
            ring,
            elements,
            rotation_period: record.sidereal_rotation.unwrap_or(0.0) * SECONDS_PER_DAY,
            axial_tilt: record.axial_tilt.unwrap_or(0.0).to_radians(),
            satellites,
        }
    }

    /// Radius including rings.
    pub fn bounding_radius(&self) -> f64 {
        match &self.ring {
            Some(ring) => ring.outer_radius,
            None => self.radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
#![enable(implicit_some)]
{
    "sun": (
        radius: 696342.0,
        light_source: true,
        satellites: "earth:saturn",
    ),
    "earth": (
        radius: 6371.0,
        color: [0.2, 0.4, 1.0],
        semi_major_axis: 149598261.0,
        eccentricity: 0.0167,
        inclination: 90.0,
        sidereal_revolution: 365.25,
        sidereal_rotation: 0.99726968,
        axial_tilt: 23.44,
        satellites: "moon",
    ),
}
"#;

    #[test]
    fn test_catalog_parses_ron() {
        let catalog = BodyCatalog::from_ron_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        let sun = catalog.record("sun").unwrap();
        assert_eq!(sun.light_source, Some(true));
        assert!(catalog.record("pluto").is_none());
    }

    #[test]
    fn test_catalog_rejects_garbage() {
        assert!(matches!(
            BodyCatalog::from_ron_str("{ \"sun\": (radius: \"big\") }"),
            Err(SceneError::CatalogParse(_))
        ));
    }

    #[test]
    fn test_catalog_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BodyCatalog::load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, SceneError::CatalogRead { .. }));
    }

    #[test]
    fn test_catalog_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bodies.ron");
        std::fs::write(&path, SAMPLE).unwrap();
        let catalog = BodyCatalog::load(&path).unwrap();
        assert!(catalog.contains("earth"));
    }

    #[test]
    fn test_resolve_converts_units() {
        let catalog = BodyCatalog::from_ron_str(SAMPLE).unwrap();
        let earth = BodyParams::resolve("earth", &catalog.record("earth").unwrap());
        assert_eq!(earth.color, [0.2, 0.4, 1.0]);
        assert!((earth.elements.inclination - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((earth.elements.revolution_period - 365.25 * 86_400.0).abs() < 1e-6);
        assert!((earth.axial_tilt - 23.44_f64.to_radians()).abs() < 1e-12);
        assert_eq!(earth.satellites, vec!["moon".to_string()]);
    }

    #[test]
    fn test_resolve_defaults() {
        let params = BodyParams::resolve("rock", &BodyRecord::default());
        assert_eq!(params.radius, 0.0);
        assert_eq!(params.flattening, 0.0);
        assert_eq!(params.color, DEFAULT_COLOR);
        assert!(!params.light_source);
        assert!(params.satellites.is_empty());
        assert!(params.ring.is_none());
    }

    #[test]
    fn test_resolve_short_color_keeps_gray_tail() {
        let record = BodyRecord {
            color: Some(vec![1.0]),
            ..Default::default()
        };
        let params = BodyParams::resolve("odd", &record);
        assert_eq!(params.color, [1.0, 0.5, 0.5]);
    }

    #[test]
    fn test_bounding_radius_uses_ring() {
        let record = BodyRecord {
            radius: Some(58_232.0),
            ring_texture: Some("saturnrings.png".into()),
            inner_radius: Some(74_500.0),
            outer_radius: Some(140_220.0),
            ..Default::default()
        };
        let params = BodyParams::resolve("saturn", &record);
        assert_eq!(params.bounding_radius(), 140_220.0);
    }

    #[test]
    fn test_empty_satellite_segments_skipped() {
        let record = BodyRecord {
            satellites: Some("io::europa:".into()),
            ..Default::default()
        };
        let params = BodyParams::resolve("jupiter", &record);
        assert_eq!(params.satellites, vec!["io", "europa"]);
    }
}
