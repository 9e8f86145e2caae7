//! Declarative per-sensor band configuration
//!
//! A sensor is described by an XML document listing its bands in physical
//! order:
//!
//! ```xml
//! <sensor name="GF1_WFV">
//!   <bands>
//!     <band key="1">
//!       <tag>B1</tag>
//!       <order>1</order>
//!       <resolution>16</resolution>
//!       <wavelength>450 520</wavelength>
//!       <description>Blue</description>
//!     </band>
//!   </bands>
//! </sensor>
//! ```

use crate::core::band::{Band, BandRegistry, Wavelength};
use crate::types::{SdrlError, SdrlResult};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

const BUILTIN_SENSORS: &[(&str, &str)] = &[
    ("ElectronicMap", include_str!("../../config/sensors/ElectronicMap.xml")),
    ("GF1_WFV", include_str!("../../config/sensors/GF1_WFV.xml")),
    ("GF2_PMS", include_str!("../../config/sensors/GF2_PMS.xml")),
];

/// Parsed sensor description
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default)]
    pub bands: BandRecordList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandRecordList {
    #[serde(rename = "band", default)]
    pub bands: Vec<BandRecord>,
}

/// One `<band>` entry. `key` only identifies the entry in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct BandRecord {
    #[serde(rename = "@key", default)]
    pub key: Option<String>,
    pub tag: String,
    pub order: usize,
    pub resolution: f64,
    #[serde(default)]
    pub wavelength: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl BandRecord {
    fn to_band(&self) -> SdrlResult<Band> {
        if self.order == 0 {
            return Err(SdrlError::InvalidConfig(format!(
                "band '{}' has order 0, band orders start at 1",
                self.tag
            )));
        }
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Band::new(
            self.tag.trim(),
            self.order,
            self.resolution,
            parse_wavelength(self.wavelength.as_deref())?,
            description,
        ))
    }
}

/// `"675"` is a single wavelength, `"620 670"` or `"620,670"` a range
fn parse_wavelength(text: Option<&str>) -> SdrlResult<Option<Wavelength>> {
    let Some(text) = text else {
        return Ok(None);
    };
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>().map_err(|_| {
                SdrlError::InvalidConfig(format!("invalid wavelength value '{}'", part))
            })
        })
        .collect::<SdrlResult<Vec<f64>>>()?;

    match values.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(Wavelength::Single(*single))),
        [low, high] if low <= high => Ok(Some(Wavelength::Range(*low, *high))),
        _ => Err(SdrlError::InvalidConfig(format!(
            "wavelength '{}' must be one value or an ascending pair",
            text
        ))),
    }
}

impl SensorConfig {
    pub fn from_xml(xml_content: &str) -> SdrlResult<Self> {
        from_str::<SensorConfig>(xml_content)
            .map_err(|e| SdrlError::XmlParsing(format!("Failed to parse sensor configuration: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SdrlResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml(&content)
    }

    pub fn band_records(&self) -> &[BandRecord] {
        &self.bands.bands
    }
}

impl BandRegistry {
    /// Build a registry in configuration order
    pub fn from_config(config: &SensorConfig) -> SdrlResult<Self> {
        config
            .band_records()
            .iter()
            .map(BandRecord::to_band)
            .collect::<SdrlResult<Vec<Band>>>()
            .map(BandRegistry::new)
    }
}

/// Sensors known by name
#[derive(Debug, Clone, Default)]
pub struct SensorCatalog {
    sensors: HashMap<String, SensorConfig>,
}

impl SensorCatalog {
    /// Catalog without any sensor
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog of the sensors shipped with the library
    pub fn builtin() -> SdrlResult<Self> {
        let mut catalog = Self::empty();
        for (name, xml) in BUILTIN_SENSORS {
            catalog.insert(*name, SensorConfig::from_xml(xml)?);
        }
        Ok(catalog)
    }

    /// Register `config` under `name`, replacing any previous definition
    pub fn insert(&mut self, name: impl Into<String>, config: SensorConfig) {
        self.sensors.insert(name.into(), config);
    }

    /// Add every `*.xml` in `dir` and its direct subdirectories, keyed by file stem.
    ///
    /// Returns the number of sensors loaded.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> SdrlResult<usize> {
        let dir = dir.as_ref();
        log::info!("Loading sensor configurations from: {}", dir.display());

        let walker = WalkDir::new(dir).min_depth(1).max_depth(2).sort_by_file_name();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            let is_xml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
            if entry.file_type().is_file() && is_xml {
                files.push(path.to_path_buf());
            }
        }

        let mut loaded = 0;
        for path in files {
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let name = name.to_string();
            let config = SensorConfig::from_file(&path)?;
            log::debug!("Sensor {} with {} bands from {}", name, config.band_records().len(), path.display());
            self.insert(name, config);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> SdrlResult<&SensorConfig> {
        self.sensors
            .get(name)
            .ok_or_else(|| SdrlError::SensorNotFound(name.to_string()))
    }

    /// Registry for the named sensor
    pub fn registry(&self, name: &str) -> SdrlResult<BandRegistry> {
        BandRegistry::from_config(self.get(name)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sensors.contains_key(name)
    }

    /// Sensor names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
