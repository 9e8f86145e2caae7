use crate::types::{SdrlError, SdrlResult};
use std::fmt;
use std::str::FromStr;

/// The fixed set of attributes every band carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandAttribute {
    Tag,
    Order,
    Resolution,
    Wavelength,
    Description,
}

impl BandAttribute {
    pub const ALL: [BandAttribute; 5] = [
        BandAttribute::Tag,
        BandAttribute::Order,
        BandAttribute::Resolution,
        BandAttribute::Wavelength,
        BandAttribute::Description,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BandAttribute::Tag => "tag",
            BandAttribute::Order => "order",
            BandAttribute::Resolution => "resolution",
            BandAttribute::Wavelength => "wavelength",
            BandAttribute::Description => "description",
        }
    }
}

impl Default for BandAttribute {
    fn default() -> Self {
        BandAttribute::Description
    }
}

impl fmt::Display for BandAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BandAttribute {
    type Err = SdrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag" => Ok(BandAttribute::Tag),
            "order" => Ok(BandAttribute::Order),
            "resolution" => Ok(BandAttribute::Resolution),
            "wavelength" => Ok(BandAttribute::Wavelength),
            "description" => Ok(BandAttribute::Description),
            other => Err(SdrlError::AttributeNotFound(other.to_string())),
        }
    }
}

/// Central wavelength or covered wavelength interval of a band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wavelength {
    Single(f64),
    Range(f64, f64),
}

impl Wavelength {
    /// Exact match for a single wavelength, inclusive bracket for a range
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Wavelength::Single(w) => w == value,
            Wavelength::Range(low, high) => low <= value && value <= high,
        }
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wavelength::Single(w) => write!(f, "{}", w),
            Wavelength::Range(low, high) => write!(f, "[{}, {}]", low, high),
        }
    }
}

/// A band attribute value crossing the generic get/set/find boundary
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Wavelength(Wavelength),
    Absent,
}

impl AttributeValue {
    fn as_f64(&self) -> Option<f64> {
        match *self {
            AttributeValue::Integer(i) => Some(i as f64),
            AttributeValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Equality with integers and floats compared numerically
    pub fn loosely_equals(&self, other: &AttributeValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Wavelength(w) => write!(f, "{}", w),
            AttributeValue::Absent => f.write_str("-"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        AttributeValue::Text(value.clone())
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value as i64)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(value as i64)
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        AttributeValue::Integer(value as i64)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<Wavelength> for AttributeValue {
    fn from(value: Wavelength) -> Self {
        AttributeValue::Wavelength(value)
    }
}

/// Metadata of one spectral band
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    tag: String,
    order: usize,
    resolution: f64,
    wavelength: Option<Wavelength>,
    description: Option<String>,
}

impl Band {
    /// Create a band; `order` is the 1-based physical band index
    pub fn new(
        tag: impl Into<String>,
        order: usize,
        resolution: f64,
        wavelength: Option<Wavelength>,
        description: Option<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            order,
            resolution,
            wavelength,
            description,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn wavelength(&self) -> Option<Wavelength> {
        self.wavelength
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Read one attribute
    pub fn get(&self, attribute: BandAttribute) -> AttributeValue {
        match attribute {
            BandAttribute::Tag => AttributeValue::Text(self.tag.clone()),
            BandAttribute::Order => AttributeValue::Integer(self.order as i64),
            BandAttribute::Resolution => AttributeValue::Number(self.resolution),
            BandAttribute::Wavelength => self
                .wavelength
                .map(AttributeValue::Wavelength)
                .unwrap_or(AttributeValue::Absent),
            BandAttribute::Description => self
                .description
                .clone()
                .map(AttributeValue::Text)
                .unwrap_or(AttributeValue::Absent),
        }
    }

    /// Read one attribute by name
    pub fn get_named(&self, attribute: &str) -> SdrlResult<AttributeValue> {
        Ok(self.get(attribute.parse()?))
    }

    /// Overwrite one attribute. The value must already have the attribute's type.
    pub fn set(&mut self, value: impl Into<AttributeValue>, attribute: BandAttribute) -> SdrlResult<()> {
        let value = value.into();
        let invalid = |reason: &str| SdrlError::InvalidAttributeValue {
            attribute: attribute.name().to_string(),
            reason: reason.to_string(),
        };

        match (attribute, value) {
            (BandAttribute::Tag, AttributeValue::Text(tag)) => self.tag = tag,
            (BandAttribute::Order, AttributeValue::Integer(order)) => {
                if order < 1 {
                    return Err(invalid("band order is 1-based"));
                }
                self.order = order as usize;
            }
            (BandAttribute::Resolution, AttributeValue::Number(resolution)) => {
                self.resolution = resolution
            }
            (BandAttribute::Resolution, AttributeValue::Integer(resolution)) => {
                self.resolution = resolution as f64
            }
            (BandAttribute::Wavelength, AttributeValue::Wavelength(w)) => self.wavelength = Some(w),
            (BandAttribute::Wavelength, AttributeValue::Number(w)) => {
                self.wavelength = Some(Wavelength::Single(w))
            }
            (BandAttribute::Wavelength, AttributeValue::Integer(w)) => {
                self.wavelength = Some(Wavelength::Single(w as f64))
            }
            (BandAttribute::Wavelength, AttributeValue::Absent) => self.wavelength = None,
            (BandAttribute::Description, AttributeValue::Text(d)) => self.description = Some(d),
            (BandAttribute::Description, AttributeValue::Absent) => self.description = None,
            (_, other) => {
                return Err(invalid(&format!("unexpected value {:?}", other)));
            }
        }
        Ok(())
    }

    /// Overwrite one attribute by name
    pub fn set_named(&mut self, value: impl Into<AttributeValue>, attribute: &str) -> SdrlResult<()> {
        self.set(value, attribute.parse()?)
    }

    /// Whether this band satisfies a registry lookup
    fn matches(&self, value: &AttributeValue, attribute: BandAttribute) -> bool {
        if attribute == BandAttribute::Wavelength {
            match (self.wavelength, value) {
                (Some(wl), AttributeValue::Integer(v)) => wl.contains(*v as f64),
                (Some(wl), AttributeValue::Number(v)) => wl.contains(*v),
                (Some(wl), AttributeValue::Wavelength(other)) => wl == *other,
                (None, AttributeValue::Absent) => true,
                _ => false,
            }
        } else {
            self.get(attribute).loosely_equals(value)
        }
    }

    /// One-row table of all five attributes
    pub fn describe(&self) -> String {
        let mut table = SummaryTable::new();
        table.push(self);
        table.render()
    }
}

/// Ordered, fixed-length collection of bands from one sensor configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandRegistry {
    bands: Vec<Band>,
}

impl BandRegistry {
    pub fn new(bands: Vec<Band>) -> Self {
        Self { bands }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Band> {
        self.bands.iter()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// All bands whose `attribute` matches `value`, in registry order.
    ///
    /// Wavelength lookups match a single wavelength exactly and a range
    /// inclusively at both ends.
    pub fn find(
        &self,
        value: impl Into<AttributeValue>,
        attribute: BandAttribute,
    ) -> SdrlResult<Vec<&Band>> {
        if self.bands.is_empty() {
            return Err(SdrlError::AttributeNotFound(format!(
                "{} (band registry is empty)",
                attribute
            )));
        }
        let value = value.into();
        Ok(self
            .bands
            .iter()
            .filter(|band| band.matches(&value, attribute))
            .collect())
    }

    /// `find` with the attribute given by name
    pub fn find_named(&self, value: impl Into<AttributeValue>, attribute: &str) -> SdrlResult<Vec<&Band>> {
        self.find(value, attribute.parse()?)
    }

    /// First matching band in registry order
    pub fn first(&self, value: impl Into<AttributeValue>, attribute: BandAttribute) -> SdrlResult<&Band> {
        let value = value.into();
        let matches = self.find(value.clone(), attribute)?;
        if matches.len() > 1 {
            log::warn!(
                "{} bands match {} = {}, using band order {}",
                matches.len(),
                attribute,
                value,
                matches[0].order()
            );
        }
        matches
            .into_iter()
            .next()
            .ok_or_else(|| SdrlError::BandNotFound {
                attribute: attribute.name().to_string(),
                value: value.to_string(),
            })
    }

    /// Table of every band's attributes
    pub fn summary(&self) -> String {
        let mut table = SummaryTable::new();
        for band in &self.bands {
            table.push(band);
        }
        table.render()
    }
}

impl<'a> IntoIterator for &'a BandRegistry {
    type Item = &'a Band;
    type IntoIter = std::slice::Iter<'a, Band>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.iter()
    }
}

impl FromIterator<Band> for BandRegistry {
    fn from_iter<I: IntoIterator<Item = Band>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Fixed-width text table, one row per band
struct SummaryTable {
    rows: Vec<[String; 5]>,
}

impl SummaryTable {
    fn new() -> Self {
        Self { rows: Vec::new() }
    }

    fn push(&mut self, band: &Band) {
        self.rows
            .push(BandAttribute::ALL.map(|attribute| band.get(attribute).to_string()));
    }

    fn render(&self) -> String {
        let header = BandAttribute::ALL.map(|attribute| attribute.name().to_string());
        let mut widths = header.clone().map(|h| h.len());
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in std::iter::once(&header).chain(self.rows.iter()) {
            let line: Vec<String> = row
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Band {
        Band::new("B3", 1, 16.0, Some(Wavelength::Range(620.0, 670.0)), Some("Red".into()))
    }

    fn nir() -> Band {
        Band::new("B4", 4, 16.0, Some(Wavelength::Range(760.0, 900.0)), Some("NIR".into()))
    }

    #[test]
    fn test_attribute_names_round_trip() {
        for attribute in BandAttribute::ALL {
            assert_eq!(attribute.name().parse::<BandAttribute>().unwrap(), attribute);
        }
        assert!(matches!(
            "colour".parse::<BandAttribute>(),
            Err(SdrlError::AttributeNotFound(name)) if name == "colour"
        ));
    }

    #[test]
    fn test_band_get_and_set() {
        let mut band = red();
        assert_eq!(band.get(BandAttribute::Order), AttributeValue::Integer(1));
        assert_eq!(band.get_named("description").unwrap(), AttributeValue::from("Red"));
        assert!(band.get_named("gain").is_err());

        band.set("Rouge", BandAttribute::Description).unwrap();
        assert_eq!(band.description(), Some("Rouge"));
        band.set(3, BandAttribute::Order).unwrap();
        assert_eq!(band.order(), 3);
        band.set_named(AttributeValue::Absent, "wavelength").unwrap();
        assert_eq!(band.wavelength(), None);
    }

    #[test]
    fn test_band_set_rejects_wrong_kind() {
        let mut band = red();
        assert!(matches!(
            band.set("one", BandAttribute::Order),
            Err(SdrlError::InvalidAttributeValue { .. })
        ));
        assert!(band.set(0, BandAttribute::Order).is_err());
        assert!(band.set(AttributeValue::Absent, BandAttribute::Tag).is_err());
        assert!(matches!(
            band.set_named("x", "gain"),
            Err(SdrlError::AttributeNotFound(_))
        ));
        assert_eq!(band, red());
    }

    #[test]
    fn test_band_set_integer_wavelength() {
        let mut band = red();
        band.set(660, BandAttribute::Wavelength).unwrap();
        assert_eq!(band.wavelength(), Some(Wavelength::Single(660.0)));

        let registry = BandRegistry::new(vec![band]);
        assert_eq!(registry.first(660, BandAttribute::Wavelength).unwrap().tag(), "B3");
    }

    #[test]
    fn test_find_by_wavelength_range() {
        let registry = BandRegistry::new(vec![red(), nir()]);

        let found = registry.find(650, BandAttribute::Wavelength).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description(), Some("Red"));

        let found = registry.find(800.0, BandAttribute::Wavelength).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description(), Some("NIR"));

        // Both ends of a range are inclusive
        assert_eq!(registry.find(620, BandAttribute::Wavelength).unwrap().len(), 1);
        assert_eq!(registry.find(900, BandAttribute::Wavelength).unwrap().len(), 1);
        assert!(registry.find(700, BandAttribute::Wavelength).unwrap().is_empty());
    }

    #[test]
    fn test_find_single_wavelength_is_exact() {
        let registry = BandRegistry::new(vec![Band::new(
            "PAN",
            1,
            2.0,
            Some(Wavelength::Single(675.0)),
            Some("Pan".into()),
        )]);
        assert_eq!(registry.find(675, BandAttribute::Wavelength).unwrap().len(), 1);
        assert!(registry.find(675.5, BandAttribute::Wavelength).unwrap().is_empty());
    }

    #[test]
    fn test_find_exact_attributes() {
        let registry = BandRegistry::new(vec![red(), nir()]);
        let by_tag = registry.find("B4", BandAttribute::Tag).unwrap();
        assert_eq!(by_tag[0].order(), 4);
        assert_eq!(registry.find(16, BandAttribute::Resolution).unwrap().len(), 2);
        assert_eq!(registry.find(4.0, BandAttribute::Order).unwrap()[0].tag(), "B4");
        assert!(registry.find("Blue", BandAttribute::Description).unwrap().is_empty());
    }

    #[test]
    fn test_find_returns_all_matches_in_registry_order() {
        let wide = Band::new("W", 2, 30.0, Some(Wavelength::Range(600.0, 800.0)), Some("Wide".into()));
        let registry = BandRegistry::new(vec![wide, red(), nir()]);
        let found = registry.find(650, BandAttribute::Wavelength).unwrap();
        let orders: Vec<usize> = found.iter().map(|b| b.order()).collect();
        assert_eq!(orders, vec![2, 1]);
        assert_eq!(registry.first(650, BandAttribute::Wavelength).unwrap().tag(), "W");
    }

    #[test]
    fn test_find_errors() {
        let empty = BandRegistry::default();
        assert!(matches!(
            empty.find("Red", BandAttribute::Description),
            Err(SdrlError::AttributeNotFound(_))
        ));

        let registry = BandRegistry::new(vec![red()]);
        assert!(matches!(
            registry.find_named("Red", "colour"),
            Err(SdrlError::AttributeNotFound(_))
        ));
        assert!(matches!(
            registry.first("Blue", BandAttribute::Description),
            Err(SdrlError::BandNotFound { .. })
        ));
    }

    #[test]
    fn test_summary_lists_every_band() {
        let registry = BandRegistry::new(vec![red(), nir()]);
        let summary = registry.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("tag"));
        assert!(lines[1].contains("[620, 670]"));
        assert!(lines[2].contains("NIR"));
        assert_eq!(red().describe().lines().count(), 2);
    }
}
