use indexmap::Equivalent;
use std::hash::{Hash, Hasher};

/// Longest value text kept for a sensor, in bytes.
pub const VALUE_MAX: usize = 127;

/// Longest unit text kept for a sensor, in bytes.
pub const UNIT_MAX: usize = 31;

/// Identity of a sensor: the producing driver and the device within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorKey {
    pub driver: String,
    pub device: String,
}

impl SensorKey {
    pub fn new(driver: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            device: device.into(),
        }
    }
}

/// Borrowed form of [`SensorKey`], used for lookups without allocating.
///
/// Hashes exactly like the derived `Hash` of `SensorKey` (driver, then device).
pub(crate) struct KeyRef<'a>(pub &'a str, pub &'a str);

impl Hash for KeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
        self.1.hash(state);
    }
}

impl Equivalent<SensorKey> for KeyRef<'_> {
    fn equivalent(&self, key: &SensorKey) -> bool {
        self.0 == key.driver && self.1 == key.device
    }
}

/// Stable position of a sensor in the store. Sensors are never removed, so an
/// id stays valid for the life of the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct SensorRecord {
    pub driver: String,
    pub device: String,
    pub location: String,
    pub name: String,
    /// Empty until known. Once set it is never replaced.
    pub unit: String,
    /// Last reported value, kept as the producer's text.
    pub value: String,
    /// Unix time of the last update, 0 if never updated.
    pub timestamp: i64,
}

impl Default for SensorRecord {
    fn default() -> Self {
        Self {
            driver: String::new(),
            device: String::new(),
            location: String::new(),
            name: String::new(),
            unit: String::new(),
            value: String::new(),
            timestamp: 0,
        }
    }
}

impl SensorRecord {
    pub fn new(driver: &str, device: &str, location: &str, name: &str, unit: Option<&str>) -> Self {
        Self {
            driver: driver.to_string(),
            device: device.to_string(),
            location: location.to_string(),
            name: name.to_string(),
            unit: unit.map(|u| truncate(u, UNIT_MAX).to_string()).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.driver.as_str(), self.device.as_str())
    }

    pub fn is_updated(&self) -> bool {
        self.timestamp != 0
    }

    pub(crate) fn update(&mut self, value: &str, unit: Option<&str>, now: i64) {
        self.value.clear();
        self.value.push_str(truncate(value, VALUE_MAX));

        if let Some(unit) = unit.filter(|u| !u.is_empty()) {
            if self.unit.is_empty() {
                self.unit.push_str(truncate(unit, UNIT_MAX));
            }
        }
        self.timestamp = now;
    }
}

/// A named tuning value from the sensor configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub name: String,
    pub value: String,
}

// Cut to at most `max` bytes without splitting a character.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
