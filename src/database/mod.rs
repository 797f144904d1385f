//! The sensor database: latest value of every configured sensor, the ring of
//! recent updates and the raw log archival.
//!
//! Sensors are declared once from the definition file and live as long as
//! the database. Producers report values with [`SensorDb::set`]; the HTTP
//! layer only reads.

pub mod archive;
pub mod events;
pub mod locations;
pub mod rawlog;

use crate::config::sensors::{ConfigError, SensorDefinitions};
use crate::models::sensor::KeyRef;
use crate::models::{OptionEntry, SensorId, SensorKey, SensorRecord};
use archive::{ArchiveAction, ArchiveScheduler, ArchiveSettings};
use chrono::{DateTime, TimeZone, Utc};
use events::{EventRing, EVENT_DEPTH};
use indexmap::IndexMap;
use locations::LocationIndex;
use log::{debug, error, info, warn};
use std::path::Path;

#[derive(Debug)]
pub struct SensorDb {
    sensors: IndexMap<SensorKey, SensorRecord>,
    locations: LocationIndex,
    options: Vec<OptionEntry>,
    events: EventRing,
    archive: ArchiveScheduler,
    driver_cursor: usize,
}

impl SensorDb {
    pub fn load<P: AsRef<Path>>(path: P, archive: ArchiveSettings) -> Result<Self, ConfigError> {
        let definitions = SensorDefinitions::load(path)?;
        Ok(Self::new(definitions, archive))
    }

    pub fn new(definitions: SensorDefinitions, archive: ArchiveSettings) -> Self {
        Self::with_event_capacity(definitions, archive, EVENT_DEPTH)
    }

    pub fn with_event_capacity(
        definitions: SensorDefinitions,
        archive: ArchiveSettings,
        capacity: usize,
    ) -> Self {
        let mut sensors: IndexMap<SensorKey, SensorRecord> =
            IndexMap::with_capacity(definitions.sensors.len());
        let mut locations = LocationIndex::default();

        for def in &definitions.sensors {
            if sensors.contains_key(&KeyRef(&def.driver, &def.device)) {
                warn!("Duplicate sensor {}.{} ignored", def.driver, def.device);
                continue;
            }
            let record = SensorRecord::new(
                &def.driver,
                &def.device,
                &def.location,
                &def.name,
                def.unit.as_deref(),
            );
            let (index, _) = sensors.insert_full(record.key(), record);
            locations.insert(&def.location, SensorId(index));
        }

        info!(
            "Sensor database: {} sensors in {} locations",
            sensors.len(),
            locations.len()
        );

        Self {
            sensors,
            locations,
            options: definitions.options,
            events: EventRing::with_capacity(capacity),
            archive: ArchiveScheduler::new(archive),
            driver_cursor: 0,
        }
    }

    /// Must be called once at startup, before the first tick.
    pub fn initialize<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        self.archive.reconcile(now);
    }

    /// Records a new value for a sensor. Unknown sensors are ignored, and
    /// `false` is returned for them.
    pub fn set(&mut self, driver: &str, device: &str, value: &str, unit: Option<&str>) -> bool {
        self.set_at(driver, device, value, unit, Utc::now().timestamp())
    }

    pub fn set_at(
        &mut self,
        driver: &str,
        device: &str,
        value: &str,
        unit: Option<&str>,
        now: i64,
    ) -> bool {
        let Some((index, _, record)) = self.sensors.get_full_mut(&KeyRef(driver, device)) else {
            return false;
        };

        record.update(value, unit, now);
        debug!("Set {}.{} to {} {}", driver, device, record.value, record.unit);

        self.events.append(SensorId(index), record);

        let line = rawlog::format_line(now, record);
        if let Err(e) = self.archive.record(&line, now) {
            error!(
                "Cannot write to {}: {}",
                self.archive.log_path().display(),
                e
            );
        }
        true
    }

    /// Restarts the device scan for `driver` and returns its first device.
    pub fn device_first(&mut self, driver: &str) -> Option<String> {
        self.driver_cursor = 0;
        self.device_next(driver)
    }

    pub fn device_next(&mut self, driver: &str) -> Option<String> {
        let (position, record) = self
            .sensors
            .values()
            .enumerate()
            .skip(self.driver_cursor)
            .find(|(_, record)| record.driver == driver)?;

        self.driver_cursor = position + 1;
        Some(record.device.clone())
    }

    pub fn devices<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.sensors
            .values()
            .filter(move |record| record.driver == driver)
            .map(|record| record.device.as_str())
    }

    /// First option declared with this exact name.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| option.value.as_str())
    }

    pub fn get(&self, driver: &str, device: &str) -> Option<&SensorRecord> {
        self.sensors.get(&KeyRef(driver, device))
    }

    pub fn sensor(&self, id: SensorId) -> Option<&SensorRecord> {
        self.sensors.get_index(id.0).map(|(_, record)| record)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorRecord> + '_ {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn locations(&self) -> &LocationIndex {
        &self.locations
    }

    pub fn events(&self) -> &EventRing {
        &self.events
    }

    pub fn archive_directory(&self) -> &Path {
        self.archive.directory()
    }

    /// Periodic housekeeping: closes an idle raw log and archives it.
    pub fn background<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Option<ArchiveAction> {
        match self.archive.tick(now) {
            Ok(action) => action,
            Err(e) => {
                error!("Archive rotation failed: {}", e);
                None
            }
        }
    }

    /// Closes the raw log. The database stays usable; the next write reopens it.
    pub fn shutdown(&mut self) {
        self.archive.close();
    }
}
