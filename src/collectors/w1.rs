use crate::database::SensorDb;
use crate::utils::file::read_head;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

pub const DRIVER: &str = "w1";
pub const UNIT: &str = "Celsius";
pub const SCAN_PERIOD_OPTION: &str = "w1.scan.period";
pub const DEFAULT_SCAN_PERIOD: i64 = 10;
const MIN_SCAN_PERIOD: i64 = 5;

/// Family codes of the DS18S20 and DS18B20 thermometers.
const DS1820_FAMILIES: &[&str] = &["10-", "28-"];

/// Periodic scan of the Linux 1-Wire bus for the `w1` sensors declared in the
/// database.
///
/// Each declared device is read from `<root>/<device>/w1_slave`, where the
/// kernel `w1_therm` driver exposes the last conversion:
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
///
/// - The first line must end with `YES`, otherwise the CRC check failed and the
///   reading is dropped.
/// - The second line carries the temperature in millidegrees after `t=`.
///
/// Readings are published in degrees Celsius, as decimal text.
///
/// Only the DS1820 families are read; other `w1` devices are skipped.
///
/// Kernel w1_therm documentation: https://docs.kernel.org/w1/slaves/w1_therm.html
#[derive(Debug)]
pub struct W1Collector {
    root: PathBuf,
    period: i64,
    last_scan: i64,
}

impl W1Collector {
    pub fn new<P: Into<PathBuf>>(root: P, db: &SensorDb) -> Self {
        let root = root.into();
        let period = match db.option(SCAN_PERIOD_OPTION) {
            Some(text) => match text.parse::<i64>() {
                Ok(period) => period.max(MIN_SCAN_PERIOD),
                Err(e) => {
                    warn!("Invalid {} '{}': {}", SCAN_PERIOD_OPTION, text, e);
                    DEFAULT_SCAN_PERIOD
                }
            },
            None => DEFAULT_SCAN_PERIOD,
        };
        info!("Scanning 1-Wire devices in {} every {}s", root.display(), period);

        Self {
            root,
            period,
            last_scan: 0,
        }
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    pub fn is_due(&self, now: i64) -> bool {
        now >= self.last_scan + self.period
    }

    /// Runs one scan if the scan period has elapsed. Returns the number of
    /// values published.
    pub fn background(&mut self, db: &mut SensorDb, now: i64) -> usize {
        if !self.is_due(now) {
            return 0;
        }
        let devices = Self::devices(db);
        let readings = self.read_devices(&devices);
        self.publish(db, &readings, now)
    }

    /// The declared `w1` devices, in declaration order.
    pub fn devices(db: &mut SensorDb) -> Vec<String> {
        let mut devices = Vec::new();
        let mut device = db.device_first(DRIVER);
        while let Some(id) = device {
            devices.push(id);
            device = db.device_next(DRIVER);
        }
        devices
    }

    /// Reads every device. Does not touch the database, so callers sharing it
    /// do not need to hold it while the bus is read.
    pub fn read_devices(&self, devices: &[String]) -> Vec<(String, String)> {
        let start = Instant::now();
        let readings: Vec<(String, String)> = devices
            .iter()
            .filter_map(|id| self.read_device(id).map(|value| (id.clone(), value)))
            .collect();
        debug!(
            "1-Wire scan of {} devices took: {} ms",
            devices.len(),
            start.elapsed().as_millis()
        );
        readings
    }

    pub fn publish(&mut self, db: &mut SensorDb, readings: &[(String, String)], now: i64) -> usize {
        self.last_scan = now;
        readings
            .iter()
            .filter(|(id, value)| db.set_at(DRIVER, id, value, Some(UNIT), now))
            .count()
    }

    fn read_device(&self, id: &str) -> Option<String> {
        if !DS1820_FAMILIES.iter().any(|family| id.starts_with(family)) {
            debug!("{} is not a thermometer", id);
            return None;
        }

        let path = self.root.join(id).join("w1_slave");
        match read_head(&path, 2) {
            Ok(lines) => {
                let value = parse_w1_slave(&lines);
                if value.is_none() {
                    debug!("{}: no valid reading", path.display());
                }
                value
            }
            Err(e) => {
                debug!("{}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Temperature in degrees Celsius from the first two lines of `w1_slave`.
pub fn parse_w1_slave(lines: &[String]) -> Option<String> {
    let status = lines.first()?;
    if !status.trim_end().ends_with(" YES") {
        return None;
    }
    let (_, raw) = lines.get(1)?.split_once(" t=")?;
    let millidegrees: i64 = raw.trim().parse().ok()?;
    Some((millidegrees as f64 / 1000.0).to_string())
}
