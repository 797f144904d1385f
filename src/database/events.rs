use crate::models::{SensorEvent, SensorId, SensorRecord};
use std::collections::VecDeque;

/// Default number of events kept in memory.
pub const EVENT_DEPTH: usize = 64 * 128;

/// Fixed-capacity ring of recent sensor updates. Once full, every append
/// evicts the oldest event.
#[derive(Debug, Clone)]
pub struct EventRing {
    entries: VecDeque<SensorEvent>,
    capacity: usize,
}

impl Default for EventRing {
    fn default() -> Self {
        Self::with_capacity(EVENT_DEPTH)
    }
}

impl EventRing {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, sensor: SensorId, record: &SensorRecord) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(SensorEvent {
            sensor,
            value: record.value.clone(),
            timestamp: record.timestamp,
        });
    }

    /// Events from newest to oldest.
    pub fn recent(&self) -> impl Iterator<Item = &SensorEvent> + '_ {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str, timestamp: i64) -> SensorRecord {
        let mut record = SensorRecord::new("w1", "28-0001", "kitchen", "temp", None);
        record.update(value, None, timestamp);
        record
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut ring = EventRing::with_capacity(4);
        ring.append(SensorId(0), &record("1", 10));
        ring.append(SensorId(1), &record("2", 20));

        let times: Vec<i64> = ring.recent().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![20, 10]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_oldest_is_evicted_when_full() {
        let mut ring = EventRing::with_capacity(3);
        for i in 0..4 {
            ring.append(SensorId(0), &record(&i.to_string(), i + 1));
        }

        let values: Vec<&str> = ring.recent().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["3", "2", "1"]);
        assert_eq!(ring.len(), ring.capacity());
    }

    #[test]
    fn test_event_value_is_a_copy() {
        let mut ring = EventRing::with_capacity(2);
        let mut sensor = record("21.5", 1);
        ring.append(SensorId(0), &sensor);

        sensor.update("30.0", None, 2);

        let event = ring.recent().next().unwrap();
        assert_eq!(event.value, "21.5");
        assert_eq!(event.timestamp, 1);
    }

    #[test]
    fn test_empty_ring_yields_nothing() {
        let ring = EventRing::default();
        assert_eq!(ring.recent().count(), 0);
        assert_eq!(ring.capacity(), EVENT_DEPTH);
    }
}
