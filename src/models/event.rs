use crate::models::sensor::SensorId;

/// One recorded update. The value is a copy taken at the time of the event,
/// the sensor itself is only referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub sensor: SensorId,
    pub value: String,
    pub timestamp: i64,
}
