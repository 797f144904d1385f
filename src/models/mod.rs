pub mod event;
pub mod sensor;

pub use event::SensorEvent;
pub use sensor::{OptionEntry, SensorId, SensorKey, SensorRecord};
