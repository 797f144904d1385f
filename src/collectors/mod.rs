pub mod w1;

pub use w1::W1Collector;
