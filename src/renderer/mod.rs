pub mod json;
pub mod views;

pub use views::{history, latest, recent, ViewContext};
