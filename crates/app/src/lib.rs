//! Presentation layer shared by the `bldc_regen` and `battery_soc` entry points.

pub mod logging;
pub mod plot;
