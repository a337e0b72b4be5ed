//! Multical21 reading extraction and the frame-handling pipeline.
//!
//! This module contains:
//! - [`reading`]: Decrypted-payload layouts, info codes and [`MeterReading`]
//! - [`handler`]: The [`WaterMeter`] pipeline tying receiver, validator,
//!   decryption and telemetry together

mod handler;
mod reading;

pub use handler::WaterMeter;
pub use reading::{InfoCode, MeterReading};
