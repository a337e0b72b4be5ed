//! Telemetry sink boundary.
//!
//! The core hands one [`MeterReading`](crate::meter::MeterReading) per
//! successfully decoded frame, plus an online/offline availability signal,
//! to a sink. Formatting and publishing (MQTT, discovery payloads, ...)
//! are the sink's business, outside this crate's core; the pipeline must
//! keep decoding even with no sink at all.

use crate::meter::MeterReading;
use log::{info, warn};

/// Receives decoded readings for publication.
pub trait TelemetrySink {
    /// One freshly decoded reading.
    fn publish_reading(&mut self, reading: &MeterReading);

    /// Availability signal for downstream consumers.
    fn publish_availability(&mut self, online: bool);
}

/// Sink that drops everything. For running without a broker.
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish_reading(&mut self, _reading: &MeterReading) {}
    fn publish_availability(&mut self, _online: bool) {}
}

/// Sink that logs each reading, human-readable plus its JSON form.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn publish_reading(&mut self, reading: &MeterReading) {
        info!("{}", reading);
        match serde_json::to_string(reading) {
            Ok(json) => info!("reading: {}", json),
            Err(e) => warn!("reading serialization failed: {}", e),
        }
    }

    fn publish_availability(&mut self, online: bool) {
        info!("availability: {}", if online { "online" } else { "offline" });
    }
}
