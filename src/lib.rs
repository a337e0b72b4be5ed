//! Multical21 WMBus receiver firmware library.
//!
//! Reads encrypted WMBus Mode C1 telemetry broadcast by a Kamstrup
//! Multical21 water meter via a CC1101 transceiver, and turns it into
//! decoded, verified readings.
//!
//! This library contains platform-independent components that can be tested
//! on the host machine without ESP32 hardware; everything that touches
//! ESP-IDF is gated behind the `esp32` feature.

pub mod cc1101;
pub mod config;
pub mod meter;
pub mod telemetry;
pub mod wmbus;

// Re-export commonly used items
pub use cc1101::{Cc1101Bus, EventBridge, Receiver, ReceiverError, SupervisorConfig, FRAME_EVENT};
pub use config::{EncryptionKey, MeterConfig, MeterId};
pub use meter::{InfoCode, MeterReading, WaterMeter};
pub use telemetry::{LogSink, NullSink, TelemetrySink};
pub use wmbus::{FrameError, RawFrame, WmbusFrame, MAX_FRAME_LEN};
