//! CC1101 transceiver support.
//!
//! This module contains:
//! - [`registers`]: Register map, strobes and the WMBus Mode C1 default table
//! - [`bus`]: Register/strobe transport contract ([`Cc1101Bus`])
//! - [`event`]: Interrupt-to-poll event bridge
//! - [`receiver`]: Receive-path supervisor with self-healing restarts
//! - [`spi`]: Bit-banged SPI transport (ESP32 only)

pub mod registers;

mod bus;
mod event;
mod receiver;

#[cfg(feature = "esp32")]
mod spi;

#[cfg(test)]
pub(crate) mod mock;

pub use bus::{Cc1101Bus, RegisterAccess};
pub use event::{EventBridge, FRAME_EVENT};
pub use receiver::{Receiver, ReceiverError, SupervisorConfig};

#[cfg(feature = "esp32")]
pub use event::FrameIrq;
#[cfg(feature = "esp32")]
pub use spi::BitBangBus;
