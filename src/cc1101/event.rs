//! Interrupt-to-poll event bridge.
//!
//! The CC1101 GDO0 line fires an edge interrupt when a frame is waiting in
//! the RX FIFO. The interrupt handler is restricted to setting a single
//! flag (no bus I/O, no heap use, no blocking); the main loop polls the
//! flag and runs the whole frame pipeline synchronously. While a frame is
//! being serviced the bridge is disarmed, so a new edge has no observable
//! effect until the pipeline completes and the bridge is re-armed. This
//! guarantees at most one frame in flight and no re-entrant access to the
//! shared frame buffer.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single bridge instance bound to the interrupt vector at start-up.
/// Fixed, never-reassigned: the ISR reaches it through this static.
pub static FRAME_EVENT: EventBridge = EventBridge::new();

/// Edge-triggered "frame ready" flag shared between interrupt and main
/// context. The flag is the sole datum the ISR touches.
pub struct EventBridge {
    pending: AtomicBool,
    armed: AtomicBool,
}

impl EventBridge {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            armed: AtomicBool::new(true),
        }
    }

    /// Called from interrupt context: record that the chip has a frame.
    /// Ignored while the bridge is disarmed (mirrors the hardware interrupt
    /// being masked during frame servicing).
    pub fn signal(&self) {
        if self.armed.load(Ordering::Acquire) {
            self.pending.store(true, Ordering::Release);
        }
    }

    /// Main-loop side: if a frame is pending, disarm the bridge, clear the
    /// flag and return true. The caller must [`rearm`](Self::rearm) once
    /// the pipeline has run to completion, success or failure.
    pub fn begin_service(&self) -> bool {
        if self.pending.swap(false, Ordering::AcqRel) {
            self.armed.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Re-enable signal delivery after frame servicing.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// GDO0 interrupt wiring (ESP32 only).
///
/// ESP-IDF one-shot semantics fit the bridge model: the pin interrupt is
/// disabled by the framework once it fires and must be explicitly
/// re-enabled, which the main loop does after each poll that serviced a
/// frame.
#[cfg(feature = "esp32")]
pub use esp32_irq::FrameIrq;

#[cfg(feature = "esp32")]
mod esp32_irq {
    use super::FRAME_EVENT;
    use esp_idf_hal::gpio::{AnyInputPin, Input, InterruptType, PinDriver};

    pub struct FrameIrq<'d> {
        gdo0: PinDriver<'d, AnyInputPin, Input>,
    }

    impl<'d> FrameIrq<'d> {
        /// Bind GDO0 to the frame-event bridge. Falling edge = end of
        /// packet, frame complete in the FIFO.
        pub fn new(
            mut gdo0: PinDriver<'d, AnyInputPin, Input>,
        ) -> Result<Self, esp_idf_sys::EspError> {
            gdo0.set_interrupt_type(InterruptType::NegEdge)?;
            // Safety: the callback only touches the atomic flags in the
            // static bridge, as required in ISR context.
            unsafe {
                gdo0.subscribe(|| FRAME_EVENT.signal())?;
            }
            gdo0.enable_interrupt()?;
            Ok(Self { gdo0 })
        }

        /// Re-enable the pin interrupt after a serviced frame.
        pub fn rearm(&mut self) -> Result<(), esp_idf_sys::EspError> {
            self.gdo0.enable_interrupt()
        }
    }
}
