//! Receive-path supervisor.
//!
//! Drives the CC1101 through IDLE -> flush -> RX and watches for the ways
//! the chip is known to wedge silently: a MARCSTATE other than RX, an RX
//! FIFO overflow, or simply no decoded frame for too long. Every failure
//! signal escalates to a full radio restart (power-on reset, register
//! reprogram, calibration, receiver re-arm); there is no lighter recovery
//! path because none of them reliably works on this chip.

use super::bus::{Cc1101Bus, RegisterAccess};
use super::registers as regs;
use log::{debug, info, warn};
use std::fmt;
use std::time::{Duration, Instant};

/// Bounded retry count for MARCSTATE polling. Exceeding it escalates to a
/// full restart instead of spinning forever.
pub const MAX_STATE_POLLS: u32 = 100;

/// Supervisor timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Interval between chip status/overflow health polls.
    pub health_poll_interval: Duration,
    /// Restart the radio if no frame has decoded within this window, even
    /// if the status register still claims RX.
    pub receive_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            health_poll_interval: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(300),
        }
    }
}

/// Errors from the receive path.
#[derive(Debug)]
pub enum ReceiverError<E> {
    /// Bus transport error.
    Bus(E),
    /// MARCSTATE polling exceeded the retry bound.
    ChipStateTimeout {
        /// State we were waiting for.
        target: u8,
        /// Last state the chip reported.
        last: u8,
    },
}

impl<E: fmt::Debug> fmt::Display for ReceiverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus error: {:?}", e),
            Self::ChipStateTimeout { target, last } => write!(
                f,
                "chip state timeout: wanted 0x{:02X}, stuck at 0x{:02X}",
                target, last
            ),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for ReceiverError<E> {}

/// Receiver state supervisor.
///
/// Owns the bus and the supervisory timestamps. All methods run on the
/// main-loop thread only.
pub struct Receiver<B: Cc1101Bus> {
    bus: B,
    config: SupervisorConfig,
    /// Last successfully decoded frame (reset on restart).
    last_frame: Instant,
    last_health_poll: Instant,
}

impl<B: Cc1101Bus> Receiver<B> {
    pub fn new(bus: B, config: SupervisorConfig, now: Instant) -> Self {
        Self {
            bus,
            config,
            last_frame: now,
            last_health_poll: now,
        }
    }

    /// Full chip restart: power-on reset, rewrite the whole default
    /// register table, calibrate, re-enter RX. The universal recovery
    /// action; idempotent, and retried by the caller's poll loop if it
    /// fails.
    pub fn restart_radio(&mut self, now: Instant) -> Result<(), ReceiverError<B::Error>> {
        info!("Resetting CC1101");

        self.bus.reset().map_err(ReceiverError::Bus)?;

        for &(addr, value) in regs::DEFAULT_CONFIG {
            self.bus
                .write_register(addr, value)
                .map_err(ReceiverError::Bus)?;
        }

        self.bus.strobe(regs::SCAL).map_err(ReceiverError::Bus)?;
        self.bus.delay_ms(1);

        self.start_receiver()?;
        self.last_frame = now;
        info!("CC1101 ready for WMBus reception");
        Ok(())
    }

    /// Enter IDLE, flush the RX FIFO and re-enter RX.
    ///
    /// Each state transition is confirmed against MARCSTATE with a bounded
    /// poll; exceeding the bound returns [`ReceiverError::ChipStateTimeout`]
    /// so the caller can escalate to [`restart_radio`](Self::restart_radio)
    /// exactly once rather than spinning here.
    pub fn start_receiver(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.bus.strobe(regs::SIDLE).map_err(ReceiverError::Bus)?;
        self.wait_state(regs::MARCSTATE_IDLE)?;

        self.bus.strobe(regs::SFRX).map_err(ReceiverError::Bus)?;
        self.bus.delay_ms(5);

        self.bus.strobe(regs::SRX).map_err(ReceiverError::Bus)?;
        self.bus.delay_ms(10);
        self.wait_state(regs::MARCSTATE_RX)?;

        Ok(())
    }

    fn wait_state(&mut self, target: u8) -> Result<(), ReceiverError<B::Error>> {
        let mut last = 0;
        for _ in 0..MAX_STATE_POLLS {
            last = self
                .bus
                .read_register(regs::MARCSTATE, RegisterAccess::Status)
                .map_err(ReceiverError::Bus)?;
            if last == target {
                return Ok(());
            }
        }
        warn!(
            "MARCSTATE stuck at 0x{:02X} waiting for 0x{:02X}",
            last, target
        );
        Err(ReceiverError::ChipStateTimeout { target, last })
    }

    /// Pop one byte from the RX FIFO.
    pub fn read_fifo_byte(&mut self) -> Result<u8, ReceiverError<B::Error>> {
        self.bus
            .read_register(regs::RXFIFO, RegisterAccess::Config)
            .map_err(ReceiverError::Bus)
    }

    /// Record a successfully decoded frame, pushing the receive timeout out.
    pub fn note_frame_decoded(&mut self, now: Instant) {
        self.last_frame = now;
    }

    /// Non-blocking supervisory checks, run every main-loop iteration.
    ///
    /// Triggers a full restart when (a) the periodic health poll finds the
    /// chip outside RX, (b) it finds the FIFO overflowed, or (c) no frame
    /// has decoded within the receive-timeout window (the silent-wedge
    /// case, where MARCSTATE may still happily report RX).
    pub fn supervise(&mut self, now: Instant) -> Result<(), ReceiverError<B::Error>> {
        if now.duration_since(self.last_health_poll) >= self.config.health_poll_interval {
            self.last_health_poll = now;

            let marc = self
                .bus
                .read_register(regs::MARCSTATE, RegisterAccess::Status)
                .map_err(ReceiverError::Bus)?;
            let rx_bytes = self
                .bus
                .read_register(regs::RXBYTES, RegisterAccess::Status)
                .map_err(ReceiverError::Bus)?;
            let rssi = self
                .bus
                .read_register(regs::RSSI, RegisterAccess::Status)
                .map_err(ReceiverError::Bus)?;

            debug!(
                "CC1101 status - MARC: 0x{:02X}, RX bytes: {}, RSSI: {} dBm",
                marc,
                rx_bytes & 0x7F,
                regs::rssi_dbm(rssi)
            );

            if marc != regs::MARCSTATE_RX {
                warn!("Not in RX mode (state 0x{:02X}), restarting radio", marc);
                return self.restart_radio(now);
            }

            if rx_bytes & regs::RXBYTES_OVERFLOW != 0 {
                warn!("RX FIFO overflow detected, restarting radio");
                return self.restart_radio(now);
            }
        }

        if now.duration_since(self.last_frame) >= self.config.receive_timeout {
            // The chip stops receiving from time to time without any status
            // indication; only a full reset brings it back.
            warn!("Receive timeout, restarting radio");
            return self.restart_radio(now);
        }

        Ok(())
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockBus;
    use super::super::registers as regs;
    use super::*;
    use std::time::{Duration, Instant};

    fn receiver(bus: MockBus) -> Receiver<MockBus> {
        Receiver::new(bus, SupervisorConfig::default(), Instant::now())
    }

    #[test]
    fn test_start_receiver_happy_path() {
        let bus = MockBus::new();
        // Default mock walks MARCSTATE IDLE -> RX as strobes arrive.
        let mut rx = receiver(bus);
        rx.start_receiver().expect("receiver should start");

        let strobes = &rx.bus().strobes;
        assert_eq!(strobes, &[regs::SIDLE, regs::SFRX, regs::SRX]);
    }

    #[test]
    fn test_start_receiver_escalates_after_bounded_polls() {
        let mut bus = MockBus::new();
        bus.stuck_marcstate = Some(0x11); // never IDLE, never RX
        let mut rx = receiver(bus);

        let err = rx.start_receiver().expect_err("should time out");
        assert!(matches!(
            err,
            ReceiverError::ChipStateTimeout {
                target: regs::MARCSTATE_IDLE,
                last: 0x11
            }
        ));
        // Exactly the bounded number of polls, no infinite local spin.
        assert_eq!(rx.bus().status_reads_of(regs::MARCSTATE), 100);
    }

    #[test]
    fn test_restart_radio_rewrites_whole_register_table() {
        let bus = MockBus::new();
        let mut rx = receiver(bus);
        rx.restart_radio(Instant::now()).expect("restart");

        assert_eq!(rx.bus().resets, 1);
        assert_eq!(rx.bus().writes.len(), regs::DEFAULT_CONFIG.len());
        assert_eq!(rx.bus().strobes[0], regs::SCAL);
    }

    #[test]
    fn test_supervise_quiet_before_intervals_elapse() {
        let now = Instant::now();
        let mut rx = Receiver::new(MockBus::new(), SupervisorConfig::default(), now);
        rx.supervise(now + Duration::from_secs(1)).expect("ok");
        assert_eq!(rx.bus().resets, 0);
        assert_eq!(rx.bus().status_reads_of(regs::MARCSTATE), 0);
    }

    #[test]
    fn test_supervise_restarts_when_not_in_rx() {
        let now = Instant::now();
        let mut bus = MockBus::new();
        bus.stuck_marcstate = Some(regs::MARCSTATE_IDLE);
        let mut rx = Receiver::new(bus, SupervisorConfig::default(), now);

        // Health poll fires, chip not in RX: restart. The restart itself
        // then fails its state polling, which surfaces as a timeout; the
        // poll loop will retry on the next iteration.
        let result = rx.supervise(now + Duration::from_secs(11));
        assert!(matches!(
            result,
            Err(ReceiverError::ChipStateTimeout { .. })
        ));
        assert_eq!(rx.bus().resets, 1);
    }

    #[test]
    fn test_supervise_restarts_on_fifo_overflow() {
        let now = Instant::now();
        let mut bus = MockBus::new();
        // Chip still claims RX; only the overflow bit triggers the restart.
        bus.rx_bytes = regs::RXBYTES_OVERFLOW | 0x05;
        let mut rx = Receiver::new(bus, SupervisorConfig::default(), now);

        rx.supervise(now + Duration::from_secs(11)).expect("restart ok");
        assert_eq!(rx.bus().resets, 1);
    }

    #[test]
    fn test_supervise_restarts_on_receive_timeout_despite_rx_state() {
        let now = Instant::now();
        // Default mock reports RX throughout: the silent-wedge case where
        // only the receive timeout can catch the dead chip.
        let mut rx = Receiver::new(MockBus::new(), SupervisorConfig::default(), now);

        rx.supervise(now + Duration::from_secs(301)).expect("restart ok");
        assert_eq!(rx.bus().resets, 1);
    }

    #[test]
    fn test_note_frame_decoded_defers_receive_timeout() {
        let now = Instant::now();
        let mut rx = Receiver::new(MockBus::new(), SupervisorConfig::default(), now);

        rx.note_frame_decoded(now + Duration::from_secs(200));
        // 301s after construction but only 101s after the frame.
        rx.supervise(now + Duration::from_secs(301)).expect("ok");
        assert_eq!(rx.bus().resets, 0);
    }

    #[test]
    fn test_restart_resets_receive_timeout_window() {
        let now = Instant::now();
        let mut rx = Receiver::new(MockBus::new(), SupervisorConfig::default(), now);

        rx.restart_radio(now + Duration::from_secs(300)).expect("restart");
        assert_eq!(rx.bus().resets, 1);

        // Window restarted at t=300: no timeout restart at t=400.
        rx.supervise(now + Duration::from_secs(400)).expect("ok");
        assert_eq!(rx.bus().resets, 1);
    }
}
