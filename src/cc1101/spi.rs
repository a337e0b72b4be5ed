//! Bit-banged SPI transport for the CC1101 (ESP32 only).
//!
//! The CC1101 signals readiness by pulling MISO low while selected, which
//! rules out a hardware SPI peripheral owning the MISO line; the bus is
//! therefore bit-banged over plain GPIO (mode 0, MSB first).
//!
//! # Pin Configuration (ESP32-C3)
//!
//! | Signal | GPIO | Notes |
//! |--------|------|-------|
//! | SCK    | 4    | SPI Clock |
//! | MISO   | 5    | Doubles as chip-ready signal |
//! | MOSI   | 6    | |
//! | CS     | 7    | Chip Select, active low |
//! | GDO0   | 3    | Frame-ready interrupt (see [`super::event`]) |

use super::bus::{Cc1101Bus, RegisterAccess, READ_BURST};
use super::registers as regs;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_sys::EspError;

pub struct BitBangBus<'d> {
    sck: PinDriver<'d, AnyOutputPin, Output>,
    mosi: PinDriver<'d, AnyOutputPin, Output>,
    miso: PinDriver<'d, AnyInputPin, Input>,
    cs: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> BitBangBus<'d> {
    pub fn new(
        sck: AnyOutputPin,
        mosi: AnyOutputPin,
        miso: AnyInputPin,
        cs: AnyOutputPin,
    ) -> Result<Self, EspError> {
        let mut bus = Self {
            sck: PinDriver::output(sck)?,
            mosi: PinDriver::output(mosi)?,
            miso: PinDriver::input(miso)?,
            cs: PinDriver::output(cs)?,
        };
        bus.cs.set_high()?;
        bus.sck.set_low()?;
        Ok(bus)
    }

    fn select(&mut self) -> Result<(), EspError> {
        self.cs.set_low()
    }

    fn deselect(&mut self) -> Result<(), EspError> {
        self.cs.set_high()
    }

    /// Busy-wait for MISO low: the chip's ready signal while selected.
    /// Bounded only by the chip's own timing guarantee; a hang here means
    /// dead hardware.
    fn wait_ready(&self) {
        while self.miso.is_high() {}
    }

    /// Clock one byte out while clocking one in (mode 0, MSB first).
    fn transfer(&mut self, out: u8) -> Result<u8, EspError> {
        let mut input = 0u8;
        for bit in (0..8).rev() {
            self.mosi.set_level(((out >> bit) & 1 == 1).into())?;
            Ets::delay_us(1);
            self.sck.set_high()?;
            Ets::delay_us(1);
            input = (input << 1) | self.miso.is_high() as u8;
            self.sck.set_low()?;
        }
        Ok(input)
    }
}

impl Cc1101Bus for BitBangBus<'_> {
    type Error = EspError;

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), EspError> {
        self.select()?;
        self.wait_ready();
        self.transfer(addr)?;
        self.transfer(value)?;
        self.deselect()
    }

    fn read_register(&mut self, addr: u8, access: RegisterAccess) -> Result<u8, EspError> {
        self.select()?;
        self.wait_ready();
        self.transfer(addr | access.header_bits())?;
        let value = self.transfer(0x00)?;
        self.deselect()?;
        Ok(value)
    }

    fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), EspError> {
        self.select()?;
        Ets::delay_us(5);
        self.wait_ready();
        self.transfer(addr | READ_BURST)?;
        for byte in buf.iter_mut() {
            *byte = self.transfer(0x00)?;
        }
        Ets::delay_us(2);
        self.deselect()
    }

    fn strobe(&mut self, strobe: u8) -> Result<(), EspError> {
        self.select()?;
        Ets::delay_us(5);
        self.wait_ready();
        self.transfer(strobe)?;
        Ets::delay_us(5);
        self.deselect()
    }

    fn reset(&mut self) -> Result<(), EspError> {
        // Power-on-reset sequence per CC1101 datasheet section 19.1.2.
        self.deselect()?;
        Ets::delay_us(3);

        self.mosi.set_low()?;
        self.sck.set_high()?;

        self.select()?;
        Ets::delay_us(3);
        self.deselect()?;
        Ets::delay_us(45); // at least 40 us

        self.select()?;
        self.wait_ready();
        self.transfer(regs::SRES)?;
        self.wait_ready();
        self.deselect()
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}
