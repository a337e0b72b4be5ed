//! Multical21 WMBus receiver firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::PinDriver;
    use esp_idf_hal::peripherals::Peripherals;
    use log::{error, warn};
    use multical21_esp32::cc1101::{BitBangBus, FrameIrq};
    use multical21_esp32::{LogSink, MeterConfig, SupervisorConfig, WaterMeter, FRAME_EVENT};
    use std::time::Instant;

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Multical21 WMBus receiver starting");

    // Replace with the AES key and serial number of your meter (the key is
    // obtained from the utility, the serial is printed on the meter).
    const ENCRYPTION_KEY: [u8; 16] = [0; 16];
    const METER_SERIAL: [u8; 4] = [0; 4];

    let peripherals = match Peripherals::take() {
        Ok(p) => p,
        Err(e) => {
            error!("failed to take peripherals: {}", e);
            return;
        }
    };
    let pins = peripherals.pins;

    let result = (|| -> Result<_, esp_idf_sys::EspError> {
        let bus = BitBangBus::new(
            pins.gpio4.downgrade_output(),
            pins.gpio6.downgrade_output(),
            pins.gpio5.downgrade_input(),
            pins.gpio7.downgrade_output(),
        )?;
        let irq = FrameIrq::new(PinDriver::input(pins.gpio3.downgrade_input())?)?;
        Ok((bus, irq))
    })();

    let (bus, mut irq) = match result {
        Ok(v) => v,
        Err(e) => {
            error!("hardware init failed: {}", e);
            return;
        }
    };

    let mut meter = WaterMeter::new(
        bus,
        MeterConfig::new(ENCRYPTION_KEY, METER_SERIAL),
        SupervisorConfig::default(),
        &FRAME_EVENT,
        LogSink::default(),
        Instant::now(),
    );

    if let Err(e) = meter.start(Instant::now()) {
        // Not fatal: the supervisor's health poll keeps retrying.
        warn!("initial radio start failed: {}", e);
    }

    loop {
        if meter.poll(Instant::now()) {
            if let Err(e) = irq.rearm() {
                warn!("failed to re-enable GDO0 interrupt: {}", e);
            }
        }
        FreeRtos::delay_ms(2);
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    env_logger::init();
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo test' for host testing.");
}
