use std::sync::{PoisonError, RwLock};

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::bus::Bus;
use crate::calibration::Calibration;
use crate::compensation::Compensator;
use crate::config::{Config, Settings};
use crate::error::{Error, Result};
use crate::gpio::GpioLines;
use crate::soft_i2c::SoftI2c;
use crate::structs::{Measurement, RawSample};

/// Value of the chip ID register on a BME280.
pub const CHIP_ID: u8 = 0x60;

// BME280 register addresses.
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_ADC_VALUE: u8 = 0xF7;
const REG_ADC_VALUE_LEN: usize = 8;

const RESET_COMMAND: u8 = 0xB6;
const RESET_DELAY_MS: u32 = 2;

/// A BME280 on a bit-banged bus.
///
/// Methods take `&self`; share the device with `Arc` to read from several
/// threads. Bus traffic is serialized by the bus lock, and the calibration
/// is swapped as a whole.
pub struct Bme280<L, D> {
    bus: Bus<L, D>,
    settings: Settings,
    calibration: RwLock<Option<Calibration>>,
}

impl<L, D> Bme280<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    /// Creates an uncalibrated device. Does not touch the bus.
    pub fn new(lines: L, delay: D, config: Config) -> Self {
        Bme280 {
            bus: Bus::new(SoftI2c::new(lines, delay, config.delay_us), config.address),
            settings: config.settings,
            calibration: RwLock::new(None),
        }
    }

    /// `new` followed by `init`.
    pub fn attach(lines: L, delay: D, config: Config) -> Result<Self, L::Error> {
        let bme280 = Bme280::new(lines, delay, config);
        bme280.init()?;
        Ok(bme280)
    }

    /// Checks the chip ID, writes the measurement settings and loads the
    /// calibration.
    pub fn init(&self) -> Result<(), L::Error> {
        let chip_id = self.chip_id()?;
        debug!("Got chip id: {chip_id:#x}");
        if chip_id != CHIP_ID {
            return Err(Error::ChipId {
                found: chip_id,
                expected: CHIP_ID,
            });
        }
        self.apply_settings()?;
        self.reload_calibration()
    }

    pub fn chip_id(&self) -> Result<u8, L::Error> {
        let mut id = [0u8; 1];
        self.bus.read_registers(REG_CHIP_ID, &mut id)?;
        Ok(id[0])
    }

    fn apply_settings(&self) -> Result<(), L::Error> {
        let Settings {
            ctrl_hum,
            ctrl_meas,
            config,
        } = self.settings;
        let mut session = self.bus.session();
        // ctrl_hum only takes effect after a write to ctrl_meas
        debug!("Setting ctrl_hum {REG_CTRL_HUM:#x} to {ctrl_hum:#010b}");
        session.write_register(REG_CTRL_HUM, ctrl_hum)?;
        debug!("Setting ctrl_meas {REG_CTRL_MEAS:#x} to {ctrl_meas:#010b}");
        session.write_register(REG_CTRL_MEAS, ctrl_meas)?;
        debug!("Setting config {REG_CONFIG:#x} to {config:#010b}");
        session.write_register(REG_CONFIG, config)
    }

    /// Reads the calibration again. On failure the device is left
    /// uncalibrated and `read` reports `NotReady` until a reload succeeds.
    pub fn reload_calibration(&self) -> Result<(), L::Error> {
        let mut session = self.bus.session();
        let loaded = Calibration::read(&mut session);
        let mut slot = self
            .calibration
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match loaded {
            Ok(calibration) => {
                debug!("Got calibration data: {calibration:#?}");
                *slot = Some(calibration);
                Ok(())
            }
            Err(err) => {
                *slot = None;
                Err(err)
            }
        }
    }

    pub fn calibration(&self) -> Option<Calibration> {
        *self
            .calibration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        self.calibration().is_some()
    }

    /// Resets the chip, then restores the settings and the calibration.
    ///
    /// The device is uncalibrated from before the reset command until the
    /// reload succeeds, so a failed restore leaves `read` at `NotReady`.
    pub fn soft_reset(&self) -> Result<(), L::Error> {
        {
            let mut session = self.bus.session();
            *self
                .calibration
                .write()
                .unwrap_or_else(PoisonError::into_inner) = None;
            debug!("Initiating soft reset");
            session.write_register(REG_RESET, RESET_COMMAND)?;
            session.pause_ms(RESET_DELAY_MS);
        }
        self.apply_settings()?;
        self.reload_calibration()
    }

    /// One burst read of the measurement block.
    pub fn read_raw(&self) -> Result<RawSample, L::Error> {
        let mut data = [0u8; REG_ADC_VALUE_LEN];
        // 0xF7 - 0xFE
        self.bus.read_registers(REG_ADC_VALUE, &mut data)?;
        Ok(RawSample::from_bytes(&data))
    }

    /// Reads and compensates one sample.
    ///
    /// Fails with `NotReady`, without any bus traffic, while uncalibrated.
    pub fn read(&self) -> Result<Measurement, L::Error> {
        let calibration = self.calibration().ok_or(Error::NotReady)?;
        let raw = self.read_raw()?;
        debug!("Read raw sample: {raw:?}");
        Ok(Compensator::new(Some(&calibration)).compensate(&raw))
    }

    pub fn bus(&self) -> &Bus<L, D> {
        &self.bus
    }

    /// Gives back the GPIO lines and the delay provider.
    pub fn release(self) -> (L, D) {
        self.bus.into_inner().release()
    }
}
