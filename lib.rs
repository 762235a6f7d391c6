//! BME280 temperature, pressure and humidity sensor on a software I2C bus.
//!
//! The bus is bit-banged over two GPIO lines, so the sensor can sit on any
//! pair of pins. [`Bme280`] is the entry point:
//!
//! ```no_run
//! use rpbme280_gpio::{Bme280, Config, RppalLines};
//!
//! # fn main() -> anyhow::Result<()> {
//! let lines = RppalLines::new(3, 2)?;
//! let bme280 = Bme280::attach(lines, rppal::hal::Delay::new(), Config::default())?;
//! let m = bme280.read()?;
//! println!("Temperature: {:.2} C", m.celsius());
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod calibration;
pub mod compensation;
pub mod config;
pub mod device;
pub mod error;
pub mod gpio;
pub mod soft_i2c;
pub mod structs;

#[cfg(test)]
mod sim;

pub use calibration::Calibration;
pub use compensation::{Compensator, FineTemperature};
pub use config::{Config, Settings};
pub use device::Bme280;
pub use error::{Error, Phase};
pub use gpio::{Direction, GpioLines, Level, Line, RppalLines};
pub use soft_i2c::SoftI2c;
pub use structs::{Measurement, RawSample};
