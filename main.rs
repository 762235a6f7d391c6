use std::env;

use anyhow::{Context, Result};
use rppal::hal::Delay;

use rpbme280_gpio::{Bme280, Config, RppalLines};

// Default BCM pins: the Pi's I2C1 header pins, driven as plain GPIO.
const SCL_GPIO: u8 = 3;
const SDA_GPIO: u8 = 2;

fn pin_arg(arg: Option<String>, default: u8, name: &str) -> Result<u8> {
    match arg {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid {name} pin: {arg}")),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let scl = pin_arg(args.next(), SCL_GPIO, "SCL")?;
    let sda = pin_arg(args.next(), SDA_GPIO, "SDA")?;

    let lines = RppalLines::new(scl, sda)
        .with_context(|| format!("failed to open GPIO {scl} (SCL) and {sda} (SDA)"))?;
    let bme280 = Bme280::attach(lines, Delay::new(), Config::default())
        .context("failed to initialize BME280")?;

    let m = bme280.read().context("failed to read BME280")?;
    println!("Temperature: {:.2} C", m.celsius());
    println!("Humidity: {:.2} %", m.relative_humidity());
    println!("Pressure: {:.2} hPa", m.hpa());

    Ok(())
}
