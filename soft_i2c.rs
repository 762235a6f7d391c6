//! Bit-level I2C master driven by two GPIO lines.
//!
//! Every edge is followed by one delay unit, so a 5 µs unit gives a clock of
//! roughly 100 kHz. Only the subset the sensor needs is implemented: 7-bit
//! addressing, no clock stretching, no arbitration.

use embedded_hal::delay::DelayNs;

use crate::error::{Error, Result};
use crate::gpio::{Direction, GpioLines, Level, Line};

/// Clock pulses issued by `recover` to flush a slave stuck mid-byte.
pub const RECOVERY_PULSES: usize = 9;

/// Acknowledge bit of one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    /// Data held low: more bytes follow / byte accepted.
    Ack,
    /// Data left high: last byte / byte refused.
    Nack,
}

impl Ack {
    fn level(self) -> Level {
        match self {
            Ack::Ack => Level::Low,
            Ack::Nack => Level::High,
        }
    }
}

impl From<Level> for Ack {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => Ack::Ack,
            Level::High => Ack::Nack,
        }
    }
}

pub struct SoftI2c<L, D> {
    lines: L,
    delay: D,
    delay_us: u32,
}

impl<L, D> SoftI2c<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    pub fn new(lines: L, delay: D, delay_us: u32) -> Self {
        SoftI2c {
            lines,
            delay,
            delay_us,
        }
    }

    /// Gives back the lines and the delay provider.
    pub fn release(self) -> (L, D) {
        (self.lines, self.delay)
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    fn wait(&mut self) {
        self.delay.delay_us(self.delay_us);
    }

    /// Longer pause outside of any bit timing (sensor reset, power-up).
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn clock(&mut self, level: Level) -> Result<(), L::Error> {
        self.lines.set_level(Line::Clock, level).map_err(Error::Gpio)
    }

    fn data(&mut self, level: Level) -> Result<(), L::Error> {
        self.lines.set_level(Line::Data, level).map_err(Error::Gpio)
    }

    fn data_direction(&mut self, direction: Direction) -> Result<(), L::Error> {
        self.lines
            .set_direction(Line::Data, direction)
            .map_err(Error::Gpio)
    }

    fn sample_data(&mut self) -> Result<Level, L::Error> {
        self.lines.get_level(Line::Data).map_err(Error::Gpio)
    }

    /// Data high to low while the clock is high. Also used as repeated start.
    pub fn start(&mut self) -> Result<(), L::Error> {
        self.data(Level::High)?;
        self.clock(Level::High)?;
        self.wait();
        self.data(Level::Low)?;
        self.wait();
        self.clock(Level::Low)
    }

    /// Data low to high while the clock is high.
    pub fn stop(&mut self) -> Result<(), L::Error> {
        // clock must be low before data drops, or this becomes a start
        self.clock(Level::Low)?;
        self.data(Level::Low)?;
        self.wait();
        self.clock(Level::High)?;
        self.wait();
        self.data(Level::High)?;
        self.wait();
        Ok(())
    }

    pub fn write_bit(&mut self, bit: Level) -> Result<(), L::Error> {
        self.clock(Level::Low)?;
        self.data(bit)?;
        self.wait();
        self.clock(Level::High)?;
        self.wait();
        Ok(())
    }

    /// Expects the data line to be an input already.
    pub fn read_bit(&mut self) -> Result<Level, L::Error> {
        self.clock(Level::Low)?;
        self.wait();
        self.clock(Level::High)?;
        let bit = self.sample_data()?;
        self.wait();
        Ok(bit)
    }

    /// Clocks out `byte` MSB first and returns the slave's acknowledge.
    pub fn write_byte(&mut self, byte: u8) -> Result<Ack, L::Error> {
        for i in (0..8).rev() {
            self.write_bit(Level::from(byte & (1 << i) != 0))?;
        }

        self.clock(Level::Low)?;
        self.data(Level::High)?;
        self.data_direction(Direction::Input)?;
        self.wait();
        self.clock(Level::High)?;
        self.wait();
        let ack = Ack::from(self.sample_data()?);
        self.clock(Level::Low)?;
        self.data_direction(Direction::Output)?;
        Ok(ack)
    }

    /// Clocks in one byte MSB first, then drives `ack` for the ninth clock.
    pub fn read_byte(&mut self, ack: Ack) -> Result<u8, L::Error> {
        let mut byte = 0u8;
        self.data(Level::High)?;
        self.data_direction(Direction::Input)?;
        for i in (0..8).rev() {
            if self.read_bit()?.is_high() {
                byte |= 1 << i;
            }
        }

        self.clock(Level::Low)?;
        self.data_direction(Direction::Output)?;
        self.data(ack.level())?;
        self.wait();
        self.clock(Level::High)?;
        self.wait();
        self.clock(Level::Low)?;
        self.data(Level::High)?;
        Ok(byte)
    }

    /// Nine clock pulses with data released, then a stop condition.
    pub fn recover(&mut self) -> Result<(), L::Error> {
        self.clock(Level::Low)?;
        self.wait();
        self.data(Level::High)?;
        self.data_direction(Direction::Input)?;
        for _ in 0..RECOVERY_PULSES {
            self.clock(Level::High)?;
            self.wait();
            self.clock(Level::Low)?;
            self.wait();
        }
        self.data_direction(Direction::Output)?;
        self.stop()
    }
}
