use std::convert::Infallible;

use rppal::gpio::{Gpio, IoPin, Mode};

/// One of the two bus lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Clock,
    Data,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<rppal::gpio::Level> for Level {
    fn from(level: rppal::gpio::Level) -> Self {
        match level {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        }
    }
}

impl From<Level> for rppal::gpio::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Two independently driven GPIO lines.
///
/// Direction is explicit state: the data line is switched to `Input` while
/// the slave drives it and back to `Output` afterwards.
pub trait GpioLines {
    type Error: core::fmt::Debug;

    fn set_level(&mut self, line: Line, level: Level) -> Result<(), Self::Error>;

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error>;

    fn get_level(&mut self, line: Line) -> Result<Level, Self::Error>;
}

/// Clock and data lines on Raspberry Pi GPIO pins (BCM numbering).
///
/// Both pins are push-pull, not open-drain. After each acknowledged byte the
/// data pin is switched back to output high while the slave may already be
/// driving its next bit low, so the two briefly drive opposite levels. Keep
/// a series resistor on SDA to limit that current.
pub struct RppalLines {
    scl: IoPin,
    sda: IoPin,
}

impl RppalLines {
    /// Acquires both pins as outputs and idles the bus high.
    pub fn new(scl_pin: u8, sda_pin: u8) -> Result<RppalLines, rppal::gpio::Error> {
        let gpio = Gpio::new()?;
        let mut scl = gpio.get(scl_pin)?.into_io(Mode::Output);
        let mut sda = gpio.get(sda_pin)?.into_io(Mode::Output);
        scl.set_high();
        sda.set_high();
        Ok(RppalLines { scl, sda })
    }

    fn pin(&mut self, line: Line) -> &mut IoPin {
        match line {
            Line::Clock => &mut self.scl,
            Line::Data => &mut self.sda,
        }
    }
}

impl GpioLines for RppalLines {
    type Error = Infallible;

    fn set_level(&mut self, line: Line, level: Level) -> Result<(), Infallible> {
        self.pin(line).write(level.into());
        Ok(())
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Infallible> {
        let mode = match direction {
            Direction::Input => Mode::Input,
            Direction::Output => Mode::Output,
        };
        self.pin(line).set_mode(mode);
        Ok(())
    }

    fn get_level(&mut self, line: Line) -> Result<Level, Infallible> {
        Ok(self.pin(line).read().into())
    }
}
