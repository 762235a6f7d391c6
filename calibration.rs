use embedded_hal::delay::DelayNs;

use crate::bus::Session;
use crate::error::Result;
use crate::gpio::GpioLines;

// BME280 calibration register ranges.
pub const REG_CALIB_00: u8 = 0x88;
pub const REG_CALIB_24: u8 = 0xA1;
pub const REG_CALIB_26: u8 = 0xE1;
pub const REG_CALIB_00_LEN: usize = 24;
pub const REG_CALIB_24_LEN: usize = 1;
pub const REG_CALIB_26_LEN: usize = 7;
pub const CALIB_LEN: usize = REG_CALIB_00_LEN + REG_CALIB_24_LEN + REG_CALIB_26_LEN;

/// Factory trimming coefficients of one sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl Calibration {
    /// Decodes the three register blocks laid end to end:
    /// `[0x88..=0x9F] [0xA1] [0xE1..=0xE7]`.
    ///
    /// H4 and H5 are 12-bit values sharing the nibbles of byte 29.
    pub fn decode(calib: &[u8; CALIB_LEN]) -> Calibration {
        let unsigned = |i: usize| u16::from_le_bytes([calib[i], calib[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([calib[i], calib[i + 1]]);

        Calibration {
            dig_t1: unsigned(0),
            dig_t2: signed(2),
            dig_t3: signed(4),
            dig_p1: unsigned(6),
            dig_p2: signed(8),
            dig_p3: signed(10),
            dig_p4: signed(12),
            dig_p5: signed(14),
            dig_p6: signed(16),
            dig_p7: signed(18),
            dig_p8: signed(20),
            dig_p9: signed(22),
            dig_h1: calib[24],
            dig_h2: signed(25),
            dig_h3: calib[27],
            dig_h4: (i16::from(calib[28]) << 4) | i16::from(calib[29] & 0x0F),
            dig_h5: (i16::from(calib[30]) << 4) | i16::from(calib[29] >> 4),
            dig_h6: calib[31] as i8,
        }
    }

    /// Reads all three blocks inside one bus session.
    ///
    /// Nothing is decoded unless every block arrived in full.
    pub fn read<L, D>(session: &mut Session<'_, L, D>) -> Result<Calibration, L::Error>
    where
        L: GpioLines,
        D: DelayNs,
    {
        let mut calib = [0u8; CALIB_LEN];
        let (tp, h) = calib.split_at_mut(REG_CALIB_00_LEN);
        let (h1, h2_h6) = h.split_at_mut(REG_CALIB_24_LEN);

        // 0x88 - 0x9F
        session.read_registers(REG_CALIB_00, tp)?;
        // 0xA1
        session.read_registers(REG_CALIB_24, h1)?;
        // 0xE1 - 0xE7
        session.read_registers(REG_CALIB_26, h2_h6)?;

        Ok(Calibration::decode(&calib))
    }
}
