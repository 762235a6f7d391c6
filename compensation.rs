//! Fixed-point compensation of raw ADC counts.
//!
//! Integer widths, shifts and operation order follow the vendor's 32/64-bit
//! reference formulas exactly. Products that can exceed the width wrap the
//! way two's complement hardware does.

use crate::calibration::Calibration;
use crate::structs::{Measurement, RawSample};

/// Highest humidity accumulator value, 100 %RH in Q22.10 before the final shift.
pub const HUMIDITY_MAX: i32 = 419_430_400;

/// Temperature intermediate shared by the pressure and humidity formulas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FineTemperature(pub i32);

/// One measurement cycle's compensation state.
///
/// `compensate_temperature` must run first in a cycle; it produces the
/// [`FineTemperature`] the other two read. Without calibration every
/// function returns 0.
pub struct Compensator<'a> {
    calib: Option<&'a Calibration>,
    fine: FineTemperature,
}

impl<'a> Compensator<'a> {
    pub fn new(calib: Option<&'a Calibration>) -> Self {
        Compensator {
            calib,
            fine: FineTemperature::default(),
        }
    }

    pub fn fine_temperature(&self) -> FineTemperature {
        self.fine
    }

    /// Returns hundredths of a degree Celsius: 2508 is 25.08 °C.
    pub fn compensate_temperature(&mut self, adc_t: i32) -> i32 {
        let calib = match self.calib {
            Some(calib) => calib,
            None => return 0,
        };
        let t1 = i32::from(calib.dig_t1);
        let t2 = i32::from(calib.dig_t2);
        let t3 = i32::from(calib.dig_t3);

        let var1 = ((adc_t >> 3) - (t1 << 1)).wrapping_mul(t2) >> 11;
        let delta = (adc_t >> 4) - t1;
        let var2 = (delta.wrapping_mul(delta) >> 12).wrapping_mul(t3) >> 14;

        self.fine = FineTemperature(var1.wrapping_add(var2));
        self.fine.0.wrapping_mul(5).wrapping_add(128) >> 8
    }

    /// Returns pascal as unsigned Q24.8: 25767233 is 100653.25 Pa.
    pub fn compensate_pressure(&self, adc_p: i32) -> u32 {
        let calib = match self.calib {
            Some(calib) => calib,
            None => return 0,
        };
        let p1 = i64::from(calib.dig_p1);
        let p2 = i64::from(calib.dig_p2);
        let p3 = i64::from(calib.dig_p3);
        let p4 = i64::from(calib.dig_p4);
        let p5 = i64::from(calib.dig_p5);
        let p6 = i64::from(calib.dig_p6);
        let p7 = i64::from(calib.dig_p7);
        let p8 = i64::from(calib.dig_p8);
        let p9 = i64::from(calib.dig_p9);

        let mut var1 = i64::from(self.fine.0) - 128_000;
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 17);
        var2 = var2.wrapping_add(p4 << 35);
        var1 = (var1.wrapping_mul(var1).wrapping_mul(p3) >> 8)
            .wrapping_add(var1.wrapping_mul(p2) << 12);
        var1 = ((1_i64 << 47).wrapping_add(var1)).wrapping_mul(p1) >> 33;

        if var1 == 0 {
            // avoid division by zero
            return 0;
        }

        let mut p = 1_048_576 - i64::from(adc_p);
        p = (p << 31).wrapping_sub(var2).wrapping_mul(3125).wrapping_div(var1);
        var1 = p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
        var2 = p8.wrapping_mul(p) >> 19;
        p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(p7 << 4);
        p as u32
    }

    /// Returns %RH as unsigned Q22.10, within `0..=102400`.
    pub fn compensate_humidity(&self, adc_h: i32) -> u32 {
        let calib = match self.calib {
            Some(calib) => calib,
            None => return 0,
        };
        let h1 = i32::from(calib.dig_h1);
        let h2 = i32::from(calib.dig_h2);
        let h3 = i32::from(calib.dig_h3);
        let h4 = i32::from(calib.dig_h4);
        let h5 = i32::from(calib.dig_h5);
        let h6 = i32::from(calib.dig_h6);

        let v = self.fine.0.wrapping_sub(76_800);
        let offset = ((adc_h << 14)
            .wrapping_sub(h4 << 20)
            .wrapping_sub(h5.wrapping_mul(v))
            .wrapping_add(16_384))
            >> 15;
        let curve = (v.wrapping_mul(h6) >> 10)
            .wrapping_mul((v.wrapping_mul(h3) >> 11) + 32_768)
            >> 10;
        let scale = curve.wrapping_add(2_097_152).wrapping_mul(h2).wrapping_add(8_192) >> 14;

        let mut v = offset.wrapping_mul(scale);
        let square = (v >> 15).wrapping_mul(v >> 15);
        v = v.wrapping_sub((square >> 7).wrapping_mul(h1) >> 4);
        let v = v.clamp(0, HUMIDITY_MAX);
        (v >> 12) as u32
    }

    /// Runs the three formulas in order for one raw sample.
    pub fn compensate(&mut self, raw: &RawSample) -> Measurement {
        let temperature = self.compensate_temperature(raw.temperature as i32);
        Measurement {
            temperature,
            pressure: self.compensate_pressure(raw.pressure as i32),
            humidity: self.compensate_humidity(raw.humidity as i32),
        }
    }
}
