/// Raw ADC values from one burst read of 0xF7 - 0xFE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSample {
    /// 20 bits.
    pub pressure: u32,
    /// 20 bits.
    pub temperature: u32,
    /// 16 bits.
    pub humidity: u32,
}

impl RawSample {
    pub fn from_bytes(data: &[u8; 8]) -> RawSample {
        let data = data.map(u32::from);
        RawSample {
            pressure: (data[0] << 12) | (data[1] << 4) | (data[2] >> 4),
            temperature: (data[3] << 12) | (data[4] << 4) | (data[5] >> 4),
            humidity: (data[6] << 8) | data[7],
        }
    }
}

/// Compensated reading in the sensor's fixed-point units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Hundredths of °C.
    pub temperature: i32,
    /// Pa, Q24.8.
    pub pressure: u32,
    /// %RH, Q22.10.
    pub humidity: u32,
}

impl Measurement {
    pub fn celsius(&self) -> f32 {
        self.temperature as f32 / 100.0
    }

    pub fn hpa(&self) -> f32 {
        self.pressure as f32 / 256.0 / 100.0
    }

    pub fn relative_humidity(&self) -> f32 {
        self.humidity as f32 / 1024.0
    }
}
