/// BME280 I2C default slave address (SDO to ground).
pub const DEFAULT_ADDRESS: u8 = 0x76;
/// Half a clock period at ~100 kHz.
pub const DEFAULT_DELAY_US: u32 = 5;

/// Values written to `ctrl_hum`, `ctrl_meas` and `config` at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub ctrl_hum: u8,
    pub ctrl_meas: u8,
    pub config: u8,
}

impl Settings {
    /// Packs the register fields; 3-wire SPI stays disabled.
    ///
    /// * `osrs_t`, `osrs_p`, `osrs_h` - oversampling codes (1 = x1 ... 5 = x16)
    /// * `mode` - 0 sleep, 1 forced, 3 normal
    /// * `t_sb` - standby time code (5 = 1000 ms)
    /// * `filter` - IIR filter code (0 = off)
    pub fn new(osrs_t: u8, osrs_p: u8, osrs_h: u8, mode: u8, t_sb: u8, filter: u8) -> Settings {
        let spi3w_en: u8 = 0;
        Settings {
            ctrl_hum: osrs_h & 0x07,
            ctrl_meas: ((osrs_t & 0x07) << 5) | ((osrs_p & 0x07) << 2) | (mode & 0x03),
            config: ((t_sb & 0x07) << 5) | ((filter & 0x07) << 2) | spi3w_en,
        }
    }
}

impl Default for Settings {
    /// x16 oversampling everywhere, normal mode, 1000 ms standby, filter off.
    fn default() -> Self {
        Settings::new(5, 5, 5, 3, 5, 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// 7-bit slave address.
    pub address: u8,
    /// Delay after every line edge, in microseconds.
    pub delay_us: u32,
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS,
            delay_us: DEFAULT_DELAY_US,
            settings: Settings::default(),
        }
    }
}
