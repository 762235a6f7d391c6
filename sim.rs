//! Simulated BME280 on two GPIO lines, for tests.
//!
//! The simulator watches the master's line changes, decodes start/stop
//! conditions and clock edges, and answers like an I2C slave with a 256-byte
//! register file and an auto-incrementing register pointer. The data line is
//! modelled as wired-AND: it reads low if either side pulls it low.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::gpio::{Direction, GpioLines, Level, Line};

pub const SIM_ADDRESS: u8 = 0x76;

/// Calibration bytes (0x88..0x9F, 0xA1, 0xE1..0xE7) for the reference set:
/// T1=27504 T2=26435 T3=-1000, P1=36477 P2=-10685 P3=3024 P4=2855 P5=140
/// P6=-7 P7=15500 P8=-14600 P9=6000, H1=75 H2=362 H3=0 H4=324 H5=0 H6=30.
pub const REFERENCE_CALIB: [u8; 32] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C, 0x00,
    0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, 0x4B, 0x6A, 0x01, 0x00, 0x14, 0x04, 0x00, 0x1E,
];

/// Measurement block at 0xF7: adc_P=415148, adc_T=519888, adc_H=27000.
pub const REFERENCE_ADC: [u8; 8] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x69, 0x78];

/// Bus-level event decoded by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Stop,
    /// Rising clock edge with the data level seen on it.
    Clock(Level),
    /// Byte fully clocked out by the slave.
    Sent(u8),
    /// Acknowledge level driven by the master after a sent byte.
    MasterAck(Level),
}

#[derive(Clone, Copy, Debug)]
pub struct Traced {
    pub event: BusEvent,
    pub thread: ThreadId,
}

/// Error injected through `fail_after`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimFault;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    Receive,
    Transmit,
    /// Not addressed, or the master has nacked: wait for the next start.
    Ignore,
}

struct SimState {
    clock: Level,
    data_out: Level,
    data_dir: Direction,
    slave_data: Level,
    mode: Mode,
    bit: u8,
    shift: u8,
    byte_index: usize,
    read_requested: bool,
    master_nacked: bool,
    pointer: u8,
    regs: [u8; 256],
    present: bool,
    refuse_reads: bool,
    nack_byte: Option<usize>,
    ops_left: Option<usize>,
    starts: usize,
    trace: Vec<Traced>,
}

impl SimState {
    fn data(&self) -> Level {
        let master_low = self.data_dir == Direction::Output && self.data_out.is_low();
        if master_low || self.slave_data.is_low() {
            Level::Low
        } else {
            Level::High
        }
    }

    fn record(&mut self, event: BusEvent) {
        self.trace.push(Traced {
            event,
            thread: thread::current().id(),
        });
    }

    fn data_changed(&mut self, before: Level) {
        let after = self.data();
        if self.clock.is_low() || before == after {
            return;
        }
        if after.is_low() {
            self.record(BusEvent::Start);
            self.starts += 1;
            self.mode = Mode::Receive;
            self.bit = 0;
            self.shift = 0;
            self.byte_index = 0;
            self.read_requested = false;
        } else {
            self.record(BusEvent::Stop);
            self.mode = Mode::Idle;
        }
        self.slave_data = Level::High;
    }

    fn rise(&mut self) {
        let data = self.data();
        self.record(BusEvent::Clock(data));
        match self.mode {
            Mode::Receive => {
                if self.bit < 8 {
                    self.shift = (self.shift << 1) | u8::from(data.is_high());
                }
                self.bit += 1;
            }
            Mode::Transmit => {
                if self.bit == 7 {
                    let sent = self.regs[usize::from(self.pointer)];
                    self.record(BusEvent::Sent(sent));
                } else if self.bit == 8 {
                    self.record(BusEvent::MasterAck(data));
                    self.master_nacked = data.is_high();
                }
                self.bit += 1;
            }
            Mode::Idle | Mode::Ignore => {}
        }
    }

    fn fall(&mut self) {
        match self.mode {
            Mode::Receive if self.bit == 8 => self.byte_received(),
            Mode::Receive if self.bit == 9 => {
                self.slave_data = Level::High;
                self.bit = 0;
                self.shift = 0;
                if self.read_requested {
                    self.mode = Mode::Transmit;
                    self.drive_bit();
                }
            }
            Mode::Transmit if self.bit >= 1 && self.bit <= 7 => self.drive_bit(),
            Mode::Transmit if self.bit == 8 => self.slave_data = Level::High,
            Mode::Transmit if self.bit == 9 => {
                if self.master_nacked {
                    self.mode = Mode::Ignore;
                    self.slave_data = Level::High;
                } else {
                    self.pointer = self.pointer.wrapping_add(1);
                    self.bit = 0;
                    self.drive_bit();
                }
            }
            _ => {}
        }
    }

    fn drive_bit(&mut self) {
        let byte = self.regs[usize::from(self.pointer)];
        self.slave_data = Level::from(byte & (0x80 >> self.bit) != 0);
    }

    fn byte_received(&mut self) {
        let byte = self.shift;
        let index = self.byte_index;
        self.byte_index += 1;

        let accept = if index == 0 {
            let ours = self.present && byte >> 1 == SIM_ADDRESS;
            self.read_requested = ours && byte & 1 == 1;
            ours && !(self.read_requested && self.refuse_reads)
        } else {
            if index == 1 {
                self.pointer = byte;
            } else {
                self.regs[usize::from(self.pointer)] = byte;
                self.pointer = self.pointer.wrapping_add(1);
            }
            true
        };

        if accept && self.nack_byte != Some(index) {
            self.slave_data = Level::Low;
        } else {
            self.mode = Mode::Ignore;
        }
    }

    fn spend(&mut self) -> Result<(), SimFault> {
        match self.ops_left {
            Some(0) => Err(SimFault),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Cloneable handle; all clones share one simulated bus.
#[derive(Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl SimBus {
    pub fn new() -> SimBus {
        SimBus {
            state: Arc::new(Mutex::new(SimState {
                clock: Level::High,
                data_out: Level::High,
                data_dir: Direction::Output,
                slave_data: Level::High,
                mode: Mode::Idle,
                bit: 0,
                shift: 0,
                byte_index: 0,
                read_requested: false,
                master_nacked: false,
                pointer: 0,
                regs: [0; 256],
                present: true,
                refuse_reads: false,
                nack_byte: None,
                ops_left: None,
                starts: 0,
                trace: Vec::new(),
            })),
        }
    }

    /// A sensor with the reference calibration and measurement block loaded.
    pub fn bme280() -> SimBus {
        let sim = SimBus::new();
        sim.set_register(0xD0, 0x60);
        sim.load(0x88, &REFERENCE_CALIB[..24]);
        sim.set_register(0xA1, REFERENCE_CALIB[24]);
        sim.load(0xE1, &REFERENCE_CALIB[25..]);
        sim.load(0xF7, &REFERENCE_ADC);
        sim
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.state().regs[usize::from(reg)] = value;
    }

    pub fn load(&self, reg: u8, bytes: &[u8]) {
        let mut state = self.state();
        for (i, byte) in bytes.iter().enumerate() {
            state.regs[usize::from(reg) + i] = *byte;
        }
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state().regs[usize::from(reg)]
    }

    /// Slave stops answering to its address.
    pub fn disconnect(&self) {
        self.state().present = false;
    }

    /// Acknowledge the address for writes only.
    pub fn refuse_reads(&self) {
        self.state().refuse_reads = true;
    }

    /// Refuse the `index`-th byte of every transaction (0 = address byte).
    pub fn nack_byte(&self, index: usize) {
        self.state().nack_byte = Some(index);
    }

    /// Every line operation after the next `ops` fails.
    pub fn fail_after(&self, ops: usize) {
        self.state().ops_left = Some(ops);
    }

    /// Put the slave mid-way through sending 0x00, holding data low.
    pub fn hold_data_low(&self) {
        let mut state = self.state();
        state.clock = Level::Low;
        state.mode = Mode::Transmit;
        state.bit = 0;
        state.master_nacked = false;
        let pointer = usize::from(state.pointer);
        state.regs[pointer] = 0x00;
        state.slave_data = Level::Low;
    }

    pub fn data_level(&self) -> Level {
        self.state().data()
    }

    pub fn data_direction(&self) -> Direction {
        self.state().data_dir
    }

    pub fn starts(&self) -> usize {
        self.state().starts
    }

    pub fn trace(&self) -> Vec<Traced> {
        self.state().trace.clone()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state().trace.iter().map(|t| t.event).collect()
    }

    pub fn sent_bytes(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BusEvent::Sent(byte) => Some(byte),
                _ => None,
            })
            .collect()
    }

    pub fn master_acks(&self) -> Vec<Level> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BusEvent::MasterAck(level) => Some(level),
                _ => None,
            })
            .collect()
    }

    pub fn clear_trace(&self) {
        let mut state = self.state();
        state.trace.clear();
        state.starts = 0;
    }
}

impl GpioLines for SimBus {
    type Error = SimFault;

    fn set_level(&mut self, line: Line, level: Level) -> Result<(), SimFault> {
        let mut state = self.state();
        state.spend()?;
        match line {
            Line::Clock => {
                let before = state.clock;
                state.clock = level;
                match (before, level) {
                    (Level::Low, Level::High) => state.rise(),
                    (Level::High, Level::Low) => state.fall(),
                    _ => {}
                }
            }
            Line::Data => {
                let before = state.data();
                state.data_out = level;
                state.data_changed(before);
            }
        }
        Ok(())
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), SimFault> {
        let mut state = self.state();
        state.spend()?;
        if line == Line::Data {
            let before = state.data();
            state.data_dir = direction;
            state.data_changed(before);
        }
        Ok(())
    }

    fn get_level(&mut self, line: Line) -> Result<Level, SimFault> {
        let mut state = self.state();
        state.spend()?;
        Ok(match line {
            Line::Clock => state.clock,
            Line::Data => state.data(),
        })
    }
}
