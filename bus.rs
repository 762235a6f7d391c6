//! Register transactions on the bit-banged bus.
//!
//! All traffic goes through one [`BusLock`]. A failed transaction runs the
//! recovery sequence while the lock is still held, so no other caller ever
//! sees a half-recovered bus.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::{error, warn};

use crate::error::{Error, Phase, Result};
use crate::gpio::GpioLines;
use crate::soft_i2c::{Ack, SoftI2c};

const WRITE: u8 = 0x00;
const READ: u8 = 0x01;

/// Blocking mutual exclusion that counts how often it was taken and released.
pub struct BusLock<T> {
    inner: Mutex<T>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl<T> BusLock<T> {
    pub fn new(value: T) -> Self {
        BusLock {
            inner: Mutex::new(value),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Waits until the bus is free.
    pub fn lock(&self) -> BusGuard<'_, T> {
        // poisoned: the next start re-drives both lines
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        BusGuard {
            guard,
            released: &self.released,
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct BusGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    released: &'a AtomicUsize,
}

impl<T> Deref for BusGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for BusGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for BusGuard<'_, T> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// The shared bus plus the 7-bit address of the device on it.
pub struct Bus<L, D> {
    master: BusLock<SoftI2c<L, D>>,
    address: u8,
}

impl<L, D> Bus<L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    pub fn new(master: SoftI2c<L, D>, address: u8) -> Self {
        Bus {
            master: BusLock::new(master),
            address,
        }
    }

    /// Takes the bus lock for a sequence of transactions.
    pub fn session(&self) -> Session<'_, L, D> {
        Session {
            master: self.master.lock(),
            address: self.address,
        }
    }

    pub fn write_register(&self, reg: u8, value: u8) -> Result<(), L::Error> {
        self.session().write_register(reg, value)
    }

    pub fn read_registers(&self, reg: u8, buf: &mut [u8]) -> Result<usize, L::Error> {
        self.session().read_registers(reg, buf)
    }

    pub fn lock(&self) -> &BusLock<SoftI2c<L, D>> {
        &self.master
    }

    pub fn into_inner(self) -> SoftI2c<L, D> {
        self.master.into_inner()
    }
}

/// Exclusive use of the bus until dropped.
pub struct Session<'a, L, D> {
    master: BusGuard<'a, SoftI2c<L, D>>,
    address: u8,
}

impl<L, D> Session<'_, L, D>
where
    L: GpioLines,
    D: DelayNs,
{
    /// start, address+W, register, value, stop.
    pub fn write_register(&mut self, reg: u8, value: u8) -> Result<(), L::Error> {
        let result = self.try_write(reg, value);
        self.finish(result, "write", reg)
    }

    /// start, address+W, register, repeated start, address+R, then
    /// `buf.len()` bytes acked except the last. Returns the byte count.
    ///
    /// The buffer is either filled completely or the call fails; a burst cut
    /// short by a line error goes through recovery like any other failure.
    pub fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<usize, L::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let result = self.try_read(reg, buf);
        self.finish(result, "read", reg)
    }

    pub fn pause_ms(&mut self, ms: u32) {
        self.master.pause_ms(ms);
    }

    fn try_write(&mut self, reg: u8, value: u8) -> Result<(), L::Error> {
        let address = self.address << 1;
        self.master.start()?;
        self.send(address | WRITE, Phase::Address)?;
        self.send(reg, Phase::Register)?;
        self.send(value, Phase::Data)
    }

    fn try_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<usize, L::Error> {
        let address = self.address << 1;
        self.master.start()?;
        self.send(address | WRITE, Phase::Address)?;
        self.send(reg, Phase::Register)?;
        self.master.start()?;
        self.send(address | READ, Phase::ReadAddress)?;

        let last = buf.len() - 1;
        for (i, byte) in buf.iter_mut().enumerate() {
            let ack = if i == last { Ack::Nack } else { Ack::Ack };
            *byte = self.master.read_byte(ack)?;
        }
        Ok(buf.len())
    }

    fn send(&mut self, byte: u8, phase: Phase) -> Result<(), L::Error> {
        match self.master.write_byte(byte)? {
            Ack::Ack => Ok(()),
            Ack::Nack => Err(Error::Nack(phase)),
        }
    }

    /// Ends the transaction with a stop, or with recovery if anything failed.
    fn finish<T>(
        &mut self,
        result: Result<T, L::Error>,
        op: &str,
        reg: u8,
    ) -> Result<T, L::Error> {
        let result = result.and_then(|value| self.master.stop().map(|()| value));
        if let Err(ref err) = result {
            error!("{op} of register {reg:#04x} failed: {err}");
            warn!("recovering bus");
            if let Err(recovery) = self.master.recover() {
                warn!("bus recovery incomplete: {recovery}");
            }
        }
        result
    }
}
