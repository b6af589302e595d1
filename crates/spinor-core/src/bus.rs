//! Bus transaction framing
//!
//! Owns the chip-select line and brackets every command in an exclusive
//! select/unselect pair. Transactions never nest: one command is framed,
//! completed, and released before the next begins, and the line is released
//! on every exit path, including transport failures mid-frame.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::error::Error;
use crate::spi::{address, SpiCommand};

/// Filler clocked out for dummy cycles.
const DUMMY: [u8; 4] = [0; 4];

/// The framed serial interface to one chip: bus, chip-select line, and the
/// microsecond delay primitive for post-release settle times.
pub struct SpiInterface<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
}

impl<SPI, CS, D> SpiInterface<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    /// Create an interface over an already-configured bus. The chip-select
    /// line is not touched until the first transaction or
    /// [`deselect`](Self::deselect).
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self { spi, cs, delay }
    }

    /// Release the underlying bus, chip-select pin, and delay provider.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    /// Deassert the chip-select line outside any transaction, so the next
    /// select is a clean high-to-low edge.
    pub fn deselect(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.unselect(0)
    }

    /// Assert the chip-select line; exclusive bus ownership begins.
    fn select(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(Error::Pin)
    }

    /// Deassert the chip-select line and, if `settle_us` is nonzero,
    /// busy-wait that many microseconds before returning.
    fn unselect(&mut self, settle_us: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_high().map_err(Error::Pin)?;
        if settle_us > 0 {
            self.delay.delay_us(settle_us);
        }
        Ok(())
    }

    /// Execute a single framed transaction.
    ///
    /// The chip-select line is released even when a transfer phase fails;
    /// the first error wins.
    pub fn execute(
        &mut self,
        cmd: &mut SpiCommand<'_>,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.select()?;
        let transferred = self.transfer_phases(cmd);
        let released = self.unselect(cmd.settle_us);
        transferred.and(released)
    }

    fn transfer_phases(
        &mut self,
        cmd: &mut SpiCommand<'_>,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.spi.write(&[cmd.opcode]).map_err(Error::Spi)?;
        if let Some(addr) = cmd.address {
            self.spi
                .write(&address::encode_24bit(addr))
                .map_err(Error::Spi)?;
        }
        if cmd.dummy_bytes > 0 {
            self.spi
                .write(&DUMMY[..cmd.dummy_bytes as usize])
                .map_err(Error::Spi)?;
        }
        if cmd.has_write() {
            self.spi.write(cmd.write_data).map_err(Error::Spi)?;
        }
        if cmd.has_read() {
            self.spi.read(cmd.read_buf).map_err(Error::Spi)?;
        }
        // all phases must hit the wire before the line is released
        self.spi.flush().map_err(Error::Spi)
    }
}
