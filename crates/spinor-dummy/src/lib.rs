//! spinor-dummy - In-memory flash chip emulator for testing
//!
//! Emulates a NOR serial flash chip behind `embedded-hal` bus, chip-select,
//! and delay handles, so driver code can run against it without hardware.
//! The emulator decodes the raw wire byte stream frame by frame: bytes
//! written while chip select is asserted accumulate into the current frame,
//! responses are streamed from the decoded command, and the command's side
//! effects are committed when the line is released - the point where a real
//! chip samples its latches.
//!
//! The chip model keeps the properties tests care about: programming only
//! clears bits (1 -> 0), erase resets whole blocks to 0xFF, the write-enable
//! latch is consumed by every modifying command, BUSY stays set for a
//! configurable number of status polls after a program/erase, and deep
//! power-down makes the device ignore everything but the wake command. A
//! transcript of completed frames and recorded settle delays is kept for
//! byte-sequence assertions.

use core::convert::Infallible;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use spinor_core::spi::opcodes;
use spinor_core::PAGE_SIZE;

/// Configuration for the emulated chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// 16-bit JEDEC identity code (manufacturer + device byte)
    pub device_id: u16,
    /// Factory-programmed 8-byte unique ID
    pub unique_id: [u8; 8],
    /// Flash size in bytes
    pub size: usize,
    /// Status polls that report BUSY after a program or block erase
    pub busy_polls: u32,
    /// Status polls that report BUSY after a chip erase
    pub chip_erase_busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            device_id: 0xEF30, // Winbond W25X40CL, 4 Mbit
            unique_id: [0xD0, 0x5E, 0xA1, 0x17, 0x28, 0x39, 0x4A, 0x5B],
            size: 512 * 1024,
            busy_polls: 2,
            chip_erase_busy_polls: 8,
        }
    }
}

struct Chip {
    config: DummyConfig,
    data: Vec<u8>,
    wel: bool,
    protect_bits: u8,
    busy_polls_left: u32,
    powered_down: bool,
    selected: bool,
    /// Bytes received in the current frame
    mosi: Vec<u8>,
    /// Response bytes streamed so far in the current frame
    miso_pos: usize,
    /// Completed frames, oldest first
    frames: Vec<Vec<u8>>,
    /// Settle delays observed on the delay handle, in microseconds
    delays_us: Vec<u32>,
}

impl Chip {
    fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            wel: false,
            protect_bits: 0,
            busy_polls_left: 0,
            powered_down: false,
            selected: false,
            mosi: Vec::new(),
            miso_pos: 0,
            frames: Vec::new(),
            delays_us: Vec::new(),
        }
    }

    fn status_byte(&self) -> u8 {
        let mut bits = self.protect_bits;
        if self.busy_polls_left > 0 {
            bits |= 0x01;
        }
        if self.wel {
            bits |= 0x02;
        }
        bits
    }

    /// Produce the next response byte for the current frame.
    fn miso_byte(&mut self) -> u8 {
        let byte = self.respond();
        self.miso_pos += 1;
        byte
    }

    fn respond(&mut self) -> u8 {
        let Some(&opcode) = self.mosi.first() else {
            return 0xFF;
        };
        if self.powered_down {
            // asleep: output is undefined, a floating line reads as ones
            return 0xFF;
        }
        match opcode {
            opcodes::RDSR => {
                let status = self.status_byte();
                if self.busy_polls_left > 0 {
                    self.busy_polls_left -= 1;
                }
                status
            }
            opcodes::RDID => {
                let id = self.config.device_id.to_be_bytes();
                id.get(self.miso_pos).copied().unwrap_or(0xFF)
            }
            opcodes::RDUID => {
                // the ID streams only after opcode + 4 dummy bytes
                if self.mosi.len() < 5 {
                    return 0xFF;
                }
                self.config
                    .unique_id
                    .get(self.miso_pos)
                    .copied()
                    .unwrap_or(0xFF)
            }
            opcodes::READ => self.array_byte(4),
            opcodes::FAST_READ => self.array_byte(5),
            _ => 0xFF,
        }
    }

    /// Stream a data byte for an array-read frame whose header (opcode,
    /// address, dummies) is `header_len` bytes long.
    fn array_byte(&self, header_len: usize) -> u8 {
        if self.mosi.len() < header_len {
            return 0xFF;
        }
        let addr = addr24(&self.mosi) as usize + self.miso_pos;
        self.data.get(addr).copied().unwrap_or(0xFF)
    }

    /// Commit the current frame's side effects; called on chip-select
    /// release, where a real chip samples its latches.
    fn commit(&mut self) {
        let frame = mem::take(&mut self.mosi);
        self.miso_pos = 0;
        if frame.is_empty() {
            return;
        }
        let opcode = frame[0];

        if self.powered_down {
            if opcode == opcodes::RDP {
                self.powered_down = false;
            }
            self.frames.push(frame);
            return;
        }

        // mid-operation the device ignores every command
        let busy = self.busy_polls_left > 0;
        match opcode {
            opcodes::WREN if !busy => self.wel = true,
            opcodes::WRDI if !busy => self.wel = false,
            opcodes::PP if !busy => self.page_program(&frame),
            opcodes::SE_20 if !busy => self.block_erase(&frame, 4 * 1024),
            opcodes::BE_52 if !busy => self.block_erase(&frame, 32 * 1024),
            opcodes::BE_D8 if !busy => self.block_erase(&frame, 64 * 1024),
            opcodes::CE_60 if !busy => self.chip_erase(),
            opcodes::WRSR if !busy => self.write_status(&frame),
            opcodes::DP if !busy => self.powered_down = true,
            opcodes::RDP => self.powered_down = false,
            _ => {}
        }
        self.frames.push(frame);
    }

    fn page_program(&mut self, frame: &[u8]) {
        if !self.wel || frame.len() < 5 {
            return;
        }
        let addr = addr24(frame) as usize;
        let page_base = addr / PAGE_SIZE * PAGE_SIZE;
        let offset = addr % PAGE_SIZE;
        for (i, &byte) in frame[4..].iter().enumerate() {
            // the device wraps within the page, never into the next one
            let pos = page_base + (offset + i) % PAGE_SIZE;
            if let Some(cell) = self.data.get_mut(pos) {
                *cell &= byte;
            }
        }
        self.wel = false;
        self.busy_polls_left = self.config.busy_polls;
    }

    fn block_erase(&mut self, frame: &[u8], block: usize) {
        if !self.wel || frame.len() < 4 {
            return;
        }
        let addr = addr24(frame) as usize;
        let base = addr & !(block - 1);
        let end = (base + block).min(self.data.len());
        if base < self.data.len() {
            self.data[base..end].fill(0xFF);
        }
        self.wel = false;
        self.busy_polls_left = self.config.busy_polls;
    }

    fn chip_erase(&mut self) {
        if !self.wel {
            return;
        }
        self.data.fill(0xFF);
        self.wel = false;
        self.busy_polls_left = self.config.chip_erase_busy_polls;
    }

    fn write_status(&mut self, frame: &[u8]) {
        if !self.wel || frame.len() < 2 {
            return;
        }
        // BUSY and WEL are device-managed, not writable
        self.protect_bits = frame[1] & !0x03;
        self.wel = false;
        self.busy_polls_left = self.config.busy_polls;
    }
}

fn addr24(frame: &[u8]) -> u32 {
    ((frame[1] as u32) << 16) | ((frame[2] as u32) << 8) | frame[3] as u32
}

/// The emulated chip.
///
/// [`handles`](Self::handles) hands out the bus, chip-select, and delay
/// endpoints a driver consumes; the `DummyFlash` itself stays behind for
/// inspecting memory, the frame transcript, and latch state.
pub struct DummyFlash {
    chip: Rc<RefCell<Chip>>,
}

impl DummyFlash {
    /// Create an emulated chip with the given configuration, fully erased.
    pub fn new(config: DummyConfig) -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip::new(config))),
        }
    }

    /// Create an emulated chip with the default configuration (4 Mbit
    /// Winbond part).
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create an emulated chip with pre-filled memory contents.
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let flash = Self::new(config);
        {
            let mut chip = flash.chip.borrow_mut();
            let len = initial_data.len().min(chip.data.len());
            chip.data[..len].copy_from_slice(&initial_data[..len]);
        }
        flash
    }

    /// The bus, chip-select, and delay endpoints for a driver.
    pub fn handles(&self) -> (DummyBus, DummyCs, DummyDelay) {
        (
            DummyBus(Rc::clone(&self.chip)),
            DummyCs(Rc::clone(&self.chip)),
            DummyDelay(Rc::clone(&self.chip)),
        )
    }

    /// Snapshot of the chip memory.
    pub fn data(&self) -> Vec<u8> {
        self.chip.borrow().data.clone()
    }

    /// Completed command frames (bytes the host drove while the chip was
    /// selected), oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.chip.borrow().frames.clone()
    }

    /// Drop the recorded transcript, so a test can assert on one sequence
    /// in isolation.
    pub fn clear_frames(&self) {
        self.chip.borrow_mut().frames.clear();
    }

    /// Settle delays observed on the delay handle, in microseconds.
    pub fn delays_us(&self) -> Vec<u32> {
        self.chip.borrow().delays_us.clone()
    }

    /// Whether the chip is in deep power-down.
    pub fn powered_down(&self) -> bool {
        self.chip.borrow().powered_down
    }

    /// Whether the write-enable latch is currently set.
    pub fn write_enabled(&self) -> bool {
        self.chip.borrow().wel
    }

    /// Whether the chip still reports BUSY.
    pub fn is_busy(&self) -> bool {
        self.chip.borrow().busy_polls_left > 0
    }
}

/// SPI bus endpoint of a [`DummyFlash`].
pub struct DummyBus(Rc<RefCell<Chip>>);

impl embedded_hal::spi::ErrorType for DummyBus {
    type Error = Infallible;
}

impl SpiBus for DummyBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            *word = chip.miso_byte();
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        if chip.selected {
            chip.mosi.extend_from_slice(words);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        // sequential approximation; the driver never needs true full duplex
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            let response = chip.miso_byte();
            if chip.selected {
                chip.mosi.push(*word);
            }
            *word = response;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Chip-select endpoint of a [`DummyFlash`]. Driving it low opens a frame;
/// driving it high commits the frame's side effects.
pub struct DummyCs(Rc<RefCell<Chip>>);

impl embedded_hal::digital::ErrorType for DummyCs {
    type Error = Infallible;
}

impl OutputPin for DummyCs {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        if !chip.selected {
            chip.selected = true;
            chip.mosi.clear();
            chip.miso_pos = 0;
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut chip = self.0.borrow_mut();
        if chip.selected {
            chip.selected = false;
            chip.commit();
        }
        Ok(())
    }
}

/// Delay endpoint of a [`DummyFlash`]; records requested delays instead of
/// sleeping.
pub struct DummyDelay(Rc<RefCell<Chip>>);

impl DelayNs for DummyDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delays_us.push(ns / 1_000);
    }
}
