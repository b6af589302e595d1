//! Driver behavior against the emulated chip.
//!
//! These tests exercise the public driver surface end to end: framing,
//! write-enable latching, busy polling, and the exact byte sequences the
//! driver puts on the wire.

use spinor_core::spi::opcodes;
use spinor_core::{Error, InitState, SpiFlash, Status, PAGE_SIZE};
use spinor_dummy::{DummyBus, DummyConfig, DummyCs, DummyDelay, DummyFlash};

type Driver = SpiFlash<DummyBus, DummyCs, DummyDelay>;

fn ready_driver(flash: &DummyFlash) -> Driver {
    let (bus, cs, delay) = flash.handles();
    let mut driver = SpiFlash::new(bus, cs, delay, Some(0xEF30));
    driver.initialize().unwrap();
    driver
}

/// Frames that are not status polls, in order.
fn command_frames(flash: &DummyFlash) -> Vec<Vec<u8>> {
    flash
        .frames()
        .into_iter()
        .filter(|frame| frame[0] != opcodes::RDSR)
        .collect()
}

#[test]
fn initialize_reaches_ready() {
    let flash = DummyFlash::new_default();
    let (bus, cs, delay) = flash.handles();
    let mut driver = SpiFlash::new(bus, cs, delay, Some(0xEF30));
    assert_eq!(driver.state(), InitState::Uninitialized);

    driver.initialize().unwrap();
    assert_eq!(driver.state(), InitState::Ready);
}

#[test]
fn initialize_without_expected_id_skips_the_check() {
    let flash = DummyFlash::new_default();
    let (bus, cs, delay) = flash.handles();
    let mut driver = SpiFlash::new(bus, cs, delay, None);
    driver.initialize().unwrap();
    assert_eq!(driver.state(), InitState::Ready);
}

#[test]
fn initialize_rejects_wrong_chip_and_stops() {
    let flash = DummyFlash::new_default(); // reports 0xEF30
    let (bus, cs, delay) = flash.handles();
    let mut driver = SpiFlash::new(bus, cs, delay, Some(0x1F44));

    let err = driver.initialize().unwrap_err();
    assert!(matches!(
        err,
        Error::JedecIdMismatch {
            expected: 0x1F44,
            found: 0xEF30,
        }
    ));
    assert_eq!(driver.state(), InitState::Failed);
    // the identification read is the only bus traffic
    assert_eq!(flash.frames(), vec![vec![opcodes::RDID]]);
}

#[test]
fn device_id_is_stable_across_reads() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);

    let first = driver.read_device_id().unwrap();
    let second = driver.read_device_id().unwrap();
    assert_eq!(first, 0xEF30);
    assert_eq!(first, second);
}

#[test]
fn unique_id_frame_carries_four_dummy_bytes() {
    let config = DummyConfig::default();
    let expected = config.unique_id;
    let flash = DummyFlash::new(config);
    let mut driver = ready_driver(&flash);

    flash.clear_frames();
    let id = driver.read_unique_id().unwrap();
    assert_eq!(id, expected);
    assert_eq!(
        flash.frames(),
        vec![vec![opcodes::RDUID, 0x00, 0x00, 0x00, 0x00]]
    );
}

#[test]
fn written_byte_reads_back_after_fresh_erase() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);

    driver.block_erase_4k(0x1000).unwrap();
    driver.write_byte(0x1234, 0xA5).unwrap();
    assert_eq!(driver.read_byte(0x1234).unwrap(), 0xA5);
    // the dispatcher busy-waited, so the device is idle again
    assert!(!driver.busy().unwrap());
}

#[test]
fn page_writes_read_back_exactly() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);

    // a short write at a page offset
    driver.write_bytes(0x2010, b"spinor").unwrap();
    let mut out = [0u8; 6];
    driver.read_bytes(0x2010, &mut out).unwrap();
    assert_eq!(&out, b"spinor");

    // a full page at a page boundary
    let mut page = [0u8; PAGE_SIZE];
    for (i, byte) in page.iter_mut().enumerate() {
        *byte = i as u8;
    }
    driver.write_bytes(0x3000, &page).unwrap();
    let mut readback = [0u8; PAGE_SIZE];
    driver.read_bytes(0x3000, &mut readback).unwrap();
    assert_eq!(readback, page);

    // a single byte ending exactly on the boundary
    driver.write_bytes(0x40FF, &[0x5A]).unwrap();
    assert_eq!(driver.read_byte(0x40FF).unwrap(), 0x5A);
}

#[test]
fn out_of_contract_page_writes_are_rejected_without_bus_traffic() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    flash.clear_frames();

    let crossing = driver.write_bytes(0x00FF, &[1, 2]);
    assert!(matches!(crossing, Err(Error::DataCrossesPageBoundary)));

    let empty = driver.write_bytes(0x0000, &[]);
    assert!(matches!(empty, Err(Error::InvalidDataLength)));

    let oversized = [0u8; PAGE_SIZE + 1];
    let too_long = driver.write_bytes(0x0000, &oversized);
    assert!(matches!(too_long, Err(Error::InvalidDataLength)));

    assert!(flash.frames().is_empty());
}

#[test]
fn every_modifying_command_relatches_the_write_enable() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    flash.clear_frames();

    driver.write_byte(0x0100, 0x11).unwrap();
    driver.write_byte(0x0101, 0x22).unwrap();

    let frames = command_frames(&flash);
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0], vec![opcodes::WREN]);
    assert_eq!(frames[1], vec![opcodes::PP, 0x00, 0x01, 0x00, 0x11]);
    assert_eq!(frames[2], vec![opcodes::WREN]);
    assert_eq!(frames[3], vec![opcodes::PP, 0x00, 0x01, 0x01, 0x22]);

    // both writes took effect, so the second latch was real
    assert_eq!(driver.read_byte(0x0100).unwrap(), 0x11);
    assert_eq!(driver.read_byte(0x0101).unwrap(), 0x22);
}

#[test]
fn block_erases_clear_their_containing_block() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);

    driver.write_byte(0x8000, 0x00).unwrap();
    driver.write_byte(0x8FFF, 0x00).unwrap();
    // an unaligned address erases the containing block
    driver.block_erase_4k(0x8ABC).unwrap();
    assert_eq!(driver.read_byte(0x8000).unwrap(), 0xFF);
    assert_eq!(driver.read_byte(0x8FFF).unwrap(), 0xFF);
    assert!(!driver.busy().unwrap());

    driver.write_byte(0x10000, 0x00).unwrap();
    driver.block_erase_32k(0x10000).unwrap();
    assert_eq!(driver.read_byte(0x10000).unwrap(), 0xFF);

    driver.write_byte(0x20000, 0x00).unwrap();
    driver.block_erase_64k(0x20000).unwrap();
    assert_eq!(driver.read_byte(0x20000).unwrap(), 0xFF);
}

#[test]
fn chip_erase_returns_immediately_and_needs_polling() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);

    driver.write_bytes(0x1000, &[0x00; 16]).unwrap();
    driver.chip_erase().unwrap();

    // no busy-wait happened inside chip_erase
    assert!(driver.busy().unwrap());

    let mut polls = 0;
    while driver.busy().unwrap() {
        polls += 1;
        assert!(polls < 1000, "chip never became idle");
    }

    let mut out = [0u8; 16];
    driver.read_bytes(0x1000, &mut out).unwrap();
    assert_eq!(out, [0xFF; 16]);
}

#[test]
fn fast_read_streams_after_one_dummy_byte() {
    let mut initial = vec![0xFF; 0x4000];
    initial[0x3000..0x3004].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let flash = DummyFlash::with_data(DummyConfig::default(), &initial);
    let mut driver = ready_driver(&flash);

    flash.clear_frames();
    let mut out = [0u8; 4];
    driver.read_bytes_fast(0x3000, &mut out).unwrap();
    assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(
        flash.frames(),
        vec![vec![opcodes::FAST_READ, 0x00, 0x30, 0x00, 0x00]]
    );
}

#[test]
fn write_status_latches_and_sticks() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    flash.clear_frames();

    driver.write_status(0x1C).unwrap();

    let frames = command_frames(&flash);
    assert_eq!(frames[0], vec![opcodes::WREN]);
    assert_eq!(frames[1], vec![opcodes::WRSR, 0x1C]);

    let status = driver.read_status().unwrap();
    assert!(status.contains(Status::PROT));
    assert!(!status.contains(Status::WEL));
}

#[test]
fn bare_commands_go_out_unadorned() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    flash.clear_frames();

    driver.command(opcodes::WREN, false, false).unwrap();
    assert!(flash.write_enabled());

    driver.write_disable().unwrap();
    assert!(!flash.write_enabled());

    assert_eq!(
        flash.frames(),
        vec![vec![opcodes::WREN], vec![opcodes::WRDI]]
    );
}

#[test]
fn sleep_issues_the_documented_sequence() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    flash.clear_frames();

    driver.sleep().unwrap();
    assert!(flash.powered_down());
    assert_eq!(flash.frames(), vec![vec![opcodes::DP]]);

    // a status read while asleep still puts the documented byte on the
    // wire; the returned value is device-dependent and not asserted
    let _ = driver.read_status().unwrap();
    assert_eq!(flash.frames()[1], vec![opcodes::RDSR]);
}

#[test]
fn wakeup_settles_before_returning() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    driver.sleep().unwrap();

    flash.clear_frames();
    driver.wakeup().unwrap();
    assert!(!flash.powered_down());
    assert_eq!(flash.frames(), vec![vec![opcodes::RDP]]);
    // the fixed post-release settle, not observable via BUSY
    assert_eq!(flash.delays_us(), vec![3]);
}

#[test]
fn release_returns_the_peripherals() {
    let flash = DummyFlash::new_default();
    let mut driver = ready_driver(&flash);
    driver.write_byte(0x0000, 0x42).unwrap();

    let (bus, cs, delay) = driver.release();

    // the chip state survives; a new handle picks up where the old one left
    let mut driver = SpiFlash::new(bus, cs, delay, Some(0xEF30));
    driver.initialize().unwrap();
    assert_eq!(driver.read_byte(0x0000).unwrap(), 0x42);
}
