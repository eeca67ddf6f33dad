// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

mod common;

use bootloader_core::{sha256, Bootloader, Error, Event, SlotId};
use common::*;
use host_protocol::Command;
use pretty_assertions::assert_eq;

#[test]
fn unknown_bytes_are_ignored() {
    let mut bl = bootloader();
    bl.transport_mut().push(b"x\0\xff\n");
    for byte in [b'x', 0x00, 0xff, b'\n'] {
        assert_eq!(bl.poll(), Ok(Event::Ignored(byte)));
    }
    assert!(bl.transport_mut().output.is_empty());
    assert_eq!(bl.poll(), Err(Error::Disconnected));
}

#[test]
fn invalid_readback_selector_only_acks_command() {
    let mut bl = bootloader();
    bl.transport_mut().push(b"RQx");
    assert_eq!(bl.poll(), Ok(Event::Handled(Command::Readback)));
    assert_eq!(bl.transport_mut().take_output(), b"R");
    assert_eq!(bl.poll(), Ok(Event::Ignored(b'x')));
}

#[test]
fn firmware_readback_without_firmware_reads_slot_a() {
    let mut bl = bootloader();
    bl.transport_mut().push(&readback_request(b'F', 64));
    assert_eq!(bl.poll(), Ok(Event::Handled(Command::Readback)));

    let mut expected = b"RF".to_vec();
    expected.resize(66, 0xff);
    assert_eq!(bl.transport_mut().take_output(), expected);
    assert!(bl
        .flash()
        .operations
        .iter()
        .any(|op| *op == Operation::Read { offset: layout().slot_a.body.base, len: PAGE as usize }));
}

#[test]
fn firmware_readback_returns_active_ciphertext() {
    let mut bl = bootloader();
    install(&mut bl, 5, b"", &image(32, 1));
    let (body, _) = protect(&image(48, 2));
    install(&mut bl, 6, b"", &image(48, 2));
    assert_eq!(bl.installed_firmware().unwrap().map(|(id, _)| id), Some(SlotId::B));

    bl.transport_mut().push(&readback_request(b'F', 48));
    bl.poll().unwrap();
    let mut expected = b"RF".to_vec();
    expected.extend_from_slice(&body);
    assert_eq!(bl.transport_mut().take_output(), expected);
}

#[test]
fn readback_past_region_end_is_erased_fill() {
    let mut bl = bootloader();
    install(&mut bl, 5, b"", &image(FIRMWARE_CAPACITY as usize, 1));
    // Slot B follows slot A, its content must not leak.
    install(&mut bl, 5, b"", &image(FIRMWARE_CAPACITY as usize, 2));
    install(&mut bl, 5, b"", &image(FIRMWARE_CAPACITY as usize, 3));
    let (body, _) = protect(&image(FIRMWARE_CAPACITY as usize, 3));

    bl.transport_mut().push(&readback_request(b'F', FIRMWARE_CAPACITY + PAGE + 3));
    bl.poll().unwrap();
    let output = bl.transport_mut().take_output();
    assert_eq!(output.len(), 2 + (FIRMWARE_CAPACITY + PAGE + 3) as usize);
    assert_eq!(&output[2..][..body.len()], &body[..]);
    assert!(output[2 + body.len()..].iter().all(|b| *b == 0xff));
}

#[test]
fn readback_storage_failure_replaces_region_ack() {
    let mut bl = bootloader_with(Flash::new_with_fault(FLASH_PAGES, layout().slot_a.hash.base));
    bl.transport_mut().push(&readback_request(b'F', 16));
    assert_eq!(bl.poll(), Err(Error::Storage));
    assert_eq!(bl.transport_mut().take_output(), vec![b'R', STORAGE_ERROR]);
}

#[test]
fn boot_without_firmware_is_refused() {
    let mut bl = bootloader();
    bl.transport_mut().push(b"B");
    assert_eq!(bl.poll(), Err(Error::NoFirmware));
    assert_eq!(bl.transport_mut().take_output(), vec![b'B', BAD]);
}

#[test]
fn boot_refuses_tampered_firmware() {
    let mut bl = bootloader();
    install(&mut bl, 5, b"rel", &image(64, 1));

    let body = layout().slot_a.body.base as usize;
    bl.flash_mut().buf[body + 40] ^= 0x80;

    bl.transport_mut().push(b"B");
    assert_eq!(bl.poll(), Err(Error::DigestMismatch));
    assert_eq!(bl.transport_mut().take_output(), vec![b'B', BAD]);
    assert!(bl.boot_region().memory.iter().all(|b| *b == 0));
}

#[test]
fn boot_refuses_tampered_digest() {
    let mut bl = bootloader();
    install(&mut bl, 5, b"rel", &image(64, 1));

    let hash = layout().slot_a.hash.base as usize;
    bl.flash_mut().buf[hash] ^= 0x01;

    bl.transport_mut().push(b"B");
    assert_eq!(bl.poll(), Err(Error::DigestMismatch));
    assert_eq!(bl.transport_mut().take_output(), vec![b'B', BAD]);
}

#[test]
fn boot_refuses_committed_empty_slot() {
    let mut bl = bootloader();
    install(&mut bl, 5, b"rel", &image(32, 1));

    // Rewrite the committed record as an empty image with a matching digest.
    let slot = layout().slot_a;
    let hash = slot.hash.base as usize;
    let size = slot.metadata.base as usize;
    bl.flash_mut().buf[hash..hash + 32].copy_from_slice(&sha256(&[]));
    bl.flash_mut().buf[size..size + 4].copy_from_slice(&0u32.to_le_bytes());
    bl.boot_region().memory[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

    bl.transport_mut().push(b"B");
    assert_eq!(bl.poll(), Err(Error::NoFirmware));
    assert_eq!(bl.transport_mut().take_output(), vec![b'B', BAD]);
}

#[test]
fn commands_after_failure_are_served() {
    let mut bl = bootloader();
    bl.transport_mut().push(b"B");
    bl.transport_mut().push(&readback_request(b'C', 4));
    assert_eq!(bl.poll(), Err(Error::NoFirmware));
    assert_eq!(bl.poll(), Ok(Event::Handled(Command::Readback)));
    assert_eq!(bl.transport_mut().take_output(), vec![b'B', BAD, b'R', b'C', 0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn layout_must_fit_flash() {
    let result = Bootloader::new(
        Link::default(),
        Flash::new(20),
        Ram::new(FIRMWARE_CAPACITY as usize),
        layout(),
        config(),
    );
    assert!(matches!(result, Err(Error::Layout)));
}

#[test]
fn boot_region_must_hold_firmware() {
    let result = Bootloader::new(
        Link::default(),
        Flash::new(FLASH_PAGES),
        Ram::new(FIRMWARE_CAPACITY as usize - 1),
        layout(),
        config(),
    );
    assert!(matches!(result, Err(Error::Layout)));
}
