// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use bootloader_core::{sha256, AesKey, BootRegion, Bootloader, Config, Digest, ExecutableImage, Layout};
use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use host_protocol::{Status, UpdateHeader};
use std::collections::VecDeque;
use std::convert::Infallible;

/// Page size of the test flash. Small enough that a long release message
/// spills into the second metadata page.
pub const PAGE: u32 = 1024;
pub const FIRMWARE_CAPACITY: u32 = 4 * PAGE;
pub const CONFIGURATION_CAPACITY: u32 = 8 * PAGE;
pub const FLASH_PAGES: usize = 24;
pub const WORD_SIZE: usize = 4;

pub const KEY: AesKey = consts::DEVELOPMENT_AES_KEY;
pub const OLDEST_VERSION: u32 = 3;

pub const OK: u8 = Status::Ok as u8;
pub const BAD: u8 = Status::Bad as u8;
pub const STORAGE_ERROR: u8 = Status::StorageError as u8;

pub fn layout() -> Layout {
    Layout::new(0, PAGE, FIRMWARE_CAPACITY, CONFIGURATION_CAPACITY)
}

pub fn config() -> Config {
    Config {
        key: KEY,
        oldest_version: OLDEST_VERSION,
    }
}

pub type TestBootloader = Bootloader<Link, Flash, Ram>;

pub fn bootloader() -> TestBootloader {
    bootloader_with(Flash::new(FLASH_PAGES))
}

pub fn bootloader_with(flash: Flash) -> TestBootloader {
    Bootloader::new(Link::default(), flash, Ram::new(FIRMWARE_CAPACITY as usize), layout(), config()).unwrap()
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

/// NOR flash in RAM. Programming a byte that is not erased is a test failure,
/// and every access touching `faulty_page` fails.
pub struct Flash {
    pub buf: Vec<u8>,
    pub operations: Vec<Operation>,
    pub faulty_page: Option<u32>,
}

impl Flash {
    pub fn new(pages: usize) -> Self {
        Self {
            buf: vec![0xffu8; PAGE as usize * pages],
            operations: Vec::new(),
            faulty_page: None,
        }
    }

    pub fn new_with_fault(pages: usize, faulty_page: u32) -> Self {
        Self {
            faulty_page: Some(faulty_page),
            ..Self::new(pages)
        }
    }

    pub fn bytes(&self, offset: u32, len: usize) -> &[u8] {
        &self.buf[offset as usize..offset as usize + len]
    }

    /// Erases and writes issued since operation `since`.
    pub fn mutations_since(&self, since: usize) -> Vec<Operation> {
        self.operations[since..]
            .iter()
            .filter(|op| !matches!(op, Operation::Read { .. }))
            .cloned()
            .collect()
    }

    pub fn erased(&self, offset: u32) -> bool {
        self.operations
            .iter()
            .any(|op| matches!(op, Operation::Erase { offset: o, .. } if *o == offset))
    }

    fn check_fault(&self, offset: u32, len: usize) -> Result<(), FlashError> {
        match self.faulty_page {
            Some(page) if offset < page + PAGE && page < offset + len as u32 => {
                println!("    flash: FAULT");
                Err(FlashError)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::READ_SIZE));

        println!("    flash: read:  0x{offset:04X}[0x{:04X}]", bytes.len());
        self.check_fault(offset, bytes.len())?;
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = PAGE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!("    flash: erase: {from:04X} - {to:04X}");
        self.check_fault(from, (to - from) as usize)?;
        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE));
        assert!(!bytes.is_empty());

        println!("    flash: write: 0x{offset:04X}[0x{:04X}]", bytes.len());
        self.check_fault(offset, bytes.len())?;
        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let target = &mut self.buf[offset as usize..offset as usize + bytes.len()];
        assert!(
            target.iter().all(|b| *b == 0xff),
            "programming unerased flash at 0x{offset:04X}"
        );
        target.copy_from_slice(bytes);
        Ok(())
    }
}

/// Scripted host link. Reads past the script report end of stream.
#[derive(Default)]
pub struct Link {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl Link {
    pub fn push(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl embedded_io::ErrorType for Link {
    type Error = Infallible;
}

impl embedded_io::Read for Link {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.input.len());
        for (dst, src) in buf.iter_mut().zip(self.input.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl embedded_io::Write for Link {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Boot RAM that refuses to jump.
pub struct Ram {
    pub memory: Vec<u8>,
}

impl Ram {
    pub fn new(len: usize) -> Self {
        Self { memory: vec![0; len] }
    }
}

impl BootRegion for Ram {
    fn base(&self) -> u32 {
        consts::BOOT_RAM_BASE
    }

    fn memory(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn jump(&mut self, image: ExecutableImage) -> ! {
        panic!("jump to 0x{:08x}", image.entry())
    }
}

/// Encrypts a plaintext image the way the host tool does and returns the
/// ciphertext with the digest of the plaintext.
pub fn protect(plain: &[u8]) -> (Vec<u8>, Digest) {
    assert!(plain.len().is_multiple_of(16));
    let mut cipher = cbc::Encryptor::<aes::Aes128>::new(&KEY.into(), &[0u8; 16].into());
    let mut body = plain.to_vec();
    for block in body.chunks_exact_mut(16) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    (body, sha256(plain))
}

pub fn hex(digest: &Digest) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Image of `len` bytes that differs per `seed`.
pub fn image(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Everything an update sends before the body.
pub fn update_header(version: u16, size: u32, message: &[u8], digest_hex: &str) -> Vec<u8> {
    let mut request = vec![b'U'];
    request.extend_from_slice(&UpdateHeader { version, size }.to_bytes());
    request.extend_from_slice(message);
    request.push(0);
    request.extend_from_slice(digest_hex.as_bytes());
    request.push(0);
    request
}

pub fn update_request(version: u16, message: &[u8], digest: &Digest, body: &[u8]) -> Vec<u8> {
    let mut request = update_header(version, body.len() as u32, message, &hex(digest));
    request.extend_from_slice(body);
    request
}

pub fn configure_request(body: &[u8]) -> Vec<u8> {
    let mut request = vec![b'C'];
    request.extend_from_slice(&(body.len() as u32).to_be_bytes());
    request.extend_from_slice(body);
    request
}

pub fn readback_request(region: u8, size: u32) -> Vec<u8> {
    let mut request = vec![b'R', region];
    request.extend_from_slice(&size.to_be_bytes());
    request
}

/// Answer to an update whose header is accepted.
pub fn update_response(frames: usize, verdict: u8) -> Vec<u8> {
    let mut response = vec![b'U', OK];
    response.extend(std::iter::repeat_n(OK, frames));
    response.push(verdict);
    response
}

/// Answer to a configuration upload that goes through.
pub fn configure_response(frames: usize) -> Vec<u8> {
    let mut response = vec![b'C', OK];
    response.extend(std::iter::repeat_n(OK, frames));
    response.push(OK);
    response
}

/// Runs a complete, valid update and clears the link afterwards.
pub fn install(bootloader: &mut TestBootloader, version: u16, message: &[u8], plain: &[u8]) {
    let (body, digest) = protect(plain);
    bootloader
        .transport_mut()
        .push(&update_request(version, message, &digest, &body));
    bootloader.poll().unwrap();
    let frames = plain.len().div_ceil(PAGE as usize);
    assert_eq!(bootloader.transport_mut().take_output(), update_response(frames, OK));
}
