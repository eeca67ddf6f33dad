// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Firmware decryption and digest check.
//!
//! The stored body is copied into the boot region, decrypted there once and
//! hashed. The same plaintext is what gets executed, so the bytes that were
//! verified are the bytes that run.

use crate::boot::BootRegion;
use crate::layout::FirmwareSlot;
use crate::metadata::FirmwareRecord;
use crate::storage;
use crate::Error;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use core::hint::black_box;
use embedded_storage::nor_flash::NorFlash;
use host_protocol::{CIPHER_BLOCK_SIZE, DIGEST_LEN};
use sha2::{Digest as _, Sha256};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub type AesKey = [u8; 16];
pub type Digest = [u8; DIGEST_LEN];

// FIXME: a fixed key with a zero IV leaks equal plaintext blocks across
// images. Needs per-image IVs once the host tooling can send them.
const ZERO_IV: [u8; CIPHER_BLOCK_SIZE] = [0; CIPHER_BLOCK_SIZE];

/// A decrypted firmware image sitting in the boot region whose digest matched.
///
/// Only [`decrypt_firmware`] creates one, and [`BootRegion::jump`] takes one by
/// value, so there is no way to jump into an image that was not verified.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecutableImage {
    entry: u32,
    len: usize,
}

impl ExecutableImage {
    /// Entry point, the boot region base with the Thumb bit set.
    pub fn entry(&self) -> u32 {
        self.entry
    }

    /// Number of plaintext bytes at the start of the boot region.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Decrypts `buf` in place with AES-128-CBC and an all-zero IV.
pub fn decrypt_in_place(key: &AesKey, buf: &mut [u8]) -> Result<(), Error> {
    if buf.len() % CIPHER_BLOCK_SIZE != 0 {
        return Err(Error::MalformedHeader);
    }
    let mut cipher = Aes128CbcDec::new(&(*key).into(), &ZERO_IV.into());
    for block in buf.chunks_exact_mut(CIPHER_BLOCK_SIZE) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

pub fn sha256(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// Compares a computed digest against a stored one.
///
/// Every byte is compared. A stored digest that is all zeroes or still erased
/// never matches.
pub fn digest_matches(computed: &Digest, stored: &Digest) -> bool {
    if stored.iter().all(|b| *b == 0x00) || stored.iter().all(|b| *b == 0xFF) {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in computed.iter().zip(stored.iter()) {
        diff |= black_box(a ^ b);
    }
    black_box(diff) == 0
}

/// Stages the body of `slot` in the boot region, decrypts it and checks it
/// against the digest of `record`. On mismatch the staged plaintext is wiped.
pub(crate) fn decrypt_firmware<F: NorFlash, B: BootRegion>(
    flash: &mut F,
    slot: &FirmwareSlot,
    record: &FirmwareRecord,
    key: &AesKey,
    region: &mut B,
) -> Result<ExecutableImage, Error> {
    let size = record.size as usize;
    // An empty image would launch whatever the boot region already holds.
    if size == 0 {
        return Err(Error::NoFirmware);
    }
    if record.size > slot.body.capacity {
        return Err(Error::TooLarge);
    }
    let base = region.base();
    let memory = region.memory();
    let image = memory.get_mut(..size).ok_or(Error::TooLarge)?;

    storage::read(flash, slot.body.base, image)?;
    decrypt_in_place(key, image)?;

    if !digest_matches(&sha256(image), &record.digest) {
        image.fill(0);
        warn!("digest mismatch, {=usize} bytes wiped", size);
        return Err(Error::DigestMismatch);
    }
    debug!("verified {=usize} bytes", size);
    Ok(ExecutableImage {
        entry: base | 1,
        len: size,
    })
}
