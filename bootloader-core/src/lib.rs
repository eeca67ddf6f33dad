// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol engine of the serial bootloader.
//!
//! The engine owns the three things a bootloader touches: the host link (any
//! blocking [`embedded_io`] byte stream), the flash holding firmware and
//! configuration (any [`embedded_storage`] NOR flash) and the RAM the firmware
//! executes from ([`BootRegion`]). Commands are served one at a time by
//! [`Bootloader::poll`], [`Bootloader::run`] serves them forever.
//!
//! Firmware is stored encrypted in one of two slots. An update always lands in
//! the slot that is not active and only becomes active once its decrypted body
//! matches the digest sent along with it, so an interrupted or forged update
//! never replaces a verified image.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod boot;
mod configure;
mod dispatch;
mod error;
mod layout;
mod loader;
mod metadata;
mod readback;
mod storage;
mod update;
mod verify;
mod wire;

pub use boot::BootRegion;
pub use dispatch::{Bootloader, Event};
pub use error::Error;
pub use layout::{FirmwareSlot, Layout, Region, SlotId, MAX_PAGE_SIZE};
pub use metadata::{FirmwareRecord, BLANK};
pub use verify::{decrypt_in_place, digest_matches, sha256, AesKey, Digest, ExecutableImage};

/// Runtime parameters of the engine.
///
/// The key is passed in by the board crate rather than living in a global, so
/// the provisioning story stays in one place.
#[derive(Clone)]
pub struct Config {
    /// AES-128 key of the firmware images. Decryption uses CBC with a zero IV.
    pub key: AesKey,
    /// Version assumed when nothing has been committed yet.
    pub oldest_version: u32,
}
