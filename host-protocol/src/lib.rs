// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host to bootloader communication protocol.
//! The host drives every exchange with a single command byte, the bootloader
//! answers with single status bytes. Multi-byte integers are big-endian.

#![no_std]


/// Longest release message accepted by an update, without its terminator.
pub const MAX_RELEASE_MESSAGE_LEN: usize = 1024;

/// The firmware digest travels as a hex string of this many characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// Size of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Terminator of the release message and of the digest string.
pub const TERMINATOR: u8 = 0x00;

/// Firmware sizes must be a multiple of the AES block.
pub const CIPHER_BLOCK_SIZE: usize = 16;

/// Sent by the bootloader right before it streams the release message on boot.
pub const BOOT_MESSAGE_ACK: u8 = b'M';

/// Top-level commands, one byte each. The bootloader echoes the byte back as
/// acknowledgment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Store a configuration blob
    Configure = b'C',
    /// Store and verify a firmware image
    Update = b'U',
    /// Dump a stored region back to the host
    Readback = b'R',
    /// Verify and execute the stored firmware
    Boot = b'B',
}

impl Command {
    /// Byte acknowledging the command.
    pub const fn ack(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'C' => Ok(Self::Configure),
            b'U' => Ok(Self::Update),
            b'R' => Ok(Self::Readback),
            b'B' => Ok(Self::Boot),
            other => Err(other),
        }
    }
}

/// Status byte sent after headers, frames and commits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// Frame committed, header accepted or image verified
    Ok = 0x00,
    /// Header rejected or image failed verification
    Bad = 0x01,
    /// Flash erase or program failed, the transfer was aborted
    StorageError = 0x02,
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Self::Ok),
            0x01 => Ok(Self::Bad),
            0x02 => Ok(Self::StorageError),
            other => Err(other),
        }
    }
}

/// Region selector of a readback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Region {
    /// Body of the active firmware slot
    Firmware = b'F',
    /// Configuration body
    Configuration = b'C',
}

impl TryFrom<u8> for Region {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'F' => Ok(Self::Firmware),
            b'C' => Ok(Self::Configuration),
            other => Err(other),
        }
    }
}

/// Fixed part of an update request, sent right after the `'U'` ack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateHeader {
    /// 0 keeps the installed version
    pub version: u16,
    /// Size of the encrypted firmware body
    pub size: u32,
}

impl UpdateHeader {
    pub const SIZE: usize = 6;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..].copy_from_slice(&self.size.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: [u8; Self::SIZE]) -> Self {
        Self {
            version: u16::from_be_bytes([buf[0], buf[1]]),
            size: u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]),
        }
    }
}

/// Number of frames (and `Status::Ok` acks) a transfer of `size` bytes takes.
pub const fn frame_count(size: u32, page_size: u32) -> u32 {
    size.div_ceil(page_size)
}
