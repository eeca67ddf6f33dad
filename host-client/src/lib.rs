// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host side of the serial bootloader protocol.

mod device;
mod image;


pub use device::Device;
pub use image::{protect, ProtectedImage};

use host_protocol::Status;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("serial port I/O")]
    Io(#[from] std::io::Error),

    #[error("expected {expected:#04x} from the device, got {got:#04x}")]
    UnexpectedAck { expected: u8, got: u8 },

    #[error("device answered {0:?}")]
    Rejected(Status),

    #[error("device sent unknown status {0:#04x}")]
    UnknownStatus(u8),

    #[error("release message of {0} bytes is longer than {max} bytes", max = host_protocol::MAX_RELEASE_MESSAGE_LEN)]
    MessageTooLong(usize),

    #[error("release message contains a NUL byte")]
    MessageHasNul,

    #[error("payload of {0} bytes does not fit the size field")]
    PayloadTooLarge(usize),
}
