// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_io::ReadExactError;
use host_protocol::Status;
use thiserror::Error;

/// Errors of the bootloader engine. None of them is fatal: the dispatcher logs
/// the error and waits for the next command.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The transport reported an error
    #[error("transport error")]
    Transport,

    /// The host stopped sending in the middle of a command
    #[error("transport closed mid-command")]
    Disconnected,

    /// A flash erase, program or read failed
    #[error("flash operation failed")]
    Storage,

    /// The storage layout does not fit the flash device or the boot region
    #[error("storage layout does not fit the device")]
    Layout,

    /// A size exceeds the capacity of its destination
    #[error("size exceeds region capacity")]
    TooLarge,

    /// The submitted firmware version is older than the installed one
    #[error("version {submitted} is older than installed version {current}")]
    Rollback { submitted: u32, current: u32 },

    /// Release message too long, digest string malformed or size not a whole
    /// number of cipher blocks
    #[error("malformed update header")]
    MalformedHeader,

    /// The decrypted firmware does not hash to the stored digest
    #[error("firmware digest mismatch")]
    DigestMismatch,

    /// No firmware slot has been committed
    #[error("no committed firmware")]
    NoFirmware,

    /// Both firmware slots carry the highest possible commit sequence
    #[error("commit sequence exhausted")]
    SequenceExhausted,
}

impl Error {
    /// Status byte telling the host about this error, if the link is still
    /// usable.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Transport | Self::Disconnected => None,
            Self::Storage | Self::SequenceExhausted => Some(Status::StorageError),
            Self::Layout
            | Self::TooLarge
            | Self::Rollback { .. }
            | Self::MalformedHeader
            | Self::DigestMismatch
            | Self::NoFirmware => Some(Status::Bad),
        }
    }
}

impl<E> From<ReadExactError<E>> for Error {
    fn from(err: ReadExactError<E>) -> Self {
        match err {
            ReadExactError::UnexpectedEof => Self::Disconnected,
            ReadExactError::Other(_) => Self::Transport,
        }
    }
}
