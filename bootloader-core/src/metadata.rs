// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Firmware and configuration metadata records.
//!
//! A record only counts once its commit word has been programmed. The commit
//! word is written last, after the body it describes is complete (and, for
//! firmware, verified), so it is the single point where new content takes
//! over. Programming one word out of the erased state either happens or it
//! does not.

use crate::layout::{
    FirmwareSlot, Layout, SlotId, CONFIGURATION_COMMIT_OFFSET, MESSAGE_OFFSET, SIZE_OFFSET,
    VERSION_OFFSET,
};
use crate::storage::{self, align_up, ERASED};
use crate::verify::Digest;
use crate::Error;
use embedded_storage::nor_flash::NorFlash;
use host_protocol::DIGEST_LEN;

/// Erased word. As a version it means "no version yet", as a commit word it
/// means "not committed".
pub const BLANK: u32 = 0xFFFF_FFFF;

/// Commit word of a complete configuration.
pub(crate) const CONFIGURATION_COMMITTED: u32 = 0x5A5A_5A5A;

/// Granule the last chunk of a release message is padded to.
const WORD: usize = 4;

/// Firmware metadata as stored in a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareRecord {
    pub size: u32,
    pub version: u32,
    pub digest: Digest,
    /// Commit sequence, `None` while the slot is not committed
    pub sequence: Option<u32>,
}

impl FirmwareRecord {
    /// Version used for the rollback check. A blank version field reads as the
    /// oldest allowed version.
    pub fn effective_version(&self, oldest_version: u32) -> u32 {
        if self.version == BLANK {
            oldest_version
        } else {
            self.version
        }
    }
}

pub(crate) fn read_firmware<F: NorFlash>(flash: &mut F, slot: &FirmwareSlot) -> Result<FirmwareRecord, Error> {
    let mut digest = [0; DIGEST_LEN];
    storage::read(flash, slot.hash.base, &mut digest)?;
    let sequence = match storage::read_u32(flash, slot.commit_address())? {
        BLANK => None,
        sequence => Some(sequence),
    };
    Ok(FirmwareRecord {
        size: storage::read_u32(flash, slot.metadata.base + SIZE_OFFSET)?,
        version: storage::read_u32(flash, slot.metadata.base + VERSION_OFFSET)?,
        digest,
        sequence,
    })
}

/// The committed slot with the highest sequence. Ties go to slot A.
pub(crate) fn active_firmware<F: NorFlash>(
    flash: &mut F,
    layout: &Layout,
) -> Result<Option<(SlotId, FirmwareRecord)>, Error> {
    let a = read_firmware(flash, layout.slot(SlotId::A))?;
    let b = read_firmware(flash, layout.slot(SlotId::B))?;
    Ok(match (a.sequence, b.sequence) {
        (Some(seq_a), Some(seq_b)) if seq_b > seq_a => Some((SlotId::B, b)),
        (Some(_), _) => Some((SlotId::A, a)),
        (None, Some(_)) => Some((SlotId::B, b)),
        (None, None) => None,
    })
}

/// Sequence the next commit gets.
pub(crate) fn next_sequence(active: Option<&FirmwareRecord>) -> Result<u32, Error> {
    match active.and_then(|record| record.sequence) {
        None => Ok(1),
        Some(sequence) => sequence
            .checked_add(1)
            .filter(|next| *next != BLANK)
            .ok_or(Error::SequenceExhausted),
    }
}

/// Everything written to a slot before its body arrives.
pub(crate) struct FirmwareHeader<'a> {
    pub size: u32,
    pub version: u32,
    /// Release message including its terminator
    pub message: &'a [u8],
    pub digest: &'a Digest,
}

/// Rewrites the hash page and metadata pages of `slot`, leaving it
/// uncommitted. `page` is scratch space of one page.
pub(crate) fn write_firmware<F: NorFlash>(
    flash: &mut F,
    page: &mut [u8],
    page_size: u32,
    slot: &FirmwareSlot,
    header: &FirmwareHeader<'_>,
) -> Result<(), Error> {
    // The hash page carries the commit word, erasing it first uncommits the
    // slot before any of its content changes.
    storage::erase_page(flash, slot.hash.base, page_size)?;
    storage::program(flash, slot.hash.base, header.digest)?;

    let first_page = slot.metadata.base;
    storage::erase_page(flash, first_page, page_size)?;

    let message_offset = MESSAGE_OFFSET as usize;
    let first_len = header.message.len().min(page_size as usize - message_offset);
    let (first, rest) = header.message.split_at(first_len);

    page.fill(ERASED);
    page[SIZE_OFFSET as usize..][..4].copy_from_slice(&header.size.to_le_bytes());
    page[VERSION_OFFSET as usize..][..4].copy_from_slice(&header.version.to_le_bytes());
    page[message_offset..][..first.len()].copy_from_slice(first);
    storage::program(flash, first_page, &page[..align_up(message_offset + first.len(), WORD)])?;

    if !rest.is_empty() {
        let second_page = first_page + page_size;
        storage::erase_page(flash, second_page, page_size)?;
        page.fill(ERASED);
        page[..rest.len()].copy_from_slice(rest);
        storage::program(flash, second_page, &page[..align_up(rest.len(), WORD)])?;
    }
    Ok(())
}

pub(crate) fn commit_firmware<F: NorFlash>(flash: &mut F, slot: &FirmwareSlot, sequence: u32) -> Result<(), Error> {
    storage::program_u32(flash, slot.commit_address(), sequence)
}

/// Size of the committed configuration, if any.
pub(crate) fn read_configuration<F: NorFlash>(flash: &mut F, layout: &Layout) -> Result<Option<u32>, Error> {
    let base = layout.configuration_metadata.base;
    if storage::read_u32(flash, base + CONFIGURATION_COMMIT_OFFSET)? != CONFIGURATION_COMMITTED {
        return Ok(None);
    }
    storage::read_u32(flash, base + SIZE_OFFSET).map(Some)
}

/// Rewrites the configuration metadata page with `size`, uncommitted.
pub(crate) fn write_configuration<F: NorFlash>(flash: &mut F, layout: &Layout, size: u32) -> Result<(), Error> {
    let base = layout.configuration_metadata.base;
    storage::erase_page(flash, base, layout.page_size)?;
    storage::program_u32(flash, base + SIZE_OFFSET, size)
}

pub(crate) fn commit_configuration<F: NorFlash>(flash: &mut F, layout: &Layout) -> Result<(), Error> {
    let base = layout.configuration_metadata.base;
    storage::program_u32(flash, base + CONFIGURATION_COMMIT_OFFSET, CONFIGURATION_COMMITTED)
}
