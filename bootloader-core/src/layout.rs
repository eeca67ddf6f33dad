// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Partition map of the storage managed by the bootloader.
//!
//! ```text
//! base ─┬─ slot A: hash page | metadata page 0 | metadata page 1 | body
//!       ├─ slot B: hash page | metadata page 0 | metadata page 1 | body
//!       └─ configuration: metadata page | body
//! ```
//!
//! The hash page holds the 32-byte digest followed by the commit word. The
//! first metadata page holds size, version and the start of the release
//! message, the second one the rest of the message.

use crate::Error;
use embedded_storage::nor_flash::NorFlash;
use host_protocol::{DIGEST_LEN, MAX_RELEASE_MESSAGE_LEN};

/// Largest page size the engine has a buffer for.
pub const MAX_PAGE_SIZE: usize = 4096;

/// Offset of the size field in the first metadata page (and in the
/// configuration metadata page).
pub(crate) const SIZE_OFFSET: u32 = 0;

/// Offset of the version field in the first metadata page.
pub(crate) const VERSION_OFFSET: u32 = 4;

/// Offset of the release message in the first metadata page.
pub(crate) const MESSAGE_OFFSET: u32 = 8;

/// Offset of the commit word in the configuration metadata page.
pub(crate) const CONFIGURATION_COMMIT_OFFSET: u32 = 4;

/// A page aligned address range reserved for one purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub base: u32,
    pub capacity: u32,
}

impl Region {
    pub const fn new(base: u32, capacity: u32) -> Self {
        Self { base, capacity }
    }

    /// First address past the region.
    pub const fn end(&self) -> u32 {
        self.base + self.capacity
    }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.base && address < self.end()
    }

    fn overlaps(&self, other: &Region) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    fn is_page_aligned(&self, page_size: u32) -> bool {
        self.base % page_size == 0 && self.capacity % page_size == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// One firmware partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareSlot {
    /// Digest and commit word
    pub hash: Region,
    /// Size, version and release message, two pages
    pub metadata: Region,
    /// Encrypted firmware
    pub body: Region,
}

impl FirmwareSlot {
    const fn new(base: u32, page_size: u32, capacity: u32) -> Self {
        let hash = Region::new(base, page_size);
        let metadata = Region::new(hash.end(), 2 * page_size);
        let body = Region::new(metadata.end(), capacity);
        Self {
            hash,
            metadata,
            body,
        }
    }

    /// Address of the commit word, right after the digest.
    pub const fn commit_address(&self) -> u32 {
        self.hash.base + DIGEST_LEN as u32
    }

    /// First address past the slot.
    pub const fn end(&self) -> u32 {
        self.body.end()
    }
}

/// Static partition of the storage. Built once at compile time by the board
/// crate, never changed at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub page_size: u32,
    pub slot_a: FirmwareSlot,
    pub slot_b: FirmwareSlot,
    pub configuration_metadata: Region,
    pub configuration_body: Region,
}

impl Layout {
    /// Lays out both firmware slots and the configuration region back to back
    /// starting at `base`.
    pub const fn new(
        base: u32,
        page_size: u32,
        firmware_capacity: u32,
        configuration_capacity: u32,
    ) -> Self {
        let slot_a = FirmwareSlot::new(base, page_size, firmware_capacity);
        let slot_b = FirmwareSlot::new(slot_a.end(), page_size, firmware_capacity);
        let configuration_metadata = Region::new(slot_b.end(), page_size);
        let configuration_body =
            Region::new(configuration_metadata.end(), configuration_capacity);
        Self {
            page_size,
            slot_a,
            slot_b,
            configuration_metadata,
            configuration_body,
        }
    }

    pub const fn slot(&self, id: SlotId) -> &FirmwareSlot {
        match id {
            SlotId::A => &self.slot_a,
            SlotId::B => &self.slot_b,
        }
    }

    pub const fn firmware_capacity(&self) -> u32 {
        self.slot_a.body.capacity
    }

    pub const fn base(&self) -> u32 {
        self.slot_a.hash.base
    }

    /// First address past the configuration body.
    pub const fn end(&self) -> u32 {
        self.configuration_body.end()
    }

    /// Checks the layout against the flash device it is going to be used with.
    pub fn validate<F: NorFlash>(&self, flash: &F) -> Result<(), Error> {
        self.check(F::ERASE_SIZE, F::WRITE_SIZE, F::READ_SIZE, flash.capacity())
    }

    fn regions(&self) -> [Region; 8] {
        [
            self.slot_a.hash,
            self.slot_a.metadata,
            self.slot_a.body,
            self.slot_b.hash,
            self.slot_b.metadata,
            self.slot_b.body,
            self.configuration_metadata,
            self.configuration_body,
        ]
    }

    fn check(
        &self,
        erase_size: usize,
        write_size: usize,
        read_size: usize,
        flash_capacity: usize,
    ) -> Result<(), Error> {
        let page_size = self.page_size as usize;
        if page_size != erase_size || page_size > MAX_PAGE_SIZE {
            return Err(Error::Layout);
        }
        // The release message and its terminator must fit both metadata pages.
        if 2 * page_size - MESSAGE_OFFSET as usize <= MAX_RELEASE_MESSAGE_LEN {
            return Err(Error::Layout);
        }
        // Word sized fields and commit words are programmed on their own.
        if 4 % write_size != 0 || 4 % read_size != 0 {
            return Err(Error::Layout);
        }
        if self.end() as usize > flash_capacity {
            return Err(Error::Layout);
        }

        let regions = self.regions();
        for (i, region) in regions.iter().enumerate() {
            if !region.is_page_aligned(self.page_size) {
                return Err(Error::Layout);
            }
            if regions[i + 1..].iter().any(|other| region.overlaps(other)) {
                return Err(Error::Layout);
            }
        }
        Ok(())
    }
}
