// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Page erase and program on top of the flash driver. Driver errors are
//! logged here and turned into [`Error::Storage`].

use crate::Error;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

/// Value of an erased flash byte.
pub(crate) const ERASED: u8 = 0xFF;

pub(crate) fn erase_page<F: NorFlash>(flash: &mut F, address: u32, page_size: u32) -> Result<(), Error> {
    flash.erase(address, address + page_size).map_err(|_| {
        warn!("erase failed at {=u32:#x}", address);
        Error::Storage
    })
}

pub(crate) fn program<F: NorFlash>(flash: &mut F, address: u32, bytes: &[u8]) -> Result<(), Error> {
    flash.write(address, bytes).map_err(|_| {
        warn!("program failed at {=u32:#x}", address);
        Error::Storage
    })
}

pub(crate) fn read<F: ReadNorFlash>(flash: &mut F, address: u32, bytes: &mut [u8]) -> Result<(), Error> {
    flash.read(address, bytes).map_err(|_| {
        warn!("read failed at {=u32:#x}", address);
        Error::Storage
    })
}

/// Reads a little-endian word, the byte order fields are stored in.
pub(crate) fn read_u32<F: ReadNorFlash>(flash: &mut F, address: u32) -> Result<u32, Error> {
    let mut word = [0; 4];
    read(flash, address, &mut word)?;
    Ok(u32::from_le_bytes(word))
}

pub(crate) fn program_u32<F: NorFlash>(flash: &mut F, address: u32, value: u32) -> Result<(), Error> {
    program(flash, address, &value.to_le_bytes())
}

pub(crate) const fn align_up(len: usize, align: usize) -> usize {
    len.div_ceil(align) * align
}
