// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Page by page transfer of a body from the host into flash.

use crate::boot::BootRegion;
use crate::layout::Region;
use crate::storage::{self, ERASED};
use crate::wire;
use crate::{Bootloader, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::Status;

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    /// Receives `size` bytes in frames of one page and programs them to
    /// `destination`, acknowledging every frame once it is in flash.
    ///
    /// The last frame may be short, the rest of its page is erased fill. A
    /// failing erase or program aborts the transfer; the caller reports it.
    pub(crate) fn load_data(&mut self, destination: Region, size: u32) -> Result<(), Error> {
        if size > destination.capacity {
            return Err(Error::TooLarge);
        }
        let page_size = self.layout.page_size;
        let page = &mut self.page[..page_size as usize];
        let mut address = destination.base;
        let mut remaining = size;

        while remaining > 0 {
            let frame_size = remaining.min(page_size) as usize;
            wire::read_exact(&mut self.transport, &mut page[..frame_size])?;
            page[frame_size..].fill(ERASED);

            storage::erase_page(&mut self.flash, address, page_size)?;
            storage::program(&mut self.flash, address, page)?;
            wire::send_status(&mut self.transport, Status::Ok)?;

            trace!("frame at {=u32:#x} ({=usize} bytes)", address, frame_size);
            address += page_size;
            remaining -= frame_size as u32;
        }
        Ok(())
    }
}
