// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagnostic dump of a stored body.

use crate::boot::BootRegion;
use crate::layout::{Region, SlotId};
use crate::metadata;
use crate::storage::{self, ERASED};
use crate::wire;
use crate::{Bootloader, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::{self as protocol, Command};

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    /// Streams the requested number of bytes from the start of a region.
    ///
    /// An unknown selector ends the command without a further byte. Bytes
    /// past the end of the region read as erased fill.
    pub(crate) fn readback(&mut self) -> Result<(), Error> {
        wire::send(&mut self.transport, &[Command::Readback.ack()])?;
        let selector = wire::read_u8(&mut self.transport)?;
        let Ok(selected) = protocol::Region::try_from(selector) else {
            debug!("unknown readback region {=u8:#x}", selector);
            return Ok(());
        };

        let region = self.readback_region(selected).map_err(|e| self.fail(e))?;
        wire::send(&mut self.transport, &[selected as u8])?;
        let size = wire::read_u32(&mut self.transport)?;
        debug!("reading back {=u32} bytes from {=u32:#x}", size, region.base);

        // Past this point the host expects raw bytes, a failure can only end
        // the stream early.
        self.stream(region, size)
    }

    fn readback_region(&mut self, selected: protocol::Region) -> Result<Region, Error> {
        Ok(match selected {
            protocol::Region::Firmware => {
                let id = metadata::active_firmware(&mut self.flash, &self.layout)?
                    .map_or(SlotId::A, |(id, _)| id);
                self.layout.slot(id).body
            }
            protocol::Region::Configuration => self.layout.configuration_body,
        })
    }

    fn stream(&mut self, region: Region, size: u32) -> Result<(), Error> {
        let page_size = self.layout.page_size;
        let page = &mut self.page[..page_size as usize];
        let mut offset = 0;

        while offset < size {
            let chunk = (size - offset).min(page_size) as usize;
            if offset < region.capacity {
                storage::read(&mut self.flash, region.base + offset, page)?;
            } else {
                page.fill(ERASED);
            }
            wire::send(&mut self.transport, &page[..chunk])?;
            offset += chunk as u32;
        }
        Ok(())
    }
}
