// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Boot command: verify the active firmware in RAM, show its release message
//! and hand it to the caller for the jump.

use crate::layout::{FirmwareSlot, MESSAGE_OFFSET};
use crate::metadata;
use crate::storage;
use crate::verify::{self, ExecutableImage};
use crate::wire;
use crate::{Bootloader, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::{Command, BOOT_MESSAGE_ACK, TERMINATOR};

/// RAM the firmware is staged in and executed from.
pub trait BootRegion {
    /// Address of the first byte of [`BootRegion::memory`].
    fn base(&self) -> u32;

    /// The staging memory. Must hold at least one firmware body.
    fn memory(&mut self) -> &mut [u8];

    /// Transfers control to the image. Never returns.
    fn jump(&mut self, image: ExecutableImage) -> !;
}

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    pub(crate) fn boot(&mut self) -> Result<ExecutableImage, Error> {
        wire::send(&mut self.transport, &[Command::Boot.ack()])?;
        let (image, slot) = self.stage_active().map_err(|e| self.fail(e))?;

        wire::send(&mut self.transport, &[BOOT_MESSAGE_ACK])?;
        self.send_release_message(slot.metadata.base)?;
        wire::send(&mut self.transport, &[TERMINATOR])?;
        Ok(image)
    }

    fn stage_active(&mut self) -> Result<(ExecutableImage, FirmwareSlot), Error> {
        let (id, record) =
            metadata::active_firmware(&mut self.flash, &self.layout)?.ok_or(Error::NoFirmware)?;
        let slot = *self.layout.slot(id);
        info!("booting slot {}, version {=u32}", id, record.version);
        let image = verify::decrypt_firmware(&mut self.flash, &slot, &record, &self.config.key, &mut self.region)?;
        Ok((image, slot))
    }

    /// Sends the stored release message without its terminator. The message
    /// starts after the size and version fields and may continue on the second
    /// metadata page.
    fn send_release_message(&mut self, metadata_base: u32) -> Result<(), Error> {
        let page_size = self.layout.page_size;
        let page = &mut self.page[..page_size as usize];

        for (address, start) in [(metadata_base, MESSAGE_OFFSET), (metadata_base + page_size, 0)] {
            storage::read(&mut self.flash, address, page)?;
            let text = &page[start as usize..];
            match text.iter().position(|b| *b == TERMINATOR) {
                Some(end) => return wire::send(&mut self.transport, &text[..end]),
                None => wire::send(&mut self.transport, text)?,
            }
        }
        warn!("release message is not terminated");
        Ok(())
    }
}
