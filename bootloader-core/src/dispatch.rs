// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::boot::BootRegion;
use crate::layout::{Layout, SlotId, MAX_PAGE_SIZE};
use crate::metadata::{self, FirmwareRecord};
use crate::verify::ExecutableImage;
use crate::wire;
use crate::{Config, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::Command;

/// Outcome of one [`Bootloader::poll`].
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A byte that is not a command, dropped without answer
    Ignored(u8),
    /// A command ran to completion
    Handled(Command),
    /// The active firmware verified and is ready to run
    Launch(ExecutableImage),
}

/// The bootloader engine.
pub struct Bootloader<T, F, B> {
    pub(crate) transport: T,
    pub(crate) flash: F,
    pub(crate) region: B,
    pub(crate) layout: Layout,
    pub(crate) config: Config,
    pub(crate) page: [u8; MAX_PAGE_SIZE],
}

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    /// Fails with [`Error::Layout`] if `layout` does not fit `flash`, or if the
    /// boot region cannot hold a full firmware body.
    pub fn new(transport: T, flash: F, mut region: B, layout: Layout, config: Config) -> Result<Self, Error> {
        layout.validate(&flash)?;
        if region.memory().len() < layout.firmware_capacity() as usize {
            return Err(Error::Layout);
        }
        info!(
            "storage {=u32:#x}..{=u32:#x}, page size {=u32}",
            layout.base(),
            layout.end(),
            layout.page_size
        );
        Ok(Self {
            transport,
            flash,
            region,
            layout,
            config,
            page: [0; MAX_PAGE_SIZE],
        })
    }

    /// Waits for one command byte and serves it.
    ///
    /// Handler errors are returned after the host has been told (when the link
    /// still works). A successful boot returns [`Event::Launch`], the caller
    /// decides when to jump.
    pub fn poll(&mut self) -> Result<Event, Error> {
        let byte = wire::read_u8(&mut self.transport)?;
        let command = match Command::try_from(byte) {
            Ok(command) => command,
            Err(other) => {
                trace!("ignoring {=u8:#x}", other);
                return Ok(Event::Ignored(other));
            }
        };
        debug!("command {}", command);

        match command {
            Command::Update => self.update(),
            Command::Configure => self.configure(),
            Command::Readback => self.readback(),
            Command::Boot => return self.boot().map(Event::Launch),
        }
        .map(|()| Event::Handled(command))
    }

    /// Serves commands until one of them boots the firmware.
    pub fn run(&mut self) -> ! {
        loop {
            match self.poll() {
                Ok(Event::Launch(image)) => {
                    info!("jumping to {=u32:#x}", image.entry());
                    self.region.jump(image)
                }
                Ok(_) => {}
                Err(e) => warn!("command failed: {}", e),
            }
        }
    }

    /// Tells the host about `error` if it has a status byte and hands it back.
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        if let Some(status) = error.status() {
            // The original error is what matters to the caller.
            let _ = wire::send_status(&mut self.transport, status);
        }
        error
    }

    /// The committed firmware that boots next, if any.
    pub fn installed_firmware(&mut self) -> Result<Option<(SlotId, FirmwareRecord)>, Error> {
        metadata::active_firmware(&mut self.flash, &self.layout)
    }

    /// Size of the committed configuration, if any.
    pub fn configuration(&mut self) -> Result<Option<u32>, Error> {
        metadata::read_configuration(&mut self.flash, &self.layout)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn boot_region(&mut self) -> &mut B {
        &mut self.region
    }

    pub fn into_parts(self) -> (T, F, B) {
        (self.transport, self.flash, self.region)
    }
}
