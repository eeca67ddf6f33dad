// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration upload. The configuration is an opaque blob, it carries
//! neither version nor digest.

use crate::boot::BootRegion;
use crate::metadata;
use crate::wire;
use crate::{Bootloader, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::{Command, Status};

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    pub(crate) fn configure(&mut self) -> Result<(), Error> {
        wire::send(&mut self.transport, &[Command::Configure.ack()])?;
        let size = wire::read_u32(&mut self.transport)?;
        self.store_configuration(size).map_err(|e| self.fail(e))
    }

    fn store_configuration(&mut self, size: u32) -> Result<(), Error> {
        let body = self.layout.configuration_body;
        if size > body.capacity {
            warn!("configuration of {=u32} bytes refused", size);
            return Err(Error::TooLarge);
        }

        // Leaves the old configuration uncommitted until the new body is in.
        metadata::write_configuration(&mut self.flash, &self.layout, size)?;
        wire::send_status(&mut self.transport, Status::Ok)?;

        self.load_data(body, size)?;

        metadata::commit_configuration(&mut self.flash, &self.layout)?;
        info!("configuration of {=u32} bytes committed", size);
        wire::send_status(&mut self.transport, Status::Ok)
    }
}
