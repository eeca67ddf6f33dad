// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Firmware update.
//!
//! The new image always goes to the slot that is not active. Only after its
//! body has been stored and verified does its commit word get programmed,
//! which makes it the active slot in one step.

use crate::boot::BootRegion;
use crate::layout::SlotId;
use crate::metadata::{self, FirmwareHeader};
use crate::verify::{self, Digest};
use crate::wire;
use crate::{Bootloader, Error};
use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use heapless::Vec;
use host_protocol::{
    Command, Status, UpdateHeader, CIPHER_BLOCK_SIZE, DIGEST_HEX_LEN, DIGEST_LEN,
    MAX_RELEASE_MESSAGE_LEN, TERMINATOR,
};

/// Release message with room for its terminator.
type ReleaseMessage = Vec<u8, { MAX_RELEASE_MESSAGE_LEN + 1 }>;

/// Everything the host sends before the body.
struct UpdateRequest {
    header: UpdateHeader,
    message: ReleaseMessage,
    message_len: usize,
    digest_hex: Vec<u8, DIGEST_HEX_LEN>,
    digest_hex_len: usize,
}

impl<T, F, B> Bootloader<T, F, B>
where
    T: Read + Write,
    F: NorFlash,
    B: BootRegion,
{
    pub(crate) fn update(&mut self) -> Result<(), Error> {
        wire::send(&mut self.transport, &[Command::Update.ack()])?;
        let request = self.receive_update()?;
        self.install(request).map_err(|e| self.fail(e))
    }

    fn receive_update(&mut self) -> Result<UpdateRequest, Error> {
        let mut header = [0; UpdateHeader::SIZE];
        wire::read_exact(&mut self.transport, &mut header)?;

        let mut message = Vec::new();
        let message_len = wire::read_line(&mut self.transport, &mut message)?;
        let mut digest_hex = Vec::new();
        let digest_hex_len = wire::read_line(&mut self.transport, &mut digest_hex)?;

        Ok(UpdateRequest {
            header: UpdateHeader::from_bytes(header),
            message,
            message_len,
            digest_hex,
            digest_hex_len,
        })
    }

    fn install(&mut self, request: UpdateRequest) -> Result<(), Error> {
        let UpdateRequest {
            header,
            mut message,
            message_len,
            digest_hex,
            digest_hex_len,
        } = request;

        if message_len > MAX_RELEASE_MESSAGE_LEN {
            warn!("release message of {=usize} bytes", message_len);
            return Err(Error::MalformedHeader);
        }
        let digest = parse_digest(&digest_hex, digest_hex_len)?;

        let active = metadata::active_firmware(&mut self.flash, &self.layout)?;
        let oldest = self.config.oldest_version;
        let current = active
            .as_ref()
            .map_or(oldest, |(_, record)| record.effective_version(oldest));

        let submitted = u32::from(header.version);
        if submitted != 0 && submitted < current {
            warn!("rollback from {=u32} to {=u32} refused", current, submitted);
            return Err(Error::Rollback { submitted, current });
        }
        if header.size > self.layout.firmware_capacity() {
            return Err(Error::TooLarge);
        }
        if header.size == 0 || header.size as usize % CIPHER_BLOCK_SIZE != 0 {
            return Err(Error::MalformedHeader);
        }
        let sequence = metadata::next_sequence(active.as_ref().map(|(_, record)| record))?;
        let target = active.map_or(SlotId::A, |(id, _)| id.other());
        let version = if submitted == 0 { current } else { submitted };

        message.push(TERMINATOR).map_err(|_| Error::MalformedHeader)?;

        info!(
            "updating slot {} to version {=u32}, {=u32} bytes",
            target, version, header.size
        );
        let slot = *self.layout.slot(target);
        let page_size = self.layout.page_size;
        metadata::write_firmware(
            &mut self.flash,
            &mut self.page[..page_size as usize],
            page_size,
            &slot,
            &FirmwareHeader {
                size: header.size,
                version,
                message: &message,
                digest: &digest,
            },
        )?;
        wire::send_status(&mut self.transport, Status::Ok)?;

        self.load_data(slot.body, header.size)?;

        let record = metadata::read_firmware(&mut self.flash, &slot)?;
        verify::decrypt_firmware(
            &mut self.flash,
            &slot,
            &record,
            &self.config.key,
            &mut self.region,
        )?;

        metadata::commit_firmware(&mut self.flash, &slot, sequence)?;
        info!("slot {} committed with sequence {=u32}", target, sequence);
        wire::send_status(&mut self.transport, Status::Ok)
    }
}

/// Decodes the digest string, which must be exactly 64 hex characters.
fn parse_digest(hex: &[u8], received: usize) -> Result<Digest, Error> {
    if received != DIGEST_HEX_LEN {
        return Err(Error::MalformedHeader);
    }
    let mut digest = [0; DIGEST_LEN];
    hex::decode_to_slice(hex, &mut digest).map_err(|_| Error::MalformedHeader)?;
    Ok(digest)
}
