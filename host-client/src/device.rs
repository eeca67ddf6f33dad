// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Error, ProtectedImage};
use host_protocol::{Command, Region, Status, UpdateHeader, BOOT_MESSAGE_ACK, MAX_RELEASE_MESSAGE_LEN, TERMINATOR};
use std::io::{Read, Write};

/// A bootloader at the other end of a byte stream, usually a serial port.
pub struct Device<P> {
    port: P,
    page_size: u32,
}

impl<P: Read + Write> Device<P> {
    /// `page_size` must match the flash page size of the device, it sets the
    /// frame size of uploads.
    pub fn new(port: P, page_size: u32) -> Self {
        Self { port, page_size }
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Uploads a protected image. Returns once the device has verified and
    /// committed it.
    pub fn update(&mut self, version: u16, message: &str, image: &ProtectedImage) -> Result<(), Error> {
        if message.len() > MAX_RELEASE_MESSAGE_LEN {
            return Err(Error::MessageTooLong(message.len()));
        }
        if message.bytes().any(|b| b == TERMINATOR) {
            return Err(Error::MessageHasNul);
        }
        let size = size_field(image.body.len())?;

        self.command(Command::Update)?;
        let mut request = UpdateHeader { version, size }.to_bytes().to_vec();
        request.extend_from_slice(message.as_bytes());
        request.push(TERMINATOR);
        request.extend_from_slice(image.digest_hex().as_bytes());
        request.push(TERMINATOR);
        self.port.write_all(&request)?;
        self.port.flush()?;
        self.expect_ok()?;

        self.send_frames(&image.body)?;
        self.expect_ok()?;
        tracing::info!(version, size, "update committed");
        Ok(())
    }

    /// Uploads a configuration blob.
    pub fn configure(&mut self, data: &[u8]) -> Result<(), Error> {
        let size = size_field(data.len())?;
        self.command(Command::Configure)?;
        self.port.write_all(&size.to_be_bytes())?;
        self.port.flush()?;
        self.expect_ok()?;

        self.send_frames(data)?;
        self.expect_ok()?;
        tracing::info!(size, "configuration committed");
        Ok(())
    }

    /// Reads `size` bytes from the start of a stored region.
    pub fn readback(&mut self, region: Region, size: u32) -> Result<Vec<u8>, Error> {
        self.command(Command::Readback)?;
        self.port.write_all(&[region as u8])?;
        self.port.flush()?;
        let ack = self.read_u8()?;
        if ack != region as u8 {
            return Err(status_error(ack));
        }

        self.port.write_all(&size.to_be_bytes())?;
        self.port.flush()?;
        let mut data = vec![0; size as usize];
        self.port.read_exact(&mut data)?;
        Ok(data)
    }

    /// Asks the device to boot its firmware. Returns the release message the
    /// device prints before it jumps.
    pub fn boot(&mut self) -> Result<String, Error> {
        self.command(Command::Boot)?;
        let ack = self.read_u8()?;
        if ack != BOOT_MESSAGE_ACK {
            return Err(status_error(ack));
        }

        let mut message = Vec::new();
        loop {
            match self.read_u8()? {
                TERMINATOR => break,
                byte => message.push(byte),
            }
        }
        Ok(String::from_utf8_lossy(&message).into_owned())
    }

    fn send_frames(&mut self, data: &[u8]) -> Result<(), Error> {
        let frames = data.chunks(self.page_size as usize);
        let count = frames.len();
        for (i, frame) in frames.enumerate() {
            self.port.write_all(frame)?;
            self.port.flush()?;
            self.expect_ok()?;
            tracing::debug!("frame {}/{}", i + 1, count);
        }
        Ok(())
    }

    fn command(&mut self, command: Command) -> Result<(), Error> {
        self.port.write_all(&[command as u8])?;
        self.port.flush()?;
        let ack = self.read_u8()?;
        if ack != command.ack() {
            return Err(Error::UnexpectedAck {
                expected: command.ack(),
                got: ack,
            });
        }
        Ok(())
    }

    fn expect_ok(&mut self) -> Result<(), Error> {
        match self.read_u8()? {
            byte if byte == Status::Ok as u8 => Ok(()),
            byte => Err(status_error(byte)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0; 1];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}

fn status_error(byte: u8) -> Error {
    match Status::try_from(byte) {
        Ok(status) => Error::Rejected(status),
        Err(byte) => Error::UnknownStatus(byte),
    }
}

fn size_field(len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::PayloadTooLarge(len))
}
