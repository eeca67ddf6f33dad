// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_nrf::peripherals::UARTE0;
use embassy_nrf::uarte::{self, Uarte};

/// EasyDMA can only read from RAM, outgoing bytes are staged here.
const TX_CHUNK: usize = 64;

#[derive(Debug, defmt::Format)]
pub struct UartError(pub uarte::Error);

impl embedded_io::Error for UartError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

/// Blocking host link on UARTE0.
pub struct Uart<'d> {
    uarte: Uarte<'d, UARTE0>,
    tx_buf: [u8; TX_CHUNK],
}

impl<'d> Uart<'d> {
    pub fn new(uarte: Uarte<'d, UARTE0>) -> Self {
        Self {
            uarte,
            tx_buf: [0; TX_CHUNK],
        }
    }
}

impl embedded_io::ErrorType for Uart<'_> {
    type Error = UartError;
}

impl embedded_io::Read for Uart<'_> {
    /// Fills the whole buffer. The receiver has no FIFO to speak of, so a
    /// frame is received in one DMA transfer rather than byte by byte.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.uarte.blocking_read(buf).map_err(UartError)?;
        Ok(buf.len())
    }
}

impl embedded_io::Write for Uart<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(TX_CHUNK);
        self.tx_buf[..n].copy_from_slice(&buf[..n]);
        self.uarte.blocking_write(&self.tx_buf[..n]).map_err(UartError)?;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // blocking_write returns once the transfer has ended
        Ok(())
    }
}
