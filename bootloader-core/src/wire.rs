// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Blocking reads and writes on the host link. Every read here is a point
//! where the bootloader may wait forever for the host.

use crate::Error;
use embedded_io::{Read, Write};
use heapless::Vec;
use host_protocol::{Status, TERMINATOR};

pub(crate) fn read_exact<T: Read>(transport: &mut T, buf: &mut [u8]) -> Result<(), Error> {
    transport.read_exact(buf)?;
    Ok(())
}

pub(crate) fn read_u8<T: Read>(transport: &mut T) -> Result<u8, Error> {
    let mut buf = [0; 1];
    read_exact(transport, &mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32<T: Read>(transport: &mut T) -> Result<u32, Error> {
    let mut buf = [0; 4];
    read_exact(transport, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads bytes up to and including the terminator.
///
/// Bytes beyond the capacity of `line` are consumed and dropped so the stream
/// stays in sync. Returns the number of bytes received before the terminator,
/// which exceeds `N` when the line overflowed.
pub(crate) fn read_line<T: Read, const N: usize>(
    transport: &mut T,
    line: &mut Vec<u8, N>,
) -> Result<usize, Error> {
    let mut count = 0;
    loop {
        let byte = read_u8(transport)?;
        if byte == TERMINATOR {
            return Ok(count);
        }
        // A full buffer drops the byte, the count still tells the caller.
        let _ = line.push(byte);
        count += 1;
    }
}

pub(crate) fn send<T: Write>(transport: &mut T, bytes: &[u8]) -> Result<(), Error> {
    transport.write_all(bytes).map_err(|_| Error::Transport)?;
    transport.flush().map_err(|_| Error::Transport)
}

pub(crate) fn send_status<T: Write>(transport: &mut T, status: Status) -> Result<(), Error> {
    send(transport, &[status as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{ErrorKind, ErrorType};

    #[derive(Debug)]
    struct Closed;

    impl embedded_io::Error for Closed {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct Bytes<'a>(&'a [u8]);

    impl ErrorType for Bytes<'_> {
        type Error = Closed;
    }

    impl Read for Bytes<'_> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn line_stops_at_terminator() {
        let mut input = Bytes(b"rel\0next");
        let mut line: Vec<u8, 8> = Vec::new();
        assert_eq!(read_line(&mut input, &mut line), Ok(3));
        assert_eq!(&line[..], b"rel");
        assert_eq!(input.0, b"next");
    }

    #[test]
    fn overflowing_line_is_consumed() {
        let mut input = Bytes(b"abcdef\0X");
        let mut line: Vec<u8, 4> = Vec::new();
        assert_eq!(read_line(&mut input, &mut line), Ok(6));
        assert_eq!(&line[..], b"abcd");
        assert_eq!(read_u8(&mut input), Ok(b'X'));
    }

    #[test]
    fn missing_terminator_is_a_disconnect() {
        let mut input = Bytes(b"abc");
        let mut line: Vec<u8, 4> = Vec::new();
        assert_eq!(read_line(&mut input, &mut line), Err(Error::Disconnected));
    }

    #[test]
    fn integers_are_big_endian() {
        let mut input = Bytes(&[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(read_u32(&mut input), Ok(0x0102));
    }
}
