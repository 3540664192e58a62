// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Address-range validation, block alignment and the chunked READ/WRITE/
//! VERIFY loops.

use std::io::{Read, Write};

use crate::device::DeviceDescriptor;
use crate::error::Error;
use crate::framing;
use crate::session::Session;

/// Reports `(completed, total)` after each block transferred. Monotonic in
/// `completed`, both always `>= 0` and `completed <= total` by construction.
pub type ProgressCallback<'a> = dyn FnMut(usize, usize) + 'a;

pub(crate) fn validate_range(device: &DeviceDescriptor, start: u16, length: usize) -> Result<(), Error> {
    if length == 0 {
        return Err(Error::Range("length must be greater than zero".into()));
    }

    let end = u32::from(start) + (length as u32) - 1;
    if u32::from(start) < u32::from(device.addr_low) || end > u32::from(device.addr_high) {
        return Err(Error::Range(format!(
            "transfer {:#06X}:{:#06X} is outside the device's range {:#06X}:{:#06X}",
            start, end, device.addr_low, device.addr_high
        )));
    }

    Ok(())
}

/// The smallest multiple of `block_size` that is `>= length`.
pub fn aligned_len(length: usize, block_size: usize) -> usize {
    ((length + block_size - 1) / block_size) * block_size
}

impl<S> Session<S>
where
    S: Read + Write,
{
    /// Read `length` bytes starting at `start`, in `block_size()`-sized
    /// chunks. Range errors are immediate and never send a byte.
    pub fn read(
        &mut self,
        start: u16,
        length: usize,
        mut callback: Option<&mut ProgressCallback<'_>>,
    ) -> Result<Vec<u8>, Error> {
        let device = self.device().ok_or(Error::NotConnected)?;
        let block_size = self.block_size()? as usize;
        validate_range(&device, start, length)?;

        let aligned_length = aligned_len(length, block_size);
        let mut result = Vec::with_capacity(aligned_length);

        let mut address = start;
        let mut offset = 0usize;
        while offset < aligned_length {
            let command = framing::encode_read(address);
            let response = self.transport()?.exchange(&command)?;

            // address (2 bytes) + data (block_size bytes); the trailing
            // checksum pair was already verified and stripped by framing.
            if response.len() != block_size + 2 {
                return Err(Error::UnexpectedLength {
                    expected: block_size + 2,
                    actual: response.len(),
                });
            }
            result.extend_from_slice(&response[2..]);

            address = address.wrapping_add(block_size as u16);
            offset += block_size;

            if let Some(cb) = callback.as_deref_mut() {
                cb(offset.min(length), length);
            }
        }

        result.truncate(length);
        Ok(result)
    }

    /// Write `data[..length]` starting at `start`. If the final aligned
    /// block overruns `length`, the un-requested tail is filled by reading
    /// it back from the device first (read-modify-write), preserving
    /// whatever was already flashed there.
    pub fn write(
        &mut self,
        start: u16,
        length: usize,
        data: &[u8],
        mut callback: Option<&mut ProgressCallback<'_>>,
    ) -> Result<(), Error> {
        let device = self.device().ok_or(Error::NotConnected)?;
        let block_size = self.block_size()? as usize;
        validate_range(&device, start, length)?;

        if data.len() < length {
            return Err(Error::Range(format!(
                "data buffer too small ({} < {})",
                data.len(),
                length
            )));
        }

        let aligned_length = aligned_len(length, block_size);
        let mut buffer = data[..length].to_vec();

        if aligned_length > length {
            let tail_start = start + (aligned_length - block_size) as u16;
            let existing = self.read(tail_start, block_size, None)?;
            let keep_from = block_size - (aligned_length - length);
            buffer.extend_from_slice(&existing[keep_from..]);
        }

        let mut address = start;
        let mut offset = 0usize;
        while offset < aligned_length {
            let chunk = &buffer[offset..offset + block_size];
            let command = framing::encode_write(address, chunk);
            let response = self.transport()?.exchange(&command)?;

            if !response.is_empty() {
                return Err(Error::UnexpectedLength {
                    expected: 0,
                    actual: response.len(),
                });
            }

            address = address.wrapping_add(block_size as u16);
            offset += block_size;

            if let Some(cb) = callback.as_deref_mut() {
                cb(offset.min(length), length);
            }
        }

        Ok(())
    }

    /// Read back `length` bytes starting at `start` and compare against
    /// `data`. Fails hard, non-retried, on the first mismatch.
    pub fn verify(
        &mut self,
        start: u16,
        length: usize,
        data: &[u8],
        callback: Option<&mut ProgressCallback<'_>>,
    ) -> Result<(), Error> {
        let current = self.read(start, length, callback)?;

        for (i, (&expected, &actual)) in data[..length].iter().zip(current.iter()).enumerate() {
            if expected != actual {
                return Err(Error::Verification {
                    address: start.wrapping_add(i as u16),
                    expected,
                    actual,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device;
    use std::io::Cursor;

    /// An in-memory stand-in for a device's flash array, speaking enough of
    /// the wire protocol to drive READ/WRITE/QUERY through a real `Session`.
    struct FakeFlash {
        flash: Vec<u8>,
        addr_low: u16,
        block_size: u8,
        family: u8,
        model: u8,
        protocol: u8,
        inbuf: Vec<u8>,
        outbuf: Cursor<Vec<u8>>,
    }

    impl FakeFlash {
        fn new(addr_low: u16, addr_high: u16, block_size: u8, family: u8, model: u8) -> Self {
            FakeFlash {
                flash: vec![0xFFu8; usize::from(addr_high - addr_low) + 1],
                addr_low,
                block_size,
                family,
                model,
                protocol: 0x10,
                inbuf: Vec::new(),
                outbuf: Cursor::new(Vec::new()),
            }
        }

        fn handle(&mut self, cmd: &[u8]) -> Vec<u8> {
            match cmd[0] {
                b'?' => {
                    let payload = [self.protocol, self.block_size, self.family, self.model];
                    ok_response(&payload)
                }
                b'R' => {
                    let addr = hex::decode(&cmd[1..5]).unwrap();
                    let address = u16::from_be_bytes([addr[0], addr[1]]);
                    let offset = usize::from(address - self.addr_low);
                    let block_size = usize::from(self.block_size);
                    let mut payload = addr;
                    payload.extend_from_slice(&self.flash[offset..offset + block_size]);
                    ok_response(&payload)
                }
                b'W' => {
                    let addr = hex::decode(&cmd[1..5]).unwrap();
                    let address = u16::from_be_bytes([addr[0], addr[1]]);
                    let offset = usize::from(address - self.addr_low);
                    let block_size = usize::from(self.block_size);
                    let data_hex = &cmd[5..5 + block_size * 2];
                    let data = hex::decode(data_hex).unwrap();
                    self.flash[offset..offset + block_size].copy_from_slice(&data);
                    b"+\n".to_vec()
                }
                _ => b"-\n".to_vec(),
            }
        }
    }

    fn ok_response(payload: &[u8]) -> Vec<u8> {
        let sum = crate::checksum::checksum(payload);
        let mut line = vec![b'+'];
        line.extend(hex::encode_upper(payload).into_bytes());
        line.extend(hex::encode_upper(sum.to_be_bytes()).into_bytes());
        line.push(b'\n');
        line
    }

    impl Write for FakeFlash {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inbuf.extend_from_slice(buf);
            if self.inbuf.last() == Some(&b'\n') {
                let cmd = std::mem::take(&mut self.inbuf);
                let response = self.handle(&cmd);
                self.outbuf = Cursor::new(response);
            }
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Read for FakeFlash {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.outbuf.read(buf)
        }
    }

    fn connected_session(block_size: u8) -> Session<FakeFlash> {
        let device = device::lookup("atmega8").unwrap();
        let stream = FakeFlash::new(device.addr_low, device.addr_high, block_size, device.family, device.model);
        let mut session = Session::new();
        session.connect("atmega8", stream).unwrap();
        session
    }

    #[test]
    fn alignment_is_a_multiple_of_block_size_within_one_block() {
        for length in 1..=200usize {
            for block_size in [1usize, 8, 16, 32, 64] {
                let aligned = aligned_len(length, block_size);
                assert_eq!(aligned % block_size, 0);
                assert!(aligned >= length && aligned < length + block_size);
            }
        }
    }

    #[test]
    fn read_is_idempotent() {
        let mut session = connected_session(16);
        let a = session.read(0x0000, 40, None).unwrap();
        let b = session.read(0x0000, 40, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut session = connected_session(16);
        let data: Vec<u8> = (0..40u16).map(|v| (v % 256) as u8).collect();
        session.write(0x0000, data.len(), &data, None).unwrap();
        let back = session.read(0x0000, data.len(), None).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn partial_tail_write_preserves_existing_bytes() {
        let mut session = connected_session(16);
        // Prime the device with known bytes in the final block.
        let priming: Vec<u8> = vec![0xAA; 32];
        session.write(0x0000, priming.len(), &priming, None).unwrap();

        // Now write 20 bytes (not a multiple of 16): bytes [20, 32) of the
        // second block must keep their primed 0xAA value.
        let data: Vec<u8> = (0..20u8).collect();
        session.write(0x0000, data.len(), &data, None).unwrap();

        let full = session.read(0x0000, 32, None).unwrap();
        assert_eq!(&full[..20], &data[..]);
        assert_eq!(&full[20..32], &[0xAA; 12][..]);
    }

    #[test]
    fn verify_succeeds_after_matching_write() {
        let mut session = connected_session(16);
        let data: Vec<u8> = (0..16u8).collect();
        session.write(0x0000, data.len(), &data, None).unwrap();
        session.verify(0x0000, data.len(), &data, None).unwrap();
    }

    #[test]
    fn verify_reports_first_mismatch() {
        let mut session = connected_session(16);
        let data: Vec<u8> = vec![0x00; 16];
        session.write(0x0000, data.len(), &data, None).unwrap();

        let mut expected = data.clone();
        expected[5] = 0x42;
        let err = session.verify(0x0000, data.len(), &expected, None).unwrap_err();
        match err {
            Error::Verification { address, expected, actual } => {
                assert_eq!(address, 0x0005);
                assert_eq!(expected, 0x42);
                assert_eq!(actual, 0x00);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn out_of_range_start_is_rejected_without_sending() {
        let mut session = connected_session(16);
        let device = session.device().unwrap();
        let err = session
            .read(device.addr_high, 100, None)
            .unwrap_err();
        assert!(matches!(err, Error::Range(_)));
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut session = connected_session(16);
        assert!(matches!(session.read(0, 0, None), Err(Error::Range(_))));
    }

    #[test]
    fn progress_callback_is_monotonic_and_bounded() {
        let mut session = connected_session(16);
        let mut seen = Vec::new();
        {
            let mut cb = |completed: usize, total: usize| seen.push((completed, total));
            session.read(0x0000, 40, Some(&mut cb)).unwrap();
        }
        assert_eq!(seen, vec![(16, 40), (32, 40), (40, 40)]);
    }
}
