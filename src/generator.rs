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

//! Offline command generation: builds the same READ/WRITE frames a live
//! [`crate::Session`] would send, without a device attached. Used to
//! produce test vectors or to feed another tool's input.
//!
//! Unlike a live write, a partial tail block here is padded with
//! [`crate::constants::GENERATOR_PAD_BYTE`] rather than read back from a
//! device, since there is no device to read from.

use rand::RngCore;

use crate::constants::GENERATOR_PAD_BYTE;
use crate::device::DeviceDescriptor;
use crate::error::Error;
use crate::framing;
use crate::transfer::{aligned_len, validate_range};

/// Generate the sequence of READ command frames (terminator included) that
/// would be sent to fetch `length` bytes starting at `start`.
pub fn generate_read_commands(
    device: &DeviceDescriptor,
    block_size: u8,
    start: u16,
    length: usize,
) -> Result<Vec<Vec<u8>>, Error> {
    validate_range(device, start, length)?;

    let block_size = block_size as usize;
    let aligned_length = aligned_len(length, block_size);

    let mut commands = Vec::with_capacity(aligned_length / block_size);
    let mut address = start;
    let mut offset = 0usize;
    while offset < aligned_length {
        commands.push(framing::encode_read(address));
        address = address.wrapping_add(block_size as u16);
        offset += block_size;
    }

    Ok(commands)
}

/// Generate the sequence of WRITE command frames needed to write `data`
/// (padded to a block boundary with `0xFF`) starting at `start`.
pub fn generate_write_commands(
    device: &DeviceDescriptor,
    block_size: u8,
    start: u16,
    data: &[u8],
) -> Result<Vec<Vec<u8>>, Error> {
    validate_range(device, start, data.len())?;

    let block_size = block_size as usize;
    let aligned_length = aligned_len(data.len(), block_size);

    let mut buffer = data.to_vec();
    buffer.resize(aligned_length, GENERATOR_PAD_BYTE);

    let mut commands = Vec::with_capacity(aligned_length / block_size);
    let mut address = start;
    let mut offset = 0usize;
    while offset < aligned_length {
        let chunk = &buffer[offset..offset + block_size];
        commands.push(framing::encode_write(address, chunk));
        address = address.wrapping_add(block_size as u16);
        offset += block_size;
    }

    Ok(commands)
}

/// Fill `length` bytes with random data, for exercising the write path
/// without an input file.
pub fn random_data(length: usize) -> Vec<u8> {
    let mut data = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device;

    #[test]
    fn read_commands_cover_the_full_aligned_range() {
        let device = device::lookup("atmega8").unwrap();
        let commands = generate_read_commands(device, 16, 0x0000, 40).unwrap();
        assert_eq!(commands.len(), 3); // ceil(40/16) == 3
        assert!(commands[0].starts_with(b"R0000"));
        assert!(commands[1].starts_with(b"R0010"));
        assert!(commands[2].starts_with(b"R0020"));
    }

    #[test]
    fn write_commands_pad_the_tail_with_0xff() {
        let device = device::lookup("atmega8").unwrap();
        let data = vec![0x11u8; 20];
        let commands = generate_write_commands(device, 16, 0x0000, &data).unwrap();
        assert_eq!(commands.len(), 2);

        // Second command's data portion (after the 1-byte opcode and
        // 4 hex address chars) should be 4 real bytes followed by padding.
        let second = &commands[1];
        let data_hex = &second[5..5 + 32];
        let decoded = hex::decode(data_hex).unwrap();
        assert_eq!(&decoded[..4], &[0x11; 4]);
        assert_eq!(&decoded[4..], &[GENERATOR_PAD_BYTE; 12]);
    }

    #[test]
    fn out_of_range_request_is_rejected() {
        let device = device::lookup("attiny85").unwrap();
        assert!(generate_read_commands(device, 16, device.addr_high, 100).is_err());
    }

    #[test]
    fn random_data_has_the_requested_length() {
        assert_eq!(random_data(64).len(), 64);
    }
}
