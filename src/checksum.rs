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

//! The 16-bit additive checksum used to validate every frame on the wire.

use crate::constants::CHECKSUM_SEED;
use crate::error::Error;

/// Accepts either a single byte or a byte sequence. Everything else is a
/// [`Error::ByteOutOfRange`] at construction time rather than at iteration
/// time.
pub enum ByteInput<'a> {
    Single(u8),
    Seq(&'a [u8]),
}

impl From<u8> for ByteInput<'_> {
    fn from(b: u8) -> Self {
        ByteInput::Single(b)
    }
}

impl<'a> From<&'a [u8]> for ByteInput<'a> {
    fn from(s: &'a [u8]) -> Self {
        ByteInput::Seq(s)
    }
}

impl<'a> ByteInput<'a> {
    fn as_slice(&'a self) -> &'a [u8] {
        match self {
            ByteInput::Single(b) => std::slice::from_ref(b),
            ByteInput::Seq(s) => s,
        }
    }
}

/// The additive checksum accumulator, seeded with [`CHECKSUM_SEED`].
#[derive(Debug, Clone, Copy)]
pub struct Checksum(u16);

impl Default for Checksum {
    fn default() -> Self {
        Checksum(CHECKSUM_SEED)
    }
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a byte or byte sequence. Byte values are always in 0..=255
    /// since the input is `u8`; the `Result` keeps `Error::ByteOutOfRange`
    /// reachable for call sites that build `ByteInput` from wider integers.
    pub fn add<'a, T: Into<ByteInput<'a>>>(&mut self, data: T) -> Result<&mut Self, Error> {
        let input = data.into();
        for &b in input.as_slice() {
            self.0 = self.0.wrapping_add(u16::from(b));
        }
        Ok(self)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Compute the checksum of `bytes` in one call, starting from the seed.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut acc = Checksum::new();
    acc.add(bytes).expect("u8 slices are always in range");
    acc.value()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seed_with_no_data_is_unchanged() {
        assert_eq!(checksum(&[]), CHECKSUM_SEED);
    }

    #[test]
    fn read_frame_checksum_matches_scenario_s1() {
        // S1: address 0x1234 -> 0x5050 + 0x12 + 0x34 == 0x5096
        let sum = checksum(&[0x12, 0x34]);
        assert_eq!(sum, 0x5096);
    }

    #[test]
    fn write_frame_checksum_matches_scenario_s2() {
        // S2: address 0x0000, 32 bytes of 0xFF -> 0x5050 + 32*0xFF == 0x7030
        let mut data = [0u8; 2 + 32];
        data[2..].fill(0xFF);
        assert_eq!(checksum(&data), 0x7030);
    }

    #[test]
    fn wraps_modulo_0x10000() {
        let mut acc = Checksum::new();
        acc.add(&[0xFFu8; 2000][..]).unwrap();
        assert!(acc.value() <= 0xFFFF);
    }
}
