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

//! Wire-protocol constants for the Microboot serial bootloader.

/// Opcode for the READ command.
pub const CMD_READ: u8 = b'R';
/// Opcode for the WRITE command.
pub const CMD_WRITE: u8 = b'W';
/// Opcode for the QUERY command.
pub const CMD_QUERY: u8 = b'?';
/// Opcode for the RESET command.
pub const CMD_RESET: u8 = b'!';

/// Leading byte of a successful response.
pub const STATUS_OK: u8 = b'+';
/// Leading byte of a failed response.
pub const STATUS_FAIL: u8 = b'-';

/// Line terminator for every command and response.
pub const EOL: u8 = b'\n';

/// Seed loaded into the 16-bit additive checksum accumulator.
pub const CHECKSUM_SEED: u16 = 0x5050;

/// Default serial baud rate.
pub const DEFAULT_SPEED: usize = 57600;
/// Default read timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 200;
/// Default number of attempts per exchange before giving up.
pub const DEFAULT_RETRIES: usize = 3;
/// Default block size used by the offline command generator.
pub const DEFAULT_BLOCK_SIZE: u8 = 16;
/// Padding byte used by the offline generator for tail bytes (live WRITE
/// uses read-modify-write instead, see `transfer::Session::write`).
pub const GENERATOR_PAD_BYTE: u8 = 0xFF;
