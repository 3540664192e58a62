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

//! # Microboot protocol engine
//!
//! A host-side client for the Microboot serial bootloader protocol: an
//! ASCII, hex-encoded, checksummed line protocol for reading and writing
//! AVR flash memory over a serial link.
//!
//! The core pieces:
//!
//! - [`checksum`] / [`framing`] — the wire format itself.
//! - [`transport`] — line send/receive, software-UART echo handling, and
//!   bounded retry.
//! - [`session`] — connection lifecycle and device identification.
//! - [`transfer`] — the chunked READ/WRITE/VERIFY engine built on a
//!   [`Session`].
//! - [`relocate`] — reset-vector relocation for devices whose bootloader
//!   sits below the application in flash.
//! - [`generator`] — offline command generation, without a live device.
//! - [`device`] — the static table of supported microcontrollers.
//! - [`ports`] — serial port enumeration, for CLI front-ends.
//!
//! None of this crate depends on any particular serial port implementation:
//! [`Session`] is generic over anything implementing [`std::io::Read`] and
//! [`std::io::Write`], so it works equally well against a real port or an
//! in-memory stream in tests.

#[rustfmt::skip]
pub mod constants;

pub mod checksum;
pub mod device;
pub mod error;
pub mod framing;
pub mod generator;
pub mod ports;
pub mod relocate;
pub mod session;
pub mod transfer;
pub mod transport;

pub use crate::device::{DeviceDescriptor, DEVICES};
pub use crate::error::{Error, Result};
pub use crate::session::{BootInfo, Session};
pub use crate::transfer::ProgressCallback;
