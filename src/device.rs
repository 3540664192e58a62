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

//! The static registry of supported microcontrollers.

use crate::error::Error;

/// Immutable description of a supported device, as advertised in the wire
/// protocol's QUERY response and validated during [`crate::Session::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// The name used to select this device on the command line, e.g. `attiny85`.
    pub name: &'static str,
    /// Processor family byte, as reported by QUERY.
    pub family: u8,
    /// Processor model byte, as reported by QUERY.
    pub model: u8,
    /// Minimum bootloader protocol version this device requires.
    pub min_protocol: u8,
    /// Lowest address accessible by READ/WRITE.
    pub addr_low: u16,
    /// Highest address accessible by READ/WRITE (inclusive).
    pub addr_high: u16,
    /// Whether this device uses a single-wire software UART that echoes
    /// every transmitted byte back to the host.
    pub soft_uart: bool,
}

/// The supported devices, in the order they should be listed to a user.
pub const DEVICES: &[DeviceDescriptor] = &[
    DeviceDescriptor {
        name: "attiny85",
        family: 0x01,
        model: 0x01,
        min_protocol: 0x10,
        addr_low: 0x0000,
        addr_high: 0x1BFF,
        soft_uart: true,
    },
    DeviceDescriptor {
        name: "atmega8",
        family: 0x01,
        model: 0x02,
        min_protocol: 0x10,
        addr_low: 0x0000,
        addr_high: 0x1BFF,
        soft_uart: false,
    },
    DeviceDescriptor {
        name: "atmega88",
        family: 0x01,
        model: 0x03,
        min_protocol: 0x10,
        addr_low: 0x0000,
        addr_high: 0x1BFF,
        soft_uart: false,
    },
    DeviceDescriptor {
        name: "atmega168",
        family: 0x01,
        model: 0x04,
        min_protocol: 0x10,
        addr_low: 0x0000,
        addr_high: 0x3BFF,
        soft_uart: false,
    },
];

/// Look up a device by name, case-insensitively.
///
/// # Errors
///
/// Returns [`Error::UnknownDevice`] if no device matches `name`.
pub fn lookup(name: &str) -> Result<&'static DeviceDescriptor, Error> {
    let name = name.to_lowercase();
    DEVICES
        .iter()
        .find(|d| d.name == name)
        .ok_or(Error::UnknownDevice(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let lower = lookup("attiny85").unwrap();
        let upper = lookup("ATtiny85").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn lookup_unknown_device_fails() {
        assert!(matches!(lookup("esp32"), Err(Error::UnknownDevice(_))));
    }

    #[test]
    fn attiny85_is_the_only_soft_uart_device() {
        let soft_uart: Vec<_> =
            DEVICES.iter().filter(|d| d.soft_uart).map(|d| d.name).collect();
        assert_eq!(soft_uart, vec!["attiny85"]);
    }
}
