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

//! Connection lifecycle and device identification.

use std::io::{Read, Write};

use crate::constants::DEFAULT_RETRIES;
use crate::device::{self, DeviceDescriptor};
use crate::error::Error;
use crate::framing;
use crate::transport::Transport;

/// Information the device reports about itself at QUERY time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootInfo {
    pub protocol_version: u8,
    pub block_size: u8,
    pub family: u8,
    pub model: u8,
}

/// A bound `(device, stream, boot-info, logger)` context. Holds the stream
/// exclusively: once `connect` succeeds the `Session` is the only thing that
/// may read or write it.
pub struct Session<S> {
    stream: Option<S>,
    device: Option<&'static DeviceDescriptor>,
    boot_info: Option<BootInfo>,
    logger: Option<Box<dyn FnMut(&[u8], &[u8])>>,
    retries: usize,
}

impl<S> Default for Session<S> {
    fn default() -> Self {
        Session {
            stream: None,
            device: None,
            boot_info: None,
            logger: None,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl<S> Session<S>
where
    S: Read + Write,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a logger sink, invoked exactly once per successful exchange
    /// with `(request, response)`. Never invoked from inside a retry
    /// attempt, and never affects error flow.
    pub fn set_logger(&mut self, logger: impl FnMut(&[u8], &[u8]) + 'static) {
        self.logger = Some(Box::new(logger));
    }

    pub fn set_retries(&mut self, retries: usize) {
        self.retries = retries;
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device(&self) -> Option<&'static DeviceDescriptor> {
        self.device
    }

    pub fn boot_info(&self) -> Option<BootInfo> {
        self.boot_info
    }

    /// The block size advertised by the device, required before any
    /// READ/WRITE transfer.
    pub fn block_size(&self) -> Result<u8, Error> {
        self.boot_info
            .map(|info| info.block_size)
            .ok_or(Error::NotConnected)
    }

    /// Connect to `device_name` over `stream`. Reconnecting tears down any
    /// prior stream first, so this is idempotent.
    pub fn connect(&mut self, device_name: &str, stream: S) -> Result<(), Error> {
        self.disconnect();

        let device = device::lookup(device_name)?;
        self.stream = Some(stream);
        self.device = Some(device);

        match self.query() {
            Ok(info) => {
                self.boot_info = Some(info);
                Ok(())
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Best-effort close of the stream; idempotent.
    pub fn disconnect(&mut self) {
        self.stream = None;
        self.device = None;
        self.boot_info = None;
    }

    /// Ask the device to reboot into the application. Does not wait for a
    /// response since the device resets immediately.
    pub fn reset(&mut self) -> Result<(), Error> {
        let command = framing::encode_reset();
        self.transport()?.send_no_response(&command)
    }

    fn query(&mut self) -> Result<BootInfo, Error> {
        let device = self.device.expect("device set before query");

        let command = framing::encode_query();
        let response = self.transport()?.exchange(&command)?;

        if response.len() != 4 {
            return Err(Error::UnexpectedLength {
                expected: 4,
                actual: response.len(),
            });
        }

        let info = BootInfo {
            protocol_version: response[0],
            block_size: response[1],
            family: response[2],
            model: response[3],
        };

        if info.protocol_version < device.min_protocol {
            return Err(Error::ProtocolVersion {
                actual: info.protocol_version,
                minimum: device.min_protocol,
            });
        }

        if info.family != device.family || info.model != device.model {
            return Err(Error::IdentityMismatch {
                expected_family: device.family,
                expected_model: device.model,
                actual_family: info.family,
                actual_model: info.model,
            });
        }

        Ok(info)
    }

    pub(crate) fn transport(&mut self) -> Result<Transport<'_, S>, Error> {
        let soft_uart = self.device.map(|d| d.soft_uart).unwrap_or(false);
        let retries = self.retries;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let mut transport = Transport::new(stream, soft_uart, retries);
        if let Some(logger) = self.logger.as_deref_mut() {
            transport = transport.with_logger(logger);
        }
        Ok(transport)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    struct MockDevice {
        response: Cursor<Vec<u8>>,
    }

    impl MockDevice {
        fn with_query_response(bytes: &[u8]) -> Self {
            MockDevice {
                response: Cursor::new(bytes.to_vec()),
            }
        }
    }

    impl Read for MockDevice {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.response.read(buf)
        }
    }

    impl Write for MockDevice {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn ok_query_response(protocol: u8, block_size: u8, family: u8, model: u8) -> Vec<u8> {
        let payload = [protocol, block_size, family, model];
        let sum = crate::checksum::checksum(&payload);
        let mut line = vec![b'+'];
        line.extend(hex::encode_upper(payload).into_bytes());
        line.extend(hex::encode_upper(sum.to_be_bytes()).into_bytes());
        line.push(b'\n');
        line
    }

    #[test]
    fn connect_succeeds_on_matching_identity() {
        let resp = ok_query_response(0x10, 32, 0x01, 0x02); // atmega8
        let stream = MockDevice::with_query_response(&resp);
        let mut session: Session<MockDevice> = Session::new();
        session.connect("atmega8", stream).unwrap();
        assert_eq!(session.block_size().unwrap(), 32);
    }

    #[test]
    fn connect_rejects_identity_mismatch() {
        // S6: device reports family=0x01 model=0x02 but attiny85 expects 0x01/0x01
        let resp = ok_query_response(0x10, 32, 0x01, 0x02);
        let stream = MockDevice::with_query_response(&resp);
        let mut session: Session<MockDevice> = Session::new();
        let err = session.connect("attiny85", stream).unwrap_err();
        assert!(matches!(err, Error::IdentityMismatch { .. }));
        assert!(!session.is_connected());
    }

    #[test]
    fn connect_rejects_low_protocol_version() {
        let resp = ok_query_response(0x05, 32, 0x01, 0x02);
        let stream = MockDevice::with_query_response(&resp);
        let mut session: Session<MockDevice> = Session::new();
        let err = session.connect("atmega8", stream).unwrap_err();
        assert!(matches!(err, Error::ProtocolVersion { .. }));
    }

    #[test]
    fn connect_rejects_unknown_device() {
        let stream = MockDevice::with_query_response(b"");
        let mut session: Session<MockDevice> = Session::new();
        assert!(matches!(
            session.connect("not-a-real-chip", stream),
            Err(Error::UnknownDevice(_))
        ));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut session: Session<MockDevice> = Session::new();
        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }
}
