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

//! Line-oriented send/receive over the byte stream, with echo consumption
//! for software-UART devices and bounded retry on malformed responses.

use std::io::{self, Read, Write};

use crate::constants::EOL;
use crate::error::Error;
use crate::framing::parse_response;

/// A single request/response exchange over a byte stream.
///
/// Owns nothing beyond a mutable borrow of the stream for the duration of
/// the call; the [`crate::Session`] is the one that owns the stream across
/// calls.
pub struct Transport<'a, S> {
    stream: &'a mut S,
    soft_uart: bool,
    retries: usize,
    logger: Option<&'a mut dyn FnMut(&[u8], &[u8])>,
}

impl<'a, S> Transport<'a, S>
where
    S: Read + Write,
{
    pub fn new(stream: &'a mut S, soft_uart: bool, retries: usize) -> Self {
        Transport {
            stream,
            soft_uart,
            retries,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: &'a mut dyn FnMut(&[u8], &[u8])) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Send `command` and return its parsed response payload, retrying up to
    /// the configured budget on malformed/failed responses. A software-UART
    /// echo mismatch is never retried: the line is desynchronized.
    pub fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>, Error> {
        let mut attempts = 0;
        while attempts < self.retries {
            match self.attempt(command) {
                Ok(data) => return Ok(data),
                Err(Error::Failed)
                | Err(Error::MalformedFrame(_))
                | Err(Error::ChecksumMismatch { .. }) => {
                    log::debug!(
                        "attempt {}/{} for command '{}' failed, retrying",
                        attempts + 1,
                        self.retries,
                        command[0] as char
                    );
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Transport {
            opcode: command[0] as char,
        })
    }

    /// Send `command` without waiting for or validating a response, for
    /// commands like RESET where the device reboots immediately.
    pub fn send_no_response(&mut self, command: &[u8]) -> Result<(), Error> {
        self.send(command)
    }

    fn attempt(&mut self, command: &[u8]) -> Result<Vec<u8>, Error> {
        self.send(command)?;
        let line = self.recv_line()?;

        if line.len() < 2 || line[line.len() - 1] != EOL {
            return Err(Error::MalformedFrame(
                "response too short or unterminated".into(),
            ));
        }

        let data = parse_response(&line[..line.len() - 1])?;

        if let Some(logger) = self.logger.as_deref_mut() {
            logger(command, &line);
        }

        Ok(data)
    }

    fn send(&mut self, command: &[u8]) -> Result<(), Error> {
        if self.soft_uart {
            for &b in command {
                self.stream.write_all(&[b])?;
                self.stream.flush()?;
                match self.read_one()? {
                    Some(echoed) if echoed == b => {}
                    Some(echoed) => {
                        return Err(Error::EchoMismatch { sent: b, echoed })
                    }
                    None => {
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "no echo received",
                        )))
                    }
                }
            }
        } else {
            let mut written = 0;
            while written < command.len() {
                written += self.stream.write(&command[written..])?;
            }
            self.stream.flush()?;
        }

        Ok(())
    }

    fn recv_line(&mut self) -> Result<Vec<u8>, Error> {
        let mut line = Vec::new();
        loop {
            match self.read_one()? {
                Some(b) => {
                    line.push(b);
                    if b == EOL {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(line)
    }

    /// Read a single byte, treating both `Ok(0)` and a timeout error as "no
    /// byte available" rather than a hard failure.
    fn read_one(&mut self) -> Result<Option<u8>, Error> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
