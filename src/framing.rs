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

//! Command encoding and response decoding for the Microboot wire protocol.

use crate::checksum::{checksum, Checksum};
use crate::constants::{CMD_QUERY, CMD_READ, CMD_RESET, CMD_WRITE, EOL, STATUS_OK};
use crate::error::Error;

/// Build a READ command frame: `R AAHH AALL CCHH CCLL \n`.
pub fn encode_read(address: u16) -> Vec<u8> {
    let addr = address.to_be_bytes();
    let sum = checksum(&addr);

    let mut frame = Vec::with_capacity(1 + 4 + 4 + 1);
    frame.push(CMD_READ);
    frame.extend(hex::encode_upper(addr).into_bytes());
    frame.extend(hex::encode_upper(sum.to_be_bytes()).into_bytes());
    frame.push(EOL);
    frame
}

/// Build a WRITE command frame: `W AAHH AALL DD...DD CCHH CCLL \n`.
///
/// `data` must be exactly the device's block size; the caller (the Flash
/// Transfer Engine) is responsible for padding partial tail blocks before
/// calling this.
pub fn encode_write(address: u16, data: &[u8]) -> Vec<u8> {
    let addr = address.to_be_bytes();
    let mut acc = Checksum::new();
    acc.add(&addr[..]).expect("addr bytes always in range");
    acc.add(data).expect("data bytes always in range");
    let sum = acc.value();

    let mut frame = Vec::with_capacity(1 + 4 + data.len() * 2 + 4 + 1);
    frame.push(CMD_WRITE);
    frame.extend(hex::encode_upper(addr).into_bytes());
    frame.extend(hex::encode_upper(data).into_bytes());
    frame.extend(hex::encode_upper(sum.to_be_bytes()).into_bytes());
    frame.push(EOL);
    frame
}

/// Build the QUERY command frame: `?\n`.
pub fn encode_query() -> Vec<u8> {
    vec![CMD_QUERY, EOL]
}

/// Build the RESET command frame: `!\n`.
pub fn encode_reset() -> Vec<u8> {
    vec![CMD_RESET, EOL]
}

/// Parse a single response line (terminator already stripped by the
/// Transport layer) into its payload bytes.
///
/// A `+` with no payload returns an empty sequence. A `+` with a payload
/// returns everything up to, but not including, the trailing two checksum
/// bytes, after verifying them. A `-` status is reported as [`Error::Failed`]
/// so the Transport layer can retry it; this function never distinguishes
/// "failed" from "malformed" beyond that, leaving the retry decision to the
/// caller.
pub fn parse_response(line: &[u8]) -> Result<Vec<u8>, Error> {
    if line.is_empty() {
        return Err(Error::MalformedFrame("empty response".into()));
    }

    let status = line[0];
    if status != STATUS_OK {
        return Err(Error::Failed);
    }

    if line.len() == 1 {
        return Ok(Vec::new());
    }

    let payload = &line[1..];
    if payload.len() % 2 != 0 {
        return Err(Error::MalformedFrame(format!(
            "odd-length hex payload ({} chars)",
            payload.len()
        )));
    }

    let values = hex::decode(payload)
        .map_err(|e| Error::MalformedFrame(format!("invalid hex digit: {}", e)))?;

    if values.len() < 2 {
        return Err(Error::MalformedFrame("payload too short for checksum".into()));
    }

    let (data, sum_bytes) = values.split_at(values.len() - 2);
    let expected = checksum(data);
    let actual = u16::from_be_bytes([sum_bytes[0], sum_bytes[1]]);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }

    Ok(data.to_vec())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_frame_matches_scenario_s1() {
        assert_eq!(encode_read(0x1234), b"R12345096\n");
    }

    #[test]
    fn write_frame_matches_scenario_s2() {
        let data = [0xFFu8; 32];
        let frame = encode_write(0x0000, &data);
        assert!(frame.starts_with(b"W0000"));
        assert!(frame.ends_with(b"7030\n"));
        assert_eq!(frame.len(), 1 + 4 + 64 + 4 + 1);
    }

    #[test]
    fn ok_with_no_data_is_empty() {
        assert_eq!(parse_response(b"+").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn fail_status_is_rejected() {
        assert!(matches!(parse_response(b"-"), Err(Error::Failed)));
    }

    #[test]
    fn odd_length_payload_is_a_parse_error() {
        assert!(matches!(
            parse_response(b"+ABC"),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn non_hex_payload_is_a_parse_error() {
        assert!(matches!(
            parse_response(b"+ZZ00"),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn hex_digits_accepted_case_insensitively() {
        let frame = encode_read(0xAB12);
        // lowercase the hex portion of our own frame and confirm it still
        // round-trips through encode/decode.
        let lower: Vec<u8> = frame
            .iter()
            .map(|b| b.to_ascii_lowercase())
            .collect();
        assert_eq!(hex::decode(&lower[1..lower.len() - 1]).unwrap().len(), 4);
    }

    #[test]
    fn checksum_round_trip() {
        let data = [0x01u8, 0x02, 0x03, 0xFF, 0x00];
        let sum = checksum(&data);
        let mut payload = data.to_vec();
        payload.extend(sum.to_be_bytes());
        let mut line = vec![STATUS_OK];
        line.extend(hex::encode_upper(&payload).into_bytes());
        assert_eq!(parse_response(&line).unwrap(), data.to_vec());
    }
}
