//! Single error taxonomy for the protocol engine.
//!
//! Every fallible operation in this crate returns [`Error`]. The Transport
//! layer is the only place that retries on its own, and only for
//! [`Error::Failed`], [`Error::MalformedFrame`] and [`Error::ChecksumMismatch`]
//! — every other variant surfaces to the caller immediately.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown device `{0}`")]
    UnknownDevice(String),

    #[error("invalid file name `{0}`")]
    InvalidFilename(String),

    #[error("address/length out of range: {0}")]
    Range(String),

    #[error("byte value out of range: {0}")]
    ByteOutOfRange(i64),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("checksum mismatch: expected {expected:#06X}, got {actual:#06X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("unexpected response length: expected {expected}, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("device returned failure status")]
    Failed,

    #[error("software-UART echo mismatch: sent {sent:#04X}, echoed {echoed:#04X}")]
    EchoMismatch { sent: u8, echoed: u8 },

    #[error(
        "protocol version too low: device reports {actual}, need at least {minimum}"
    )]
    ProtocolVersion { actual: u8, minimum: u8 },

    #[error(
        "device identity mismatch: expected family {expected_family:#04X}/model {expected_model:#04X}, got {actual_family:#04X}/{actual_model:#04X}"
    )]
    IdentityMismatch {
        expected_family: u8,
        expected_model: u8,
        actual_family: u8,
        actual_model: u8,
    },

    #[error("command '{opcode}' failed after exhausting retries")]
    Transport { opcode: char },

    #[error(
        "verification failed at address {address:#06X}: expected {expected:#04X}, got {actual:#04X}"
    )]
    Verification {
        address: u16,
        expected: u8,
        actual: u8,
    },

    #[error("first opcode {opcode:#06X} is not a relative-jump instruction")]
    NotRelativeJump { opcode: u16 },

    #[error("image leaves no room for the relocated entry record")]
    NoRoomForEntryRecord,

    #[error("not connected to a device")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
