//! Wire codec for the two inverter protocols: the AA55 fixed-header protocol
//! and the Modbus-style register protocol.
//!
//! A command owns its encoded request and validates the matching reply,
//! handing back only the payload bytes inside the frame.

mod checksum;
mod error;
mod legacy;
mod modbus;

pub use checksum::{additive_checksum, crc16};
pub use error::{CodecError, ExceptionCode};
pub use legacy::{LegacyCommand, DEFAULT_PAYLOAD_OFFSET};
pub use modbus::{FunctionCode, ModbusCommand};

/// A request that can be put on the wire and check its own reply.
pub trait Request {
    fn encode(&self) -> &[u8];

    /// Validates a raw reply and returns the payload slice within it.
    fn validate<'a>(&self, response: &'a [u8]) -> Result<&'a [u8], CodecError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Legacy(LegacyCommand),
    Modbus(ModbusCommand),
}

impl Request for Command {
    fn encode(&self) -> &[u8] {
        match self {
            Command::Legacy(cmd) => cmd.encode(),
            Command::Modbus(cmd) => cmd.encode(),
        }
    }

    fn validate<'a>(&self, response: &'a [u8]) -> Result<&'a [u8], CodecError> {
        match self {
            Command::Legacy(cmd) => cmd.validate(response),
            Command::Modbus(cmd) => cmd.validate(response),
        }
    }
}

impl From<LegacyCommand> for Command {
    fn from(cmd: LegacyCommand) -> Self {
        Command::Legacy(cmd)
    }
}

impl From<ModbusCommand> for Command {
    fn from(cmd: ModbusCommand) -> Self {
        Command::Modbus(cmd)
    }
}
