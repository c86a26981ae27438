use std::fmt;

use thiserror::Error;

use crate::modbus::FunctionCode;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex input: {0}")]
    Encoding(#[from] hex::FromHexError),
    #[error("response truncated ({len} bytes)")]
    Truncated { len: usize },
    #[error("unexpected response length {actual} (expected {expected})")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("unexpected response type `{actual:04x}` (expected `{expected:04x}`)")]
    TypeMismatch { expected: u16, actual: u16 },
    #[error("invalid checksum {computed:#06x} (frame carries {received:#06x})")]
    ChecksumMismatch { computed: u16, received: u16 },
    #[error("short response: expected {expected} data bytes, frame declares {declared}")]
    ShortResponse { expected: usize, declared: usize },
    #[error("command failed with code {}: {0}", .0.code())]
    DeviceException(ExceptionCode),
    #[error("{0:?} commands are not implemented")]
    Unimplemented(FunctionCode),
}

impl CodecError {
    /// Whether re-sending the same request can change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CodecError::Encoding(_) | CodecError::Unimplemented(_))
    }
}

/// Failure codes a Modbus slave reports in place of a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    NegativeAcknowledgement,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetDeviceFailedToRespond,
    Unknown(u8),
}

impl ExceptionCode {
    pub fn code(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::SlaveDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::SlaveDeviceBusy => 0x06,
            ExceptionCode::NegativeAcknowledgement => 0x07,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x09,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => 0x0A,
            ExceptionCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::SlaveDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::SlaveDeviceBusy,
            0x07 => ExceptionCode::NegativeAcknowledgement,
            0x08 => ExceptionCode::MemoryParityError,
            0x09 => ExceptionCode::GatewayPathUnavailable,
            0x0A => ExceptionCode::GatewayTargetDeviceFailedToRespond,
            other => ExceptionCode::Unknown(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::SlaveDeviceFailure => "slave device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::SlaveDeviceBusy => "slave device busy",
            ExceptionCode::NegativeAcknowledgement => "negative acknowledgement",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                "gateway target device failed to respond"
            }
            ExceptionCode::Unknown(_) => "unknown failure",
        };
        f.write_str(name)
    }
}
