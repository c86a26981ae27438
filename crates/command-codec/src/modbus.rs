//! Modbus-style protocol spoken over the inverter's UDP port.
//!
//! Requests are a bare 8-byte RTU frame. Responses carry a 2-byte `AA 55`
//! prefix, so the function code sits at offset 3 and the CRC covers
//! everything from offset 2 up to the trailing two bytes.

use crate::checksum::crc16;
use crate::error::{CodecError, ExceptionCode};
use crate::Request;

const SLAVE_ADDRESS: u8 = 0xF7;
const MIN_RESPONSE_LEN: usize = 4;
const FUNCTION_INDEX: usize = 3;
const BYTE_COUNT_INDEX: usize = 4;
const DATA_START: usize = 5;
const CRC_START: usize = 2;
const CRC_LEN: usize = 2;
const READ_OVERHEAD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    Read,
    // TODO: write support needs the 0x06/0x10 response layouts confirmed on a device.
    Write,
    WriteMulti,
}

impl FunctionCode {
    pub fn code(self) -> u8 {
        match self {
            FunctionCode::Read => 0x03,
            FunctionCode::Write => 0x06,
            FunctionCode::WriteMulti => 0x10,
        }
    }
}

impl TryFrom<u8> for FunctionCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x03 => Ok(FunctionCode::Read),
            0x06 => Ok(FunctionCode::Write),
            0x10 => Ok(FunctionCode::WriteMulti),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusCommand {
    frame: [u8; 8],
    function: FunctionCode,
    offset: u16,
    value: u16,
}

impl ModbusCommand {
    pub fn new(function: FunctionCode, offset: u16, value: u16) -> Result<Self, CodecError> {
        if function != FunctionCode::Read {
            return Err(CodecError::Unimplemented(function));
        }
        Ok(Self::encode_frame(function, offset, value))
    }

    /// Read `count` holding registers starting at `offset`.
    pub fn read(offset: u16, count: u16) -> Self {
        Self::encode_frame(FunctionCode::Read, offset, count)
    }

    fn encode_frame(function: FunctionCode, offset: u16, value: u16) -> Self {
        let [offset_hi, offset_lo] = offset.to_be_bytes();
        let [value_hi, value_lo] = value.to_be_bytes();
        let head = [
            SLAVE_ADDRESS,
            function.code(),
            offset_hi,
            offset_lo,
            value_hi,
            value_lo,
        ];
        let [crc_lo, crc_hi] = crc16(&head).to_le_bytes();

        let mut frame = [0u8; 8];
        frame[..6].copy_from_slice(&head);
        frame[6] = crc_lo;
        frame[7] = crc_hi;

        Self {
            frame,
            function,
            offset,
            value,
        }
    }

    pub fn function(&self) -> FunctionCode {
        self.function
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

impl Request for ModbusCommand {
    fn encode(&self) -> &[u8] {
        &self.frame
    }

    fn validate<'a>(&self, p: &'a [u8]) -> Result<&'a [u8], CodecError> {
        if p.len() < MIN_RESPONSE_LEN {
            return Err(CodecError::Truncated { len: p.len() });
        }

        let function = p[FUNCTION_INDEX];
        let expected_len = match FunctionCode::try_from(function) {
            Ok(FunctionCode::Read) => {
                let declared = usize::from(
                    *p.get(BYTE_COUNT_INDEX)
                        .ok_or(CodecError::Truncated { len: p.len() })?,
                );
                let expected = usize::from(self.value) * 2;
                if declared != expected {
                    return Err(CodecError::ShortResponse { expected, declared });
                }
                let expected_len = declared + READ_OVERHEAD;
                if p.len() < expected_len {
                    return Err(CodecError::LengthMismatch {
                        expected: expected_len,
                        actual: p.len(),
                    });
                }
                expected_len
            }
            Ok(other) => return Err(CodecError::Unimplemented(other)),
            // Exception replies carry no byte count; the datagram is the frame.
            Err(_) => p.len(),
        };

        let crc_offset = expected_len - CRC_LEN;
        let computed = crc16(&p[CRC_START..crc_offset]);
        let received = u16::from_le_bytes([p[crc_offset], p[crc_offset + 1]]);
        if computed != received {
            return Err(CodecError::ChecksumMismatch { computed, received });
        }

        if function != self.function.code() {
            let code = *p
                .get(BYTE_COUNT_INDEX)
                .ok_or(CodecError::Truncated { len: p.len() })?;
            return Err(CodecError::DeviceException(ExceptionCode::from(code)));
        }

        Ok(&p[DATA_START..crc_offset])
    }
}
