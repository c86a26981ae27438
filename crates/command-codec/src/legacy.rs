//! AA55 fixed-header protocol.
//!
//! Response frames look like `AA 55 <src> <dst> <type:2> <len> <data:len> <sum:2>`,
//! so a frame is always `len + 9` bytes long.

use crate::checksum::additive_checksum;
use crate::error::CodecError;
use crate::Request;

const HEADER: [u8; 4] = [0xAA, 0x55, 0xC0, 0x7F];
const MIN_RESPONSE_LEN: usize = 8;
const RESPONSE_LENGTH_INDEX: usize = 6;
const RESPONSE_LENGTH_OVERHEAD: usize = 9;
const RESPONSE_TYPE_INDEX: usize = 4;
const CHECKSUM_LEN: usize = 2;

/// Offset of the first data byte in a response frame, just past the length byte.
pub const DEFAULT_PAYLOAD_OFFSET: usize = 7;

const IDENTIFY_PAYLOAD: [u8; 3] = [0x01, 0x02, 0x00];
const IDENTIFY_RESPONSE_TYPE: u16 = 0x0182;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCommand {
    frame: Vec<u8>,
    response_type: u16,
    payload_offset: usize,
}

impl LegacyCommand {
    /// Builds a request from hex text. `response_type` is the 2-byte tag a
    /// valid reply carries, also as hex.
    pub fn new(payload: &str, response_type: &str) -> Result<Self, CodecError> {
        let payload = hex::decode(payload)?;
        let mut tag = [0u8; 2];
        hex::decode_to_slice(response_type, &mut tag)?;
        Ok(Self::from_parts(&payload, u16::from_be_bytes(tag)))
    }

    /// Device identification request (model name, serial number).
    pub fn identify() -> Self {
        Self::from_parts(&IDENTIFY_PAYLOAD, IDENTIFY_RESPONSE_TYPE)
    }

    fn from_parts(payload: &[u8], response_type: u16) -> Self {
        let mut frame = Vec::with_capacity(HEADER.len() + payload.len() + CHECKSUM_LEN);
        frame.extend_from_slice(&HEADER);
        frame.extend_from_slice(payload);
        let sum = additive_checksum(&frame);
        frame.extend_from_slice(&sum.to_be_bytes());

        Self {
            frame,
            response_type,
            payload_offset: DEFAULT_PAYLOAD_OFFSET,
        }
    }

    /// Overrides where the returned payload starts within a validated frame.
    pub fn with_payload_offset(mut self, offset: usize) -> Self {
        self.payload_offset = offset;
        self
    }

    pub fn response_type(&self) -> u16 {
        self.response_type
    }

    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }
}

impl Request for LegacyCommand {
    fn encode(&self) -> &[u8] {
        &self.frame
    }

    fn validate<'a>(&self, p: &'a [u8]) -> Result<&'a [u8], CodecError> {
        if p.len() < MIN_RESPONSE_LEN {
            return Err(CodecError::Truncated { len: p.len() });
        }

        let expected = usize::from(p[RESPONSE_LENGTH_INDEX]) + RESPONSE_LENGTH_OVERHEAD;
        if p.len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: p.len(),
            });
        }

        let actual = u16::from_be_bytes([p[RESPONSE_TYPE_INDEX], p[RESPONSE_TYPE_INDEX + 1]]);
        if actual != self.response_type {
            return Err(CodecError::TypeMismatch {
                expected: self.response_type,
                actual,
            });
        }

        let body_end = p.len() - CHECKSUM_LEN;
        let computed = additive_checksum(&p[..body_end]);
        let received = u16::from_be_bytes([p[body_end], p[body_end + 1]]);
        if computed != received {
            return Err(CodecError::ChecksumMismatch { computed, received });
        }

        let start = self.payload_offset.min(body_end);
        Ok(&p[start..body_end])
    }
}
