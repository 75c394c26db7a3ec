//! Outbound frame serialization

use super::{LENGTH_7, LENGTH_16, LENGTH_63, Opcode};
use crate::{FeedError, Result};

/// A single WebSocket frame prior to serialization.
///
/// Control bits are kept as raw integers so that invalid combinations can be
/// represented and rejected by [`Frame::format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: u8,
    pub rsv1: u8,
    pub rsv2: u8,
    pub rsv3: u8,
    pub opcode: u8,
    pub mask: bool,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Final, masked frame with the given opcode.
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: 1,
            rsv1: 0,
            rsv2: 0,
            rsv3: 0,
            opcode: opcode as u8,
            mask: true,
            payload: payload.into(),
        }
    }

    /// Final, masked text frame.
    pub fn text(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Opcode::Text, payload)
    }

    /// Serialize the frame.
    ///
    /// `mask_key` is used only when the mask flag is set.
    pub fn format(&self, mask_key: [u8; 4]) -> Result<Vec<u8>> {
        for (name, bit) in
            [("fin", self.fin), ("rsv1", self.rsv1), ("rsv2", self.rsv2), ("rsv3", self.rsv3)]
        {
            if bit > 1 {
                return Err(FeedError::invalid_frame(format!("{} must be 0 or 1, got {}", name, bit)));
            }
        }
        let opcode = Opcode::try_from(self.opcode)?;

        let length = self.payload.len();
        if length as u64 >= LENGTH_63 {
            return Err(FeedError::invalid_frame(format!("payload of {} bytes is too long", length)));
        }

        let mut out = Vec::with_capacity(length + 14);
        out.push(
            self.fin << 7 | self.rsv1 << 6 | self.rsv2 << 5 | self.rsv3 << 4 | opcode as u8,
        );

        let mask_bit = u8::from(self.mask) << 7;
        if length < LENGTH_7 {
            out.push(mask_bit | length as u8);
        } else if length < LENGTH_16 {
            out.push(mask_bit | 0x7E);
            out.extend_from_slice(&(length as u16).to_be_bytes());
        } else {
            out.push(mask_bit | 0x7F);
            out.extend_from_slice(&(length as u64).to_be_bytes());
        }

        if self.mask {
            out.extend_from_slice(&mask_key);
            let start = out.len();
            out.extend_from_slice(&self.payload);
            apply_mask(mask_key, &mut out[start..]);
        } else {
            out.extend_from_slice(&self.payload);
        }

        Ok(out)
    }
}

/// XOR `data` in place with the repeating 4-byte key. Applying it twice restores the input.
pub fn apply_mask(mask_key: [u8; 4], data: &mut [u8]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask_key[i % 4];
    }
}

/// Encode `payload` as a final, masked text frame with a random mask key.
pub fn encode_text_frame(payload: &[u8]) -> Result<Vec<u8>> {
    encode_text_frame_with_mask(payload, rand::random())
}

/// Encode `payload` as a final, masked text frame with a fixed mask key.
pub fn encode_text_frame_with_mask(payload: &[u8], mask_key: [u8; 4]) -> Result<Vec<u8>> {
    Frame::text(payload).format(mask_key)
}
