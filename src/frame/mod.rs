//! WebSocket frame codec.
//!
//! Outbound frames are always masked, as required for client-to-server
//! traffic. The inbound decoder deliberately handles a single frame shape:
//! final, unmasked text frames with a 16-bit extended length. That is what
//! the feed emits for ticker traffic.
//!
//! ## Wire Layout
//!
//! ```text
//!  0               1               2               3
//!  F R R R opcode  M len7          extended length (16 or 64 bit)
//!  I S S S         A
//!  N V V V         S
//!    1 2 3         K
//! ```

mod decoder;
mod encoder;

pub use decoder::{DecodeStatus, DecoderConfig, FrameDecoder};
pub use encoder::{Frame, apply_mask, encode_text_frame, encode_text_frame_with_mask};

/// Payloads below this fit the inline 7-bit length field.
pub const LENGTH_7: usize = 0x7E;

/// Payloads below this use the 16-bit extended length.
pub const LENGTH_16: usize = 1 << 16;

/// Payloads at or above this cannot be encoded.
pub const LENGTH_63: u64 = 1 << 63;

/// Leading byte of a final text frame (`fin=1`, `rsv=000`, `opcode=1`).
pub const FIN_TEXT: u8 = 0x81;

/// Frame operation codes defined by RFC 6455.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    /// Whether this opcode marks a control frame.
    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = crate::FeedError;

    fn try_from(value: u8) -> crate::Result<Self> {
        match value {
            0x0 => Ok(Opcode::Continuation),
            0x1 => Ok(Opcode::Text),
            0x2 => Ok(Opcode::Binary),
            0x8 => Ok(Opcode::Close),
            0x9 => Ok(Opcode::Ping),
            0xA => Ok(Opcode::Pong),
            other => Err(crate::FeedError::invalid_frame(format!("invalid opcode {:#x}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_u8() {
        for opcode in [
            Opcode::Continuation,
            Opcode::Text,
            Opcode::Binary,
            Opcode::Close,
            Opcode::Ping,
            Opcode::Pong,
        ] {
            assert_eq!(Opcode::try_from(opcode as u8).unwrap(), opcode);
        }
    }

    #[test]
    fn reserved_opcodes_are_rejected() {
        for raw in [0x3, 0x7, 0xB, 0xF] {
            assert!(Opcode::try_from(raw).is_err());
        }
    }

    #[test]
    fn control_classification() {
        assert!(Opcode::Ping.is_control());
        assert!(!Opcode::Text.is_control());
    }
}
