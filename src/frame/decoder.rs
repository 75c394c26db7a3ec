//! Streaming inbound frame decoder
//!
//! Bytes arrive in arbitrary chunks. The decoder keeps them in one buffer with
//! a read cursor and emits a JSON value for every complete text frame.
//!
//! Receive-path assumption: every inbound frame uses the 16-bit extended
//! length (`len7 == 126`). A leading byte other than [`FIN_TEXT`], or a
//! length byte other than `0x7E` (short frames, 64-bit lengths, masked
//! frames), stalls the decoder until [`DecoderConfig::max_stalled_reads`]
//! pulls have passed without progress. Nothing is consumed while stalled.
//!
//! Buffer growth is not capped while a single payload completes. The 16-bit
//! length limits one pending payload to 65 535 bytes.

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::{FIN_TEXT, LENGTH_7};
use crate::config::{DEFAULT_MAX_STALLED_READS, DEFAULT_READ_SIZE};
use crate::transport::Transport;
use crate::{FeedError, Result};

const HEADER_LEN: usize = 4;
const COMPACT_THRESHOLD: usize = 64 * 1024;

/// Decoder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum bytes requested per pull
    pub read_size: usize,

    /// Consecutive stalled pulls tolerated before [`FeedError::Protocol`]
    pub max_stalled_reads: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { read_size: DEFAULT_READ_SIZE, max_stalled_reads: DEFAULT_MAX_STALLED_READS }
    }
}

/// Outcome of one decode step over the buffered bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeStatus {
    /// A complete frame was consumed
    Message(Value),

    /// Fewer bytes are buffered than the next frame needs
    Incomplete,

    /// The frame at the cursor has an unhandled header; carries the
    /// offending byte (leading or length byte)
    Stalled(u8),
}

/// Pull-based frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    cursor: usize,
    config: DecoderConfig,
    stalled_reads: u32,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { buffer: Vec::with_capacity(config.read_size), cursor: 0, config, stalled_reads: 0 }
    }

    /// Decoder seeded with bytes already read from the connection.
    pub fn with_initial_bytes(config: DecoderConfig, bytes: &[u8]) -> Self {
        let mut decoder = Self::new(config);
        decoder.extend(bytes);
        decoder
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Append received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Try to decode one frame from buffered bytes.
    ///
    /// A fully buffered frame whose payload is not JSON is skipped and
    /// reported as [`FeedError::MalformedPayload`].
    pub fn decode_next(&mut self) -> Result<DecodeStatus> {
        if self.pending() < 2 {
            return Ok(DecodeStatus::Incomplete);
        }

        let start = self.cursor;
        let leading = self.buffer[start];
        if leading != FIN_TEXT {
            return Ok(DecodeStatus::Stalled(leading));
        }
        let len7 = self.buffer[start + 1];
        if usize::from(len7) != LENGTH_7 {
            return Ok(DecodeStatus::Stalled(len7));
        }
        if self.pending() < HEADER_LEN {
            return Ok(DecodeStatus::Incomplete);
        }

        let length = u16::from_be_bytes([self.buffer[start + 2], self.buffer[start + 3]]) as usize;
        let end = start + HEADER_LEN + length;
        if self.buffer.len() < end {
            return Ok(DecodeStatus::Incomplete);
        }

        let parsed = serde_json::from_slice(&self.buffer[start + HEADER_LEN..end]);
        self.cursor = end;
        self.stalled_reads = 0;
        self.compact();

        match parsed {
            Ok(value) => {
                trace!("Decoded frame of {} bytes", length);
                Ok(DecodeStatus::Message(value))
            }
            Err(source) => Err(FeedError::MalformedPayload { length, source }),
        }
    }

    /// Decode every complete frame currently buffered.
    ///
    /// Stops at the first incomplete or stalled position. A malformed payload
    /// ends the batch with an error; frames decoded before it are lost to the
    /// caller, so prefer [`FrameDecoder::decode_next`] when that matters.
    pub fn drain(&mut self) -> Result<Vec<Value>> {
        let mut messages = Vec::new();
        while let DecodeStatus::Message(value) = self.decode_next()? {
            messages.push(value);
        }
        Ok(messages)
    }

    /// Next JSON message, pulling from `transport` as needed.
    ///
    /// Returns `Ok(None)` once the transport reports an orderly close.
    pub async fn next_message<T>(&mut self, transport: &mut T) -> Result<Option<Value>>
    where
        T: Transport + ?Sized,
    {
        loop {
            match self.decode_next()? {
                DecodeStatus::Message(value) => return Ok(Some(value)),
                DecodeStatus::Incomplete => {}
                DecodeStatus::Stalled(leading) => {
                    self.stalled_reads += 1;
                    if self.stalled_reads > self.config.max_stalled_reads {
                        return Err(FeedError::protocol(format!(
                            "unhandled frame header {:#04x} after {} reads",
                            leading, self.config.max_stalled_reads
                        )));
                    }
                    warn!(
                        "Unhandled frame header {:#04x}, waiting for more data ({}/{})",
                        leading, self.stalled_reads, self.config.max_stalled_reads
                    );
                }
            }

            let chunk = transport.receive(self.config.read_size).await?;
            if chunk.is_empty() {
                if self.pending() > 0 {
                    debug!("Connection closed with {} undecoded bytes", self.pending());
                }
                return Ok(None);
            }
            trace!("Pulled {} bytes ({} pending)", chunk.len(), self.pending());
            self.extend(&chunk);
        }
    }

    fn compact(&mut self) {
        if self.cursor == self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
        } else if self.buffer.len() >= COMPACT_THRESHOLD && self.cursor * 2 >= self.buffer.len() {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Opcode};
    use crate::test_utils::{ScriptedTransport, server_text_frame, ticker_json};
    use proptest::prelude::*;
    use serde_json::json;

    fn small_config() -> DecoderConfig {
        DecoderConfig { read_size: 16, max_stalled_reads: 3 }
    }

    #[test]
    fn decodes_single_buffered_frame() {
        let payload = ticker_json("ETH-USD", "3149.35", "0.00275791");
        let mut decoder = FrameDecoder::new(DecoderConfig::default());
        decoder.extend(&server_text_frame(payload.as_bytes()));

        let messages = decoder.drain().unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["product_id"], "ETH-USD");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn waits_for_header_and_payload() {
        let frame = server_text_frame(br#"{"type":"heartbeat"}"#);
        let mut decoder = FrameDecoder::new(DecoderConfig::default());

        decoder.extend(&frame[..3]);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Incomplete);

        decoder.extend(&frame[3..frame.len() - 1]);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Incomplete);

        decoder.extend(&frame[frame.len() - 1..]);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Message(json!({"type": "heartbeat"})));
    }

    #[test]
    fn reports_stall_on_unhandled_header() {
        let mut decoder = FrameDecoder::new(DecoderConfig::default());
        decoder.extend(&[0x89, 0x00, 0x00, 0x00]);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Stalled(0x89));
        // Nothing is consumed while stalled
        assert_eq!(decoder.pending(), 4);
    }

    #[test]
    fn inline_length_text_frame_stalls_instead_of_misreading() {
        let payload = br#"{"type":"heartbeat","sequence":1}"#;
        let short = Frame { mask: false, ..Frame::text(payload.to_vec()) }.format([0; 4]).unwrap();
        assert_eq!(short[1] as usize, payload.len());

        let mut decoder = FrameDecoder::new(DecoderConfig::default());
        decoder.extend(&short);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Stalled(payload.len() as u8));
        assert_eq!(decoder.pending(), short.len());
    }

    #[tokio::test]
    async fn inline_length_frame_hits_stall_bound() {
        let short = Frame { mask: false, ..Frame::text(br#"{"seq":0}"#.to_vec()) }.format([0; 4]).unwrap();
        let mut stream = short;
        stream.extend(std::iter::repeat_n(0u8, 64));
        let mut transport = ScriptedTransport::new(stream, 4);
        let mut decoder = FrameDecoder::new(small_config());

        let result = decoder.next_message(&mut transport).await;

        assert!(matches!(result, Err(FeedError::Protocol { .. })));
    }

    #[test]
    fn malformed_payload_is_skipped_with_error() {
        let mut stream = server_text_frame(b"{not json}");
        stream.extend(server_text_frame(br#"{"ok":true}"#));
        let mut decoder = FrameDecoder::new(DecoderConfig::default());
        decoder.extend(&stream);

        match decoder.decode_next() {
            Err(FeedError::MalformedPayload { length, .. }) => assert_eq!(length, 10),
            other => panic!("expected malformed payload, got {:?}", other),
        }
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Message(json!({"ok": true})));
    }

    #[test]
    fn truncated_json_is_not_reported_as_malformed() {
        let frame = server_text_frame(br#"{"price":"1.5"}"#);
        let mut decoder = FrameDecoder::new(DecoderConfig::default());
        // `{"price":` alone would be a JSON syntax error if parsed early
        decoder.extend(&frame[..13]);
        assert_eq!(decoder.decode_next().unwrap(), DecodeStatus::Incomplete);
    }

    #[tokio::test]
    async fn next_message_pulls_until_close() {
        let mut stream = Vec::new();
        for i in 0..3 {
            stream.extend(server_text_frame(format!(r#"{{"seq":{}}}"#, i).as_bytes()));
        }
        let mut transport = ScriptedTransport::new(stream, 5);
        let mut decoder = FrameDecoder::new(small_config());

        for i in 0..3 {
            let message = decoder.next_message(&mut transport).await.unwrap();
            assert_eq!(message, Some(json!({ "seq": i })));
        }
        assert_eq!(decoder.next_message(&mut transport).await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeded_bytes_are_decoded_before_pulling() {
        let frame = server_text_frame(br#"{"seq":0}"#);
        let mut transport = ScriptedTransport::new(Vec::new(), 5);
        let mut decoder = FrameDecoder::with_initial_bytes(small_config(), &frame);

        assert_eq!(decoder.next_message(&mut transport).await.unwrap(), Some(json!({"seq": 0})));
        assert_eq!(transport.receive_calls(), 0);
    }

    #[tokio::test]
    async fn stall_is_bounded() {
        let mut stream = vec![0x88, 0x02, 0x03, 0xE8];
        stream.extend(std::iter::repeat_n(0u8, 64));
        let mut transport = ScriptedTransport::new(stream, 4);
        let mut decoder = FrameDecoder::new(small_config());

        let result = decoder.next_message(&mut transport).await;

        assert!(matches!(result, Err(FeedError::Protocol { .. })));
    }

    proptest! {
        #[test]
        fn chunked_stream_yields_every_frame_in_order(
            payloads in prop::collection::vec(
                ("[A-Z]{3}-[A-Z]{3}", 0.0001f64..100_000.0, 0.0001f64..1_000.0),
                1..20,
            ),
            chunk_size in 1usize..64,
        ) {
            let expected: Vec<String> = payloads
                .iter()
                .map(|(id, price, qty)| ticker_json(id, &price.to_string(), &qty.to_string()))
                .collect();

            let mut stream = Vec::new();
            for payload in &expected {
                stream.extend(server_text_frame(payload.as_bytes()));
            }

            let mut decoder = FrameDecoder::new(DecoderConfig::default());
            let mut decoded = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                decoder.extend(chunk);
                decoded.extend(decoder.drain().unwrap());
            }

            prop_assert_eq!(decoded.len(), expected.len());
            for (value, payload) in decoded.iter().zip(&expected) {
                let original: Value = serde_json::from_str(payload).unwrap();
                prop_assert_eq!(value, &original);
            }
            prop_assert_eq!(decoder.pending(), 0);
        }

        #[test]
        fn encoded_then_unmasked_frame_round_trips(
            size in LENGTH_7..=u16::MAX as usize,
            fill in "[a-zA-Z0-9 ]",
        ) {
            // JSON string of exactly `size` bytes
            let payload = format!("\"{}\"", fill.repeat(size - 2));
            let server_view = Frame { mask: false, ..Frame::new(Opcode::Text, payload.clone()) }
                .format([0; 4])
                .unwrap();
            prop_assert_eq!(server_view[1] as usize, LENGTH_7);

            let mut decoder = FrameDecoder::new(DecoderConfig::default());
            decoder.extend(&server_view);
            let messages = decoder.drain().unwrap();

            prop_assert_eq!(messages.len(), 1);
            prop_assert_eq!(&messages[0], &serde_json::from_str::<Value>(&payload).unwrap());
            prop_assert_eq!(decoder.pending(), 0);
        }
    }
}
