//! Length-prefixed, XOR-obfuscated framing for the TCP stream.
//!
//! ```text
//! +-------------------+------------------------------+
//! | length (4 bytes)  |   obfuscated payload         |
//! | u32 little-endian |   (length bytes)             |
//! +-------------------+------------------------------+
//! ```
//!
//! The length counts only the payload bytes. The payload is the UTF-8 text of
//! a packet XORed byte-wise against [`OBFUSCATION_KEY`], repeating the key from
//! the start of every payload. XOR is its own inverse, so [`obfuscate`] both
//! hides and reveals.
//!
//! TCP delivers bytes in arbitrary chunks, so decoding works on a growing
//! buffer: [`decode_frame`] returns `Ok(None)` until a whole frame is present
//! and reports how many leading bytes it consumed once one is.

/// Shared key known to both ends. Deters casual tampering, nothing more.
pub const OBFUSCATION_KEY: &[u8] = b"Happy_New_Year_2_0_2_6_!!!";

/// Size of the little-endian length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Default upper bound on a single payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1_048_576;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The peer declared a payload larger than we are willing to buffer.
    #[error("declared frame length {size} exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}

/// XORs `data` in place against the repeating key.
pub fn obfuscate(data: &mut [u8]) {
    for (byte, key) in data.iter_mut().zip(OBFUSCATION_KEY.iter().cycle()) {
        *byte ^= key;
    }
}

/// Wraps already-encoded packet text into a wire frame.
pub fn encode_frame(text: &str) -> Vec<u8> {
    let mut payload = text.as_bytes().to_vec();
    obfuscate(&mut payload);

    let mut frame = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame
}

/// One complete frame pulled off the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// De-obfuscated payload bytes.
    pub payload: Vec<u8>,
    /// Leading bytes of the buffer this frame occupied, prefix included.
    pub consumed: usize,
}

/// Tries to decode the frame at the start of `buf`.
///
/// Returns `Ok(None)` while fewer than `4 + declared length` bytes are
/// available; the caller retries once more bytes arrive.
pub fn decode_frame(buf: &[u8], max_len: usize) -> Result<Option<Frame>, FrameError> {
    if buf.len() < LENGTH_PREFIX {
        return Ok(None);
    }

    let mut len_bytes = [0u8; LENGTH_PREFIX];
    len_bytes.copy_from_slice(&buf[..LENGTH_PREFIX]);
    let declared = u32::from_le_bytes(len_bytes) as usize;

    if declared > max_len {
        return Err(FrameError::TooLarge {
            size: declared,
            max: max_len,
        });
    }

    let total = LENGTH_PREFIX + declared;
    if buf.len() < total {
        return Ok(None);
    }

    let mut payload = buf[LENGTH_PREFIX..total].to_vec();
    obfuscate(&mut payload);

    Ok(Some(Frame {
        payload,
        consumed: total,
    }))
}

/// Accumulates transport chunks and yields complete payloads in order.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_len: usize,
}

impl FrameDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_len,
        }
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next complete payload, compacting the buffer behind it.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        match decode_frame(&self.buffer, self.max_len)? {
            Some(frame) => {
                self.buffer.drain(..frame.consumed);
                Ok(Some(frame.payload))
            }
            None => Ok(None),
        }
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obfuscation_is_symmetric() {
        let original = b"END_TURN|{}".to_vec();
        let mut data = original.clone();

        obfuscate(&mut data);
        assert_ne!(data, original);

        obfuscate(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_key_repeats_past_its_length() {
        let mut data = vec![0u8; OBFUSCATION_KEY.len() * 2 + 3];
        obfuscate(&mut data);

        assert_eq!(&data[..OBFUSCATION_KEY.len()], OBFUSCATION_KEY);
        assert_eq!(
            &data[OBFUSCATION_KEY.len()..OBFUSCATION_KEY.len() * 2],
            OBFUSCATION_KEY
        );
        assert_eq!(&data[OBFUSCATION_KEY.len() * 2..], &OBFUSCATION_KEY[..3]);
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let frame = encode_frame("hello");
        assert_eq!(&frame[..4], &5u32.to_le_bytes());
        assert_eq!(frame.len(), 9);
        assert_ne!(&frame[4..], b"hello");
    }

    #[test]
    fn test_reencoding_decoded_frame_reproduces_bytes() {
        let long = "x".repeat(300);
        for text in ["", "a", "RESPONSE|{\"success\":true,\"message\":\"Подключено\"}", long.as_str()] {
            let bytes = encode_frame(text);
            let frame = decode_frame(&bytes, DEFAULT_MAX_FRAME_LEN).unwrap().unwrap();
            assert_eq!(frame.consumed, bytes.len());

            let text_back = String::from_utf8(frame.payload).unwrap();
            assert_eq!(encode_frame(&text_back), bytes);
        }
    }

    #[test]
    fn test_incomplete_prefix_waits_for_more() {
        let bytes = encode_frame("JOIN|{}");
        for cut in 0..LENGTH_PREFIX {
            assert_eq!(decode_frame(&bytes[..cut], DEFAULT_MAX_FRAME_LEN), Ok(None));
        }
    }

    #[test]
    fn test_incomplete_payload_waits_for_more() {
        let bytes = encode_frame("JOIN|{}");
        assert_eq!(
            decode_frame(&bytes[..bytes.len() - 1], DEFAULT_MAX_FRAME_LEN),
            Ok(None)
        );
    }

    #[test]
    fn test_declared_length_over_limit_is_rejected() {
        let mut bytes = 64u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);

        assert_eq!(
            decode_frame(&bytes, 16),
            Err(FrameError::TooLarge { size: 64, max: 16 })
        );
    }

    #[test]
    fn test_decoder_reassembles_byte_by_byte() {
        let mut stream = encode_frame("BUILD|{\"placeId\":3,\"type\":\"Farm\"}");
        stream.extend(encode_frame("END_TURN|{}"));

        let mut decoder = FrameDecoder::default();
        let mut payloads = Vec::new();
        for byte in &stream {
            decoder.extend(std::slice::from_ref(byte));
            while let Some(payload) = decoder.next_frame().unwrap() {
                payloads.push(String::from_utf8(payload).unwrap());
            }
        }

        assert_eq!(
            payloads,
            vec!["BUILD|{\"placeId\":3,\"type\":\"Farm\"}", "END_TURN|{}"]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_keeps_trailing_partial_frame() {
        let first = encode_frame("A|{}");
        let second = encode_frame("B|{}");
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second[..3]);

        let mut decoder = FrameDecoder::default();
        decoder.extend(&chunk);

        assert_eq!(decoder.next_frame().unwrap(), Some(b"A|{}".to_vec()));
        assert_eq!(decoder.next_frame().unwrap(), None);
        assert_eq!(decoder.buffered(), 3);

        decoder.extend(&second[3..]);
        assert_eq!(decoder.next_frame().unwrap(), Some(b"B|{}".to_vec()));
    }
}
