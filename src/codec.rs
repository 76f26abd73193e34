use crate::protocol::DELIMITER;
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Bytes buffered without seeing a delimiter before the buffer is discarded
const MAX_FRAME_LEN: usize = 1024;

/// One delimited response from the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Raw frame text
    pub text: String,
    /// Whether `text` still ends with the delimiter
    pub includes_delimiter: bool,
}

impl InboundFrame {
    /// Create a frame from already split text
    pub fn new(text: impl Into<String>, includes_delimiter: bool) -> Self {
        Self {
            text: text.into(),
            includes_delimiter,
        }
    }

    /// Frame text without the trailing delimiter
    pub fn body(&self) -> &str {
        if self.includes_delimiter {
            self.text.strip_suffix(DELIMITER).unwrap_or(&self.text)
        } else {
            &self.text
        }
    }
}

/// Splits the inbound byte stream on a single delimiter byte and writes
/// outbound frames verbatim
#[derive(Debug, Clone)]
pub struct DelimiterCodec {
    delimiter: u8,
    include_delimiter: bool,
}

impl DelimiterCodec {
    /// Codec for `delimiter`; `include_delimiter` controls whether emitted
    /// frames keep it
    pub fn new(delimiter: u8, include_delimiter: bool) -> Self {
        Self {
            delimiter,
            include_delimiter,
        }
    }

    pub fn include_delimiter(&self) -> bool {
        self.include_delimiter
    }
}

impl Default for DelimiterCodec {
    fn default() -> Self {
        Self::new(DELIMITER as u8, true)
    }
}

impl Decoder for DelimiterCodec {
    type Item = InboundFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == self.delimiter) else {
                if src.len() > MAX_FRAME_LEN {
                    tracing::debug!("Discarding {} bytes without delimiter", src.len());
                    src.clear();
                }
                return Ok(None);
            };

            let raw = src.split_to(pos + 1);
            let body = String::from_utf8_lossy(&raw[..pos]);
            let body = body.trim();

            // Back-to-back delimiters or line noise
            if body.is_empty() {
                continue;
            }

            let mut text = body.to_string();
            if self.include_delimiter {
                text.push(self.delimiter as char);
            }

            tracing::trace!("RX frame: {}", text);
            return Ok(Some(InboundFrame::new(text, self.include_delimiter)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    tracing::debug!("Dropping {} trailing bytes at end of stream", src.len());
                    src.advance(src.len());
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for DelimiterCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_back_to_back_frames() {
        let mut codec = DelimiterCodec::default();
        let mut buf = BytesMut::from(&b"?1VO15+?1MU0+"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, InboundFrame::new("?1VO15+", true));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.body(), "?1MU0");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn holds_partial_frame_until_delimiter() {
        let mut codec = DelimiterCodec::default();
        let mut buf = BytesMut::from(&b"?2SS"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4, "partial frame must stay buffered");

        buf.put_slice(b"3+");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.text, "?2SS3+");
    }

    #[test]
    fn strips_delimiter_when_not_retained() {
        let mut codec = DelimiterCodec::new(b'+', false);
        let mut buf = BytesMut::from(&b"?1VO15+"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, InboundFrame::new("?1VO15", false));
        assert_eq!(frame.body(), "?1VO15");
    }

    #[test]
    fn skips_line_noise_and_empty_frames() {
        let mut codec = DelimiterCodec::default();
        let mut buf = BytesMut::from(&b"\r\n++ ?3PR1+\r\n"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.text, "?3PR1+");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn discards_runaway_buffer() {
        let mut codec = DelimiterCodec::default();
        let mut buf = BytesMut::from(&vec![b'x'; MAX_FRAME_LEN + 1][..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn encodes_frame_verbatim() {
        let mut codec = DelimiterCodec::default();
        let mut buf = BytesMut::new();
        codec.encode("!1VO10+".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"!1VO10+");
    }
}
