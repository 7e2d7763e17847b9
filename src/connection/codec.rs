//! Line framing for tokio transports.

#[cfg(feature = "encoding")]
use std::io;

use bytes::BytesMut;
#[cfg(feature = "encoding")]
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ClientError, Result};

/// Splits a byte stream into lines and terminates outgoing ones.
///
/// Lines end at `\n`; a trailing `\r` is stripped. There is no length limit
/// unless one is set with [`LineCodec::with_max_len`]. Invalid UTF-8 is
/// replaced rather than rejected.
#[derive(Debug)]
pub struct LineCodec {
    #[cfg(feature = "encoding")]
    encoding: &'static Encoding,
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: Option<usize>,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self {
            #[cfg(feature = "encoding")]
            encoding: encoding::UTF_8,
            next_index: 0,
            max_len: None,
        }
    }
}

impl LineCodec {
    /// UTF-8 codec without a length limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec for a named character encoding, e.g. `iso-8859-1`.
    #[cfg(feature = "encoding")]
    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            ClientError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown encoding: {label}"),
            ))
        })?;
        Ok(Self {
            encoding,
            ..Self::default()
        })
    }

    /// Reject lines longer than `max_len` bytes.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn check_len(&self, len: usize) -> Result<()> {
        match self.max_len {
            Some(limit) if len > limit => Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line of {len} bytes exceeds limit of {limit}"),
            ))),
            _ => Ok(()),
        }
    }

    fn decode_bytes(&self, raw: &[u8]) -> String {
        #[cfg(feature = "encoding")]
        {
            let (cow, _enc, _had_errors) = self.encoding.decode(raw);
            cow.into_owned()
        }

        #[cfg(not(feature = "encoding"))]
        {
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            self.check_len(line.len())?;

            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            Ok(Some(self.decode_bytes(&line[..end])))
        } else {
            self.next_index = src.len();
            self.check_len(src.len())?;
            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Unterminated final line.
        let rest = src.split_to(src.len());
        self.next_index = 0;
        let text = self.decode_bytes(&rest);
        Ok(Some(text.trim_end_matches('\r').to_string()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = ClientError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<()> {
        // Anything after an embedded line break would be read as a second command.
        let line = msg
            .split(['\r', '\n'])
            .next()
            .unwrap_or_default();

        #[cfg(feature = "encoding")]
        {
            let (bytes, _enc, _had_errors) = self.encoding.encode(line);
            dst.extend_from_slice(&bytes);
        }

        #[cfg(not(feature = "encoding"))]
        {
            dst.extend_from_slice(line.as_bytes());
        }

        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_crlf_and_lf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :a\r\nPING :b\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :b".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"x\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :x".to_string()));
    }

    #[test]
    fn test_no_default_limit() {
        let mut codec = LineCodec::new();
        let long = format!("PRIVMSG #c :{}\r\n", "x".repeat(4096));
        let mut buf = BytesMut::from(long.as_str());
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.len(), long.len() - 2);

        let mut codec = LineCodec::new().with_max_len(10);
        let mut buf = BytesMut::from("this is way too long\n");
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_lossy_decode() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("PRIVMSG #c :caf"));
    }

    #[test]
    fn test_decode_eof_unterminated() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("ERROR :bye");
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("ERROR :bye".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_terminates_and_truncates() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("PONG :x".to_string(), &mut buf).unwrap();
        codec.encode("NICK a\r\nQUIT".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :x\r\nNICK a\r\n");
    }
}
