//! [`tokio_util::codec`] adapter for serving the protocol on an async stream.
//!
//! Decodes newline terminated [`Command`] lines and encodes [`Response`]s.
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::ReadError,
    protocol::{Command, Response, TRANSFER_SIZE_LIMIT},
};

/// Slack on top of the hex payload for the verb, offset and separators.
const LINE_OVERHEAD: usize = 64;

#[derive(Debug, Clone)]
pub struct CommandCodec {
    max_transfer_size: usize,
    /// Index up to which the buffer was already scanned for a newline.
    next_index: usize,
}

impl CommandCodec {
    /// `max_transfer_size` is capped at [`TRANSFER_SIZE_LIMIT`].
    pub fn new(max_transfer_size: usize) -> CommandCodec {
        CommandCodec {
            max_transfer_size: max_transfer_size.min(TRANSFER_SIZE_LIMIT),
            next_index: 0,
        }
    }

    /// Longest line that can carry a valid command.
    pub fn max_line_len(&self) -> usize {
        self.max_transfer_size * 2 + LINE_OVERHEAD
    }
}

impl Decoder for CommandCodec {
    type Item = Command;
    type Error = ReadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>, ReadError> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');
            let Some(pos) = newline else {
                if src.len() > self.max_line_len() {
                    return Err(ReadError::TooManyBytes {
                        max: self.max_line_len(),
                        got: src.len(),
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + pos + 1);
            self.next_index = 0;
            // Empty keep-alive lines are skipped.
            if line.trim_ascii().is_empty() {
                continue;
            }
            return Command::from_line(&line, self.max_transfer_size).map(Some);
        }
    }
}

impl Encoder<Response> for CommandCodec {
    type Error = ReadError;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), ReadError> {
        let bytes = response.to_bytes();
        dst.reserve(bytes.len());
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::AddressSpace;

    #[test]
    fn decodes_partial_lines() {
        let mut codec = CommandCodec::new(16);
        let mut buf = BytesMut::from(&b"peekMain 0x1"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"0 4\r\ngetHeap");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Command::Peek {
                space: AddressSpace::Main,
                offset: 0x10,
                length: 4
            })
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"Base\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Command::GetHeapBase));
        assert!(buf.is_empty());
    }

    #[test]
    fn skips_blank_lines() {
        let mut codec = CommandCodec::new(16);
        let mut buf = BytesMut::from(&b"\r\n\r\ngetMainNsoBase\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Command::GetMainNsoBase));
    }

    #[test]
    fn rejects_overlong_line() {
        let mut codec = CommandCodec::new(4);
        let mut buf = BytesMut::from(vec![b'A'; codec.max_line_len() + 1].as_slice());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ReadError::TooManyBytes { .. })
        ));
    }

    #[test]
    fn caps_transfer_size() {
        let codec = CommandCodec::new(usize::MAX);
        assert_eq!(codec.max_line_len(), TRANSFER_SIZE_LIMIT * 2 + LINE_OVERHEAD);
    }

    #[test]
    fn encodes_responses() {
        let mut codec = CommandCodec::new(16);
        let mut dst = BytesMut::new();
        codec
            .encode(Response::Memory(vec![0x12, 0x34].into_boxed_slice()), &mut dst)
            .unwrap();
        codec.encode(Response::Address(1), &mut dst).unwrap();
        assert_eq!(&dst[..], b"1234\n0000000000000001\n");
    }
}
