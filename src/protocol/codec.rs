use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::trace::{self, Direction, SharedTrace};
use crate::core::{Error, Result};
use super::command::Command;
use super::message::{Message, MessageType};

const LINE_TERMINATOR: &[u8] = b"\r\n";

/// One CRLF-terminated line as received: a type tag and what follows `<tag>:`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub tag: u8,
    pub payload: Bytes,
    /// False when the line lacks the `:` after its tag
    pub well_formed: bool,
}

impl RawLine {
    fn from_line(mut line: BytesMut) -> Option<Self> {
        if line.is_empty() {
            return None;
        }
        let tag = line[0];
        let well_formed = line.len() >= 2 && line[1] == b':';
        let prefix = line.len().min(2);
        let payload = line.split_off(prefix).freeze();
        Some(RawLine {
            tag,
            payload,
            well_formed,
        })
    }
}

/// A logical message: its type plus one payload per wire line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub parts: Vec<Bytes>,
}

impl Frame {
    pub fn decode(&self) -> Result<Message> {
        Message::decode(self.message_type, &self.parts)
    }
}

/// Line framing codec for the hub's control channel
#[derive(Clone)]
pub struct LineCodec {
    trace: SharedTrace,
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec::new()
    }
}

impl LineCodec {
    /// Creates a new line codec with a no-op trace hook
    pub fn new() -> Self {
        LineCodec {
            trace: trace::noop(),
        }
    }

    pub fn with_trace(trace: SharedTrace) -> Self {
        LineCodec { trace }
    }

    /// Groups lines into frames, merging consecutive lines of a multi-part type
    ///
    /// Each entry corresponds to one logical message; failures affect only
    /// their own entry.
    pub fn assemble(&self, lines: Vec<RawLine>) -> Vec<Result<Frame>> {
        let mut frames = Vec::new();
        let mut lines = lines.into_iter().peekable();

        while let Some(line) = lines.next() {
            if !line.well_formed {
                frames.push(Err(Error::validation(format!(
                    "line with tag {:?} lacks the ':' separator",
                    line.tag as char
                ))));
                continue;
            }
            let Some(message_type) = MessageType::from_tag(line.tag) else {
                frames.push(Err(Error::unsupported_message(format!(
                    "unknown message tag {:?}",
                    line.tag as char
                ))));
                continue;
            };

            let mut parts = vec![line.payload];
            if message_type.is_multi_part() {
                while let Some(next) = lines.next_if(|l| l.tag == line.tag && l.well_formed) {
                    parts.push(next.payload);
                }
            }
            frames.push(Ok(Frame {
                message_type,
                parts,
            }));
        }

        frames
    }
}

impl Decoder for LineCodec {
    type Item = RawLine;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(pos) = src
                .windows(LINE_TERMINATOR.len())
                .position(|w| w == LINE_TERMINATOR)
            else {
                // Need more data to complete the line
                return Ok(None);
            };

            let mut line = src.split_to(pos + LINE_TERMINATOR.len());
            line.truncate(pos);
            self.trace.on_bytes(Direction::Inbound, "line", &line);

            if let Some(raw) = RawLine::from_line(line) {
                return Ok(Some(raw));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Unterminated trailing line left by a drain that ended mid-line
        let line = src.split();
        self.trace.on_bytes(Direction::Inbound, "partial line", &line);
        Ok(RawLine::from_line(line))
    }
}

impl Encoder<&Command> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: &Command, dst: &mut BytesMut) -> Result<()> {
        let bytes = item.to_bytes()?;
        self.trace.on_bytes(Direction::Outbound, "command", &bytes);
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TraceHook;
    use std::sync::{Arc, Mutex};

    fn lines_of(data: &[u8]) -> Vec<RawLine> {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(data);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_decode_splits_lines() {
        let lines = lines_of(b"H:abc\r\nM:00,01,xyz\r\n\r\nS:00,0,31\r\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].tag, b'H');
        assert_eq!(lines[0].payload, Bytes::from_static(b"abc"));
        assert_eq!(lines[1].payload, Bytes::from_static(b"00,01,xyz"));
        assert_eq!(lines[2].tag, b'S');
    }

    #[test]
    fn test_decode_waits_for_terminator() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"H:abc"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().payload, Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_decode_eof_keeps_partial_line() {
        let lines = lines_of(b"F:ntp.homematic.com");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].payload, Bytes::from_static(b"ntp.homematic.com"));
    }

    #[test]
    fn test_assemble_multi_part() {
        let codec = LineCodec::new();
        let lines = lines_of(b"H:a\r\nM:00,02,x\r\nM:01,02,y\r\nC:z\r\nM:00,01,w\r\n");
        let frames: Vec<Frame> = codec
            .assemble(lines)
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].message_type, MessageType::Hello);
        assert_eq!(frames[1].message_type, MessageType::Directory);
        assert_eq!(
            frames[1].parts,
            vec![Bytes::from_static(b"00,02,x"), Bytes::from_static(b"01,02,y")]
        );
        assert_eq!(frames[2].message_type, MessageType::Configuration);
        assert_eq!(frames[3].parts.len(), 1);
    }

    #[test]
    fn test_assemble_unknown_and_malformed() {
        let codec = LineCodec::new();
        let frames = codec.assemble(lines_of(b"X:\r\nS\r\nS:00,0,31\r\n"));
        assert_eq!(frames.len(), 3);
        assert!(matches!(frames[0], Err(Error::UnsupportedMessage(_))));
        assert!(matches!(frames[1], Err(Error::Validation(_))));
        assert!(frames[2].is_ok());
    }

    #[test]
    fn test_single_part_types_are_not_merged() {
        let codec = LineCodec::new();
        let frames = codec.assemble(lines_of(b"L:a\r\nL:b\r\n"));
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_encode_command() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(&Command::Quit, &mut dst).unwrap();
        assert_eq!(&dst[..], b"q:\r\n");
    }

    #[derive(Default)]
    struct Counter(Mutex<Vec<(Direction, String)>>);

    impl TraceHook for Counter {
        fn on_bytes(&self, direction: Direction, label: &str, _data: &[u8]) {
            self.0.lock().unwrap().push((direction, label.to_string()));
        }
    }

    #[test]
    fn test_trace_hook_sees_traffic() {
        let counter = Arc::new(Counter::default());
        let mut codec = LineCodec::with_trace(counter.clone());

        let mut buf = BytesMut::from(&b"S:00,0,31\r\n"[..]);
        codec.decode(&mut buf).unwrap();
        codec.encode(&Command::RequestStatus, &mut BytesMut::new()).unwrap();

        let seen = counter.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Direction::Inbound, "line".to_string()),
                (Direction::Outbound, "command".to_string()),
            ]
        );
    }
}
