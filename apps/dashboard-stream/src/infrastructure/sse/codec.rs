//! Event-Stream Codec
//!
//! Incremental decoder for the `text/event-stream` wire format. Bytes are
//! fed in arbitrary chunks; complete events come out as [`RawFrame`]s.
//!
//! # Framing
//!
//! - Lines end in `\n`, `\r\n` or `\r`, including when the pair is split
//!   across two chunks.
//! - `field: value` lines; one leading space after the colon is stripped.
//! - Lines starting with `:` are comments.
//! - A blank line dispatches the pending event. Events without any `data:`
//!   line are discarded.
//! - Multiple `data:` lines are joined with `\n`.
//! - The last seen `id:` sticks to every later event until replaced.

use std::time::Duration;

use crate::application::ports::RawFrame;

/// Streaming decoder for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    event_type: String,
    data: String,
    has_data: bool,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    /// Create a decoder with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body and collect every event it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' => self.end_line(&mut frames),
                b'\r' => {
                    self.skip_lf = true;
                    self.end_line(&mut frames);
                }
                _ => self.line.push(byte),
            }
        }

        frames
    }

    /// Identifier of the most recent event, if any.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    fn end_line(&mut self, frames: &mut Vec<RawFrame>) {
        let bytes = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&bytes);

        if line.is_empty() {
            if let Some(frame) = self.dispatch() {
                frames.push(frame);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };

        match field {
            "event" => value.clone_into(&mut self.event_type),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" if !value.contains('\0') => {
                self.last_id = (!value.is_empty()).then(|| value.to_string());
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    self.retry = value.parse().ok().map(Duration::from_millis);
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<RawFrame> {
        let event_type = std::mem::take(&mut self.event_type);
        let data = std::mem::take(&mut self.data);

        if !std::mem::take(&mut self.has_data) {
            return None;
        }

        Some(RawFrame {
            event_type: (!event_type.is_empty()).then_some(event_type),
            data,
            id: self.last_id.clone(),
            retry: self.retry.take(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn decode_all(input: &str) -> Vec<RawFrame> {
        SseDecoder::new().decode(input.as_bytes())
    }

    #[test]
    fn named_event_with_json_body() {
        let frames = decode_all("event: price\ndata: {\"asset\":\"BTC\"}\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type.as_deref(), Some("price"));
        assert_eq!(frames[0].data, r#"{"asset":"BTC"}"#);
    }

    #[test]
    fn unnamed_event_has_no_type() {
        let frames = decode_all("data: hello\n\n");
        assert_eq!(frames[0].event_type, None);
        assert_eq!(frames[0].data, "hello");
    }

    #[test_case("data: a\n\n" ; "lf")]
    #[test_case("data: a\r\n\r\n" ; "crlf")]
    #[test_case("data: a\r\r" ; "cr")]
    fn line_endings(input: &str) {
        let frames = decode_all(input);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "a");
    }

    #[test_case("data:value\n\n", "value" ; "no space")]
    #[test_case("data: value\n\n", "value" ; "one space stripped")]
    #[test_case("data:  value\n\n", " value" ; "only first space stripped")]
    #[test_case("data\n\n", "" ; "field without colon")]
    fn value_parsing(input: &str, expected: &str) {
        let frames = decode_all(input);
        assert_eq!(frames[0].data, expected);
    }

    #[test]
    fn multiple_data_lines_join_with_newline() {
        let frames = decode_all("data: first\ndata: second\n\n");
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let frames = decode_all(": keep-alive\nfoo: bar\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn event_without_data_is_discarded() {
        let frames = decode_all("event: price\n\ndata: next\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_type, None);
        assert_eq!(frames[0].data, "next");
    }

    #[test]
    fn id_persists_until_replaced() {
        let frames = decode_all("id: 1\ndata: a\n\ndata: b\n\nid\ndata: c\n\n");
        assert_eq!(frames[0].id.as_deref(), Some("1"));
        assert_eq!(frames[1].id.as_deref(), Some("1"));
        assert_eq!(frames[2].id, None);
    }

    #[test]
    fn retry_is_parsed_when_numeric() {
        let frames = decode_all("retry: 3000\ndata: a\n\nretry: soon\ndata: b\n\n");
        assert_eq!(frames[0].retry, Some(Duration::from_millis(3000)));
        assert_eq!(frames[1].retry, None);
    }

    #[test]
    fn crlf_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let mut frames = decoder.decode(b"data: a\r");
        frames.extend(decoder.decode(b"\n\r"));
        frames.extend(decoder.decode(b"\ndata: b\n\n"));

        let data: Vec<_> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(data, vec!["a", "b"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let bytes = "data: €\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        let mut frames = decoder.decode(&bytes[..7]);
        frames.extend(decoder.decode(&bytes[7..]));

        assert_eq!(frames[0].data, "€");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let frames = SseDecoder::new().decode(b"data: \xff\n\n");
        assert_eq!(frames[0].data, "\u{fffd}");
    }

    #[test]
    fn incomplete_event_is_held_back() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.decode(b"event: price\ndata: 1\n").is_empty());
        let frames = decoder.decode(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(decoder.last_event_id(), None);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_output(split_points in prop::collection::vec(0usize..120, 0..8)) {
            let input = "event: price\r\ndata: {\"asset\":\"ETH\"}\r\n\r\n: ping\n\
                         id: 9\ndata: one\ndata: two\r\rdata: tail\n\n";
            let bytes = input.as_bytes();
            let expected = SseDecoder::new().decode(bytes);

            let mut points: Vec<usize> = split_points.into_iter().map(|p| p % bytes.len()).collect();
            points.sort_unstable();
            points.dedup();

            let mut decoder = SseDecoder::new();
            let mut frames = Vec::new();
            let mut start = 0;
            for point in points {
                frames.extend(decoder.decode(&bytes[start..point]));
                start = point;
            }
            frames.extend(decoder.decode(&bytes[start..]));

            prop_assert_eq!(frames, expected);
        }
    }
}
