//! Reassembles newline-delimited JSON from arbitrarily split chunks.

use reel_core::job::JobEvent;
use tracing::warn;

/// Longest line kept before the rest of it is thrown away.
pub const MAX_LINE: usize = 1024 * 1024;

/// Buffers raw bytes until a full line is available.
///
/// Works on bytes rather than text so that a multi-byte character split across two
/// chunks is never mangled. A pending line that grows past the limit is dropped up to
/// its next newline.
#[derive(Debug)]
pub struct LineDecoder {
    buf: Vec<u8>,
    max_line: usize,
    discarding: bool,
    overflowed: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
            discarding: false,
            overflowed: 0,
        }
    }

    /// Appends a chunk and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buf[start..].iter().position(|b| *b == b'\n') {
            if self.discarding {
                self.discarding = false;
            } else if pos > self.max_line {
                self.overflow();
            } else {
                lines.push(self.buf[start..start + pos].to_vec());
            }
            start += pos + 1;
        }
        self.buf.drain(..start);

        if self.buf.len() > self.max_line {
            if !self.discarding {
                self.overflow();
            }
            self.discarding = true;
            self.buf.clear();
        }
        lines
    }

    fn overflow(&mut self) {
        self.overflowed += 1;
        warn!("Dropping stream line longer than {} bytes", self.max_line);
    }

    /// Returns whatever followed the last newline once the body has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buf);
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        (!rest.trim_ascii().is_empty()).then_some(rest)
    }

    /// Bytes held back waiting for a newline.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Number of lines dropped for exceeding the length limit.
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }
}

#[derive(Debug)]
pub enum LineOutcome {
    Event(JobEvent),
    /// Blank lines, SSE comments and events without any field.
    Skip,
    Malformed(serde_json::Error),
}

/// Parses one line. Accepts both bare JSON and the SSE style `data: {...}` form.
pub fn parse_line(line: &[u8]) -> LineOutcome {
    let line = line.trim_ascii();
    if line.is_empty() || line.starts_with(b":") {
        return LineOutcome::Skip;
    }

    let payload = match line.strip_prefix(b"data:") {
        Some(rest) => rest.trim_ascii_start(),
        None => line,
    };
    if payload.is_empty() {
        return LineOutcome::Skip;
    }

    match serde_json::from_slice::<JobEvent>(payload) {
        Ok(event) if event.is_empty() => LineOutcome::Skip,
        Ok(event) => LineOutcome::Event(event),
        Err(e) => LineOutcome::Malformed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "{\"status\":\"fetching\"}\n",
        "data: {\"progress\":50,\"status\":\"Téléchargement…\"}\r\n",
        "\n",
        "{\"progress\":100,\"complete\":true,\"download_url\":\"/api/download/x.mp4\"}\n",
    );

    fn decode(chunks: &[&[u8]]) -> Vec<JobEvent> {
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.push(chunk));
        }
        lines.extend(decoder.finish());

        lines
            .iter()
            .filter_map(|l| match parse_line(l) {
                LineOutcome::Event(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn whole_stream_yields_three_events() {
        let events = decode(&[STREAM.as_bytes()]);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].status.as_deref(), Some("Téléchargement…"));
        assert!(events[2].is_complete());
    }

    #[test]
    fn any_split_point_reconstructs_the_same_events() {
        let bytes = STREAM.as_bytes();
        let expected = decode(&[bytes]);

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode(&[a, b]), expected, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_reconstructs_the_same_events() {
        let bytes = STREAM.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode(&chunks), decode(&[bytes]));
    }

    #[test]
    fn trailing_line_without_newline_is_kept() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"status\":\"a\"}\n{\"error\":\"b\"}").len() == 1);
        assert!(decoder.buffered() > 0);
        let last = decoder.finish().unwrap();
        assert!(matches!(parse_line(&last), LineOutcome::Event(e) if e.is_error()));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn oversized_line_is_dropped_up_to_its_newline() {
        let mut decoder = LineDecoder::with_max_line(16);
        assert!(decoder.push(b"{\"status\":\"aaaa").is_empty());
        assert!(decoder.push(b"aaaaaaaaaaaaaaa").is_empty());
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.overflowed(), 1);

        assert!(decoder.push(b"aaaaaaaaaaaaaaaaaaaaaaa").is_empty());
        assert_eq!(decoder.overflowed(), 1);

        let lines = decoder.push(b"aa\"}\n{\"status\":\"b\"}\n");
        assert_eq!(lines, vec![b"{\"status\":\"b\"}".to_vec()]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn oversized_line_within_one_chunk_is_dropped() {
        let mut decoder = LineDecoder::with_max_line(8);
        let lines = decoder.push(b"{\"status\":\"too long\"}\n{}\n");
        assert_eq!(lines, vec![b"{}".to_vec()]);
        assert_eq!(decoder.overflowed(), 1);
    }

    #[test]
    fn stream_ending_inside_an_oversized_line_yields_nothing() {
        let mut decoder = LineDecoder::with_max_line(4);
        decoder.push(b"{\"error\":\"x\"}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn malformed_and_blank_lines() {
        assert!(matches!(parse_line(b"{\"progress\":"), LineOutcome::Malformed(_)));
        assert!(matches!(parse_line(b"42"), LineOutcome::Malformed(_)));
        assert!(matches!(parse_line(b"   "), LineOutcome::Skip));
        assert!(matches!(parse_line(b": keep-alive"), LineOutcome::Skip));
        assert!(matches!(parse_line(b"data:"), LineOutcome::Skip));
        assert!(matches!(parse_line(b"{}"), LineOutcome::Skip));
    }
}
