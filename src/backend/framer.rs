//! Incremental line framing over a fragmented byte stream
//!
//! Serial reads return whatever bytes happen to be buffered by the driver, so a
//! single read may contain several lines, a fraction of a line, or a line
//! terminator split across two reads. The framer accumulates bytes until a
//! `\n` arrives and hands out complete lines with their terminator attached.
//!
//! Framing is lossless: concatenating every emitted line and the final
//! remainder reproduces the input stream byte for byte, regardless of how it
//! was chunked.

/// Line terminator recognised by the framer
pub const LINE_TERMINATOR: u8 = b'\n';

/// A complete, terminator-included line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(Vec<u8>);

impl Line {
    /// Raw bytes including the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode as UTF-8, if valid
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Length in bytes including the terminator
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line(s.as_bytes().to_vec())
    }
}

/// Split `existing ++ new_bytes` into complete lines and the unterminated tail.
///
/// The returned remainder becomes the `existing` buffer for the next call.
pub fn frame(mut existing: Vec<u8>, new_bytes: &[u8]) -> (Vec<Line>, Vec<u8>) {
    existing.extend_from_slice(new_bytes);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = existing[start..]
        .iter()
        .position(|&b| b == LINE_TERMINATOR)
    {
        let end = start + offset + 1;
        lines.push(Line(existing[start..end].to_vec()));
        start = end;
    }

    let remainder = existing.split_off(start);
    (lines, remainder)
}

/// Stateful framer owning the partial-line buffer between reads
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Line> {
        let existing = std::mem::take(&mut self.buffer);
        let (lines, remainder) = frame(existing, chunk);
        self.buffer = remainder;
        lines
    }

    /// Bytes received since the last terminator
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the partial line, returning it
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines_as_strings(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| String::from_utf8_lossy(l.as_bytes()).into_owned())
            .collect()
    }

    #[test]
    fn test_frame_keeps_terminators_and_tail() {
        let (lines, rest) = frame(Vec::new(), b"1,2\n3,4\n5,");
        assert_eq!(lines_as_strings(&lines), vec!["1,2\n", "3,4\n"]);
        assert_eq!(rest, b"5,");
    }

    #[test]
    fn test_frame_completes_buffered_line() {
        let (lines, rest) = frame(b"5,".to_vec(), b"6\n");
        assert_eq!(lines_as_strings(&lines), vec!["5,6\n"]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_crlf_split_across_reads() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"7\t8\r").is_empty());
        assert_eq!(framer.pending(), b"7\t8\r");
        let lines = framer.push(b"\n");
        assert_eq!(lines_as_strings(&lines), vec!["7\t8\r\n"]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut framer = LineFramer::new();
        framer.push(b"abc");
        assert!(framer.push(b"").is_empty());
        assert_eq!(framer.pending(), b"abc");
    }

    #[test]
    fn test_blank_lines_are_emitted() {
        let (lines, rest) = frame(Vec::new(), b"\n\n");
        assert_eq!(lines.len(), 2);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_take_pending_clears_buffer() {
        let mut framer = LineFramer::new();
        framer.push(b"partial");
        assert_eq!(framer.take_pending(), b"partial");
        assert!(framer.pending().is_empty());
    }

    proptest! {
        #[test]
        fn test_framing_is_lossless_for_any_chunking(
            data in prop::collection::vec(
                prop::sample::select(vec![b'1', b',', b'\n', b'\r', b'x', b'.']),
                0..256
            ),
            cuts in prop::collection::vec(0usize..256, 0..16)
        ) {
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(data.len())).collect();
            cuts.sort_unstable();

            let mut framer = LineFramer::new();
            let mut output = Vec::new();
            let mut prev = 0;
            for cut in cuts.into_iter().chain(std::iter::once(data.len())) {
                for line in framer.push(&data[prev..cut]) {
                    // Property: every emitted line ends with exactly one terminator
                    prop_assert_eq!(line.as_bytes().last(), Some(&LINE_TERMINATOR));
                    let terminators = line
                        .as_bytes()
                        .iter()
                        .filter(|&&b| b == LINE_TERMINATOR)
                        .count();
                    prop_assert_eq!(terminators, 1);
                    output.extend_from_slice(line.as_bytes());
                }
                prev = cut;
            }
            output.extend_from_slice(framer.pending());

            // Property: lines ++ remainder == input
            prop_assert_eq!(output, data);
        }

        #[test]
        fn test_chunking_does_not_change_lines(
            data in prop::collection::vec(prop::sample::select(vec![b'9', b'\t', b'\n']), 0..128),
            split in 0usize..128
        ) {
            let split = split.min(data.len());
            let (whole, whole_rest) = frame(Vec::new(), &data);

            let (mut first, rest) = frame(Vec::new(), &data[..split]);
            let (second, second_rest) = frame(rest, &data[split..]);
            first.extend(second);

            prop_assert_eq!(first, whole);
            prop_assert_eq!(second_rest, whole_rest);
        }
    }
}
