//! LineReader (spec §4.1): turns a byte reader into a sequence of logical
//! lines, each terminated by `\n`, normalizing `\r`, `\r\n`, `\n`, and a
//! final un-terminated chunk before EOF into `\n`-terminated lines.

use crate::error::{AtrusError, Result};
use std::io::Read;

const DEFAULT_MAX_LINE_LEN: usize = 1 << 20;
const REFILL_CHUNK: usize = 8 * 1024;

pub struct LineReader<R: Read> {
    reader: R,
    raw: Vec<u8>,
    pos: usize,
    eof_reached: bool,
    line: Vec<u8>,
    max_line_len: usize,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_len(reader, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(reader: R, max_line_len: usize) -> Self {
        Self {
            reader,
            raw: Vec::new(),
            pos: 0,
            eof_reached: false,
            line: Vec::new(),
            max_line_len,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let mut chunk = vec![0u8; REFILL_CHUNK];
        let n = self
            .reader
            .read(&mut chunk)
            .map_err(|e| AtrusError::ReadFailed(e.to_string()))?;
        chunk.truncate(n);
        self.raw = chunk;
        self.pos = 0;
        if n == 0 {
            self.eof_reached = true;
        }
        Ok(())
    }

    fn ensure_byte_available(&mut self) -> Result<bool> {
        if self.pos < self.raw.len() {
            return Ok(true);
        }
        if self.eof_reached {
            return Ok(false);
        }
        self.refill()?;
        Ok(self.pos < self.raw.len())
    }

    /// Returns the next logical line, or `None` once the stream is exhausted.
    /// The returned slice is valid until the next call to `next`.
    pub fn next(&mut self) -> Result<Option<&[u8]>> {
        self.line.clear();
        let mut any_byte_seen = false;

        loop {
            if !self.ensure_byte_available()? {
                break;
            }
            let b = self.raw[self.pos];
            self.pos += 1;
            any_byte_seen = true;

            match b {
                b'\n' => {
                    self.line.push(b'\n');
                    return Ok(Some(&self.line));
                }
                b'\r' => {
                    // Look ahead one byte to swallow the `\n` of a `\r\n` pair.
                    if self.ensure_byte_available()? && self.raw[self.pos] == b'\n' {
                        self.pos += 1;
                    }
                    self.line.push(b'\n');
                    return Ok(Some(&self.line));
                }
                _ => {
                    if self.line.len() >= self.max_line_len {
                        return Err(AtrusError::LineTooLong {
                            limit: self.max_line_len,
                        });
                    }
                    self.line.push(b);
                }
            }
        }

        if any_byte_seen {
            // Final chunk reached EOF without a terminator; synthesize one.
            self.line.push(b'\n');
            Ok(Some(&self.line))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<String> {
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut lines = Vec::new();
        while let Some(line) = reader.next().expect("read failed") {
            lines.push(String::from_utf8(line.to_vec()).unwrap());
        }
        lines
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(collect("").is_empty());
    }

    #[test]
    fn unix_newlines_split_correctly() {
        assert_eq!(collect("a\nb\nc\n"), vec!["a\n", "b\n", "c\n"]);
    }

    #[test]
    fn mixed_terminators_normalize_to_lf() {
        assert_eq!(collect("a\r\nb\rc\n"), vec!["a\n", "b\n", "c\n"]);
    }

    #[test]
    fn final_unterminated_chunk_gets_synthesized_newline() {
        assert_eq!(collect("a\nb"), vec!["a\n", "b\n"]);
    }

    #[test]
    fn line_too_long_errors() {
        let mut reader = LineReader::with_max_line_len(Cursor::new(b"abcdef\n".to_vec()), 3);
        match reader.next() {
            Err(AtrusError::LineTooLong { limit: 3 }) => {}
            other => panic!("expected LineTooLong, got {other:?}"),
        }
    }
}
