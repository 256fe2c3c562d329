//! BlockTokenizer (spec §4.2): scans one line at a time into block tokens,
//! never crossing a line boundary except that `newline` is the token that
//! marks end-of-line.

use crate::error::Result;
use crate::line_reader::LineReader;
use crate::loop_guard::LoopGuard;
use crate::token::{BlockToken, BlockTokenKind};
use std::io::Read;

/// Tokenize an entire document up front. The block/leaf parsers backtrack by
/// snapshotting an index into this vector, which is far simpler (and just
/// as faithful to the per-line scanning contract) than re-deriving a
/// streaming iterator with its own rewind support.
pub fn tokenize_document<R: Read>(reader: &mut LineReader<R>) -> Result<Vec<BlockToken>> {
    let mut tokens = Vec::new();
    let mut guard = LoopGuard::new("block_tokenizer::tokenize_document");
    while let Some(line) = reader.next()? {
        guard.tick();
        // `line` always ends in `\n`; the bytes before it were validated by
        // the host (spec §6.3) so this can only fail on a pathological
        // mid-sequence split, which cannot happen since every terminator
        // LineReader recognizes is a single ASCII byte.
        let line = String::from_utf8_lossy(line).into_owned();
        log::trace!("tokenizing line: {:?}", crate::logging::safe_preview(&line, 80));
        tokenize_line(&line, &mut tokens);
    }
    log::debug!("block tokenizer produced {} tokens", tokens.len());
    Ok(tokens)
}

fn tokenize_line(line: &str, out: &mut Vec<BlockToken>) {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;
    let mut indented = false;

    // Leading indentation: one tab, or groups of exactly four spaces, each
    // becomes its own `indent` token; this naturally supports deeper
    // indentation levels (multiple tokens) without a separate "how deep"
    // field on the token itself.
    loop {
        if i < len && bytes[i] == b'\t' {
            out.push(BlockToken::lexeme_less(BlockTokenKind::Indent));
            i += 1;
            indented = true;
            continue;
        }
        let start = i;
        let mut j = i;
        while j < len && bytes[j] == b' ' {
            j += 1;
        }
        if j - start >= 4 {
            out.push(BlockToken::lexeme_less(BlockTokenKind::Indent));
            i = start + 4;
            indented = true;
            continue;
        }
        break;
    }

    // Leftover leading spaces (0..=3) that weren't enough to form another
    // indent unit.
    let run_start = i;
    let mut j = i;
    while j < len && bytes[j] == b' ' {
        j += 1;
    }
    if j > run_start {
        out.push(BlockToken::new(BlockTokenKind::Whitespace, &line[run_start..j]));
    }
    i = j;

    // Column-0 constructs (blockquote marker, fences, thematic-break rules)
    // are only tried when we're still within 3 leading spaces of true
    // column 0 (spec §4.2).
    if !indented {
        if let Some((kind, consumed)) = try_line_start_token(&line[i..]) {
            let lexeme = if kind.is_lexeme_less() { "" } else { &line[i..i + consumed] };
            out.push(BlockToken::new(kind, lexeme));
            i += consumed;
        }
    }

    scan_general(&line[i..], out);
}

fn try_line_start_token(rest: &str) -> Option<(BlockTokenKind, usize)> {
    let bytes = rest.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    if bytes[0] == b'>' {
        return Some((BlockTokenKind::RAngleBracketBlockquote, 1));
    }
    if let Some(result) = try_fence(rest) {
        return Some(result);
    }
    classify_rule_run(rest)
}

fn try_fence(rest: &str) -> Option<(BlockTokenKind, usize)> {
    let bytes = rest.as_bytes();
    let ch = *bytes.first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let mut i = 0;
    while i < bytes.len() && bytes[i] == ch {
        i += 1;
    }
    if i >= 3 {
        let kind = if ch == b'`' {
            BlockTokenKind::BacktickFence
        } else {
            BlockTokenKind::TildeFence
        };
        Some((kind, i))
    } else {
        None
    }
}

/// Classifies the delimiter-run thematic-break candidates. Each of the four
/// characters (`*`, `_`, `-`, `=`) has its own whitespace-tolerance rule
/// (spec §4.2); this is the one place all four live so the rules stay easy
/// to compare.
fn classify_rule_run(rest: &str) -> Option<(BlockTokenKind, usize)> {
    let bytes = rest.as_bytes();
    match *bytes.first()? {
        b'*' => {
            let mut i = 0;
            let mut stars = 0u32;
            loop {
                match bytes.get(i) {
                    Some(b'*') => {
                        stars += 1;
                        i += 1;
                    }
                    Some(b' ') | Some(b'\t') => i += 1,
                    Some(b'\n') | None => break,
                    Some(_) => return None,
                }
            }
            (stars >= 3).then_some((BlockTokenKind::RuleStar, i))
        }
        b'_' => {
            let mut i = 0;
            while bytes.get(i) == Some(&b'_') {
                i += 1;
            }
            if i < 3 {
                return None;
            }
            // "no whitespace allowed": nothing but the run itself may
            // precede the newline.
            match bytes.get(i) {
                Some(b'\n') | None => Some((BlockTokenKind::RuleUnderline, i)),
                _ => None,
            }
        }
        b'-' => {
            let mut i = 0;
            let mut dashes = 0u32;
            loop {
                match bytes.get(i) {
                    Some(b'-') => {
                        dashes += 1;
                        i += 1;
                    }
                    Some(b' ') | Some(b'\t') => i += 1,
                    Some(b'\n') | None => break,
                    Some(_) => break,
                }
            }
            if dashes == 0 {
                return None;
            }
            let scanned = &bytes[..i];
            let mut seen_whitespace = false;
            let mut interior_whitespace = false;
            for &b in scanned {
                match b {
                    b'-' if seen_whitespace => interior_whitespace = true,
                    b' ' | b'\t' => seen_whitespace = true,
                    _ => {}
                }
            }
            if interior_whitespace {
                Some((BlockTokenKind::RuleDashWithWhitespace, i))
            } else {
                let dash_only_len = scanned.iter().take_while(|&&b| b == b'-').count();
                Some((BlockTokenKind::RuleDash, dash_only_len))
            }
        }
        b'=' => {
            let mut i = 0;
            while bytes.get(i) == Some(&b'=') {
                i += 1;
            }
            (i > 0).then_some((BlockTokenKind::RuleEquals, i))
        }
        _ => None,
    }
}

fn scan_general(s: &str, out: &mut Vec<BlockToken>) {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;
    let mut text_start: Option<usize> = None;
    let mut guard = LoopGuard::new("block_tokenizer::scan_general");

    macro_rules! flush_text {
        () => {
            if let Some(start) = text_start.take() {
                if start < i {
                    out.push(BlockToken::new(BlockTokenKind::Text, &s[start..i]));
                }
            }
        };
    }

    while i < len {
        guard.tick();
        match bytes[i] {
            b'\n' => {
                flush_text!();
                out.push(BlockToken::lexeme_less(BlockTokenKind::Newline));
                i += 1;
            }
            b' ' | b'\t' => {
                flush_text!();
                let start = i;
                while i < len && matches!(bytes[i], b' ' | b'\t') {
                    i += 1;
                }
                out.push(BlockToken::new(BlockTokenKind::Whitespace, &s[start..i]));
            }
            b'#' => {
                let start = i;
                let mut j = i;
                while j < len && bytes[j] == b'#' {
                    j += 1;
                }
                let word_bounded = j >= len || matches!(bytes[j], b' ' | b'\t' | b'\n');
                if word_bounded {
                    flush_text!();
                    out.push(BlockToken::new(BlockTokenKind::Pound, &s[start..j]));
                    i = j;
                } else if text_start.is_none() {
                    text_start = Some(start);
                    i = j;
                } else {
                    i = j;
                }
            }
            b @ (b'[' | b']' | b'<' | b'>' | b'(' | b')' | b'\'' | b'"' | b':') => {
                flush_text!();
                let kind = match b {
                    b'[' => BlockTokenKind::LSquareBracket,
                    b']' => BlockTokenKind::RSquareBracket,
                    b'<' => BlockTokenKind::LAngleBracket,
                    b'>' => BlockTokenKind::RAngleBracket,
                    b'(' => BlockTokenKind::LParen,
                    b')' => BlockTokenKind::RParen,
                    b'\'' => BlockTokenKind::SingleQuote,
                    b'"' => BlockTokenKind::DoubleQuote,
                    b':' => BlockTokenKind::Colon,
                    _ => unreachable!(),
                };
                out.push(BlockToken::new(kind, &s[i..i + 1]));
                i += 1;
            }
            _ => {
                if text_start.is_none() {
                    text_start = Some(i);
                }
                i += 1;
            }
        }
    }
    flush_text!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::BlockTokenKind as K;
    use std::io::Cursor;

    fn tokenize(input: &str) -> Vec<BlockToken> {
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        tokenize_document(&mut reader).expect("tokenize failed")
    }

    #[test]
    fn plain_line_is_one_text_and_one_newline() {
        let tokens = tokenize("hello world\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, K::Text);
        assert_eq!(tokens[0].lexeme, "hello world");
        assert_eq!(tokens[1].kind, K::Newline);
    }

    #[test]
    fn atx_heading_tokens() {
        let tokens = tokenize("## Heading\n");
        assert_eq!(tokens[0].kind, K::Pound);
        assert_eq!(tokens[0].lexeme, "##");
        assert_eq!(tokens[1].kind, K::Whitespace);
        assert_eq!(tokens[2].kind, K::Text);
        assert_eq!(tokens[2].lexeme, "Heading");
        assert_eq!(tokens[3].kind, K::Newline);
    }

    #[test]
    fn thematic_break_star() {
        let tokens = tokenize("***\n");
        assert_eq!(tokens[0].kind, K::RuleStar);
        assert_eq!(tokens[1].kind, K::Newline);
    }

    #[test]
    fn dash_with_interior_whitespace() {
        let tokens = tokenize("- - -\n");
        assert_eq!(tokens[0].kind, K::RuleDashWithWhitespace);
    }

    #[test]
    fn blockquote_marker_at_line_start() {
        let tokens = tokenize(">foo\n");
        assert_eq!(tokens[0].kind, K::RAngleBracketBlockquote);
        assert_eq!(tokens[1].kind, K::Text);
        assert_eq!(tokens[1].lexeme, "foo");
    }

    #[test]
    fn indented_code_line() {
        let tokens = tokenize("    code\n");
        assert_eq!(tokens[0].kind, K::Indent);
        assert_eq!(tokens[1].kind, K::Text);
        assert_eq!(tokens[1].lexeme, "code");
    }

    #[test]
    fn backtick_fence_with_info_string() {
        let tokens = tokenize("```python\n");
        assert_eq!(tokens[0].kind, K::BacktickFence);
        assert_eq!(tokens[0].lexeme, "```");
        assert_eq!(tokens[1].kind, K::Text);
        assert_eq!(tokens[1].lexeme, "python");
    }
}
