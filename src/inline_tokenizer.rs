//! InlineTokenizer (spec §4.5): the `top_level_state` scan over a raw text
//! span, in ten-production precedence order, producing `InlineToken`s for
//! the InlineParser to consume.

use crate::loop_guard::LoopGuard;
use crate::token::{InlineToken, InlineTokenKind, StarContext, UnderscoreContext};

pub fn tokenize(text: &str) -> Vec<InlineToken> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;
    let mut out = Vec::new();
    let mut text_start: Option<usize> = None;
    let mut guard = LoopGuard::new("inline_tokenizer::tokenize");

    macro_rules! flush_text {
        () => {
            if let Some(start) = text_start.take() {
                if start < i {
                    out.push(InlineToken::new(InlineTokenKind::Text, &text[start..i]));
                }
            }
        };
    }

    while i < len {
        guard.tick();
        let b = bytes[i];
        match b {
            b'\n' => {
                flush_text!();
                out.push(InlineToken::new(InlineTokenKind::Newline, "\n"));
                i += 1;
            }
            b'\\' => {
                // Keep a backslash and the ASCII-punctuation character it
                // escapes inside the same running text lexeme, so the
                // escaped character never reaches the dedicated arm that
                // would otherwise turn it into its own token (delimiter
                // run, bracket, backtick run, ...). The backslash itself
                // is preserved here (spec §4.5); text resolution strips it
                // later (spec §4.6). A backslash not followed by ASCII
                // punctuation is left as a literal, unescapable backslash
                // and the next byte is scanned normally.
                if text_start.is_none() {
                    text_start = Some(i);
                }
                i += 1;
                if i < len && bytes[i].is_ascii_punctuation() {
                    i += 1;
                }
            }
            b' ' | b'\t' => {
                flush_text!();
                let start = i;
                while i < len && matches!(bytes[i], b' ' | b'\t') {
                    i += 1;
                }
                out.push(InlineToken::new(InlineTokenKind::Whitespace, &text[start..i]));
            }
            b'`' => {
                flush_text!();
                let start = i;
                while i < len && bytes[i] == b'`' {
                    i += 1;
                }
                out.push(InlineToken::new(InlineTokenKind::Backtick, &text[start..i]));
            }
            b'&' => {
                if let Some((kind, consumed)) = try_char_reference(&text[i..]) {
                    flush_text!();
                    out.push(InlineToken::new(kind, &text[i..i + consumed]));
                    i += consumed;
                } else if text_start.is_none() {
                    text_start = Some(i);
                    i += 1;
                } else {
                    i += 1;
                }
            }
            b'*' => {
                flush_text!();
                let (tok, consumed) = scan_star_run(text, i);
                out.push(tok);
                i += consumed;
            }
            b'_' => {
                flush_text!();
                let (tok, consumed) = scan_underscore_run(text, i);
                out.push(tok);
                i += consumed;
            }
            b'[' | b']' | b'<' | b'>' | b'(' | b')' | b'\'' | b'"' | b'!' => {
                flush_text!();
                let kind = match b {
                    b'[' => InlineTokenKind::LSquareBracket,
                    b']' => InlineTokenKind::RSquareBracket,
                    b'<' => InlineTokenKind::LAngleBracket,
                    b'>' => InlineTokenKind::RAngleBracket,
                    b'(' => InlineTokenKind::LParen,
                    b')' => InlineTokenKind::RParen,
                    b'\'' => InlineTokenKind::SingleQuote,
                    b'"' => InlineTokenKind::DoubleQuote,
                    b'!' => InlineTokenKind::ExclamationMark,
                    _ => unreachable!(),
                };
                out.push(InlineToken::new(kind, &text[i..i + 1]));
                i += 1;
            }
            _ => {
                if let Some(consumed) = try_absolute_uri(&text[i..]) {
                    flush_text!();
                    out.push(InlineToken::new(InlineTokenKind::AbsoluteUri, &text[i..i + consumed]));
                    i += consumed;
                    continue;
                }
                if let Some(consumed) = try_email(&text[i..]) {
                    flush_text!();
                    out.push(InlineToken::new(InlineTokenKind::Email, &text[i..i + consumed]));
                    i += consumed;
                    continue;
                }
                if text_start.is_none() {
                    text_start = Some(i);
                }
                i += 1;
            }
        }
    }
    flush_text!();
    out
}

fn try_char_reference(rest: &str) -> Option<(InlineTokenKind, usize)> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    if bytes.get(1) == Some(&b'#') {
        let is_hex = matches!(bytes.get(2), Some(b'x') | Some(b'X'));
        let digits_start = if is_hex { 3 } else { 2 };
        let mut i = digits_start;
        while bytes.get(i).is_some_and(|b| {
            if is_hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        }) {
            i += 1;
        }
        if i == digits_start || i - digits_start > 8 {
            return None;
        }
        if bytes.get(i) != Some(&b';') {
            return None;
        }
        let kind = if is_hex {
            InlineTokenKind::HexadecimalCharacterReference
        } else {
            InlineTokenKind::DecimalCharacterReference
        };
        return Some((kind, i + 1));
    }
    // Named entity reference: `&name;` where name is alphanumeric.
    let mut i = 1;
    while bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric()) {
        i += 1;
    }
    if i == 1 || bytes.get(i) != Some(&b';') {
        return None;
    }
    Some((InlineTokenKind::EntityReference, i + 1))
}

fn scan_star_run(text: &str, pos: usize) -> (InlineToken, usize) {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && bytes[i] == b'*' {
        i += 1;
    }
    let run_len = (i - pos) as u16;
    let lexeme = &text[pos..i];
    let before = prev_char(text, pos);
    let after = next_char(text, i);
    let (can_open, can_close) = flanking(before, after);
    let ctx = StarContext { run_len };
    let kind = match (can_open, can_close) {
        (true, true) => InlineTokenKind::LrDelimStar(ctx),
        (true, false) => InlineTokenKind::LDelimStar(ctx),
        (false, true) => InlineTokenKind::RDelimStar(ctx),
        (false, false) => InlineTokenKind::LDelimStar(ctx),
    };
    (InlineToken::new(kind, lexeme), i - pos)
}

fn scan_underscore_run(text: &str, pos: usize) -> (InlineToken, usize) {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && bytes[i] == b'_' {
        i += 1;
    }
    let run_len = (i - pos) as u16;
    let lexeme = &text[pos..i];
    let before = prev_char(text, pos);
    let after = next_char(text, i);
    let (left_flank, right_flank) = flanking(before, after);
    let preceded_by_punct = before.map(|c| c.is_ascii_punctuation()).unwrap_or(false);
    let followed_by_punct = after.map(|c| c.is_ascii_punctuation()).unwrap_or(false);
    // Underscores additionally veto intraword matches: a left-flanking run
    // that's also preceded by an alphanumeric and followed by one isn't a
    // valid opener, and symmetrically for closers (spec §4.6, CommonMark
    // rule 1/2 extension for `_`).
    let before_alnum = before.map(|c| c.is_alphanumeric()).unwrap_or(false);
    let after_alnum = after.map(|c| c.is_alphanumeric()).unwrap_or(false);
    let can_open = left_flank && !(before_alnum && after_alnum);
    let can_close = right_flank && !(before_alnum && after_alnum);
    let ctx = UnderscoreContext {
        run_len,
        preceded_by_punct,
        followed_by_punct,
    };
    let kind = match (can_open, can_close) {
        (true, true) => InlineTokenKind::LrDelimUnderscore(ctx),
        (true, false) => InlineTokenKind::LDelimUnderscore(ctx),
        (false, true) => InlineTokenKind::RDelimUnderscore(ctx),
        (false, false) => InlineTokenKind::LDelimUnderscore(ctx),
    };
    (InlineToken::new(kind, lexeme), i - pos)
}

fn prev_char(text: &str, byte_pos: usize) -> Option<char> {
    text[..byte_pos].chars().next_back()
}

fn next_char(text: &str, byte_pos: usize) -> Option<char> {
    text[byte_pos..].chars().next()
}

/// CommonMark left/right flanking classification (spec §4.6, rules 1-2):
/// a run is left-flanking if not followed by whitespace, and either not
/// followed by punctuation or preceded by whitespace/punctuation; mirrored
/// for right-flanking.
fn flanking(before: Option<char>, after: Option<char>) -> (bool, bool) {
    let before_ws = before.map(|c| c.is_whitespace()).unwrap_or(true);
    let after_ws = after.map(|c| c.is_whitespace()).unwrap_or(true);
    let before_punct = before.map(|c| c.is_ascii_punctuation()).unwrap_or(false);
    let after_punct = after.map(|c| c.is_ascii_punctuation()).unwrap_or(false);

    let left_flanking = !after_ws && (!after_punct || before_ws || before_punct);
    let right_flanking = !before_ws && (!before_punct || after_ws || after_punct);
    (left_flanking, right_flanking)
}

/// Recognizes the spec §4.5 production-8 grammar: `scheme:rest` where
/// `scheme` is `[A-Za-z][A-Za-z0-9+.-]{1,31}` (2-32 characters total) and
/// `rest` contains no `<`, `>`, whitespace, or ASCII control character.
/// Any scheme matching that shape is recognized, not just a fixed list.
fn try_absolute_uri(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if !bytes.first().is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let mut i = 1;
    while i < bytes.len()
        && i < 32
        && matches!(bytes[i], b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'.' | b'-')
    {
        i += 1;
    }
    // `scheme` is the first letter plus 1-31 further characters.
    if !(2..=32).contains(&i) {
        return None;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() && is_uri_rest_byte(bytes[j]) {
        j += 1;
    }
    if j == i + 1 {
        return None;
    }
    Some(j)
}

fn is_uri_rest_byte(b: u8) -> bool {
    !matches!(b, b'<' | b'>' | b' ' | b'\t' | b'\n') && b >= 0x20 && b != 0x7f
}

fn try_email(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'.' | b'_' | b'+' | b'-')) {
        i += 1;
    }
    if i == 0 || bytes.get(i) != Some(&b'@') {
        return None;
    }
    i += 1;
    let domain_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'.' | b'-')) {
        i += 1;
    }
    if i == domain_start || !rest[domain_start..i].contains('.') {
        return None;
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::InlineTokenKind as K;

    #[test]
    fn plain_text_is_one_token() {
        let tokens = tokenize("hello");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, K::Text);
    }

    #[test]
    fn emphasis_star_run_is_left_flanking_before_word() {
        let tokens = tokenize("*foo*");
        assert!(tokens[0].kind.can_open_star());
        assert!(tokens[2].kind.can_close_star());
    }

    #[test]
    fn intraword_underscore_does_not_flank() {
        let tokens = tokenize("foo_bar_baz");
        // "foo", "_", "bar", "_", "baz" — the underscores are intraword so
        // neither opens nor closes.
        let underscore_tokens: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind.underscore_context().is_some())
            .collect();
        assert_eq!(underscore_tokens.len(), 2);
        for tok in underscore_tokens {
            assert!(!tok.kind.can_open_underscore());
            assert!(!tok.kind.can_close_underscore());
        }
    }

    #[test]
    fn backtick_run_is_its_own_token() {
        let tokens = tokenize("``code``");
        assert_eq!(tokens[0].kind, K::Backtick);
        assert_eq!(tokens[0].lexeme, "``");
    }

    #[test]
    fn decimal_and_hex_character_references() {
        let tokens = tokenize("&#65;&#x41;");
        assert_eq!(tokens[0].kind, K::DecimalCharacterReference);
        assert_eq!(tokens[1].kind, K::HexadecimalCharacterReference);
    }

    #[test]
    fn absolute_uri_is_single_token() {
        let tokens = tokenize("see https://example.com/a[b] now");
        assert!(tokens.iter().any(|t| t.kind == K::AbsoluteUri));
    }

    #[test]
    fn absolute_uri_recognizes_schemes_outside_the_old_whitelist() {
        for text in ["irc://chat.example.com/room", "tel:+1234567890", "foo+bar-baz.1:rest"] {
            let tokens = tokenize(text);
            assert!(
                tokens.iter().any(|t| t.kind == K::AbsoluteUri),
                "expected an AbsoluteUri token for {text:?}, got {tokens:?}"
            );
        }
    }

    #[test]
    fn scheme_grammar_rejects_a_bare_colon_with_no_letter_before_it() {
        let tokens = tokenize(":not-a-uri");
        assert!(!tokens.iter().any(|t| t.kind == K::AbsoluteUri));
    }

    #[test]
    fn escaped_star_does_not_tokenize_as_a_delimiter_run() {
        let tokens = tokenize(r"\*foo\*");
        assert!(
            !tokens.iter().any(|t| matches!(t.kind, K::LDelimStar(_) | K::LrDelimStar(_))),
            "expected no star-delimiter token, got {tokens:?}"
        );
        assert!(tokens.iter().all(|t| t.kind == K::Text));
    }

    #[test]
    fn backslash_before_non_punctuation_is_left_as_a_literal_backslash() {
        let tokens = tokenize(r"\A");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, K::Text);
        assert_eq!(tokens[0].lexeme, r"\A");
    }
}
