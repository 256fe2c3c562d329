//! LeafBlockParser (spec §4.4): consumes the container-stripped token
//! stream for one nesting level and produces leaf-level AST nodes, trying
//! nine productions in a fixed precedence order at the start of every new
//! line. Inline content (emphasis, links, code spans, …) is deliberately
//! left as raw text here; the InlineTokenizer/InlineParser pass resolves it
//! afterwards in a second walk over the finished tree (spec §4.5, §4.6).

use crate::ast::Node;
use crate::error::Result;
use crate::link_defs::LinkDefMap;
use crate::loop_guard::LoopGuard;
use crate::token::{BlockToken, BlockTokenKind as K};
use crate::uri;

pub fn parse(tokens: &[BlockToken], link_defs: &mut LinkDefMap) -> Result<Vec<Node>> {
    let mut cur = Cursor { tokens, pos: 0 };
    let mut nodes: Vec<Node> = Vec::new();
    let mut pending_setext_eligible = false;
    let mut guard = LoopGuard::new("leaf_parser::parse");

    while cur.pos < cur.tokens.len() {
        guard.tick();

        if cur.peek_kind() == Some(K::Close) {
            cur.pos += 1;
            pending_setext_eligible = false;
            continue;
        }

        if let Some(node) = try_blank_line(&mut cur) {
            let _ = node;
            pending_setext_eligible = false;
            continue;
        }
        if let Some(node) = try_indented_code(&mut cur) {
            nodes.push(node);
            pending_setext_eligible = false;
            continue;
        }
        if let Some(node) = try_fenced_code(&mut cur) {
            nodes.push(node);
            pending_setext_eligible = false;
            continue;
        }
        if let Some(node) = try_atx_heading(&mut cur) {
            nodes.push(node);
            pending_setext_eligible = false;
            continue;
        }
        if let Some(node) = try_thematic_break(&mut cur, pending_setext_eligible) {
            nodes.push(node);
            pending_setext_eligible = false;
            continue;
        }
        if let Some(def) = try_link_reference_definition(&mut cur)? {
            let raw = match &def {
                Node::Definition(d) => d.clone(),
                _ => unreachable!(),
            };
            if link_defs.insert(raw) {
                nodes.push(def);
            }
            pending_setext_eligible = false;
            continue;
        }
        if pending_setext_eligible {
            if let Some(heading) = try_setext_heading(&mut cur, nodes.last()) {
                nodes.pop();
                nodes.push(heading);
                pending_setext_eligible = false;
                continue;
            }
        }

        let (node, line_count) = parse_paragraph(&mut cur);
        nodes.push(node);
        pending_setext_eligible = line_count == 1;
    }

    Ok(nodes)
}

struct Cursor<'a> {
    tokens: &'a [BlockToken],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek_kind(&self) -> Option<K> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn checkpoint(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Byte index, exclusive, of the token just after the next `newline`
    /// (or end of input if there isn't one) — i.e. the bounds of "the rest
    /// of the current line" starting at `self.pos`.
    fn current_line_end(&self) -> usize {
        let mut i = self.pos;
        while i < self.tokens.len() {
            let is_newline = self.tokens[i].kind == K::Newline;
            i += 1;
            if is_newline {
                break;
            }
        }
        i
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn is_blank_slice(tokens: &[BlockToken]) -> bool {
    tokens.iter().all(|t| matches!(t.kind, K::Whitespace | K::Newline))
}

/// Up to 3 leading spaces are tolerated in front of every line-starting
/// construct (ATX heading, thematic break, fence, link reference
/// definition, setext underline — spec §4.2/§4.4). The BlockTokenizer
/// always emits that leftover indentation as at most one `whitespace`
/// token before anything else on the line, so skipping it here is a
/// single peek-and-advance rather than a counted space scan.
fn skip_up_to_three_spaces(cur: &mut Cursor) -> usize {
    if cur.peek_kind() == Some(K::Whitespace) {
        let len = cur.tokens[cur.pos].lexeme.len();
        if len <= 3 {
            cur.pos += 1;
            return len;
        }
    }
    0
}

fn try_blank_line(cur: &mut Cursor) -> Option<()> {
    let checkpoint = cur.checkpoint();
    let end = cur.current_line_end();
    let line = &cur.tokens[cur.pos..end];
    if line.is_empty() || !is_blank_slice(line) {
        cur.restore(checkpoint);
        return None;
    }
    cur.pos = end;
    Some(())
}

/// Reconstructs a token slice's literal source text. `indent_as_spaces`
/// controls how an `indent` token (which carries no lexeme of its own)
/// renders: `false` drops the *first* one (the unit that qualified the line
/// as indented code) and renders any further ones as four literal spaces;
/// `true` renders every one as four literal spaces. Newlines are never
/// included — callers join multi-line content with `\n` themselves.
fn reconstruct(tokens: &[BlockToken], indent_as_spaces: bool) -> String {
    let mut out = String::new();
    let mut dropped_one = false;
    for tok in tokens {
        match tok.kind {
            K::Newline => {}
            K::Indent => {
                if !indent_as_spaces && !dropped_one {
                    dropped_one = true;
                } else {
                    out.push_str("    ");
                }
            }
            _ => out.push_str(&tok.lexeme),
        }
    }
    out
}

fn try_indented_code(cur: &mut Cursor) -> Option<Node> {
    if cur.peek_kind() != Some(K::Indent) {
        return None;
    }
    let mut lines: Vec<String> = Vec::new();
    let mut trailing_blanks = 0usize;
    let mut guard = LoopGuard::new("leaf_parser::try_indented_code");

    loop {
        guard.tick();
        let end = cur.current_line_end();
        let line = &cur.tokens[cur.pos..end];
        let has_indent = line.first().map(|t| t.kind == K::Indent).unwrap_or(false);
        let blank = is_blank_slice(line);
        if !has_indent && !blank {
            break;
        }
        if blank {
            lines.push(String::new());
            trailing_blanks += 1;
        } else {
            lines.push(reconstruct(line, false));
            trailing_blanks = 0;
        }
        cur.pos = end;
        if cur.at_eof() {
            break;
        }
    }
    for _ in 0..trailing_blanks {
        lines.pop();
    }
    let value = lines.join("\n");
    Some(Node::code(value, ""))
}

fn try_fenced_code(cur: &mut Cursor) -> Option<Node> {
    let checkpoint = cur.checkpoint();
    let fence_indent = skip_up_to_three_spaces(cur);
    let kind = match cur.peek_kind() {
        Some(k) if k == K::BacktickFence || k == K::TildeFence => k,
        _ => {
            cur.restore(checkpoint);
            return None;
        }
    };
    let fence_char = if kind == K::BacktickFence { '`' } else { '~' };
    let open_len = cur.tokens[cur.pos].lexeme.len();
    let end = cur.current_line_end();
    let info_tokens = &cur.tokens[cur.pos + 1..end];
    let info_string = reconstruct(info_tokens, true);
    let lang = info_string.split_whitespace().next().unwrap_or("").to_string();
    cur.pos = end;

    let mut lines: Vec<String> = Vec::new();
    let mut guard = LoopGuard::new("leaf_parser::try_fenced_code");
    loop {
        guard.tick();
        if cur.at_eof() {
            break;
        }
        let line_end = cur.current_line_end();
        let line = &cur.tokens[cur.pos..line_end];
        if is_closing_fence(line, fence_char, open_len) {
            cur.pos = line_end;
            break;
        }
        lines.push(strip_indent_columns(&reconstruct(line, true), fence_indent));
        cur.pos = line_end;
    }
    Some(Node::code(lines.join("\n"), lang))
}

/// Strips up to `n` leading ASCII space characters — the same amount of
/// indentation the opening fence itself carried, so a fenced block nested
/// inside an indented context (e.g. under a list or blockquote, or simply
/// written with leading spaces) is dedented to its intended column rather
/// than keeping the fence's own indentation baked into every line.
fn strip_indent_columns(line: &str, n: usize) -> String {
    let mut to_strip = n;
    let mut start = 0;
    for ch in line.chars() {
        if to_strip == 0 || ch != ' ' {
            break;
        }
        to_strip -= 1;
        start += ch.len_utf8();
    }
    line[start..].to_string()
}

fn is_closing_fence(line: &[BlockToken], fence_char: char, open_len: usize) -> bool {
    let expected_kind = if fence_char == '`' { K::BacktickFence } else { K::TildeFence };
    let mut iter = line.iter().peekable();
    if let Some(t) = iter.peek() {
        if t.kind == K::Whitespace && t.lexeme.len() <= 3 {
            iter.next();
        }
    }
    match iter.next() {
        Some(t) if t.kind == expected_kind && t.lexeme.len() >= open_len => {}
        _ => return false,
    }
    iter.all(|t| matches!(t.kind, K::Whitespace | K::Newline))
}

fn try_atx_heading(cur: &mut Cursor) -> Option<Node> {
    let checkpoint = cur.checkpoint();
    skip_up_to_three_spaces(cur);
    if cur.peek_kind() != Some(K::Pound) {
        cur.restore(checkpoint);
        return None;
    }
    let depth = cur.tokens[cur.pos].lexeme.len();
    if !(1..=6).contains(&depth) {
        cur.restore(checkpoint);
        return None;
    }
    let end = cur.current_line_end();
    let rest = &cur.tokens[cur.pos + 1..end];
    cur.pos = end;
    let mut text = reconstruct(rest, true);
    text = text.trim().to_string();
    // Strip an optional closing sequence of `#`s.
    let trimmed_end = text.trim_end_matches('#');
    if trimmed_end.len() != text.len() && (trimmed_end.is_empty() || trimmed_end.ends_with(' ') || trimmed_end.ends_with('\t')) {
        text = trimmed_end.trim_end().to_string();
    }
    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    Some(Node::heading(depth as u8, children))
}

fn try_thematic_break(cur: &mut Cursor, pending_setext_eligible: bool) -> Option<Node> {
    let checkpoint = cur.checkpoint();
    skip_up_to_three_spaces(cur);
    let kind = match cur.peek_kind() {
        Some(k) => k,
        None => {
            cur.restore(checkpoint);
            return None;
        }
    };
    let qualifies = match kind {
        K::RuleStar | K::RuleUnderline | K::RuleDashWithWhitespace => true,
        K::RuleDash => !pending_setext_eligible && cur.tokens[cur.pos].lexeme.len() >= 3,
        _ => false,
    };
    if !qualifies {
        cur.restore(checkpoint);
        return None;
    }
    let end = cur.current_line_end();
    let rest = &cur.tokens[cur.pos + 1..end];
    if !is_blank_slice(rest) {
        cur.restore(checkpoint);
        return None;
    }
    cur.pos = end;
    Some(Node::ThematicBreak)
}

fn try_setext_heading(cur: &mut Cursor, last: Option<&Node>) -> Option<Node> {
    let paragraph = match last {
        Some(Node::Paragraph(c)) => c.clone(),
        _ => return None,
    };
    let checkpoint = cur.checkpoint();
    skip_up_to_three_spaces(cur);
    let kind = match cur.peek_kind() {
        Some(k) => k,
        None => {
            cur.restore(checkpoint);
            return None;
        }
    };
    let depth = match kind {
        K::RuleEquals => 1u8,
        K::RuleDash => 2u8,
        _ => {
            cur.restore(checkpoint);
            return None;
        }
    };
    let end = cur.current_line_end();
    let rest = &cur.tokens[cur.pos + 1..end];
    if !is_blank_slice(rest) {
        cur.restore(checkpoint);
        return None;
    }
    cur.pos = end;
    Some(Node::heading(depth, paragraph.children))
}

/// Tries a link reference definition. The fixed set of tokens that open the
/// production (`[`) make dispatch cheap, but the body (destination, title,
/// which may spill onto a second line) is irregular enough that it's
/// parsed from the reconstructed raw text rather than token-by-token; any
/// failure restores the cursor so the line falls through to the paragraph
/// production untouched.
fn try_link_reference_definition(cur: &mut Cursor) -> Result<Option<Node>> {
    let checkpoint = cur.checkpoint();
    skip_up_to_three_spaces(cur);
    if cur.peek_kind() != Some(K::LSquareBracket) {
        cur.restore(checkpoint);
        return Ok(None);
    }

    // Collect up to three lines' worth of raw text to scan; a definition
    // never spans more than a label line, an optional destination
    // continuation, and an optional title continuation.
    let mut scan_end = cur.pos;
    for _ in 0..3 {
        if scan_end >= cur.tokens.len() {
            break;
        }
        let mut i = scan_end;
        while i < cur.tokens.len() && cur.tokens[i].kind != K::Newline {
            i += 1;
        }
        if i < cur.tokens.len() {
            i += 1;
        }
        scan_end = i;
    }
    let window = &cur.tokens[cur.pos..scan_end];
    let raw = reconstruct_verbatim_multiline(window);

    match parse_definition_text(&raw) {
        Some((label, url, title, consumed_bytes)) => {
            let consumed_tokens = tokens_for_byte_len(window, consumed_bytes);
            cur.pos += consumed_tokens;
            Ok(Some(Node::definition(label, url, title)))
        }
        None => {
            cur.restore(checkpoint);
            Ok(None)
        }
    }
}

fn reconstruct_verbatim_multiline(tokens: &[BlockToken]) -> String {
    let mut out = String::new();
    for tok in tokens {
        match tok.kind {
            K::Newline => out.push('\n'),
            K::Indent => out.push_str("    "),
            _ => out.push_str(&tok.lexeme),
        }
    }
    out
}

/// Finds how many leading tokens of `window` reconstruct to exactly
/// `byte_len` bytes of verbatim text, so the cursor can be advanced by
/// tokens after the definition grammar was parsed out of a plain string.
fn tokens_for_byte_len(window: &[BlockToken], byte_len: usize) -> usize {
    let mut consumed = 0usize;
    for (i, tok) in window.iter().enumerate() {
        if consumed >= byte_len {
            return i;
        }
        consumed += match tok.kind {
            K::Newline => 1,
            K::Indent => 4,
            _ => tok.lexeme.len(),
        };
    }
    window.len()
}

/// Parses `[label]: destination "title"` (title optional, destination may
/// be angle-bracketed) from the front of `s`. Returns the parsed fields and
/// how many bytes of `s` were consumed, stopping at (and consuming) the
/// line's trailing newline. The remainder of that final line must be
/// blank-or-nothing or the whole production fails.
fn parse_definition_text(s: &str) -> Option<(String, String, String, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut i = 1;
    let label_start = i;
    let mut escaped = false;
    loop {
        let b = *bytes.get(i)?;
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b']' => break,
            b'\n' => return None,
            _ => {}
        }
        i += 1;
    }
    let label = s[label_start..i].to_string();
    if label.trim().is_empty() {
        return None;
    }
    i += 1; // ']'
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i += 1;
    i += skip_inline_whitespace_and_at_most_one_newline(&s[i..]);

    let (url, dest_consumed) = if bytes.get(i) == Some(&b'<') {
        let (inner, consumed) = uri::scan_angle_destination(&s[i..])?;
        (inner.to_string(), consumed)
    } else {
        let (raw, consumed) = uri::scan_bare_destination(&s[i..])?;
        (raw.to_string(), consumed)
    };
    i += dest_consumed;
    let url = uri::normalize_destination(&crate::entities::unescape(&url));

    let after_dest = i;
    let ws_before_title = skip_inline_whitespace_and_at_most_one_newline(&s[i..]);
    let mut title = String::new();
    let mut have_title = false;
    if ws_before_title > 0 {
        let candidate = i + ws_before_title;
        if let Some((t, consumed)) = scan_title(&s[candidate..]) {
            title = t;
            i = candidate + consumed;
            have_title = true;
        }
    }
    if !have_title {
        i = after_dest;
    }

    // Rest of the final line must be blank.
    let line_end = match s[i..].find('\n') {
        Some(pos) => i + pos + 1,
        None => s.len(),
    };
    let trailing = &s[i..line_end];
    if !trailing.trim().is_empty() {
        return None;
    }
    Some((label, url, title, line_end))
}

fn skip_inline_whitespace_and_at_most_one_newline(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i).is_some_and(|b| matches!(b, b' ' | b'\t')) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'\n') {
        i += 1;
        while bytes.get(i).is_some_and(|b| matches!(b, b' ' | b'\t')) {
            i += 1;
        }
    }
    i
}

fn scan_title(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let quote = *bytes.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut i = 1;
    let mut escaped = false;
    loop {
        let b = *bytes.get(i)?;
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            c if c == quote => break,
            _ => {}
        }
        i += 1;
    }
    let title = crate::entities::unescape(&s[1..i]);
    Some((title, i + 1))
}

/// Accumulates consecutive lines into one paragraph, stopping at EOF, a
/// blank line, a `close` token, or a line starting with an
/// interrupt-worthy token (spec §4.4 "Paragraph scanning"). Returns the
/// node and how many source lines contributed to it, since the caller
/// needs that count to know whether a setext underline may still apply.
fn parse_paragraph(cur: &mut Cursor) -> (Node, usize) {
    let mut lines: Vec<String> = Vec::new();
    let mut guard = LoopGuard::new("leaf_parser::parse_paragraph");

    loop {
        guard.tick();
        if cur.at_eof() {
            break;
        }
        match cur.peek_kind() {
            Some(K::Close) => break,
            Some(k) if k.interrupts_paragraph() => break,
            _ => {}
        }
        let end = cur.current_line_end();
        let line = &cur.tokens[cur.pos..end];
        if is_blank_slice(line) {
            break;
        }
        lines.push(reconstruct(line, true).trim().to_string());
        cur.pos = end;
        if cur.at_eof() {
            break;
        }
        // A line starting a setext-underline candidate (rule_dash /
        // rule_equals) belongs to the next top-level production dispatch,
        // not to this paragraph's own accumulation.
        match cur.peek_kind() {
            Some(K::RuleDash) | Some(K::RuleEquals) => break,
            _ => {}
        }
    }
    let text = lines.join("\n");
    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    (Node::paragraph(children), lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_tokenizer::tokenize_document;
    use crate::line_reader::LineReader;
    use std::io::Cursor as IoCursor;

    fn parse_doc(input: &str) -> Vec<Node> {
        let mut reader = LineReader::new(IoCursor::new(input.as_bytes().to_vec()));
        let tokens = tokenize_document(&mut reader).unwrap();
        let mut link_defs = LinkDefMap::new();
        parse(&tokens, &mut link_defs).unwrap()
    }

    #[test]
    fn atx_heading_and_paragraph() {
        let nodes = parse_doc("# Title\n\nSome text.\n");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], Node::Heading(h) if h.depth == 1));
        assert!(matches!(&nodes[1], Node::Paragraph(_)));
    }

    #[test]
    fn fenced_code_strips_fence_lines() {
        let nodes = parse_doc("```rust\nfn main() {}\n```\n");
        match &nodes[0] {
            Node::Code(c) => {
                assert_eq!(c.lang, "rust");
                assert_eq!(c.value, "fn main() {}");
            }
            other => panic!("expected code node, got {other:?}"),
        }
    }

    #[test]
    fn fenced_code_dedents_to_fence_indentation() {
        let nodes = parse_doc("  ```python\n  def foo():\n      pass\n  ```\n");
        match &nodes[0] {
            Node::Code(c) => {
                assert_eq!(c.lang, "python");
                assert_eq!(c.value, "def foo():\n    pass");
            }
            other => panic!("expected code node, got {other:?}"),
        }
    }

    #[test]
    fn indented_code_strips_one_level() {
        let nodes = parse_doc("    echo hi\n");
        match &nodes[0] {
            Node::Code(c) => assert_eq!(c.value, "echo hi"),
            other => panic!("expected code node, got {other:?}"),
        }
    }

    #[test]
    fn setext_heading_from_prior_paragraph() {
        let nodes = parse_doc("Title\n=====\n");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Heading(h) if h.depth == 1));
    }

    #[test]
    fn thematic_break_not_mistaken_for_setext_when_no_paragraph() {
        let nodes = parse_doc("---\n");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], Node::ThematicBreak));
    }

    #[test]
    fn link_reference_definition_registers_and_emits_node() {
        let mut link_defs = LinkDefMap::new();
        let mut reader = LineReader::new(IoCursor::new(b"[foo]: /url \"title\"\n".to_vec()));
        let tokens = tokenize_document(&mut reader).unwrap();
        let nodes = parse(&tokens, &mut link_defs).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Definition(_)));
        assert_eq!(link_defs.get("foo").unwrap().url, "/url");
        assert_eq!(link_defs.get("foo").unwrap().title, "title");
    }

    #[test]
    fn atx_heading_tolerates_up_to_three_leading_spaces() {
        let nodes = parse_doc("   # Title\n");
        assert!(matches!(&nodes[0], Node::Heading(h) if h.depth == 1));
    }

    #[test]
    fn thematic_break_tolerates_up_to_three_leading_spaces() {
        let nodes = parse_doc("   ---\n");
        assert!(matches!(nodes[0], Node::ThematicBreak));
    }

    #[test]
    fn link_reference_definition_tolerates_up_to_three_leading_spaces() {
        let mut link_defs = LinkDefMap::new();
        let mut reader = LineReader::new(IoCursor::new(b"   [foo]: /url\n".to_vec()));
        let tokens = tokenize_document(&mut reader).unwrap();
        let nodes = parse(&tokens, &mut link_defs).unwrap();
        assert!(matches!(&nodes[0], Node::Definition(_)));
        assert_eq!(link_defs.get("foo").unwrap().url, "/url");
    }

    #[test]
    fn setext_heading_tolerates_up_to_three_leading_spaces() {
        let nodes = parse_doc("Title\n  =====\n");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Heading(h) if h.depth == 1));
    }
}
