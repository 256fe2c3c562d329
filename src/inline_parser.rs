//! InlineParser (spec §4.6): recursive-descent with backtracking over the
//! InlineTokenizer's output, nine productions in precedence order: code
//! span, URI autolink, email autolink, image, inline/reference link,
//! emphasis/strong (star and underscore, rule 9/10 predicate), text
//! resolution, and a raw-text fallback.

use crate::alt_text;
use crate::ast::Node;
use crate::entities;
use crate::inline_tokenizer::tokenize;
use crate::link_defs::LinkDefMap;
use crate::loop_guard::LoopGuard;
use crate::node_list::NodeList;
use crate::token::{InlineToken, InlineTokenKind as K};
use crate::uri;

pub fn parse(text: &str, link_defs: &LinkDefMap) -> Vec<Node> {
    let tokens = tokenize(text);
    let mut p = Parser {
        tokens,
        pos: 0,
        link_defs,
    };
    let limit = p.tokens.len();
    p.parse_run(limit)
}

struct Parser<'a> {
    tokens: Vec<InlineToken>,
    pos: usize,
    link_defs: &'a LinkDefMap,
}

impl<'a> Parser<'a> {
    fn parse_run(&mut self, limit: usize) -> Vec<Node> {
        let mut list = NodeList::new();
        let mut guard = LoopGuard::new("inline_parser::parse_run");

        while self.pos < limit {
            guard.tick();
            let tok = &self.tokens[self.pos];
            match tok.kind {
                K::Backtick => {
                    if let Some(node) = self.try_code_span(limit) {
                        list.append(node);
                        continue;
                    }
                    list.append_text(&self.tokens[self.pos].lexeme);
                    self.pos += 1;
                }
                K::AbsoluteUri | K::Email => {
                    let lexeme = tok.lexeme.clone();
                    list.append(self.make_autolink(&lexeme));
                    self.pos += 1;
                }
                K::LAngleBracket => {
                    if let Some((node, consumed)) = self.try_bracketed_autolink(limit) {
                        list.append(node);
                        self.pos += consumed;
                    } else {
                        list.append_text("<");
                        self.pos += 1;
                    }
                }
                K::ExclamationMark => {
                    if self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(K::LSquareBracket) {
                        if let Some((node, consumed)) = self.try_image(limit) {
                            list.append(node);
                            self.pos += consumed;
                            continue;
                        }
                    }
                    list.append_text("!");
                    self.pos += 1;
                }
                K::LSquareBracket => {
                    if let Some((node, consumed)) = self.try_link(limit) {
                        list.append(node);
                        self.pos += consumed;
                    } else {
                        list.append_text("[");
                        self.pos += 1;
                    }
                }
                K::LDelimStar(_) | K::LrDelimStar(_) => {
                    if let Some((nodes, consumed)) = self.try_emphasis_star(limit) {
                        for n in nodes {
                            list.append(n);
                        }
                        self.pos += consumed;
                    } else {
                        list.append_text(&self.tokens[self.pos].lexeme);
                        self.pos += 1;
                    }
                }
                K::LDelimUnderscore(_) | K::LrDelimUnderscore(_) => {
                    if let Some((nodes, consumed)) = self.try_emphasis_underscore(limit) {
                        for n in nodes {
                            list.append(n);
                        }
                        self.pos += consumed;
                    } else {
                        list.append_text(&self.tokens[self.pos].lexeme);
                        self.pos += 1;
                    }
                }
                K::EntityReference | K::DecimalCharacterReference | K::HexadecimalCharacterReference => {
                    list.append_text(&entities::decode(&self.tokens[self.pos].lexeme));
                    self.pos += 1;
                }
                K::Newline => {
                    // A single trailing space-less newline inside a
                    // paragraph becomes a soft line break: a literal
                    // space in rendered text. Two or more trailing
                    // spaces before it would make it a hard break, but
                    // leaf-level reconstruction already collapses
                    // trailing whitespace, so soft breaks are all this
                    // layer sees in practice.
                    list.append_text("\n");
                    self.pos += 1;
                }
                K::Text => {
                    list.append_text(&entities::unescape(&self.tokens[self.pos].lexeme));
                    self.pos += 1;
                }
                _ => {
                    list.append_text(&self.tokens[self.pos].lexeme);
                    self.pos += 1;
                }
            }
        }
        list.into_vec()
    }

    fn make_autolink(&self, raw: &str) -> Node {
        let url = uri::normalize_destination(raw);
        Node::link(url, "", vec![Node::text(raw)])
    }

    fn try_bracketed_autolink(&mut self, limit: usize) -> Option<(Node, usize)> {
        let next = self.tokens.get(self.pos + 1)?;
        if !matches!(next.kind, K::AbsoluteUri | K::Email) {
            return None;
        }
        let closing = self.tokens.get(self.pos + 2)?;
        if closing.kind != K::RAngleBracket {
            return None;
        }
        if self.pos + 2 >= limit {
            return None;
        }
        let raw = next.lexeme.clone();
        Some((self.make_autolink(&raw), 3))
    }

    /// Finds a closing backtick run of exactly the same length as the
    /// opener and returns the content rendered per CommonMark code-span
    /// rules: internal newlines become spaces, and a single leading and
    /// trailing space are stripped if the content isn't all whitespace.
    fn try_code_span(&mut self, limit: usize) -> Option<Node> {
        let open_len = self.tokens[self.pos].lexeme.len();
        let mut j = self.pos + 1;
        while j < limit {
            if self.tokens[j].kind == K::Backtick && self.tokens[j].lexeme.len() == open_len {
                let mut raw = String::new();
                for t in &self.tokens[self.pos + 1..j] {
                    if t.kind == K::Newline {
                        raw.push(' ');
                    } else {
                        raw.push_str(&t.lexeme);
                    }
                }
                let trimmed = if raw.starts_with(' ')
                    && raw.ends_with(' ')
                    && raw.trim() != ""
                {
                    raw[1..raw.len() - 1].to_string()
                } else {
                    raw
                };
                self.pos = j + 1;
                return Some(Node::inline_code(trimmed));
            }
            j += 1;
        }
        None
    }

    fn find_matching_bracket(&self, start: usize, limit: usize) -> Option<usize> {
        let mut depth = 1i32;
        let mut i = start + 1;
        while i < limit {
            match self.tokens[i].kind {
                K::Backtick => {
                    let open_len = self.tokens[i].lexeme.len();
                    let mut j = i + 1;
                    while j < limit {
                        if self.tokens[j].kind == K::Backtick && self.tokens[j].lexeme.len() == open_len {
                            break;
                        }
                        j += 1;
                    }
                    i = if j < limit { j + 1 } else { i + 1 };
                    continue;
                }
                K::LSquareBracket => depth += 1,
                K::RSquareBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn find_matching_paren(&self, start: usize, limit: usize) -> Option<usize> {
        let mut depth = 1i32;
        let mut i = start + 1;
        while i < limit {
            match self.tokens[i].kind {
                K::LParen => depth += 1,
                K::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn reconstruct(&self, range: std::ops::Range<usize>) -> String {
        self.tokens[range].iter().map(|t| t.lexeme.as_str()).collect()
    }

    /// Parses `destination ["title"]` out of the raw text between a link's
    /// parentheses.
    fn parse_inline_destination(inner: &str) -> Option<(String, String)> {
        let trimmed_start = inner.trim_start();
        let leading_ws = inner.len() - trimmed_start.len();
        let mut i = leading_ws;
        let bytes = inner.as_bytes();
        if i >= bytes.len() {
            return Some((String::new(), String::new()));
        }
        let (raw_url, consumed) = if bytes[i] == b'<' {
            let (u, c) = uri::scan_angle_destination(&inner[i..])?;
            (u.to_string(), c)
        } else {
            let (u, c) = uri::scan_bare_destination(&inner[i..])?;
            (u.to_string(), c)
        };
        i += consumed;
        let url = uri::normalize_destination(&raw_url);
        let rest = inner[i..].trim_start();
        let title = if rest.starts_with('"') || rest.starts_with('\'') {
            let quote = rest.as_bytes()[0];
            let body = &rest[1..];
            body.find(quote as char).map(|end| body[..end].to_string())
        } else {
            None
        };
        Some((url, title.unwrap_or_default()))
    }

    fn try_image(&mut self, limit: usize) -> Option<(Node, usize)> {
        let bracket_pos = self.pos + 1;
        if self.tokens.get(bracket_pos)?.kind != K::LSquareBracket {
            return None;
        }
        let close_bracket = self.find_matching_bracket(bracket_pos, limit)?;
        let alt_children = {
            let mut sub = Parser {
                tokens: self.tokens[bracket_pos + 1..close_bracket].to_vec(),
                pos: 0,
                link_defs: self.link_defs,
            };
            let len = sub.tokens.len();
            sub.parse_run(len)
        };
        let alt = alt_text::render(&alt_children);

        let (url, title, total_consumed) = self.resolve_link_tail(close_bracket, limit, &alt)?;
        Some((Node::image(url, title, alt), total_consumed + 1))
    }

    fn try_link(&mut self, limit: usize) -> Option<(Node, usize)> {
        let close_bracket = self.find_matching_bracket(self.pos, limit)?;
        let text_children = {
            let mut sub = Parser {
                tokens: self.tokens[self.pos + 1..close_bracket].to_vec(),
                pos: 0,
                link_defs: self.link_defs,
            };
            let len = sub.tokens.len();
            sub.parse_run(len)
        };
        let plain_label = self.reconstruct(self.pos + 1..close_bracket);
        let (url, title, total_consumed) = self.resolve_link_tail(close_bracket, limit, &plain_label)?;
        Some((Node::link(url, title, text_children), total_consumed))
    }

    /// Shared tail-parsing for both links and images: everything from just
    /// after the closing `]` of the label/alt through the destination,
    /// whether written inline `(...)` or as a `[label]`/shortcut
    /// reference. `fallback_label` is the label text used for a shortcut
    /// reference (bracket content itself).
    fn resolve_link_tail(
        &self,
        close_bracket: usize,
        limit: usize,
        fallback_label: &str,
    ) -> Option<(String, String, usize)> {
        let next = close_bracket + 1;
        if self.tokens.get(next).map(|t| t.kind) == Some(K::LParen) {
            let close_paren = self.find_matching_paren(next, limit)?;
            let inner = self.reconstruct(next + 1..close_paren);
            let (url, title) = Self::parse_inline_destination(&inner)?;
            return Some((url, title, close_paren + 1 - self.pos));
        }
        // `[text][label]` full reference form.
        if self.tokens.get(next).map(|t| t.kind) == Some(K::LSquareBracket) {
            if let Some(close2) = self.find_matching_bracket(next, limit) {
                let label_text = self.reconstruct(next + 1..close2);
                let label = if label_text.trim().is_empty() {
                    fallback_label
                } else {
                    &label_text
                };
                if let Some(def) = self.link_defs.get(label) {
                    return Some((def.url.clone(), def.title.clone(), close2 + 1 - self.pos));
                }
                return None;
            }
        }
        // Shortcut reference: `[label]` with no following `(` or `[...]`.
        if let Some(def) = self.link_defs.get(fallback_label) {
            return Some((def.url.clone(), def.title.clone(), close_bracket + 1 - self.pos));
        }
        None
    }

    fn try_emphasis_star(&mut self, limit: usize) -> Option<(Vec<Node>, usize)> {
        self.try_emphasis(limit, true)
    }

    fn try_emphasis_underscore(&mut self, limit: usize) -> Option<(Vec<Node>, usize)> {
        self.try_emphasis(limit, false)
    }

    fn try_emphasis(&mut self, limit: usize, star: bool) -> Option<(Vec<Node>, usize)> {
        let opener = &self.tokens[self.pos];
        let (opener_len, opener_is_lr) = if star {
            (opener.kind.star_run_len()?, opener.kind.is_both_flanking_star())
        } else {
            (
                opener.kind.underscore_context()?.run_len,
                opener.kind.is_both_flanking_underscore(),
            )
        };

        let mut j = self.pos + 1;
        let mut closer_idx = None;
        while j < limit {
            let k = self.tokens[j].kind;
            let matches_char = if star {
                matches!(k, K::RDelimStar(_) | K::LrDelimStar(_))
            } else {
                matches!(k, K::RDelimUnderscore(_) | K::LrDelimUnderscore(_))
            };
            if matches_char {
                let (closer_len, closer_is_lr) = if star {
                    (k.star_run_len().unwrap(), k.is_both_flanking_star())
                } else {
                    (k.underscore_context().unwrap().run_len, k.is_both_flanking_underscore())
                };
                if rule_9_10_ok(opener_len, closer_len, opener_is_lr, closer_is_lr) {
                    closer_idx = Some(j);
                    break;
                }
            }
            j += 1;
        }
        let closer_idx = closer_idx?;
        let closer_len = if star {
            self.tokens[closer_idx].kind.star_run_len().unwrap()
        } else {
            self.tokens[closer_idx].kind.underscore_context().unwrap().run_len
        };

        let content = {
            let mut sub = Parser {
                tokens: self.tokens[self.pos + 1..closer_idx].to_vec(),
                pos: 0,
                link_defs: self.link_defs,
            };
            let len = sub.tokens.len();
            sub.parse_run(len)
        };

        let mut remaining_open = opener_len;
        let mut remaining_close = closer_len;
        let mut result = content;
        let mut guard = LoopGuard::new("inline_parser::try_emphasis peel");
        while remaining_open > 0 && remaining_close > 0 {
            guard.tick();
            let bite = if remaining_open >= 2 && remaining_close >= 2 { 2 } else { 1 };
            result = vec![if bite == 2 {
                Node::strong(result)
            } else {
                Node::emphasis(result)
            }];
            remaining_open -= bite;
            remaining_close -= bite;
        }

        let delim_char = if star { '*' } else { '_' };
        let mut out = Vec::new();
        if remaining_open > 0 {
            out.push(Node::text(delim_char.to_string().repeat(remaining_open as usize)));
        }
        out.extend(result);
        if remaining_close > 0 {
            out.push(Node::text(delim_char.to_string().repeat(remaining_close as usize)));
        }
        Some((out, closer_idx + 1 - self.pos))
    }
}

/// CommonMark rule 9/10: when either side can both open and close, the sum
/// of the two run lengths must not be a multiple of 3 unless both
/// individually are.
fn rule_9_10_ok(opener_len: u16, closer_len: u16, opener_is_lr: bool, closer_is_lr: bool) -> bool {
    if !opener_is_lr && !closer_is_lr {
        return true;
    }
    let sum_multiple_of_3 = (opener_len + closer_len) % 3 == 0;
    if !sum_multiple_of_3 {
        return true;
    }
    opener_len % 3 == 0 && closer_len % 3 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_text(s: &str) -> Vec<Node> {
        let defs = LinkDefMap::new();
        parse(s, &defs)
    }

    #[test]
    fn plain_text_round_trips() {
        let nodes = parse_text("hello world");
        assert_eq!(nodes, vec![Node::text("hello world")]);
    }

    #[test]
    fn simple_emphasis() {
        let nodes = parse_text("*em*");
        assert_eq!(nodes, vec![Node::emphasis(vec![Node::text("em")])]);
    }

    #[test]
    fn triple_star_nests_emphasis_around_strong() {
        let nodes = parse_text("***a strong in an emphasis***");
        assert_eq!(
            nodes,
            vec![Node::emphasis(vec![Node::strong(vec![Node::text(
                "a strong in an emphasis"
            )])])]
        );
    }

    #[test]
    fn code_span_strips_single_surrounding_space() {
        let nodes = parse_text("` foo `");
        assert_eq!(nodes, vec![Node::inline_code("foo")]);
    }

    #[test]
    fn inline_link_with_title() {
        let nodes = parse_text("[text](/url \"title\")");
        assert_eq!(
            nodes,
            vec![Node::link("/url", "title", vec![Node::text("text")])]
        );
    }

    #[test]
    fn reference_link_resolves_from_link_defs() {
        let mut defs = LinkDefMap::new();
        defs.insert(crate::ast::Definition {
            label: "foo".to_string(),
            url: "/bar".to_string(),
            title: String::new(),
        });
        let nodes = parse("[text][foo]", &defs);
        assert_eq!(nodes, vec![Node::link("/bar", "", vec![Node::text("text")])]);
    }

    #[test]
    fn bare_autolink_percent_encodes_brackets() {
        let nodes = parse_text("https://example.com/a[b]");
        match &nodes[0] {
            Node::Link(l) => assert_eq!(l.url, "https://example.com/a%5Bb%5D"),
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn escaped_stars_do_not_produce_emphasis() {
        let nodes = parse_text(r"\*foo\*");
        assert_eq!(nodes, vec![Node::text("*foo*")]);
    }

    #[test]
    fn backslash_escape_is_stripped_before_ascii_punctuation() {
        let nodes = parse_text(r"a\.b");
        assert_eq!(nodes, vec![Node::text("a.b")]);
    }

    #[test]
    fn backslash_before_non_punctuation_is_preserved() {
        let nodes = parse_text(r"a\Ab");
        assert_eq!(nodes, vec![Node::text(r"a\Ab")]);
    }

    #[test]
    fn other_scheme_autolink_is_recognized() {
        let nodes = parse_text("irc://chat.example.com/room");
        match &nodes[0] {
            Node::Link(l) => assert_eq!(l.url, "irc://chat.example.com/room"),
            other => panic!("expected link, got {other:?}"),
        }
    }
}
