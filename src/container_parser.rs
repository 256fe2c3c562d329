//! ContainerBlockParser (spec §4.3): strips blockquote markers, resolves
//! lazy continuation, and recursively assembles the `blockquote` nesting
//! structure around whatever the LeafBlockParser produces.
//!
//! Lists are a Non-goal, so blockquote is the only container kind; the
//! "container stack" from the spec collapses to a single nesting depth
//! counter instead of a `Vec<ContainerKind>`.

use crate::ast::Node;
use crate::leaf_parser;
use crate::link_defs::LinkDefMap;
use crate::loop_guard::LoopGuard;
use crate::error::Result;
use crate::token::{BlockToken, BlockTokenKind};

struct RawLine {
    depth: usize,
    rest: Vec<BlockToken>,
    /// True when this line closed one or more containers without a blank
    /// line in between — the LeafBlockParser needs an explicit signal here
    /// so it doesn't mistake the next shallower line for a lazy-continued
    /// paragraph (spec §9, "close token interaction with lazy continuation").
    forced_close: bool,
}

pub fn parse(tokens: &[BlockToken], link_defs: &mut LinkDefMap) -> Result<Vec<Node>> {
    let lines = classify_lines(tokens);
    build_nodes(&lines, 0, link_defs)
}

fn split_into_lines(tokens: &[BlockToken]) -> Vec<Vec<BlockToken>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    for tok in tokens {
        let is_newline = tok.kind == BlockTokenKind::Newline;
        current.push(tok.clone());
        if is_newline {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Strips leading `>` markers (and at most one single-space/tab whitespace
/// token directly following each marker) from a line, returning how many
/// markers were found and the residual tokens.
fn strip_leading_markers(line: &[BlockToken]) -> (usize, Vec<BlockToken>) {
    let mut i = 0;
    // Up to 3 leading spaces are tolerated before the first `>` marker
    // (spec §4.2/§4.3); only skipped when a marker actually follows, so an
    // ordinary line's leading whitespace reaches the LeafBlockParser intact
    // (it needs to see it to compute fenced-code indentation stripping).
    if line.first().map(|t| t.kind) == Some(BlockTokenKind::Whitespace)
        && line[0].lexeme.len() <= 3
        && line.get(1).map(|t| t.kind) == Some(BlockTokenKind::RAngleBracketBlockquote)
    {
        i = 1;
    }
    let mut markers = 0usize;
    while i < line.len() && line[i].kind == BlockTokenKind::RAngleBracketBlockquote {
        markers += 1;
        i += 1;
        if i < line.len() && line[i].kind == BlockTokenKind::Whitespace && line[i].lexeme.len() == 1 {
            i += 1;
        }
    }
    (markers, line[i..].to_vec())
}

fn is_blank(rest: &[BlockToken]) -> bool {
    rest.iter()
        .all(|t| matches!(t.kind, BlockTokenKind::Whitespace | BlockTokenKind::Newline))
}

fn classify_lines(tokens: &[BlockToken]) -> Vec<RawLine> {
    let mut out = Vec::new();
    let mut open_depth = 0usize;
    let mut prev_nonblank = false;
    let mut guard = LoopGuard::new("container_parser::classify_lines");

    for line in split_into_lines(tokens) {
        guard.tick();
        let (markers_here, after_markers) = strip_leading_markers(&line);
        let blank = is_blank(&after_markers);

        if markers_here >= open_depth {
            open_depth = markers_here;
            prev_nonblank = !blank;
            out.push(RawLine {
                depth: markers_here,
                rest: after_markers,
                forced_close: false,
            });
        } else if blank {
            open_depth = markers_here;
            prev_nonblank = false;
            out.push(RawLine {
                depth: markers_here,
                rest: after_markers,
                forced_close: false,
            });
        } else if markers_here == 0 && prev_nonblank {
            // Lazy continuation: keep the full, unstripped line at the
            // still-open depth; a line with zero markers that lazily
            // continues a paragraph carries no container content to strip.
            out.push(RawLine {
                depth: open_depth,
                rest: line,
                forced_close: false,
            });
        } else {
            prev_nonblank = !blank;
            out.push(RawLine {
                depth: markers_here,
                rest: after_markers,
                forced_close: true,
            });
            open_depth = markers_here;
        }
    }
    out
}

fn build_nodes(lines: &[RawLine], depth: usize, link_defs: &mut LinkDefMap) -> Result<Vec<Node>> {
    let mut result = Vec::new();
    let mut i = 0;
    let mut guard = LoopGuard::new("container_parser::build_nodes");

    while i < lines.len() {
        guard.tick();
        if lines[i].depth > depth {
            let start = i;
            while i < lines.len() && lines[i].depth > depth {
                i += 1;
            }
            let children = build_nodes(&lines[start..i], depth + 1, link_defs)?;
            result.push(Node::blockquote(children));
        } else if lines[i].depth == depth {
            let start = i;
            while i < lines.len() && lines[i].depth == depth {
                i += 1;
            }
            let mut leaf_tokens = Vec::new();
            for l in &lines[start..i] {
                leaf_tokens.extend(l.rest.iter().cloned());
                if l.forced_close {
                    leaf_tokens.push(BlockToken::lexeme_less(BlockTokenKind::Close));
                }
            }
            let nodes = leaf_parser::parse(&leaf_tokens, link_defs)?;
            result.extend(nodes);
        } else {
            // A line shallower than the current recursion depth cannot
            // occur here: classify_lines() only ever hands this recursion
            // level lines with depth >= depth.
            break;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_tokenizer::tokenize_document;
    use crate::line_reader::LineReader;
    use std::io::Cursor;

    fn parse_doc(input: &str) -> Vec<Node> {
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        let tokens = tokenize_document(&mut reader).unwrap();
        let mut link_defs = LinkDefMap::new();
        parse(&tokens, &mut link_defs).unwrap()
    }

    #[test]
    fn simple_blockquote_wraps_paragraph() {
        let nodes = parse_doc("> hello\n");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Blockquote(c) => assert_eq!(c.children.len(), 1),
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn nested_blockquote() {
        let nodes = parse_doc("> > deep\n");
        match &nodes[0] {
            Node::Blockquote(outer) => match &outer.children[0] {
                Node::Blockquote(inner) => assert_eq!(inner.children.len(), 1),
                other => panic!("expected nested blockquote, got {other:?}"),
            },
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn lazy_continuation_across_lines() {
        let nodes = parse_doc("> line one\nline two\n> line three\n");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Blockquote(c) => assert_eq!(c.children.len(), 1),
            other => panic!("expected single blockquote, got {other:?}"),
        }
    }

    #[test]
    fn blank_line_closes_blockquote() {
        let nodes = parse_doc("> quoted\n\nnot quoted\n");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(nodes[0], Node::Blockquote(_)));
        assert!(matches!(nodes[1], Node::Paragraph(_)));
    }
}
