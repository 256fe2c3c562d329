//! Atrus: a MyST-flavored Markdown parsing core (spec §1-§2).
//!
//! The pipeline (spec §2): `LineReader` -> `block_tokenizer` ->
//! `container_parser` (which calls down into `leaf_parser` per nesting
//! depth) -> `resolve` (fills in inline children once the whole document's
//! link definitions are known) -> `post_process` -> one of the renderers.
//! Lists, tables, and MyST directives/roles are out of scope (spec §9
//! Non-goals); the surface here is blockquotes, ATX/setext headings,
//! fenced/indented code, thematic breaks, link reference definitions,
//! paragraphs, and CommonMark inline emphasis/links/images/autolinks/code
//! spans/character references.

pub mod alt_text;
pub mod ast;
pub mod block_tokenizer;
pub mod container_parser;
pub mod entities;
pub mod error;
pub mod inline_parser;
pub mod inline_tokenizer;
pub mod leaf_parser;
pub mod line_reader;
pub mod link_defs;
pub mod logging;
pub mod loop_guard;
pub mod node_list;
pub mod post_process;
pub mod render;
pub mod resolve;
pub mod token;
pub mod uri;

pub use ast::Node;
pub use error::{AtrusError, Result};
pub use link_defs::LinkDefMap;
pub use render::{ParseLevel, ParseOptions, RenderOptions, Whitespace};

use line_reader::LineReader;
use std::io::Read;

/// Runs the full pipeline over `input` and returns the resulting tree.
///
/// `options.parse_level` controls whether the returned tree has gone
/// through `PostProcess` (`ParseLevel::Post`, the default) or is left at
/// the raw block-list stage (`ParseLevel::Pre`) for callers that want to
/// inspect or further transform it before wrapping.
pub fn parse<R: Read>(input: R, options: ParseOptions) -> Result<Node> {
    let mut reader = LineReader::new(input);
    let tokens = block_tokenizer::tokenize_document(&mut reader)?;

    let mut link_defs = LinkDefMap::new();
    let blocks = container_parser::parse(&tokens, &mut link_defs)?;
    let children = resolve::resolve_inlines(blocks, &link_defs);

    let root = Node::Root(ast::Root {
        children,
        is_post_processed: false,
    });

    Ok(match options.parse_level {
        ParseLevel::Pre => root,
        ParseLevel::Post => post_process::post_process(root),
    })
}

/// Serializes a tree to the mdast-shaped JSON format (spec §6.2). Requires
/// a post-processed tree (`ParseLevel::Post`).
pub fn render_json(root: &Node, options: RenderOptions) -> Result<String> {
    render::json::render(root, options)
}

/// Serializes a tree to HTML (spec §6.2). Requires a post-processed tree.
pub fn render_html(root: &Node) -> Result<String> {
    render::html::render(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_str(input: &str) -> Node {
        parse(Cursor::new(input.as_bytes().to_vec()), ParseOptions::default()).unwrap()
    }

    #[test]
    fn heading_and_paragraph_round_trip_to_json() {
        let root = parse_str("# Title\n\nSome *text*.\n");
        let json = render_json(&root, RenderOptions::default()).unwrap();
        assert!(json.contains(r#""type": "heading""#));
        assert!(json.contains(r#""type": "emphasis""#));
    }

    #[test]
    fn reference_link_resolves_against_later_definition() {
        let root = parse_str("See [a link][ref].\n\n[ref]: /dest \"Title\"\n");
        let html = render_html(&root).unwrap();
        assert!(html.contains(r#"<a href="/dest" title="Title">a link</a>"#));
    }

    #[test]
    fn pre_level_tree_is_rejected_by_renderers() {
        let root = parse(
            Cursor::new(b"hi\n".to_vec()),
            ParseOptions {
                parse_level: ParseLevel::Pre,
            },
        )
        .unwrap();
        assert!(matches!(
            render_json(&root, RenderOptions::default()),
            Err(AtrusError::NotPostProcessed)
        ));
        assert!(matches!(render_html(&root), Err(AtrusError::NotPostProcessed)));
    }

    #[test]
    fn blockquote_lazy_continuation_end_to_end() {
        let root = parse_str("> line one\nline two\n> line three\n\nnot quoted\n");
        match &root {
            Node::Root(r) => match &r.children[0] {
                Node::Block(c) => {
                    assert!(matches!(c.children[0], Node::Blockquote(_)));
                }
                other => panic!("expected block, got {other:?}"),
            },
            other => panic!("expected root, got {other:?}"),
        }
    }
}
