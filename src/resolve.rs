//! Second tree walk that replaces each leaf block's raw text placeholder
//! (produced by the LeafBlockParser) with real inline children, once the
//! whole document's link definitions are known.

use crate::ast::Node;
use crate::inline_parser;
use crate::link_defs::LinkDefMap;

pub fn resolve_inlines(nodes: Vec<Node>, link_defs: &LinkDefMap) -> Vec<Node> {
    nodes.into_iter().map(|n| resolve_node(n, link_defs)).collect()
}

fn resolve_node(node: Node, link_defs: &LinkDefMap) -> Node {
    match node {
        Node::Paragraph(c) => Node::paragraph(resolve_raw_children(c.children, link_defs)),
        Node::Heading(h) => Node::heading(h.depth, resolve_raw_children(h.children, link_defs)),
        Node::Blockquote(c) => Node::blockquote(resolve_inlines(c.children, link_defs)),
        other => other,
    }
}

/// A freshly parsed Paragraph/Heading carries exactly one `Node::Text`
/// child holding its unparsed source (or none, for an empty heading); this
/// expands that single placeholder into the real inline node list.
fn resolve_raw_children(children: Vec<Node>, link_defs: &LinkDefMap) -> Vec<Node> {
    match children.into_iter().next() {
        Some(Node::Text(v)) => inline_parser::parse(&v.value, link_defs),
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paragraph_raw_text_becomes_inline_children() {
        let defs = LinkDefMap::new();
        let nodes = vec![Node::paragraph(vec![Node::text("*em*")])];
        let resolved = resolve_inlines(nodes, &defs);
        assert_eq!(resolved, vec![Node::paragraph(vec![Node::emphasis(vec![Node::text("em")])])]);
    }

    #[test]
    fn blockquote_children_resolve_recursively() {
        let defs = LinkDefMap::new();
        let nodes = vec![Node::blockquote(vec![Node::paragraph(vec![Node::text("`code`")])])];
        let resolved = resolve_inlines(nodes, &defs);
        assert_eq!(
            resolved,
            vec![Node::blockquote(vec![Node::paragraph(vec![Node::inline_code("code")])])]
        );
    }
}
