//! Alt-text sub-renderer (spec §4.8): flattens an inline subtree to plain
//! text for use as an `image` node's `alt` payload.

use crate::ast::Node;

pub fn render(children: &[Node]) -> String {
    let mut out = String::new();
    for child in children {
        render_into(child, &mut out);
    }
    out
}

fn render_into(node: &Node, out: &mut String) {
    match node {
        Node::Text(v) | Node::InlineCode(v) => out.push_str(&v.value),
        Node::Emphasis(c) | Node::Strong(c) => {
            for child in &c.children {
                render_into(child, out);
            }
        }
        Node::Link(l) => {
            for child in &l.children {
                render_into(child, out);
            }
        }
        Node::Image(i) => out.push_str(&i.alt),
        Node::Break => out.push(' '),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_emphasis_and_links() {
        let children = vec![
            Node::text("see "),
            Node::emphasis(vec![Node::text("the "), Node::strong(vec![Node::text("thing")])]),
        ];
        assert_eq!(render(&children), "see the thing");
    }

    #[test]
    fn image_contributes_its_own_alt() {
        let children = vec![Node::image("/x.png", "", "a picture")];
        assert_eq!(render(&children), "a picture");
    }
}
