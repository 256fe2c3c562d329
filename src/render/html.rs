//! HTML renderer (spec §6.2 REDESIGN note — shipped as a real renderer
//! scoped to exactly the node/field set the spec defines, no syntax
//! highlighting or embedded-language theming).

use crate::ast::Node;
use crate::error::{AtrusError, Result};

pub fn render(root: &Node) -> Result<String> {
    match root {
        Node::Root(r) if r.is_post_processed => {
            let mut out = String::new();
            for child in &r.children {
                render_node(child, &mut out);
            }
            Ok(out)
        }
        Node::Root(_) => Err(AtrusError::NotPostProcessed),
        _ => Err(AtrusError::NotPostProcessed),
    }
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(r) => {
            for child in &r.children {
                render_node(child, out);
            }
        }
        Node::Block(c) => {
            for child in &c.children {
                render_node(child, out);
            }
        }
        Node::Paragraph(c) => {
            out.push_str("<p>");
            render_children(&c.children, out);
            out.push_str("</p>\n");
        }
        Node::Blockquote(c) => {
            out.push_str("<blockquote>\n");
            for child in &c.children {
                render_node(child, out);
            }
            out.push_str("</blockquote>\n");
        }
        Node::Heading(h) => {
            out.push_str(&format!("<h{}>", h.depth));
            render_children(&h.children, out);
            out.push_str(&format!("</h{}>\n", h.depth));
        }
        Node::ThematicBreak => out.push_str("<hr />\n"),
        Node::Code(c) => {
            out.push_str("<pre><code");
            if !c.lang.is_empty() {
                out.push_str(&format!(" class=\"language-{}\"", htmlescape::encode_attribute(&c.lang)));
            }
            out.push('>');
            out.push_str(&htmlescape::encode_minimal(&c.value));
            out.push_str("</code></pre>\n");
        }
        Node::InlineCode(v) => {
            out.push_str("<code>");
            out.push_str(&htmlescape::encode_minimal(&v.value));
            out.push_str("</code>");
        }
        Node::Text(v) => out.push_str(&htmlescape::encode_minimal(&v.value)),
        Node::Emphasis(c) => {
            out.push_str("<em>");
            render_children(&c.children, out);
            out.push_str("</em>");
        }
        Node::Strong(c) => {
            out.push_str("<strong>");
            render_children(&c.children, out);
            out.push_str("</strong>");
        }
        Node::Link(l) => {
            out.push_str("<a href=\"");
            out.push_str(&htmlescape::encode_attribute(&l.url));
            out.push('"');
            if !l.title.is_empty() {
                out.push_str(" title=\"");
                out.push_str(&htmlescape::encode_attribute(&l.title));
                out.push('"');
            }
            out.push('>');
            render_children(&l.children, out);
            out.push_str("</a>");
        }
        Node::Image(i) => {
            out.push_str("<img src=\"");
            out.push_str(&htmlescape::encode_attribute(&i.url));
            out.push_str("\" alt=\"");
            out.push_str(&htmlescape::encode_attribute(&i.alt));
            out.push('"');
            if !i.title.is_empty() {
                out.push_str(" title=\"");
                out.push_str(&htmlescape::encode_attribute(&i.title));
                out.push('"');
            }
            out.push_str(" />");
        }
        Node::Definition(_) => {
            // Definitions have no HTML representation of their own (spec
            // §6.2); they exist only so a reference link can resolve.
        }
        Node::Break => out.push_str("<br />\n"),
    }
}

fn render_children(children: &[Node], out: &mut String) {
    for child in children {
        render_node(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Children, Root};

    fn processed_root(children: Vec<Node>) -> Node {
        Node::Root(Root {
            children: vec![Node::Block(Children { children })],
            is_post_processed: true,
        })
    }

    #[test]
    fn rejects_pre_processed_tree() {
        let root = Node::Root(Root {
            children: vec![],
            is_post_processed: false,
        });
        assert!(matches!(render(&root), Err(AtrusError::NotPostProcessed)));
    }

    #[test]
    fn renders_heading_and_paragraph() {
        let root = processed_root(vec![
            Node::heading(2, vec![Node::text("Hi")]),
            Node::paragraph(vec![Node::text("body")]),
        ]);
        let html = render(&root).unwrap();
        assert_eq!(html, "<h2>Hi</h2>\n<p>body</p>\n");
    }

    #[test]
    fn escapes_text_and_attributes() {
        let root = processed_root(vec![Node::paragraph(vec![Node::text("<script>")])]);
        let html = render(&root).unwrap();
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn code_block_without_lang_omits_class() {
        let root = processed_root(vec![Node::code("fn x() {}", "")]);
        let html = render(&root).unwrap();
        assert_eq!(html, "<pre><code>fn x() {}</code></pre>\n");
    }
}
