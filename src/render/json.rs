//! JSON renderer (spec §6.2). Built as a manual ordered value tree rather
//! than a `#[derive(Serialize)]` on `Node`: the wire format mandates an
//! exact key order per node type and one conditional omission (`link.title`
//! when empty) that a derive can't express without fighting serde's
//! attribute model. `serde_json` is still used for scalar string escaping,
//! so quoting/escaping stays consistent with the rest of the ecosystem.

use crate::ast::Node;
use crate::error::{AtrusError, Result};
use crate::render::options::{RenderOptions, Whitespace};

enum Value {
    Object(Vec<(&'static str, Value)>),
    Array(Vec<Value>),
    Str(String),
    Num(u64),
    Bool(bool),
}

pub fn render(root: &Node, options: RenderOptions) -> Result<String> {
    if !matches!(root, Node::Root(r) if r.is_post_processed) {
        return Err(AtrusError::NotPostProcessed);
    }
    let value = node_to_value(root);
    Ok(write_value(&value, options.whitespace, 0))
}

fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Root(r) => Value::Object(vec![
            ("type", Value::Str("root".into())),
            ("children", children_value(&r.children)),
        ]),
        Node::Block(c) => Value::Object(vec![
            ("type", Value::Str("block".into())),
            ("children", children_value(&c.children)),
        ]),
        Node::Paragraph(c) => Value::Object(vec![
            ("type", Value::Str("paragraph".into())),
            ("children", children_value(&c.children)),
        ]),
        Node::Blockquote(c) => Value::Object(vec![
            ("type", Value::Str("blockquote".into())),
            ("children", children_value(&c.children)),
        ]),
        Node::Heading(h) => Value::Object(vec![
            ("type", Value::Str("heading".into())),
            ("depth", Value::Num(h.depth as u64)),
            ("children", children_value(&h.children)),
        ]),
        Node::ThematicBreak => Value::Object(vec![("type", Value::Str("thematicBreak".into()))]),
        Node::Code(c) => Value::Object(vec![
            ("type", Value::Str("code".into())),
            ("lang", Value::Str(c.lang.clone())),
            ("value", Value::Str(c.value.clone())),
        ]),
        Node::InlineCode(v) => Value::Object(vec![
            ("type", Value::Str("inlineCode".into())),
            ("value", Value::Str(v.value.clone())),
        ]),
        Node::Text(v) => Value::Object(vec![
            ("type", Value::Str("text".into())),
            ("value", Value::Str(v.value.clone())),
        ]),
        Node::Emphasis(c) => Value::Object(vec![
            ("type", Value::Str("emphasis".into())),
            ("children", children_value(&c.children)),
        ]),
        Node::Strong(c) => Value::Object(vec![
            ("type", Value::Str("strong".into())),
            ("children", children_value(&c.children)),
        ]),
        Node::Link(l) => {
            let mut fields = vec![("type", Value::Str("link".into())), ("url", Value::Str(l.url.clone()))];
            // spec §6.2: `title` is omitted, not emitted as `""`, when empty.
            if !l.title.is_empty() {
                fields.push(("title", Value::Str(l.title.clone())));
            }
            fields.push(("children", children_value(&l.children)));
            Value::Object(fields)
        }
        Node::Image(i) => Value::Object(vec![
            ("type", Value::Str("image".into())),
            ("url", Value::Str(i.url.clone())),
            ("title", Value::Str(i.title.clone())),
            ("alt", Value::Str(i.alt.clone())),
        ]),
        Node::Definition(d) => Value::Object(vec![
            ("type", Value::Str("definition".into())),
            ("label", Value::Str(d.label.clone())),
            ("url", Value::Str(d.url.clone())),
            ("title", Value::Str(d.title.clone())),
        ]),
        Node::Break => Value::Object(vec![("type", Value::Str("break".into()))]),
    }
}

fn children_value(children: &[Node]) -> Value {
    Value::Array(children.iter().map(node_to_value).collect())
}

fn escape_str(s: &str) -> String {
    serde_json::to_string(&serde_json::Value::String(s.to_string())).unwrap_or_default()
}

fn write_value(value: &Value, ws: Whitespace, depth: usize) -> String {
    let mut out = String::new();
    write_value_into(value, ws, depth, &mut out);
    out
}

fn write_value_into(value: &Value, ws: Whitespace, depth: usize, out: &mut String) {
    match value {
        Value::Str(s) => out.push_str(&escape_str(s)),
        Value::Num(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Array(items) => write_collection(out, ws, depth, '[', ']', items.len(), |out, i, d| {
            write_value_into(&items[i], ws, d, out)
        }),
        Value::Object(fields) => write_collection(out, ws, depth, '{', '}', fields.len(), |out, i, d| {
            out.push_str(&escape_str(fields[i].0));
            out.push(':');
            if ws.indent_width() > 0 {
                out.push(' ');
            }
            write_value_into(&fields[i].1, ws, d, out);
        }),
    }
}

fn write_collection(
    out: &mut String,
    ws: Whitespace,
    depth: usize,
    open: char,
    close: char,
    len: usize,
    mut write_item: impl FnMut(&mut String, usize, usize),
) {
    out.push(open);
    if len == 0 {
        out.push(close);
        return;
    }
    let indent_width = ws.indent_width();
    let inner_indent = " ".repeat(indent_width * (depth + 1));
    let outer_indent = " ".repeat(indent_width * depth);
    for i in 0..len {
        if indent_width > 0 {
            out.push('\n');
            out.push_str(&inner_indent);
        }
        write_item(out, i, depth + 1);
        if i + 1 < len {
            out.push(',');
            if indent_width == 0 {
                out.push(' ');
            }
        }
    }
    if indent_width > 0 {
        out.push('\n');
        out.push_str(&outer_indent);
    }
    out.push(close);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Node, Root};

    fn processed_root(children: Vec<Node>) -> Node {
        Node::Root(Root {
            children: vec![Node::Block(crate::ast::Children { children })],
            is_post_processed: true,
        })
    }

    #[test]
    fn rejects_pre_processed_tree() {
        let root = Node::Root(Root {
            children: vec![],
            is_post_processed: false,
        });
        let err = render(&root, RenderOptions::default()).unwrap_err();
        assert!(matches!(err, AtrusError::NotPostProcessed));
    }

    #[test]
    fn minified_output_omits_whitespace() {
        let root = processed_root(vec![Node::ThematicBreak]);
        let json = render(
            &root,
            RenderOptions {
                whitespace: Whitespace::Minified,
            },
        )
        .unwrap();
        assert!(!json.contains('\n'));
        assert!(json.contains(r#""type":"thematicBreak""#));
    }

    #[test]
    fn link_title_omitted_when_empty_but_image_title_kept() {
        let root = processed_root(vec![
            Node::link("/a", "", vec![Node::text("x")]),
            Node::image("/b", "", "alt"),
        ]);
        let json = render(
            &root,
            RenderOptions {
                whitespace: Whitespace::Minified,
            },
        )
        .unwrap();
        assert!(!json.contains(r#""type":"link","url":"/a","title""#));
        assert!(json.contains(r#""type":"image","url":"/b","title":"""#));
    }
}
