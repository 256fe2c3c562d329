//! AST node definitions (spec §3.2). `Node` owns its children and byte
//! payloads exclusively; tearing one down tears down the whole subtree,
//! which plain `Vec<Node>`/`String` ownership already gives us for free —
//! there is no cyclic structure to worry about (spec §9 "Cyclic references:
//! none").
//!
//! Byte payloads are modeled as `String` rather than `Vec<u8>`: the crate's
//! contract (spec §6.3) already requires the host to hand it valid UTF-8,
//! and every payload here is always decoded/escaped text, never an
//! arbitrary binary blob, so `String` is the right owned type and avoids a
//! UTF-8 validation re-check on every render.

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Root),
    Block(Children),
    Paragraph(Children),
    Blockquote(Children),
    Heading(Heading),
    ThematicBreak,
    Code(Code),
    InlineCode(Value),
    Text(Value),
    Emphasis(Children),
    Strong(Children),
    Link(Link),
    Image(Image),
    Definition(Definition),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub children: Vec<Node>,
    pub is_post_processed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Children {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub depth: u8,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub value: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub url: String,
    pub title: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub url: String,
    pub title: String,
    pub label: String,
}

impl Node {
    pub fn text(value: impl Into<String>) -> Node {
        Node::Text(Value { value: value.into() })
    }

    pub fn inline_code(value: impl Into<String>) -> Node {
        Node::InlineCode(Value { value: value.into() })
    }

    pub fn heading(depth: u8, children: Vec<Node>) -> Node {
        assert!((1..=6).contains(&depth), "heading depth out of [1,6]: {depth}");
        Node::Heading(Heading { depth, children })
    }

    pub fn paragraph(children: Vec<Node>) -> Node {
        Node::Paragraph(Children { children })
    }

    pub fn blockquote(children: Vec<Node>) -> Node {
        Node::Blockquote(Children { children })
    }

    pub fn emphasis(children: Vec<Node>) -> Node {
        Node::Emphasis(Children { children })
    }

    pub fn strong(children: Vec<Node>) -> Node {
        Node::Strong(Children { children })
    }

    pub fn code(value: impl Into<String>, lang: impl Into<String>) -> Node {
        Node::Code(Code {
            value: value.into(),
            lang: lang.into(),
        })
    }

    pub fn link(url: impl Into<String>, title: impl Into<String>, children: Vec<Node>) -> Node {
        Node::Link(Link {
            url: url.into(),
            title: title.into(),
            children,
        })
    }

    pub fn image(url: impl Into<String>, title: impl Into<String>, alt: impl Into<String>) -> Node {
        Node::Image(Image {
            url: url.into(),
            title: title.into(),
            alt: alt.into(),
        })
    }

    pub fn definition(
        label: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Node {
        Node::Definition(Definition {
            label: label.into(),
            url: url.into(),
            title: title.into(),
        })
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(r) => &r.children,
            Node::Block(c) | Node::Paragraph(c) | Node::Blockquote(c) | Node::Emphasis(c) | Node::Strong(c) => {
                &c.children
            }
            Node::Heading(h) => &h.children,
            Node::Link(l) => &l.children,
            Node::ThematicBreak
            | Node::Code(_)
            | Node::InlineCode(_)
            | Node::Text(_)
            | Node::Image(_)
            | Node::Definition(_)
            | Node::Break => &[],
        }
    }

    /// True for every node kind that is allowed to carry the text children
    /// the NodeList helper coalesces (spec §4.7).
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }
}
