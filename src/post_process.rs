//! PostProcess (spec §4.9): wraps the parsed top-level children in a single
//! `block` node and marks the root as post-processed. Idempotent — calling
//! it again on an already-processed root is a no-op.

use crate::ast::{Children, Node, Root};

pub fn post_process(root: Node) -> Node {
    match root {
        Node::Root(r) if r.is_post_processed => Node::Root(r),
        Node::Root(r) => Node::Root(Root {
            children: vec![Node::Block(Children { children: r.children })],
            is_post_processed: true,
        }),
        other => other,
    }
}

// TODO(open question, spec §9): a link written with a deliberately empty
// destination (`[foo]()`) is not retroactively resolved against
// `LinkDefMap` here or anywhere upstream. Callers should not rely on such
// links picking up a definition; resolving them would require deferring
// link construction until the whole document (including definitions that
// appear later) has been scanned, which this pipeline does not currently do
// for the inline pass.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    fn fresh_root(children: Vec<Node>) -> Node {
        Node::Root(Root {
            children,
            is_post_processed: false,
        })
    }

    #[test]
    fn wraps_children_in_a_single_block() {
        let root = fresh_root(vec![Node::ThematicBreak]);
        let processed = post_process(root);
        match processed {
            Node::Root(r) => {
                assert!(r.is_post_processed);
                assert_eq!(r.children.len(), 1);
                assert!(matches!(&r.children[0], Node::Block(_)));
            }
            other => panic!("expected root, got {other:?}"),
        }
    }

    #[test]
    fn is_idempotent() {
        let once = post_process(fresh_root(vec![Node::ThematicBreak]));
        let twice = post_process(once.clone());
        assert_eq!(once, twice);
    }
}
