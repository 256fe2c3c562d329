//! LinkDefMap (spec §3.3): insert-only, case-insensitive map from a link
//! label to the `definition` node that first declared it.

use crate::ast::{Definition, Node};
use std::collections::HashMap;

/// Labels longer than this are rejected outright and never inserted
/// (spec §3.3, §4.4).
pub const MAX_LABEL_LEN: usize = 999;

#[derive(Debug, Default)]
pub struct LinkDefMap {
    definitions: HashMap<String, Definition>,
}

impl LinkDefMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// ASCII-lowercase normalization key used for both insertion and
    /// lookup (spec §3.2, §3.3).
    pub fn normalize(label: &str) -> String {
        label.to_ascii_lowercase()
    }

    /// Insert a definition. First writer for a given normalized label wins;
    /// labels over `MAX_LABEL_LEN` bytes are silently rejected. Returns
    /// `true` if the definition was actually inserted.
    pub fn insert(&mut self, def: Definition) -> bool {
        if def.label.len() > MAX_LABEL_LEN {
            log::debug!("rejecting link label over {} bytes", MAX_LABEL_LEN);
            return false;
        }
        let key = Self::normalize(&def.label);
        if self.definitions.contains_key(&key) {
            log::debug!("link label {key:?} already defined; first definition wins");
            return false;
        }
        self.definitions.insert(key, def);
        true
    }

    pub fn get(&self, label: &str) -> Option<&Definition> {
        self.definitions.get(&Self::normalize(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in no particular order, used by PostProcess and the
    /// LeafBlockParser to emit `definition` AST nodes.
    pub fn values(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }
}

pub fn definition_node(def: &Definition) -> Node {
    Node::Definition(def.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(label: &str, url: &str) -> Definition {
        Definition {
            label: label.to_string(),
            url: url.to_string(),
            title: String::new(),
        }
    }

    #[test]
    fn first_definition_wins_case_insensitively() {
        let mut map = LinkDefMap::new();
        assert!(map.insert(def("Foo", "/first")));
        assert!(!map.insert(def("FOO", "/second")));
        assert_eq!(map.get("foo").unwrap().url, "/first");
    }

    #[test]
    fn oversized_label_rejected() {
        let mut map = LinkDefMap::new();
        let label = "a".repeat(MAX_LABEL_LEN + 1);
        assert!(!map.insert(def(&label, "/x")));
        assert!(map.is_empty());
    }
}
