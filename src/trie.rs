// Rylos Dispatch Trie - Per-Argument Specializer Tree
//
// One node per argument position; a path from the root spells out one
// registered specializer sequence. Pure ownership tree: every child is
// owned by its parent, nodes are created lazily and never removed.

use std::collections::HashMap;

use crate::classes::ClassId;
use crate::types::{EqlKey, NativeFn};

/// One level of a generic function's dispatch structure.
#[derive(Default)]
pub struct DispatchNode {
    /// Children keyed by class specializer
    class_children: HashMap<ClassId, DispatchNode>,
    /// Children keyed by eql specializer
    value_children: HashMap<EqlKey, DispatchNode>,
    /// Child taken when nothing more specific matches
    default_child: Option<Box<DispatchNode>>,
    /// Implementation stored at the end of a specializer sequence
    terminal: Option<NativeFn>,
}

impl DispatchNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child for a class specializer, created on first use.
    pub fn class_child_or_insert(&mut self, class: ClassId) -> &mut DispatchNode {
        self.class_children.entry(class).or_default()
    }

    /// Child for an eql specializer, created on first use.
    pub fn value_child_or_insert(&mut self, key: EqlKey) -> &mut DispatchNode {
        self.value_children.entry(key).or_default()
    }

    /// Fallback child, created on first use.
    pub fn default_child_or_insert(&mut self) -> &mut DispatchNode {
        self.default_child.get_or_insert_with(Default::default)
    }

    pub fn class_child(&self, class: ClassId) -> Option<&DispatchNode> {
        self.class_children.get(&class)
    }

    pub fn value_child(&self, key: &EqlKey) -> Option<&DispatchNode> {
        self.value_children.get(key)
    }

    pub fn default_child(&self) -> Option<&DispatchNode> {
        self.default_child.as_deref()
    }

    /// Install an implementation, returning the one it displaces.
    pub fn set_terminal(&mut self, implementation: NativeFn) -> Option<NativeFn> {
        self.terminal.replace(implementation)
    }

    pub fn terminal(&self) -> Option<&NativeFn> {
        self.terminal.as_ref()
    }

    /// True when the node carries no branches and no implementation.
    pub fn is_empty(&self) -> bool {
        self.class_children.is_empty()
            && self.value_children.is_empty()
            && self.default_child.is_none()
            && self.terminal.is_none()
    }
}
