// Rylos: CLOS-Style Generic Function Dispatch
// Generic functions select an implementation by the runtime classes
// and exact values of their positional arguments, walking one
// dispatch-trie level per argument.

pub mod types;
pub mod conditions;
pub mod classes;
pub mod trie;
pub mod generic;
