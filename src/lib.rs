//! Decides the word problem for a finitely presented semigroup or monoid: given a
//! presentation and a set of generating pairs, answer whether two words name the same
//! congruence class, reduce a word to its class representative, and (if finite) count the
//! classes.
//!
//! Two independent algorithms are raced against the same input (spec.md §4.7/§4.8):
//! Todd–Coxeter coset enumeration ([`todd_coxeter`]), which builds the quotient action as
//! an explicit word graph, and Knuth–Bendix completion ([`knuth_bendix`]), which builds a
//! confluent string rewriting system. Either can decide the word problem; whichever
//! finishes first answers the caller's query. [`congruence::Congruence`] is the entry
//! point most callers want.

pub mod alphabet;
pub mod congruence;
pub mod error;
pub mod felsch_graph;
pub mod felsch_tree;
pub mod knuth_bendix;
pub mod node_manager;
pub mod order;
pub mod presentation;
pub mod race;
pub mod rewrite_trie;
pub mod todd_coxeter;
pub mod union_find;
pub mod word_graph;
pub mod word_graph_sources;

pub use alphabet::{DefaultLetter, Letter, Word};
pub use congruence::{Congruence, CongruenceKind};
pub use error::{CongruenceError, Result};
pub use presentation::{Containment, Presentation};
