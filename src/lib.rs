//! # weighted-prefix-tree
//!
//! Weighted prefix trees for ranked autocompletion over arbitrary token
//! sequences: characters, words, melodic intervals, anything hashable.
//!
//! Values are inserted under a token sequence with a positive weight, then
//! retrieved by any prefix of that sequence, heaviest first. Subtree weights
//! aggregate either as a sum or as the mean individual weight.
//!
//! Two interchangeable implementations of [`Autocompleter`] are provided:
//!
//! - [`SimplePrefixTree`]: one node per distinct prefix.
//! - [`CompressedPrefixTree`]: chains of single-child nodes collapsed into
//!   one node per run, split on divergent inserts and re-merged on removal.
//!
//! Both return identical results for identical operation sequences.
//!
//! ## Example
//!
//! ```rust
//! use weighted_prefix_tree::{Autocompleter, TreeConfig};
//!
//! let mut tree = TreeConfig::parse("compressed", "sum")?.build::<&str, char>();
//! tree.insert("cat", 1.0, &['c', 'a', 't'])?;
//! tree.insert("car", 1.0, &['c', 'a', 'r'])?;
//! tree.insert("dog", 1.0, &['d', 'o', 'g'])?;
//! tree.insert("car", 1.0, &['c', 'a', 'r'])?;
//!
//! assert_eq!(tree.autocomplete(&['c'], None)?, vec![("car", 2.0), ("cat", 1.0)]);
//! assert_eq!(tree.weight_of(&['c']), Some(3.0));
//!
//! tree.remove(&['c', 'a']);
//! assert!(tree.autocomplete(&['c'], None)?.is_empty());
//! assert_eq!(tree.weight(), 1.0);
//! # Ok::<(), weighted_prefix_tree::AutocompleteError>(())
//! ```
//!
//! ## Ordering
//!
//! Results are ordered by non-increasing entry weight. Equal weights keep
//! insertion order: the entry created first (re-inserts do not reset it) is
//! returned first. With a limit, the heaviest `limit` entries are selected
//! best-first without enumerating the whole subtree.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod arena;
mod compressed;
mod config;
mod error;
mod policy;
mod rank;
mod simple;

pub use compressed::CompressedPrefixTree;
pub use config::{TreeConfig, TreeKind};
pub use error::{AutocompleteError, Result};
pub use policy::AggregationPolicy;
pub use simple::SimplePrefixTree;

/// A weighted prefix index mapping token sequences to ranked values.
///
/// Callers pass already-normalized tokens; the index does no validation of
/// token content.
pub trait Autocompleter<V, T> {
    /// Adds `value` with `weight` under the exact sequence `prefix`.
    ///
    /// Inserting a value already stored under the same sequence adds `weight`
    /// to its stored weight. An empty `prefix` stores the value at the root,
    /// where every query matches it.
    ///
    /// Fails with [`AutocompleteError::InvalidWeight`] unless `weight` is
    /// finite and positive, leaving the tree unchanged.
    fn insert(&mut self, value: V, weight: f64, prefix: &[T]) -> Result<()>;

    /// Returns `(value, weight)` for every entry whose sequence starts with
    /// `prefix`, in non-increasing weight order.
    ///
    /// With `Some(limit)` only the `limit` heaviest are returned. No match
    /// yields an empty vector. `Some(0)` fails with
    /// [`AutocompleteError::InvalidLimit`].
    fn autocomplete(&self, prefix: &[T], limit: Option<usize>) -> Result<Vec<(V, f64)>>;

    /// Removes every entry whose sequence starts with `prefix`.
    ///
    /// Removing a prefix that matches nothing does nothing.
    fn remove(&mut self, prefix: &[T]);

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregated weight of the whole index (zero when empty).
    fn weight(&self) -> f64 {
        self.weight_of(&[]).unwrap_or(0.0)
    }

    /// Aggregated weight of the entries whose sequence starts with `prefix`,
    /// or `None` if no stored sequence does.
    ///
    /// The empty prefix always matches.
    fn weight_of(&self, prefix: &[T]) -> Option<f64>;

    /// The aggregation policy fixed at construction.
    fn policy(&self) -> AggregationPolicy;
}

#[cfg(test)]
mod proptests;
