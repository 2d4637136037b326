//! Construction-time configuration: which tree to build and how it weighs.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::{AutocompleteError, Result};
use crate::policy::AggregationPolicy;
use crate::{Autocompleter, CompressedPrefixTree, SimplePrefixTree};

/// Which prefix tree implementation backs an autocompleter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TreeKind {
    /// [`SimplePrefixTree`]: one node per prefix.
    #[default]
    Simple,
    /// [`CompressedPrefixTree`]: non-branching chains collapsed.
    Compressed,
}

impl TreeKind {
    /// The configuration literal for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            TreeKind::Simple => "simple",
            TreeKind::Compressed => "compressed",
        }
    }
}

impl FromStr for TreeKind {
    type Err = AutocompleteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(TreeKind::Simple),
            "compressed" => Ok(TreeKind::Compressed),
            other => Err(AutocompleteError::UnknownTreeKind(other.to_string())),
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for building an [`Autocompleter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeConfig {
    /// Tree implementation.
    pub kind: TreeKind,
    /// Weight aggregation policy, fixed for the tree's lifetime.
    pub policy: AggregationPolicy,
}

impl TreeConfig {
    /// Parses the `autocompleter` and `weight_type` literals used by engine
    /// configurations (`"simple"`/`"compressed"` and `"sum"`/`"average"`).
    pub fn parse(kind: &str, policy: &str) -> Result<Self> {
        Ok(Self {
            kind: kind.parse()?,
            policy: policy.parse()?,
        })
    }

    /// Builds an empty tree.
    pub fn build<V, T>(&self) -> Box<dyn Autocompleter<V, T>>
    where
        V: Clone + PartialEq + 'static,
        T: Eq + Hash + Clone + 'static,
    {
        match self.kind {
            TreeKind::Simple => Box::new(SimplePrefixTree::new(self.policy)),
            TreeKind::Compressed => Box::new(CompressedPrefixTree::new(self.policy)),
        }
    }
}
