use std::fmt;
use std::str::FromStr;

use crate::error::AutocompleteError;

/// How individual entry weights combine into a subtree's weight.
///
/// Fixed when a tree is constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum AggregationPolicy {
    /// Total of every entry weight in the subtree.
    #[default]
    Sum,
    /// Mean individual entry weight in the subtree (not the mean of child weights).
    Average,
}

impl AggregationPolicy {
    /// Weight of a subtree holding `count` entries whose weights add up to `total`.
    ///
    /// An empty subtree weighs zero under both policies.
    #[inline]
    pub fn aggregate(self, total: f64, count: usize) -> f64 {
        match self {
            AggregationPolicy::Sum => total,
            AggregationPolicy::Average if count == 0 => 0.0,
            AggregationPolicy::Average => total / count as f64,
        }
    }

    /// The configuration literal for this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationPolicy::Sum => "sum",
            AggregationPolicy::Average => "average",
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = AutocompleteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(AggregationPolicy::Sum),
            "average" => Ok(AggregationPolicy::Average),
            other => Err(AutocompleteError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
