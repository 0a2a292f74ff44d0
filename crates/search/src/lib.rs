//! Tabula search: fuzzy ranking of cell values and row filtering.
//!
//! [`rank`] scores one candidate string against a query. [`filter`] applies a filter spec
//! to a row set and keeps the rank of every fuzzy match in a [`RankContext`] so the sort
//! stage can order by match quality without ranking again.

#![forbid(unsafe_code)]

pub mod filter;
pub mod rank;

pub use filter::{filter, pre_filter, validate_filters, Filtered, RankContext};
pub use rank::{compare_ranks, is_subsequence, rank, MatchTier, RankResult, Ranker};
