//! Match ranking of a candidate string against a query.
//!
//! Ranking is tiered: exact and prefix hits beat word-start hits, which beat substring and
//! acronym hits, which beat scattered subsequence ("fuzzy") hits. Only the fuzzy tier uses a
//! numeric score, taken from the skim matcher.

#![forbid(unsafe_code)]

use std::cmp::Ordering;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Match quality, best first. `Unranked` is the empty-query tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    CaseSensitiveEqual,
    Equal,
    StartsWith,
    WordStartsWith,
    Contains,
    Acronym,
    Fuzzy,
    Unranked,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankResult {
    pub passed: bool,
    pub tier: MatchTier,
    /// Skim score; non-zero only in the `Fuzzy` tier.
    pub score: i64,
}

impl RankResult {
    fn tier(tier: MatchTier) -> Self { Self { passed: tier != MatchTier::NoMatch, tier, score: 0 } }

    pub fn no_match() -> Self { Self::tier(MatchTier::NoMatch) }
}

/// Order two rank results best first: lower tier, then higher score.
pub fn compare_ranks(a: &RankResult, b: &RankResult) -> Ordering {
    a.tier.cmp(&b.tier).then_with(|| b.score.cmp(&a.score))
}

fn is_word_sep(c: char) -> bool { c.is_whitespace() || c == '-' || c == '_' }

pub struct Ranker {
    matcher: SkimMatcherV2,
}

impl Default for Ranker {
    fn default() -> Self { Self { matcher: SkimMatcherV2::default().ignore_case() } }
}

impl Ranker {
    pub fn new() -> Self { Self::default() }

    pub fn rank(&self, candidate: &str, query: &str) -> RankResult {
        if query.is_empty() {
            return RankResult::tier(MatchTier::Unranked);
        }
        if candidate == query {
            return RankResult::tier(MatchTier::CaseSensitiveEqual);
        }
        let c = candidate.to_lowercase();
        let q = query.to_lowercase();
        if c == q {
            return RankResult::tier(MatchTier::Equal);
        }
        if c.starts_with(&q) {
            return RankResult::tier(MatchTier::StartsWith);
        }
        if word_starts_with(&c, &q) {
            return RankResult::tier(MatchTier::WordStartsWith);
        }
        if c.contains(&q) {
            return RankResult::tier(MatchTier::Contains);
        }
        if acronym(&c).contains(&q) {
            return RankResult::tier(MatchTier::Acronym);
        }
        if is_subsequence(&c, &q) {
            let score = self.matcher.fuzzy_match(&c, &q).unwrap_or(0);
            return RankResult { passed: true, tier: MatchTier::Fuzzy, score };
        }
        RankResult::no_match()
    }
}

/// Rank with a throwaway matcher. Prefer a shared [`Ranker`] in loops.
pub fn rank(candidate: &str, query: &str) -> RankResult { Ranker::new().rank(candidate, query) }

fn word_starts_with(hay: &str, needle: &str) -> bool {
    let mut prev_sep = false;
    for (i, ch) in hay.char_indices() {
        if prev_sep && !is_word_sep(ch) && hay[i..].starts_with(needle) {
            return true;
        }
        prev_sep = is_word_sep(ch);
    }
    false
}

fn acronym(s: &str) -> String {
    s.split(is_word_sep).filter_map(|w| w.chars().next()).collect()
}

/// True when every char of `needle` appears in `hay` in order.
pub fn is_subsequence(hay: &str, needle: &str) -> bool {
    let mut hs = hay.chars();
    needle.chars().all(|n| hs.any(|h| h == n))
}
