//! Pre-flight skip filters.
//!
//! An ordered, short-circuiting chain of predicates decides whether a pull
//! request should be skipped before any status check is fetched. The order
//! is load-bearing: each predicate produces a distinct skip reason, and the
//! first match wins.

use regex::Regex;

use crate::types::{PullRequestSnapshot, SkipReason};

/// Read-only inputs to the skip chain, borrowed from the run configuration.
pub struct FilterContext<'a> {
    /// Login of the authenticated user. `None` disables the reviewer filter.
    pub reviewer: Option<&'a str>,
    /// Skip pull requests whose title matches (regex search, not anchored).
    pub skip_pattern: Option<&'a Regex>,
    /// Allow-list: skip pull requests whose author does NOT match.
    pub author_pattern: Option<&'a Regex>,
}

type SkipPredicate = fn(&PullRequestSnapshot, &FilterContext<'_>) -> Option<SkipReason>;

/// Evaluated in order; first matching predicate supplies the skip reason.
const SKIP_CHAIN: &[SkipPredicate] = &[by_reviewer, by_title, by_author];

/// Returns the reason the pull request should be skipped, if any.
///
/// Draft pull requests are partitioned out at the listing stage and never
/// reach this chain.
pub fn should_skip(pr: &PullRequestSnapshot, ctx: &FilterContext<'_>) -> Option<SkipReason> {
    SKIP_CHAIN.iter().find_map(|predicate| predicate(pr, ctx))
}

fn by_reviewer(pr: &PullRequestSnapshot, ctx: &FilterContext<'_>) -> Option<SkipReason> {
    let actor = ctx.reviewer?;
    if pr.requested_reviewers.is_empty() {
        return Some(SkipReason::NoReviewersRequested);
    }
    if !pr.requested_reviewers.iter().any(|r| r.login == actor) {
        return Some(SkipReason::NotRequestedReviewer {
            actor: actor.to_string(),
        });
    }
    None
}

fn by_title(pr: &PullRequestSnapshot, ctx: &FilterContext<'_>) -> Option<SkipReason> {
    ctx.skip_pattern?
        .is_match(&pr.title)
        .then_some(SkipReason::TitleMatchesSkipPattern)
}

fn by_author(pr: &PullRequestSnapshot, ctx: &FilterContext<'_>) -> Option<SkipReason> {
    (!ctx.author_pattern?.is_match(&pr.user.login)).then_some(SkipReason::AuthorNotAllowed)
}
