use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("repository must be in 'owner/name' form, got '{0}'")]
    Malformed(String),
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, RepoError> {
        match s.split('/').collect::<Vec<_>>()[..] {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self::new(owner, name)),
            _ => Err(RepoError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A GitHub account, as it appears in REST payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub login: String,
}

/// One end of a pull request (head or base).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub sha: String,
}

/// Immutable-at-fetch-time view of one pull request.
///
/// After a branch update the head SHA recorded here is stale; callers must
/// re-fetch a fresh snapshot and use its head SHA for any further status
/// lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestSnapshot {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub draft: bool,
    pub user: Account,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(default)]
    pub requested_reviewers: Vec<Account>,
}

/// State of a single commit status item.
///
/// GitHub reports lowercase strings; states this tool does not recognise
/// deserialise to `Unknown` and are treated like successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Success,
    Failure,
    Error,
    Pending,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// One named status context attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitStatus {
    pub state: CheckState,
    pub context: String,
}

/// Aggregate CI result for a commit across all status contexts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CombinedStatus {
    pub state: CheckState,
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
}

/// Result of requesting a branch update from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchUpdate {
    /// The update was applied immediately.
    Applied,
    /// The platform accepted the request and is applying it asynchronously;
    /// the new head SHA becomes visible later.
    InProgress,
}

/// Why a pull request was skipped before any status check was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoReviewersRequested,
    NotRequestedReviewer { actor: String },
    TitleMatchesSkipPattern,
    AuthorNotAllowed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoReviewersRequested => write!(f, "no reviewers requested"),
            SkipReason::NotRequestedReviewer { actor } => {
                write!(f, "{actor} is not a requested reviewer")
            }
            SkipReason::TitleMatchesSkipPattern => write!(f, "title matches the skip pattern"),
            SkipReason::AuthorNotAllowed => {
                write!(f, "author does not match the author pattern")
            }
        }
    }
}

/// Terminal result of one pull request's pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Checks are failing or pending and no branch update is warranted.
    StatusBlocked,
    /// A branch update was applied synchronously; the pull request will be
    /// re-evaluated on the next run.
    UpdateTriggered,
    /// Checks remained non-clean after a completed branch update.
    ChecksStillFailing,
    Merged {
        approved: bool,
    },
}

/// Failure talking to the hosting platform.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The platform refused to fast-forward the branch; manual rebase
    /// required. Never retried.
    #[error("pull request cannot be updated automatically, manual rebase required")]
    NotMergeable,
    #[error("api request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<octocrab::Error> for ForgeError {
    fn from(err: octocrab::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Failure of one pull request's pipeline. Terminal for that pull request
/// only; sibling pipelines are unaffected.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Forge(#[from] ForgeError),
    #[error("failed to approve: {0}")]
    Approve(#[source] ForgeError),
    #[error("failed to merge: {0}")]
    Merge(#[source] ForgeError),
    #[error("branch update timed out after {0} polling attempts")]
    UpdateTimedOut(usize),
}

/// Aggregate failure of a run: every pull request whose pipeline errored,
/// keyed by number.
#[derive(Debug)]
pub struct RunError {
    pub failures: Vec<(u64, PipelineError)>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pull request(s) failed processing",
            self.failures.len()
        )?;
        for (number, err) in &self.failures {
            write!(f, "\n  #{number}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunError {}

/// Operations the pipeline needs from a hosting platform.
///
/// Implemented for GitHub over octocrab; tests substitute scripted mocks.
#[async_trait]
pub trait Forge {
    /// Lists open pull requests, draft ones included.
    async fn list_open_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>, ForgeError>;

    /// Fetches the combined status for a commit.
    async fn combined_status(&self, sha: &str) -> Result<CombinedStatus, ForgeError>;

    /// How many commits `head` is behind `base`.
    async fn behind_by(&self, base_sha: &str, head_sha: &str) -> Result<u64, ForgeError>;

    /// Requests a fast-forward update of the pull request's branch from its
    /// base. Returns `ForgeError::NotMergeable` when the platform reports
    /// the branch cannot be updated automatically.
    async fn update_branch(&self, number: u64) -> Result<BranchUpdate, ForgeError>;

    /// Re-fetches a single pull request.
    async fn pull_request(&self, number: u64) -> Result<PullRequestSnapshot, ForgeError>;

    /// Submits an approving review; returns the review id.
    async fn approve(&self, number: u64) -> Result<u64, ForgeError>;

    /// Merges with a standard merge commit; returns the platform's merged
    /// flag.
    async fn merge(&self, number: u64, message: &str) -> Result<bool, ForgeError>;

    /// Login of the authenticated user.
    async fn current_user(&self) -> Result<String, ForgeError>;
}
