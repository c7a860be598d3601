//! Autoland: unattended pull-request landing for GitHub repositories.
//!
//! Lists a repository's open pull requests, filters them by reviewer, title
//! and author criteria, classifies each one's combined CI status, optionally
//! updates branches that have fallen behind their base, and approves and
//! merges the pull requests whose checks pass. Every pull request is
//! processed by its own concurrent unit with isolated error handling.

pub mod cli;
pub mod config;
pub mod filter;
pub mod github;
pub mod processor;
pub mod status;
pub mod types;

pub use cli::CliArgs;
pub use config::Config;
pub use github::GitHub;
pub use processor::{MERGE_COMMIT_MESSAGE, Processor, UPDATE_POLL_ATTEMPTS, UPDATE_POLL_DELAY};
pub use types::{
    Account, BranchRef, BranchUpdate, CheckState, CombinedStatus, CommitStatus, Forge, ForgeError,
    Outcome, PipelineError, PullRequestSnapshot, Repo, RepoError, RunError, SkipReason,
};
