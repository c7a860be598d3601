//! Run configuration, assembled once at startup and read-only afterwards.

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::{cli::CliArgs, github, types::Repo};

/// Process-wide settings. Patterns are compiled and validated here so a
/// malformed pattern aborts the run before any pull request is touched.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub repo: Repo,
    /// Submit an approval review before merging. Defaults to true.
    pub approve: bool,
    /// Skip pull requests whose titles match.
    pub skip_pattern: Option<Regex>,
    /// Allow-list on author logins.
    pub author_pattern: Option<Regex>,
    /// Update branches that are behind their base. Defaults to false.
    pub auto_rebase: bool,
    /// Only process pull requests where the authenticated user is a
    /// requested reviewer. Defaults to true; the `--no-reviewer-filter`
    /// flag and the `GITHUB_NO_FILTER_REVIEWER` variable disable it.
    pub filter_by_reviewer: bool,
}

impl Config {
    /// Resolves configuration from flags, then environment, then the git
    /// checkout, in that precedence order.
    pub fn resolve(args: CliArgs) -> Result<Self> {
        Self::resolve_from(args, |key| std::env::var(key).ok())
    }

    fn resolve_from(args: CliArgs, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|value| !value.is_empty());

        let token = github::resolve_token(args.token)?;

        let repo = match args.repo {
            Some(spec) => Repo::parse(&spec)
                .with_context(|| format!("invalid --repo value '{spec}'"))?,
            None => match (env("GITHUB_OWNER"), env("GITHUB_REPO")) {
                (Some(owner), Some(name)) => Repo::new(owner, name),
                _ => {
                    let repo = github::repo_from_git_remote()
                        .context("failed to determine repository; pass --repo")?;
                    info!(%repo, "using repository from git config");
                    repo
                }
            },
        };

        let skip_pattern = args
            .skip_pattern
            .or_else(|| env("GITHUB_PR_SKIP_PATTERN"))
            .map(|pattern| {
                Regex::new(&pattern).with_context(|| format!("invalid skip pattern '{pattern}'"))
            })
            .transpose()?;

        let author_pattern = args
            .author_pattern
            .or_else(|| env("GITHUB_PR_AUTHOR_PATTERN"))
            .map(|pattern| {
                Regex::new(&pattern).with_context(|| format!("invalid author pattern '{pattern}'"))
            })
            .transpose()?;

        let env_disables_reviewer_filter = matches!(
            env("GITHUB_NO_FILTER_REVIEWER").as_deref(),
            Some("true") | Some("1")
        );

        Ok(Self {
            token,
            repo,
            approve: !args.no_approve,
            skip_pattern,
            author_pattern,
            auto_rebase: args.auto_rebase,
            filter_by_reviewer: !args.no_reviewer_filter && !env_disables_reviewer_filter,
        })
    }
}
