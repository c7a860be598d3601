use clap::Parser;

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

/// Command-line surface. Every option has an environment fallback where the
/// help text says so; flags always win over the environment.
#[derive(Parser, Debug, Default)]
#[command(name = "autoland")]
#[command(
    about = "Lands GitHub pull requests unattended - checks CI on every open PR, updates stale branches, then approves and merges the ones that pass"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
pub struct CliArgs {
    /// GitHub repository in 'owner/repo' form (default: $GITHUB_OWNER and
    /// $GITHUB_REPO, then the origin remote of the current checkout)
    #[arg(short = 'r', long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// GitHub personal access token (default: $GITHUB_TOKEN, $GH_TOKEN,
    /// then `gh auth token`)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Do not submit an approval review before merging
    #[arg(long = "no-approve")]
    pub no_approve: bool,

    /// Skip PRs whose titles match this regular expression
    /// (default: $GITHUB_PR_SKIP_PATTERN)
    #[arg(long = "skip-pattern", value_name = "REGEX")]
    pub skip_pattern: Option<String>,

    /// Only process PRs whose authors match this regular expression
    /// (default: $GITHUB_PR_AUTHOR_PATTERN)
    #[arg(long = "author-pattern", value_name = "REGEX")]
    pub author_pattern: Option<String>,

    /// Update PRs that are behind their base branch when checks are not
    /// passing
    #[arg(long = "auto-rebase")]
    pub auto_rebase: bool,

    /// Process every PR, not just those where you are a requested reviewer
    /// (default: $GITHUB_NO_FILTER_REVIEWER set to "true" or "1")
    #[arg(long = "no-reviewer-filter")]
    pub no_reviewer_filter: bool,
}
