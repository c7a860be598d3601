use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::types::{
    Account, BranchUpdate, CombinedStatus, Forge, ForgeError, PullRequestSnapshot, Repo,
};

/// Message GitHub returns when an update-branch request was accepted but is
/// being applied asynchronously.
const UPDATE_IN_PROGRESS_MESSAGE: &str = "Updating pull request branch.";

pub fn resolve_token(flag: Option<String>) -> Result<String> {
    if let Some(token) = flag {
        return Ok(token);
    }

    // Prefer environment variables over the gh CLI to avoid subprocess
    // overhead.
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("failed to run 'gh auth token'")?;

    if !output.status.success() {
        anyhow::bail!(
            "GitHub token is required. Pass --token, set GITHUB_TOKEN, or run 'gh auth login'"
        );
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("empty token returned from gh CLI");
    }

    Ok(token)
}

/// Reads the repository from the current checkout's origin remote.
pub fn repo_from_git_remote() -> Result<Repo> {
    let output = Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .output()
        .context("failed to run git")?;

    if !output.status.success() {
        anyhow::bail!("could not read remote.origin.url from git config");
    }

    let remote = String::from_utf8(output.stdout)?.trim().to_string();
    parse_remote_url(&remote)
}

/// Extracts owner and repository from an HTTPS or SSH remote URL.
pub fn parse_remote_url(remote: &str) -> Result<Repo> {
    let trimmed = remote.trim().trim_end_matches(".git");

    // SCP-like SSH form: git@github.com:owner/repo
    if let Some((_, path)) = trimmed.split_once(':').filter(|_| !trimmed.contains("://")) {
        return repo_from_path_segments(path.split('/'))
            .with_context(|| format!("invalid remote URL format: '{remote}'"));
    }

    let url = url::Url::parse(trimmed)
        .with_context(|| format!("invalid remote URL format: '{remote}'"))?;
    let segments = url
        .path_segments()
        .with_context(|| format!("remote URL has no path: '{remote}'"))?;
    repo_from_path_segments(segments)
        .with_context(|| format!("invalid remote URL format: '{remote}'"))
}

fn repo_from_path_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Result<Repo> {
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    match segments[..] {
        [.., owner, name] => Ok(Repo::new(owner, name)),
        _ => anyhow::bail!("expected at least 'owner/repo' path segments"),
    }
}

#[derive(Serialize)]
struct ListPullsParams<'a> {
    state: &'a str,
    per_page: u8,
}

#[derive(Deserialize)]
struct CommitComparison {
    behind_by: u64,
}

#[derive(Deserialize)]
struct UpdateBranchResponse {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    event: &'a str,
}

#[derive(Deserialize)]
struct ReviewResponse {
    id: u64,
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    commit_message: &'a str,
    merge_method: &'a str,
}

#[derive(Deserialize)]
struct MergeResponse {
    #[serde(default)]
    merged: bool,
}

/// GitHub REST implementation of [`Forge`] for one repository.
pub struct GitHub {
    client: Octocrab,
    repo: Repo,
}

impl GitHub {
    pub fn new(token: &str, repo: Repo) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .context("failed to create GitHub client")?;
        Ok(Self { client, repo })
    }

    fn route(&self, tail: &str) -> String {
        format!("/repos/{}/{}/{tail}", self.repo.owner, self.repo.name)
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn list_open_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>, ForgeError> {
        let params = ListPullsParams {
            state: "open",
            per_page: 100,
        };
        let pulls = self
            .client
            .get(self.route("pulls"), Some(&params))
            .await?;
        Ok(pulls)
    }

    async fn combined_status(&self, sha: &str) -> Result<CombinedStatus, ForgeError> {
        let combined = self
            .client
            .get(self.route(&format!("commits/{sha}/status")), None::<&()>)
            .await?;
        Ok(combined)
    }

    async fn behind_by(&self, base_sha: &str, head_sha: &str) -> Result<u64, ForgeError> {
        let comparison: CommitComparison = self
            .client
            .get(
                self.route(&format!("compare/{base_sha}...{head_sha}")),
                None::<&()>,
            )
            .await?;
        Ok(comparison.behind_by)
    }

    async fn update_branch(&self, number: u64) -> Result<BranchUpdate, ForgeError> {
        let response: Result<UpdateBranchResponse, octocrab::Error> = self
            .client
            .put(self.route(&format!("pulls/{number}/update-branch")), None::<&()>)
            .await;

        match response {
            Ok(body) if body.message == UPDATE_IN_PROGRESS_MESSAGE => Ok(BranchUpdate::InProgress),
            Ok(_) => Ok(BranchUpdate::Applied),
            Err(octocrab::Error::GitHub { source, .. })
                if source.message.contains("not mergeable") =>
            {
                Err(ForgeError::NotMergeable)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn pull_request(&self, number: u64) -> Result<PullRequestSnapshot, ForgeError> {
        let pr = self
            .client
            .get(self.route(&format!("pulls/{number}")), None::<&()>)
            .await?;
        Ok(pr)
    }

    async fn approve(&self, number: u64) -> Result<u64, ForgeError> {
        let review: ReviewResponse = self
            .client
            .post(
                self.route(&format!("pulls/{number}/reviews")),
                Some(&ReviewRequest { event: "APPROVE" }),
            )
            .await?;
        Ok(review.id)
    }

    async fn merge(&self, number: u64, message: &str) -> Result<bool, ForgeError> {
        let result: MergeResponse = self
            .client
            .put(
                self.route(&format!("pulls/{number}/merge")),
                Some(&MergeRequest {
                    commit_message: message,
                    merge_method: "merge",
                }),
            )
            .await?;
        Ok(result.merged)
    }

    async fn current_user(&self) -> Result<String, ForgeError> {
        let user: Account = self.client.get("/user", None::<&()>).await?;
        Ok(user.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_remote() {
        let repo = parse_remote_url("https://github.com/rust-lang/cargo.git").unwrap();
        assert_eq!(repo, Repo::new("rust-lang", "cargo"));
    }

    #[test]
    fn parses_https_remote_without_git_suffix() {
        let repo = parse_remote_url("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(repo, Repo::new("rust-lang", "cargo"));
    }

    #[test]
    fn parses_scp_like_ssh_remote() {
        let repo = parse_remote_url("git@github.com:rust-lang/cargo.git").unwrap();
        assert_eq!(repo, Repo::new("rust-lang", "cargo"));
    }

    #[test]
    fn parses_ssh_scheme_remote() {
        let repo = parse_remote_url("ssh://git@github.com/rust-lang/cargo.git").unwrap();
        assert_eq!(repo, Repo::new("rust-lang", "cargo"));
    }

    #[test]
    fn rejects_remote_without_repo_path() {
        assert!(parse_remote_url("https://github.com/").is_err());
        assert!(parse_remote_url("nonsense").is_err());
    }
}
