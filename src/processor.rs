//! The per-pull-request pipeline and the run-level fan-out around it.
//!
//! Each open, non-draft pull request is processed by its own concurrent
//! unit: skip filters gate early exit, the combined status is classified,
//! and the pull request either merges (clean) or enters the branch-update
//! path (blocked). Units are fully isolated; one unit's failure is captured
//! and aggregated without cancelling its siblings.

use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    filter::{self, FilterContext},
    status::{self, StatusClassification},
    types::{
        BranchUpdate, Forge, ForgeError, Outcome, PipelineError, PullRequestSnapshot, RunError,
    },
};

/// How many times a pending branch update is re-checked before giving up.
pub const UPDATE_POLL_ATTEMPTS: usize = 5;

/// Fixed pause before each branch-update poll.
pub const UPDATE_POLL_DELAY: Duration = Duration::from_secs(5);

/// Commit message used for every merge.
pub const MERGE_COMMIT_MESSAGE: &str = "Auto-merge successful";

/// Drives the pipeline for every open pull request of one repository.
pub struct Processor<F> {
    forge: F,
    config: Config,
    /// Resolved once per run; `None` when the reviewer filter is disabled.
    current_actor: Option<String>,
}

impl<F: Forge + Sync> Processor<F> {
    /// Builds a processor, resolving the authenticated user up front when
    /// the reviewer filter is enabled.
    pub async fn new(forge: F, config: Config) -> Result<Self, ForgeError> {
        let current_actor = if config.filter_by_reviewer {
            Some(forge.current_user().await?)
        } else {
            None
        };

        Ok(Self {
            forge,
            config,
            current_actor,
        })
    }

    pub fn forge(&self) -> &F {
        &self.forge
    }

    /// Processes every open pull request concurrently and reports an
    /// aggregate error when any unit failed.
    pub async fn run(&self) -> Result<()> {
        let pulls = self.forge.list_open_pull_requests().await?;
        info!(count = pulls.len(), "found open pull requests");

        if let Some(actor) = &self.current_actor {
            info!(%actor, "reviewer filter enabled");
        }
        if let Some(pattern) = &self.config.skip_pattern {
            info!(pattern = %pattern, "skip pattern enabled");
        }
        if let Some(pattern) = &self.config.author_pattern {
            info!(pattern = %pattern, "author filter enabled");
        }

        // Drafts are excluded before any unit is dispatched.
        let (drafts, candidates): (Vec<_>, Vec<_>) =
            pulls.into_iter().partition(|pr| pr.draft);
        for pr in drafts {
            info!(pr = pr.number, title = %pr.title, "skipping draft pull request");
        }

        let units = candidates.into_iter().map(|pr| {
            let number = pr.number;
            async move {
                match self.process(pr).await {
                    Ok(outcome) => {
                        debug!(pr = number, ?outcome, "pipeline finished");
                        None
                    }
                    Err(err) => {
                        warn!(pr = number, error = %err, "pipeline failed");
                        Some((number, err))
                    }
                }
            }
        });

        let failures: Vec<(u64, PipelineError)> =
            join_all(units).await.into_iter().flatten().collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RunError { failures }.into())
        }
    }

    /// Runs the full pipeline for one pull request.
    pub async fn process(&self, pr: PullRequestSnapshot) -> Result<Outcome, PipelineError> {
        info!(pr = pr.number, title = %pr.title, "processing pull request");

        let ctx = FilterContext {
            reviewer: self.current_actor.as_deref(),
            skip_pattern: self.config.skip_pattern.as_ref(),
            author_pattern: self.config.author_pattern.as_ref(),
        };
        if let Some(reason) = filter::should_skip(&pr, &ctx) {
            info!(pr = pr.number, %reason, "skipping pull request");
            return Ok(Outcome::Skipped(reason));
        }

        let classification = status::classify(&self.forge.combined_status(&pr.head.sha).await?);
        if classification.is_clean() {
            return self.finalize(&pr).await;
        }

        self.handle_blocked(&pr, &classification).await
    }

    /// Rebase controller: entered when checks are failing or pending.
    async fn handle_blocked(
        &self,
        pr: &PullRequestSnapshot,
        classification: &StatusClassification,
    ) -> Result<Outcome, PipelineError> {
        if !classification.failed.is_empty() {
            info!(pr = pr.number, failed = %classification.failed.join(", "), "failed checks");
        }
        if !classification.pending.is_empty() {
            info!(pr = pr.number, pending = %classification.pending.join(", "), "pending checks");
        }

        if !self.config.auto_rebase {
            info!(pr = pr.number, "checks not passing and auto-rebase is disabled");
            return Ok(Outcome::StatusBlocked);
        }

        let behind = self.forge.behind_by(&pr.base.sha, &pr.head.sha).await?;
        if behind == 0 {
            // Checks are failing for a reason other than staleness.
            info!(pr = pr.number, "branch is up to date with its base");
            return Ok(Outcome::StatusBlocked);
        }

        info!(pr = pr.number, behind, "branch is behind its base, updating");
        match self.forge.update_branch(pr.number).await? {
            BranchUpdate::Applied => {
                info!(pr = pr.number, "branch update applied");
                Ok(Outcome::UpdateTriggered)
            }
            BranchUpdate::InProgress => {
                info!(pr = pr.number, "branch update in progress, waiting for completion");
                self.wait_for_update(pr).await
            }
        }
    }

    /// Polls until the head SHA moves away from its pre-update value, then
    /// re-classifies the new head. Bounded by [`UPDATE_POLL_ATTEMPTS`].
    async fn wait_for_update(&self, pr: &PullRequestSnapshot) -> Result<Outcome, PipelineError> {
        for attempt in 1..=UPDATE_POLL_ATTEMPTS {
            tokio::time::sleep(UPDATE_POLL_DELAY).await;

            let fresh = self.forge.pull_request(pr.number).await?;
            if fresh.head.sha == pr.head.sha {
                debug!(pr = pr.number, attempt, "head unchanged");
                continue;
            }

            info!(pr = pr.number, attempt, head = %fresh.head.sha, "branch update completed");
            let classification =
                status::classify(&self.forge.combined_status(&fresh.head.sha).await?);
            if classification.is_clean() {
                return self.finalize(&fresh).await;
            }

            info!(pr = pr.number, "checks still not passing after update");
            return Ok(Outcome::ChecksStillFailing);
        }

        Err(PipelineError::UpdateTimedOut(UPDATE_POLL_ATTEMPTS))
    }

    /// Merge controller: optional approval, then merge. An approval failure
    /// aborts before any merge is attempted.
    async fn finalize(&self, pr: &PullRequestSnapshot) -> Result<Outcome, PipelineError> {
        info!(pr = pr.number, "all status checks passed");

        if self.config.approve {
            let review_id = self
                .forge
                .approve(pr.number)
                .await
                .map_err(PipelineError::Approve)?;
            info!(pr = pr.number, review_id, "approved pull request");
        }

        let merged = self
            .forge
            .merge(pr.number, MERGE_COMMIT_MESSAGE)
            .await
            .map_err(PipelineError::Merge)?;
        info!(pr = pr.number, merged, "merge requested");

        Ok(Outcome::Merged {
            approved: self.config.approve,
        })
    }
}
