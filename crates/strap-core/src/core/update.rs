//! Fast-forward self-update against the configured remote branch.
//!
//! Everything here shells out to git through the runner seam; nothing
//! reimplements version-control diffing. Uncommitted local work always
//! wins over an update.

use anyhow::Result;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use strap_domain::{ProjectLayout, Revision, RevisionPair, UpdateDecision};

use crate::core::config::CommandContext;
use crate::core::runtime::process::{Invocation, ProcessError};
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to refresh remote state from {remote}")]
    Network { remote: String },
    #[error("cannot fast-forward {branch}: local and remote histories diverged")]
    FastForward { branch: String },
    #[error("hard reset against {target} failed")]
    Apply { target: String },
}

/// Result of one remote comparison. `revisions` is `None` outside a
/// repository.
#[derive(Clone, Debug)]
pub struct UpdateCheck {
    pub needs_update: bool,
    pub revisions: Option<RevisionPair>,
}

pub struct Updater<'a> {
    ctx: &'a CommandContext<'a>,
    layout: ProjectLayout,
}

impl<'a> Updater<'a> {
    pub fn new(ctx: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self {
            layout: ctx.layout()?,
            ctx,
        })
    }

    fn git(&self, args: &[&str]) -> Invocation {
        Invocation::new(
            "git",
            args,
            self.layout.root(),
            Some(self.ctx.config().update().git_timeout),
        )
    }

    pub fn is_repository(&self) -> bool {
        self.ctx.fs().is_dir(&self.layout.git_dir())
    }

    /// Any uncommitted modification counts, tracked or untracked.
    pub fn has_local_changes(&self) -> Result<bool> {
        let output = self.ctx.runner().run(&self.git(&["status", "--porcelain"]))?;
        Ok(output.stdout.lines().any(|line| !line.trim().is_empty()))
    }

    /// Best effort: `None` on detached HEAD or any failure, never fatal.
    pub fn current_branch(&self) -> Option<String> {
        let output = self
            .ctx
            .runner()
            .run(&self.git(&["branch", "--show-current"]))
            .ok()?;
        let name = output.stdout.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Refreshes remote-tracking state and compares branch tips. Network
    /// failures propagate; a missing repository is the cheap no-op path.
    pub fn check_for_updates(&self) -> Result<UpdateCheck> {
        if !self.is_repository() {
            return Ok(UpdateCheck {
                needs_update: false,
                revisions: None,
            });
        }
        let remote = self.ctx.config().update().remote.clone();
        let branch = self.ctx.config().update().branch.clone();
        self.fetch(&["fetch", "--prune", &remote])?;

        let local = self.rev_parse("HEAD")?;
        let remote_tip = self.rev_parse(&format!("{remote}/{branch}"))?;
        let revisions = RevisionPair {
            local,
            remote: remote_tip,
        };
        Ok(UpdateCheck {
            needs_update: revisions.needs_update(),
            revisions: Some(revisions),
        })
    }

    /// Applies a fast-forward-only pull. Returns `false` for every skip
    /// (no repository, local changes, already in sync); conflicts are never
    /// resolved automatically.
    pub fn apply_update(&self) -> Result<bool> {
        if !self.is_repository() {
            info!("not a repository; skipping update");
            return Ok(false);
        }
        if self.has_local_changes()? {
            warn!("local changes present; skipping update");
            return Ok(false);
        }
        let check = self.check_for_updates()?;
        let Some(revisions) = check.revisions else {
            return Ok(false);
        };
        if !check.needs_update {
            info!(revision = %revisions.local, "already up to date");
            return Ok(false);
        }

        warn!(from = %revisions.local, to = %revisions.remote, "applying update");
        let remote = self.ctx.config().update().remote.clone();
        let branch = self.ctx.config().update().branch.clone();
        let pull = self.git(&["pull", "--ff-only", &remote, &branch]);
        if let Err(err) = self.ctx.runner().run_streaming(&pull) {
            if pull_diverged(&err) {
                return Err(err.context(UpdateError::FastForward { branch }));
            }
            return Err(err.context(format!("failed to pull {remote}/{branch}")));
        }
        info!("update applied");
        Ok(true)
    }

    /// Destructive path: discard all local modifications and untracked
    /// files, resetting the working tree to the remote branch tip. The
    /// first failing step aborts the remainder.
    pub fn hard_reset(&self) -> Result<bool> {
        let remote = self.ctx.config().update().remote.clone();
        let branch = self.ctx.config().update().branch.clone();
        let target = format!("{remote}/{branch}");
        warn!(target = %target, "hard reset: discarding all local modifications");

        self.fetch(&["fetch", &remote])?;
        for step in [
            ["reset", "--hard", target.as_str()].as_slice(),
            ["clean", "-fd"].as_slice(),
        ] {
            self.ctx
                .runner()
                .run_streaming(&self.git(step))
                .map_err(|err| {
                    err.context(UpdateError::Apply {
                        target: target.clone(),
                    })
                })?;
        }
        info!("hard reset complete");
        Ok(true)
    }

    /// Collapses repository, working-tree and remote state into a single
    /// decision for reporting.
    pub fn decide(&self) -> Result<UpdateDecision> {
        if !self.is_repository() {
            return Ok(UpdateDecision::NotARepository);
        }
        if self.has_local_changes()? {
            return Ok(UpdateDecision::LocalChanges);
        }
        let check = self.check_for_updates()?;
        Ok(if check.needs_update {
            UpdateDecision::UpdateAvailable
        } else {
            UpdateDecision::UpToDate
        })
    }

    fn fetch(&self, args: &[&str]) -> Result<()> {
        let remote = self.ctx.config().update().remote.clone();
        self.ctx
            .runner()
            .run_streaming(&self.git(args))
            .map_err(|err| err.context(UpdateError::Network { remote }))?;
        Ok(())
    }

    fn rev_parse(&self, rev: &str) -> Result<Revision> {
        let output = self.ctx.runner().run(&self.git(&["rev-parse", rev]))?;
        Ok(Revision::new(output.stdout))
    }
}

fn pull_diverged(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProcessError>()
        .is_some_and(|process| match process {
            ProcessError::Failed { stderr, .. } => {
                let lowered = stderr.to_ascii_lowercase();
                lowered.contains("fast-forward") || lowered.contains("diverg")
            }
            _ => false,
        })
}

/// `check` command: report availability without applying anything.
pub fn check_updates(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let updater = Updater::new(ctx)?;
    let check = updater.check_for_updates()?;
    let Some(revisions) = &check.revisions else {
        return Ok(ExecutionOutcome::success(
            "not a repository; nothing to check",
            json!({ "decision": UpdateDecision::NotARepository.as_str() }),
        ));
    };
    let mut details = json!({
        "local": revisions.local.short(),
        "remote": revisions.remote.short(),
        "branch": updater.current_branch(),
    });
    if check.needs_update {
        details["decision"] = UpdateDecision::UpdateAvailable.as_str().into();
        Ok(ExecutionOutcome::user_error(
            format!(
                "update available: {} -> {}",
                revisions.local, revisions.remote
            ),
            details,
        ))
    } else {
        details["decision"] = UpdateDecision::UpToDate.as_str().into();
        Ok(ExecutionOutcome::success(
            format!("up to date ({})", revisions.local),
            details,
        ))
    }
}

/// `force-update` command: the destructive hard-reset path. Interactive
/// confirmation is the CLI's responsibility.
pub fn force_update(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let updater = Updater::new(ctx)?;
    if !updater.is_repository() {
        return Ok(ExecutionOutcome::user_error(
            "not a repository; nothing to reset",
            json!({ "decision": UpdateDecision::NotARepository.as_str() }),
        ));
    }
    updater.hard_reset()?;
    let update = ctx.config().update();
    let target = format!("{}/{}", update.remote, update.branch);
    Ok(ExecutionOutcome::success(
        format!("working tree reset to {target}"),
        json!({ "target": target }),
    ))
}
