//! Isolated runtime environment management.
//!
//! The process never replaces its own image. When execution must continue
//! inside the environment, `request_restart` hands back a request that the
//! CLI turns into the reserved restart exit code; a supervising wrapper
//! relaunches with the environment activated.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use strap_domain::{ProjectLayout, RestartReason};

use crate::core::config::CommandContext;
use crate::core::runtime::process::Invocation;

const CREATE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to create environment at {}", .path.display())]
    Creation { path: PathBuf },
    #[error("environment interpreter missing at {}", .path.display())]
    Missing { path: PathBuf },
    #[error("{count} consecutive restarts without entering the environment; check the supervising wrapper")]
    RestartLoop { count: u32 },
}

#[derive(Debug)]
pub enum EnvState {
    Ready,
    RestartRequired(RestartRequest),
}

#[derive(Debug, Clone, Copy)]
pub struct RestartRequest {
    pub reason: RestartReason,
}

pub struct Environment<'a> {
    ctx: &'a CommandContext<'a>,
    layout: ProjectLayout,
}

impl<'a> Environment<'a> {
    pub fn new(ctx: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self {
            layout: ctx.layout()?,
            ctx,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn exists(&self) -> bool {
        self.ctx.fs().is_dir(self.layout.env_dir())
    }

    /// Whether this invocation was launched with the project environment
    /// activated (the wrapper exports `VIRTUAL_ENV` on relaunch).
    pub fn is_active(&self) -> bool {
        let Some(active) = self.ctx.config().active_env() else {
            return false;
        };
        let env_dir = self.layout.env_dir();
        let fs = self.ctx.fs();
        match (fs.canonicalize(active), fs.canonicalize(env_dir)) {
            (Ok(left), Ok(right)) => left == right,
            _ => active == env_dir,
        }
    }

    /// Materializes a new environment. Not idempotent: callers check
    /// `exists()` first; re-creating an existing environment is undefined.
    pub fn create(&self) -> Result<()> {
        let python = self.base_interpreter()?;
        warn!(path = %self.layout.env_dir().display(), "creating environment");
        let env_dir = self.layout.env_dir().to_string_lossy();
        let invocation = Invocation::new(
            python,
            ["-m", "venv", env_dir.as_ref()],
            self.layout.root(),
            Some(CREATE_TIMEOUT),
        );
        self.ctx
            .runner()
            .run_streaming(&invocation)
            .context(EnvError::Creation {
                path: self.layout.env_dir().to_path_buf(),
            })?;
        Ok(())
    }

    /// Creates the environment when absent, then requests a restart unless
    /// already active. When this returns `Ready` the caller is guaranteed
    /// to be running inside the environment.
    pub fn ensure(&self) -> Result<EnvState> {
        if !self.exists() {
            self.create()?;
        }
        if self.is_active() {
            self.clear_restart_marker();
            debug!("environment active");
            return Ok(EnvState::Ready);
        }
        let request = self.request_restart(RestartReason::EnterEnvironment)?;
        Ok(EnvState::RestartRequired(request))
    }

    /// Validates that a relaunch can succeed, bumps the consecutive-restart
    /// bound, and hands the request to the caller. The process identity is
    /// not preserved across the relaunch; only filesystem state survives.
    pub fn request_restart(&self, reason: RestartReason) -> Result<RestartRequest> {
        let interpreter = self.layout.interpreter();
        if !self.ctx.fs().exists(&interpreter) {
            return Err(EnvError::Missing { path: interpreter }.into());
        }
        let count = self.bump_restart_marker()?;
        let max = self.ctx.config().environment().max_restarts;
        if count > max {
            return Err(EnvError::RestartLoop { count }.into());
        }
        warn!(reason = reason.as_str(), "requesting restart");
        Ok(RestartRequest { reason })
    }

    fn base_interpreter(&self) -> Result<String> {
        if let Some(explicit) = &self.ctx.config().environment().python {
            return Ok(explicit.clone());
        }
        for candidate in ["python3", "python"] {
            if let Ok(path) = which::which(candidate) {
                return path
                    .into_os_string()
                    .into_string()
                    .map_err(|_| anyhow::anyhow!("non-utf8 interpreter path"));
            }
        }
        bail!("no python interpreter found; set STRAP_PYTHON");
    }

    fn bump_restart_marker(&self) -> Result<u32> {
        let marker = self.layout.restart_marker();
        let fs = self.ctx.fs();
        let previous = if fs.exists(&marker) {
            fs.read_to_string(&marker)
                .ok()
                .and_then(|contents| contents.trim().parse::<u32>().ok())
                .unwrap_or(0)
        } else {
            0
        };
        let count = previous + 1;
        fs.write(&marker, format!("{count}\n").as_bytes())
            .context("failed to record restart marker")?;
        Ok(count)
    }

    fn clear_restart_marker(&self) {
        let marker = self.layout.restart_marker();
        if self.ctx.fs().exists(&marker) {
            let _ = self.ctx.fs().remove_file(&marker);
        }
    }
}
