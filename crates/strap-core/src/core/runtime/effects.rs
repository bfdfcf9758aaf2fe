use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error};

use super::process::{self, Invocation, RunOutput};

/// Runs external tools to completion.
///
/// A successful return implies a zero exit status; non-zero exits, timeouts
/// and launch failures surface as `ProcessError` inside the error chain.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput>;
    /// Same contract, with child output streamed to the operator while
    /// still being captured.
    fn run_streaming(&self, invocation: &Invocation) -> Result<RunOutput>;
}

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn CommandRunner;
    fn fs(&self) -> &dyn FileSystem;
}

pub struct SystemEffects {
    runner: Arc<SystemRunner>,
    fs: Arc<SystemFileSystem>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            fs: Arc::new(SystemFileSystem),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

struct SystemRunner;

impl SystemRunner {
    fn finish(invocation: &Invocation, result: Result<RunOutput>) -> Result<RunOutput> {
        let checked = result.and_then(|output| process::ensure_success(invocation, output));
        if let Err(err) = &checked {
            error!(command = %invocation.display(), "external command failed: {err:#}");
        }
        checked
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        debug!(command = %invocation.display(), "running");
        Self::finish(invocation, process::run_command(invocation))
    }

    fn run_streaming(&self, invocation: &Invocation) -> Result<RunOutput> {
        debug!(command = %invocation.display(), "running (streaming)");
        Self::finish(invocation, process::run_command_streaming(invocation))
    }
}

pub(crate) struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(path).with_context(|| format!("canonicalizing {}", path.display()))
    }
}

pub type SharedEffects = Arc<dyn Effects>;
