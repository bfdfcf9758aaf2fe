//! Dependency synchronisation driven by the manifest fingerprint.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use strap_domain::{fingerprint, ProjectLayout};

use crate::core::config::CommandContext;
use crate::core::runtime::process::Invocation;

#[derive(Debug, Error)]
#[error("dependency install failed for {manifest}")]
pub struct DepsError {
    pub manifest: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    UpToDate,
    Installed,
    NoManifest,
}

impl SyncState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::UpToDate => "up-to-date",
            SyncState::Installed => "installed",
            SyncState::NoManifest => "no-manifest",
        }
    }
}

/// Installs from the manifest only when its content fingerprint changed
/// since the last successful install.
///
/// The cache is rewritten atomically after a successful install and left
/// untouched on failure, so a crashed or failed install re-attempts rather
/// than silently skipping.
pub fn sync_dependencies(ctx: &CommandContext, layout: &ProjectLayout) -> Result<SyncState> {
    let manifest = layout.manifest();
    let Some(current) = fingerprint::fingerprint_file(manifest)? else {
        info!(manifest = %manifest.display(), "no manifest; nothing to install");
        return Ok(SyncState::NoManifest);
    };

    let cache_path = layout.fingerprint_cache();
    if read_cached_fingerprint(ctx, &cache_path).as_deref() == Some(current.as_str()) {
        info!("dependencies up to date");
        return Ok(SyncState::UpToDate);
    }

    install(ctx, layout)?;
    write_fingerprint_atomic(&cache_path, &current)?;
    Ok(SyncState::Installed)
}

fn read_cached_fingerprint(ctx: &CommandContext, path: &Path) -> Option<String> {
    let contents = ctx.fs().read_to_string(path).ok()?;
    let line = contents.trim();
    fingerprint::is_well_formed_digest(line).then(|| line.to_string())
}

fn install(ctx: &CommandContext, layout: &ProjectLayout) -> Result<()> {
    let pip = layout.pip();
    let manifest = layout.manifest();
    warn!(manifest = %manifest.display(), "installing dependencies");
    let manifest_arg = manifest.to_string_lossy();
    let invocation = Invocation::new(
        pip.to_string_lossy(),
        ["install", "-r", manifest_arg.as_ref()],
        layout.root(),
        Some(ctx.config().dependencies().install_timeout),
    );
    ctx.runner()
        .run_streaming(&invocation)
        .context(DepsError {
            manifest: manifest.display().to_string(),
        })?;
    Ok(())
}

// Install and cache rewrite are separate steps; the rename makes the second
// one all-or-nothing so a crash in between can only mean "retry install".
fn write_fingerprint_atomic(cache_path: &Path, digest: &str) -> Result<()> {
    let dir = cache_path
        .parent()
        .context("fingerprint cache has no parent directory")?;
    let mut staged = tempfile::Builder::new()
        .prefix(".req-hash.")
        .tempfile_in(dir)
        .with_context(|| format!("failed to stage fingerprint in {}", dir.display()))?;
    writeln!(staged, "{digest}").context("failed to write staged fingerprint")?;
    staged
        .persist(cache_path)
        .with_context(|| format!("failed to persist {}", cache_path.display()))?;
    Ok(())
}
