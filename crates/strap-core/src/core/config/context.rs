use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use strap_domain::{discover_project_root, ProjectLayout};

use crate::core::config::settings::EnvSnapshot;
use crate::core::config::{Config, GlobalOptions};
use crate::core::runtime::effects::{self, Effects, SharedEffects};

/// Per-invocation wiring: global flags, configuration snapshot, effects and
/// the lazily resolved project root.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    project_root: OnceLock<PathBuf>,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a new command context from the process environment.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let config = Config::from_snapshot(&EnvSnapshot::capture());
        Ok(Self {
            global,
            config,
            project_root: OnceLock::new(),
            effects,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        global: &'a GlobalOptions,
        config: Config,
        effects: SharedEffects,
        root: PathBuf,
    ) -> Self {
        let project_root = OnceLock::new();
        let _ = project_root.set(root);
        Self {
            global,
            config,
            project_root,
            effects,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &dyn effects::CommandRunner {
        self.effects.runner()
    }

    pub fn fs(&self) -> &dyn effects::FileSystem {
        self.effects.fs()
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    /// Resolves the project root once per invocation.
    pub fn project_root(&self) -> Result<PathBuf> {
        if let Some(path) = self.project_root.get() {
            return Ok(path.clone());
        }
        let explicit = self.global.project.as_ref().map(PathBuf::from);
        let root = discover_project_root(
            explicit.as_deref(),
            &self.config.dependencies().manifest_name,
        )?;
        let _ = self.project_root.set(root.clone());
        Ok(root)
    }

    /// Derived filesystem layout for the resolved project root.
    pub fn layout(&self) -> Result<ProjectLayout> {
        let root = self.project_root()?;
        Ok(ProjectLayout::new(
            root,
            &self.config.environment().env_dir_name,
            &self.config.dependencies().manifest_name,
        ))
    }
}
