use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub project: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) environment: EnvironmentConfig,
    pub(crate) dependencies: DependencyConfig,
    pub(crate) update: UpdateConfig,
    pub(crate) active_env: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub env_dir_name: String,
    pub python: Option<String>,
    pub max_restarts: u32,
}

#[derive(Debug, Clone)]
pub struct DependencyConfig {
    pub manifest_name: String,
    pub install_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub remote: String,
    pub branch: String,
    pub git_timeout: Duration,
}

impl Config {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            environment: EnvironmentConfig {
                env_dir_name: string_var(snapshot, "STRAP_ENV_DIR", "venv"),
                python: snapshot.var("STRAP_PYTHON").map(ToOwned::to_owned),
                max_restarts: numeric_var(snapshot, "STRAP_MAX_RESTARTS", 3),
            },
            dependencies: DependencyConfig {
                manifest_name: string_var(snapshot, "STRAP_REQUIREMENTS", "requirements.txt"),
                install_timeout: Duration::from_secs(numeric_var(
                    snapshot,
                    "STRAP_INSTALL_TIMEOUT_SECS",
                    600,
                )),
            },
            update: UpdateConfig {
                remote: string_var(snapshot, "STRAP_REMOTE", "origin"),
                branch: string_var(snapshot, "STRAP_BRANCH", "main"),
                git_timeout: Duration::from_secs(numeric_var(
                    snapshot,
                    "STRAP_GIT_TIMEOUT_SECS",
                    30,
                )),
            },
            active_env: snapshot.var("VIRTUAL_ENV").map(PathBuf::from),
        }
    }

    #[must_use]
    pub fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    #[must_use]
    pub fn dependencies(&self) -> &DependencyConfig {
        &self.dependencies
    }

    #[must_use]
    pub fn update(&self) -> &UpdateConfig {
        &self.update
    }

    /// The environment this invocation was launched inside, if any.
    #[must_use]
    pub fn active_env(&self) -> Option<&Path> {
        self.active_env.as_deref()
    }
}

fn string_var(snapshot: &EnvSnapshot, key: &str, default: &str) -> String {
    match snapshot.var(key) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn numeric_var<T: std::str::FromStr + PartialOrd + From<u8>>(
    snapshot: &EnvSnapshot,
    key: &str,
    default: T,
) -> T {
    snapshot
        .var(key)
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| *value > T::from(0))
        .unwrap_or(default)
}
