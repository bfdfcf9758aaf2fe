use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Derived filesystem layout for a bootstrapped project.
///
/// Every path hangs off a single project root. Construction is pure; nothing
/// here touches the filesystem.
#[derive(Clone, Debug)]
pub struct ProjectLayout {
    root: PathBuf,
    env_dir: PathBuf,
    manifest: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, env_dir_name: &str, manifest_name: &str) -> Self {
        let root = root.into();
        let env_dir = root.join(env_dir_name);
        let manifest = root.join(manifest_name);
        Self {
            root,
            env_dir,
            manifest,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    /// Single-line hex digest recorded after the last successful install.
    pub fn fingerprint_cache(&self) -> PathBuf {
        self.env_dir.join(".req-hash")
    }

    /// Consecutive restart-request counter; cleared by a run that settles
    /// inside the environment.
    pub fn restart_marker(&self) -> PathBuf {
        self.env_dir.join(".restart-marker")
    }

    pub fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.env_dir.join("Scripts")
        } else {
            self.env_dir.join("bin")
        }
    }

    pub fn interpreter(&self) -> PathBuf {
        self.bin_dir().join(executable("python"))
    }

    pub fn pip(&self) -> PathBuf {
        self.bin_dir().join(executable("pip"))
    }
}

fn executable(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Locates the project root for the current invocation.
///
/// An explicit override wins unconditionally. Otherwise the working
/// directory and its ancestors are searched for the manifest or
/// version-control metadata; the working directory itself is the fallback
/// when neither is found.
pub fn discover_project_root(explicit: Option<&Path>, manifest_name: &str) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    let cwd = env::current_dir().context("failed to resolve working directory")?;
    Ok(discover_project_root_from(&cwd, manifest_name))
}

pub fn discover_project_root_from(start: &Path, manifest_name: &str) -> PathBuf {
    let mut candidate = start;
    loop {
        if candidate.join(manifest_name).is_file() || candidate.join(".git").is_dir() {
            debug!(root = %candidate.display(), "discovered project root");
            return candidate.to_path_buf();
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return start.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn layout_derives_paths_from_root() {
        let layout = ProjectLayout::new("/srv/tool", "venv", "requirements.txt");
        assert_eq!(layout.root(), Path::new("/srv/tool"));
        assert_eq!(layout.env_dir(), Path::new("/srv/tool/venv"));
        assert_eq!(layout.manifest(), Path::new("/srv/tool/requirements.txt"));
        assert_eq!(
            layout.fingerprint_cache(),
            PathBuf::from("/srv/tool/venv/.req-hash")
        );
        assert_eq!(layout.git_dir(), PathBuf::from("/srv/tool/.git"));
    }

    #[cfg(unix)]
    #[test]
    fn layout_entry_points_live_in_bin() {
        let layout = ProjectLayout::new("/srv/tool", "venv", "requirements.txt");
        assert_eq!(layout.interpreter(), PathBuf::from("/srv/tool/venv/bin/python"));
        assert_eq!(layout.pip(), PathBuf::from("/srv/tool/venv/bin/pip"));
    }

    #[test]
    fn discovery_walks_up_to_the_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("project");
        let nested = root.join("src").join("deep");
        fs::create_dir_all(&nested).expect("mkdirs");
        fs::write(root.join("requirements.txt"), "pkg==1.0\n").expect("manifest");

        assert_eq!(
            discover_project_root_from(&nested, "requirements.txt"),
            root
        );
    }

    #[test]
    fn discovery_falls_back_to_the_start_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let start = temp.path().join("nowhere");
        fs::create_dir_all(&start).expect("mkdirs");

        assert_eq!(
            discover_project_root_from(&start, "requirements.txt"),
            start
        );
    }

    #[test]
    fn explicit_root_wins_over_discovery() {
        let explicit = Path::new("/opt/elsewhere");
        let resolved =
            discover_project_root(Some(explicit), "requirements.txt").expect("resolve");
        assert_eq!(resolved, explicit);
    }
}
