#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;

/// Builds a `strap` invocation with the host environment neutralized so a
/// developer's own shell state cannot leak into the assertions.
pub fn strap(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("strap");
    cmd.current_dir(dir);
    for var in [
        "VIRTUAL_ENV",
        "STRAP_PYTHON",
        "STRAP_ENV_DIR",
        "STRAP_REQUIREMENTS",
        "STRAP_REMOTE",
        "STRAP_BRANCH",
        "STRAP_MAX_RESTARTS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn find_git() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub fn find_python() -> Option<String> {
    for candidate in ["python3", "python"] {
        let probe = Command::new(candidate).arg("--version").output();
        if probe.map(|out| out.status.success()).unwrap_or(false) {
            return Some(candidate.to_string());
        }
    }
    None
}

pub fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.email=strap@test",
            "-c",
            "user.name=strap",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

pub struct RepoFixture {
    /// Bare repository standing in for the hosted origin.
    pub remote: PathBuf,
    /// Working clone used to publish new commits upstream.
    pub seed: PathBuf,
    /// The deployment checkout the bootstrapper operates on.
    pub deploy: PathBuf,
}

/// Local-path remote plus two clones: one to publish from, one under test.
pub fn git_fixture(temp: &Path) -> RepoFixture {
    run_git(temp, &["init", "--bare", "-b", "main", "remote.git"]);

    let seed = temp.join("seed");
    run_git(temp, &["clone", "remote.git", "seed"]);
    fs::write(seed.join("tool.py"), "print('v1')\n").expect("seed source");
    fs::write(seed.join(".gitignore"), "venv/\n__pycache__/\n").expect("seed gitignore");
    run_git(&seed, &["add", "."]);
    run_git(&seed, &["commit", "-m", "v1"]);
    run_git(&seed, &["push", "origin", "main"]);

    run_git(temp, &["clone", "remote.git", "deploy"]);

    RepoFixture {
        remote: temp.join("remote.git"),
        seed,
        deploy: temp.join("deploy"),
    }
}

pub fn publish_change(fixture: &RepoFixture, message: &str) {
    fs::write(
        fixture.seed.join("tool.py"),
        format!("print('{message}')\n"),
    )
    .expect("rewrite source");
    run_git(&fixture.seed, &["commit", "-am", message]);
    run_git(&fixture.seed, &["push", "origin", "main"]);
}

pub fn env_bin_dir(venv: &Path) -> PathBuf {
    venv.join(if cfg!(windows) { "Scripts" } else { "bin" })
}

/// A directory that passes for an environment without invoking python:
/// enough for flows that never execute the interpreter.
pub fn stub_env(venv: &Path) {
    let bin = env_bin_dir(venv);
    fs::create_dir_all(&bin).expect("create env dirs");
    let python = if cfg!(windows) { "python.exe" } else { "python" };
    fs::write(bin.join(python), "").expect("interpreter stub");
}
