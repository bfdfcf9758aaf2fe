mod common;

use std::fs;

use common::{find_git, git_fixture, publish_change, strap};

#[test]
fn force_update_restores_the_working_tree_non_interactively() {
    if !find_git() {
        eprintln!("skipping force-update test (git not found)");
        return;
    }
    let temp = tempfile::tempdir().expect("tempdir");
    let fixture = git_fixture(temp.path());
    publish_change(&fixture, "v2");

    fs::write(fixture.deploy.join("tool.py"), "print('clobbered')\n").expect("clobber");
    fs::write(fixture.deploy.join("scratch.txt"), "local junk\n").expect("untracked file");

    // Piped stdin is not a tty, so no prompt is issued.
    strap(&fixture.deploy).arg("force-update").assert().success();

    let tool = fs::read_to_string(fixture.deploy.join("tool.py")).expect("tool.py");
    assert!(tool.contains("v2"), "tracked files match the remote tip");
    assert!(
        !fixture.deploy.join("scratch.txt").exists(),
        "untracked files are removed"
    );
}

#[test]
fn force_update_outside_a_repository_reports_a_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    strap(temp.path()).arg("force-update").assert().code(1);
}
