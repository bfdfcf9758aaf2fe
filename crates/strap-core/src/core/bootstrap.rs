//! End-to-end startup sequencing: environment, dependencies, self-update,
//! restart decision.

use anyhow::Result;
use serde_json::json;
use tracing::info;

use strap_domain::RestartReason;

use crate::core::config::CommandContext;
use crate::core::dependencies::sync_dependencies;
use crate::core::environment::{EnvState, Environment};
use crate::core::tooling::outcome::ExecutionOutcome;
use crate::core::update::Updater;

#[derive(Clone, Copy, Debug, Default)]
pub struct BootstrapRequest {
    pub update: bool,
}

/// The default command: ensure the environment, synchronize dependencies,
/// then optionally self-update. Either restart branch ends the invocation;
/// anything that must survive it is already on disk by then.
pub fn bootstrap(ctx: &CommandContext, request: &BootstrapRequest) -> Result<ExecutionOutcome> {
    info!("starting bootstrap");
    let environment = Environment::new(ctx)?;
    let env_dir = environment.layout().env_dir().display().to_string();

    if let EnvState::RestartRequired(restart) = environment.ensure()? {
        return Ok(ExecutionOutcome::restart(
            restart.reason,
            "restart required to enter the environment",
            json!({
                "environment": env_dir,
                "hint": "the supervising wrapper relaunches with the environment activated",
            }),
        ));
    }

    let layout = environment.layout().clone();
    let sync_state = sync_dependencies(ctx, &layout)?;

    let mut updated = false;
    if request.update {
        let updater = Updater::new(ctx)?;
        updated = updater.apply_update()?;
        if updated {
            let restart = environment.request_restart(RestartReason::UpdateApplied)?;
            return Ok(ExecutionOutcome::restart(
                restart.reason,
                "update applied; restart required",
                json!({
                    "environment": env_dir,
                    "dependencies": sync_state.as_str(),
                    "hint": "the supervising wrapper relaunches under the refreshed source",
                }),
            ));
        }
    }

    info!("bootstrap complete");
    Ok(ExecutionOutcome::success(
        "bootstrap complete",
        json!({
            "environment": env_dir,
            "dependencies": sync_state.as_str(),
            "updated": updated,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GlobalOptions;
    use crate::core::testing::{test_config, test_context, FakeRunner};
    use crate::core::tooling::outcome::RESTART_EXIT_CODE;
    use std::fs;
    use std::path::Path;

    const LOCAL: &str = "abc12345ffffffffffffffffffffffffffffffff";
    const REMOTE: &str = "def67890ffffffffffffffffffffffffffffffff";

    fn materialize_env(root: &Path) -> String {
        let venv = root.join("venv");
        let bin = venv.join(if cfg!(windows) { "Scripts" } else { "bin" });
        fs::create_dir_all(&bin).expect("create env dirs");
        let python = if cfg!(windows) { "python.exe" } else { "python" };
        fs::write(bin.join(python), "").expect("interpreter stub");
        venv.to_str().expect("utf8 path").to_string()
    }

    #[test]
    fn settled_run_reports_success() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let venv = materialize_env(root);

        let global = GlobalOptions::default();
        let config = test_config(&[("VIRTUAL_ENV", &venv)]);
        let runner = FakeRunner::new();
        let ctx = test_context(&global, config, runner.clone(), root);

        let outcome = bootstrap(&ctx, &BootstrapRequest { update: true }).expect("bootstrap");
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.restart.is_none());
        assert_eq!(outcome.details["dependencies"], "no-manifest");
        assert_eq!(outcome.details["updated"], false);
        assert!(runner.calls().is_empty(), "no repo, no manifest, no commands");
    }

    #[test]
    fn inactive_environment_requests_a_restart_before_anything_else() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        materialize_env(root);
        fs::write(root.join("requirements.txt"), "pkg==1.0").expect("manifest");

        let global = GlobalOptions::default();
        let runner = FakeRunner::new();
        let ctx = test_context(&global, test_config(&[]), runner.clone(), root);

        let outcome = bootstrap(&ctx, &BootstrapRequest { update: true }).expect("bootstrap");
        assert_eq!(outcome.exit_code(), RESTART_EXIT_CODE);
        assert_eq!(outcome.restart.as_deref(), Some("enter-environment"));
        assert!(
            runner.calls().is_empty(),
            "dependency sync and update wait for the relaunch"
        );
    }

    #[test]
    fn applied_update_requests_a_second_restart() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let venv = materialize_env(root);
        fs::create_dir_all(root.join(".git")).expect("git metadata");

        let global = GlobalOptions::default();
        let config = test_config(&[("VIRTUAL_ENV", &venv)]);
        let runner = FakeRunner::new();
        runner.ok("git status --porcelain", "");
        runner.ok("git fetch --prune origin", "");
        runner.ok("git rev-parse HEAD", LOCAL);
        runner.ok("git rev-parse origin/main", REMOTE);
        runner.ok("git pull --ff-only origin main", "");
        let ctx = test_context(&global, config, runner.clone(), root);

        let outcome = bootstrap(&ctx, &BootstrapRequest { update: true }).expect("bootstrap");
        assert_eq!(outcome.exit_code(), RESTART_EXIT_CODE);
        assert_eq!(outcome.restart.as_deref(), Some("update-applied"));
        assert_eq!(runner.calls_matching("pull --ff-only"), 1);
        let marker = fs::read_to_string(root.join("venv").join(".restart-marker"))
            .expect("marker recorded");
        assert_eq!(marker.trim(), "1");
    }

    #[test]
    fn no_update_flag_skips_the_updater_entirely() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let venv = materialize_env(root);
        fs::create_dir_all(root.join(".git")).expect("git metadata");

        let global = GlobalOptions::default();
        let config = test_config(&[("VIRTUAL_ENV", &venv)]);
        let runner = FakeRunner::new();
        let ctx = test_context(&global, config, runner.clone(), root);

        let outcome = bootstrap(&ctx, &BootstrapRequest { update: false }).expect("bootstrap");
        assert_eq!(outcome.exit_code(), 0);
        assert!(runner.calls().is_empty());
    }
}
