//! Test doubles shared by the core unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::core::config::settings::EnvSnapshot;
use crate::core::config::{CommandContext, Config, GlobalOptions};
use crate::core::runtime::effects::{
    CommandRunner, Effects, FileSystem, SharedEffects, SystemFileSystem,
};
use crate::core::runtime::process::{Invocation, ProcessError, RunOutput};

#[derive(Clone, Debug)]
enum Scripted {
    Ok(String),
    Fail { code: i32, stderr: String },
}

/// Records every invocation and replays scripted results keyed on the full
/// command line. A single scripted entry repeats; multiple entries play in
/// order.
pub(crate) struct FakeRunner {
    responses: Mutex<HashMap<String, Vec<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn ok(&self, command: &str, stdout: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(command.to_string())
            .or_default()
            .push(Scripted::Ok(stdout.to_string()));
    }

    pub(crate) fn fail(&self, command: &str, code: i32, stderr: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(command.to_string())
            .or_default()
            .push(Scripted::Fail {
                code,
                stderr: stderr.to_string(),
            });
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_matching(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.contains(needle))
            .count()
    }

    fn respond(&self, invocation: &Invocation) -> Result<RunOutput> {
        let key = invocation.display();
        self.calls.lock().expect("calls lock").push(key.clone());
        let mut responses = self.responses.lock().expect("responses lock");
        let queue = responses
            .get_mut(&key)
            .unwrap_or_else(|| panic!("unscripted command: {key}"));
        let scripted = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue
                .first()
                .cloned()
                .unwrap_or_else(|| panic!("unscripted command: {key}"))
        };
        match scripted {
            Scripted::Ok(stdout) => Ok(RunOutput {
                code: 0,
                stdout,
                stderr: String::new(),
            }),
            Scripted::Fail { code, stderr } => Err(ProcessError::Failed {
                command: key,
                code,
                stderr,
            }
            .into()),
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.respond(invocation)
    }

    fn run_streaming(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.respond(invocation)
    }
}

struct TestEffects {
    runner: Arc<FakeRunner>,
    fs: SystemFileSystem,
}

impl Effects for TestEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn fs(&self) -> &dyn FileSystem {
        &self.fs
    }
}

pub(crate) fn test_config(vars: &[(&str, &str)]) -> Config {
    Config::from_snapshot(&EnvSnapshot::testing(vars))
}

pub(crate) fn test_context<'a>(
    global: &'a GlobalOptions,
    config: Config,
    runner: Arc<FakeRunner>,
    root: &Path,
) -> CommandContext<'a> {
    let effects: SharedEffects = Arc::new(TestEffects {
        runner,
        fs: SystemFileSystem,
    });
    CommandContext::for_tests(global, config, effects, root.to_path_buf())
}
